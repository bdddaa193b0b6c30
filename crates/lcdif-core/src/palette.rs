//! Truecolor pseudo-palette helpers.

use lcdif_regs::ColorField;

/// Number of pseudo-palette entries exposed to the consumer.
pub const PALETTE_SIZE: usize = 16;

/// Packs a 16-bit color channel into its position within a pixel word.
pub fn chan_to_field(chan: u16, field: &ColorField) -> u32 {
    let chan = u32::from(chan) & 0xffff;
    (chan >> (16 - field.length)) << field.offset
}

/// Reduces an RGB triple to a single gray channel.
pub fn rgb_to_gray(red: u16, green: u16, blue: u16) -> u16 {
    let gray =
        19595 * u32::from(red) + 38470 * u32::from(green) + 7471 * u32::from(blue);
    (gray >> 16) as u16
}
