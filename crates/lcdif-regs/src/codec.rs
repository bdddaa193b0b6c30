//! Bidirectional mapping between a [`VideoMode`] and the controller's timing
//! registers.
//!
//! Encoding is total for validated modes: sub-field overflow is the mode
//! validator's job (resolution limits), so no ranges are re-checked here.
//! Decoding is used by mode recovery only and is deliberately lossy: RGB
//! bitfields are not representable in the timing words, so callers re-run
//! mode validation afterwards to reconstruct them from depth + bus width.

use crate::mode::{BusWidth, SyncFlags, VideoMode, RGB666};
use crate::{ctrl, transfer_count, vdctrl0, vdctrl2, vdctrl3, vdctrl4};

/// The register-level image of one video mode.
///
/// Field order matches the fixed programming order: control, transfer count,
/// then the five vertical/horizontal detail words.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TimingWords {
    pub ctrl: u32,
    /// Byte-packaging value for the `CTRL1` sub-field (not the whole
    /// register; `CTRL1` also carries live IRQ state).
    pub byte_packaging: u32,
    pub transfer_count: u32,
    pub vdctrl0: u32,
    pub vdctrl1: u32,
    pub vdctrl2: u32,
    pub vdctrl3: u32,
    pub vdctrl4: u32,
}

/// Geometry and polarity reconstructed from live timing registers.
///
/// The pixel-clock period is not recoverable from the registers; recovery
/// reads it back from the clock capability instead.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodedMode {
    pub xres: u32,
    pub yres: u32,
    pub depth: u32,
    pub hsync_len: u32,
    pub vsync_len: u32,
    pub left_margin: u32,
    pub right_margin: u32,
    pub upper_margin: u32,
    pub lower_margin: u32,
    pub sync: SyncFlags,
    pub bus_width: BusWidth,
    pub dotclk_delay: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The control word's word-length field holds a code with no depth
    /// assigned (only 0 = 16bpp and 3 = 32bpp are produced by encode).
    InvalidWordLength(u32),
    /// A margin computation underflowed: the period/wait counters disagree
    /// with the pulse widths, so the registers do not describe a mode this
    /// codec could have produced.
    InconsistentTiming(&'static str),
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DecodeError::InvalidWordLength(code) => {
                write!(f, "invalid word-length code {code}")
            }
            DecodeError::InconsistentTiming(what) => {
                write!(f, "inconsistent timing registers: {what}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Encodes a validated mode into its register image.
///
/// `dotclk_delay` is the platform's dot-clock output delay tap (3 bits).
pub fn encode(mode: &VideoMode, bus_width: BusWidth, dotclk_delay: u32) -> TimingWords {
    debug_assert!(mode.depth == 16 || mode.depth == 32);

    let mut control = ctrl::BYPASS_COUNT | ctrl::MASTER | ctrl::set_bus_width(bus_width.code());
    let byte_packaging;
    if mode.depth == 16 {
        control |= ctrl::set_word_length(0);
        byte_packaging = 0xf;
    } else {
        control |= ctrl::set_word_length(3);
        byte_packaging = 0x7;
        match bus_width {
            // 24-bit words squeezed onto a 16-bit bus.
            BusWidth::Bits16 => control |= ctrl::DF24,
            // An 18-bit bus only needs the forcing bit when it has to emit
            // full 24-bit words, i.e. when the negotiated format is not
            // RGB666.
            BusWidth::Bits18 if !mode.pixfmt_is(&RGB666) => control |= ctrl::DF24,
            _ => {}
        }
    }

    let mut v0 = vdctrl0::ENABLE_PRESENT
        | vdctrl0::VSYNC_PERIOD_UNIT
        | vdctrl0::VSYNC_PULSE_WIDTH_UNIT
        | vdctrl0::set_vsync_pulse_width(mode.vsync_len);
    if mode.sync.contains(SyncFlags::HSYNC_ACTIVE_HIGH) {
        v0 |= vdctrl0::HSYNC_ACT_HIGH;
    }
    if mode.sync.contains(SyncFlags::VSYNC_ACTIVE_HIGH) {
        v0 |= vdctrl0::VSYNC_ACT_HIGH;
    }
    if !mode.sync.contains(SyncFlags::OE_ACTIVE_LOW) {
        v0 |= vdctrl0::ENABLE_ACT_HIGH;
    }
    if mode.sync.contains(SyncFlags::CLK_LATCH_FALLING) {
        v0 |= vdctrl0::DOTCLK_ACT_FALLING;
    }

    // Frame length in lines.
    let vsync_period = mode.vsync_len + mode.upper_margin + mode.yres + mode.lower_margin;
    // Line length in dot clocks.
    let hsync_period = mode.hsync_len + mode.left_margin + mode.xres + mode.right_margin;

    TimingWords {
        ctrl: control,
        byte_packaging,
        transfer_count: transfer_count::pack(mode.xres, mode.yres),
        vdctrl0: v0,
        vdctrl1: vsync_period,
        vdctrl2: vdctrl2::set_hsync_pulse_width(mode.hsync_len)
            | vdctrl2::set_hsync_period(hsync_period),
        vdctrl3: vdctrl3::set_hor_wait_cnt(mode.hsync_len + mode.left_margin)
            | vdctrl3::set_vert_wait_cnt(mode.vsync_len + mode.upper_margin),
        vdctrl4: vdctrl4::set_dotclk_dly(dotclk_delay)
            | vdctrl4::set_h_valid_data_cnt(mode.xres),
    }
}

/// Inverts [`encode`] as far as the registers allow.
pub fn decode(words: &TimingWords) -> Result<DecodedMode, DecodeError> {
    let depth = match ctrl::get_word_length(words.ctrl) {
        0 => 16,
        3 => 32,
        code => return Err(DecodeError::InvalidWordLength(code)),
    };

    let xres = transfer_count::hcount(words.transfer_count);
    let yres = transfer_count::vcount(words.transfer_count);

    let hsync_len = vdctrl2::get_hsync_pulse_width(words.vdctrl2);
    let vsync_len = vdctrl0::get_vsync_pulse_width(words.vdctrl0);

    let left_margin = vdctrl3::get_hor_wait_cnt(words.vdctrl3)
        .checked_sub(hsync_len)
        .ok_or(DecodeError::InconsistentTiming("horizontal wait count"))?;
    let right_margin = vdctrl2::get_hsync_period(words.vdctrl2)
        .checked_sub(hsync_len + left_margin + xres)
        .ok_or(DecodeError::InconsistentTiming("hsync period"))?;
    let upper_margin = vdctrl3::get_vert_wait_cnt(words.vdctrl3)
        .checked_sub(vsync_len)
        .ok_or(DecodeError::InconsistentTiming("vertical wait count"))?;
    let lower_margin = words
        .vdctrl1
        .checked_sub(vsync_len + upper_margin + yres)
        .ok_or(DecodeError::InconsistentTiming("vsync period"))?;

    let mut sync = SyncFlags::empty();
    if words.vdctrl0 & vdctrl0::HSYNC_ACT_HIGH != 0 {
        sync |= SyncFlags::HSYNC_ACTIVE_HIGH;
    }
    if words.vdctrl0 & vdctrl0::VSYNC_ACT_HIGH != 0 {
        sync |= SyncFlags::VSYNC_ACTIVE_HIGH;
    }
    if words.vdctrl0 & vdctrl0::ENABLE_ACT_HIGH == 0 {
        sync |= SyncFlags::OE_ACTIVE_LOW;
    }
    if words.vdctrl0 & vdctrl0::DOTCLK_ACT_FALLING != 0 {
        sync |= SyncFlags::CLK_LATCH_FALLING;
    }

    Ok(DecodedMode {
        xres,
        yres,
        depth,
        hsync_len,
        vsync_len,
        left_margin,
        right_margin,
        upper_margin,
        lower_margin,
        sync,
        bus_width: BusWidth::from_code(ctrl::get_bus_width(words.ctrl)),
        dotclk_delay: vdctrl4::get_dotclk_dly(words.vdctrl4),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{RGB565, RGB888};

    fn mode_480x272_16bpp() -> VideoMode {
        let mut mode = VideoMode {
            xres: 480,
            yres: 272,
            xres_virtual: 480,
            yres_virtual: 272,
            depth: 16,
            pixclock_ps: 111_000,
            hsync_len: 2,
            vsync_len: 2,
            left_margin: 2,
            right_margin: 2,
            upper_margin: 2,
            lower_margin: 2,
            ..Default::default()
        };
        mode.apply_pixfmt(&RGB565);
        mode
    }

    #[test]
    fn encode_480x272_16bpp_over_24bit_bus() {
        let words = encode(&mode_480x272_16bpp(), BusWidth::Bits24, 0);

        assert_eq!(ctrl::get_word_length(words.ctrl), 0);
        assert_eq!(words.byte_packaging, 0xf);
        assert_eq!(words.transfer_count, (272 << 16) | 480);
        assert_eq!(ctrl::get_bus_width(words.ctrl), BusWidth::Bits24.code());
        assert_eq!(words.ctrl & ctrl::DF24, 0);

        // vsync period = 2 + 2 + 272 + 2, hsync period = 2 + 2 + 480 + 2.
        assert_eq!(words.vdctrl1, 278);
        assert_eq!(vdctrl2::get_hsync_period(words.vdctrl2), 486);
        assert_eq!(vdctrl2::get_hsync_pulse_width(words.vdctrl2), 2);
        assert_eq!(vdctrl3::get_hor_wait_cnt(words.vdctrl3), 4);
        assert_eq!(vdctrl3::get_vert_wait_cnt(words.vdctrl3), 4);
        assert_eq!(vdctrl4::get_h_valid_data_cnt(words.vdctrl4), 480);
    }

    #[test]
    fn encode_32bpp_word_length_and_packaging() {
        let mut mode = mode_480x272_16bpp();
        mode.depth = 32;
        mode.apply_pixfmt(&RGB888);

        let words = encode(&mode, BusWidth::Bits24, 0);
        assert_eq!(ctrl::get_word_length(words.ctrl), 3);
        assert_eq!(words.byte_packaging, 0x7);
        assert_eq!(words.ctrl & ctrl::DF24, 0);
    }

    #[test]
    fn df24_set_for_16bit_bus_at_32bpp() {
        let mut mode = mode_480x272_16bpp();
        mode.depth = 32;
        mode.apply_pixfmt(&RGB666);

        let words = encode(&mode, BusWidth::Bits16, 0);
        assert_ne!(words.ctrl & ctrl::DF24, 0);
    }

    #[test]
    fn df24_on_18bit_bus_only_for_rgb888() {
        let mut mode = mode_480x272_16bpp();
        mode.depth = 32;

        mode.apply_pixfmt(&RGB666);
        let words = encode(&mode, BusWidth::Bits18, 0);
        assert_eq!(words.ctrl & ctrl::DF24, 0);

        mode.apply_pixfmt(&RGB888);
        let words = encode(&mode, BusWidth::Bits18, 0);
        assert_ne!(words.ctrl & ctrl::DF24, 0);
    }

    #[test]
    fn round_trip_representative_mode_per_bus_width() {
        for (bus, depth) in [
            (BusWidth::Bits8, 16),
            (BusWidth::Bits16, 32),
            (BusWidth::Bits18, 32),
            (BusWidth::Bits24, 32),
        ] {
            let mut mode = VideoMode {
                xres: 800,
                yres: 480,
                depth,
                hsync_len: 48,
                vsync_len: 3,
                left_margin: 40,
                right_margin: 40,
                upper_margin: 29,
                lower_margin: 13,
                sync: SyncFlags::HSYNC_ACTIVE_HIGH | SyncFlags::CLK_LATCH_FALLING,
                ..Default::default()
            };
            mode.apply_pixfmt(if depth == 16 { &RGB565 } else { &RGB888 });

            let decoded = decode(&encode(&mode, bus, 3)).unwrap();
            assert_eq!(decoded.xres, mode.xres);
            assert_eq!(decoded.yres, mode.yres);
            assert_eq!(decoded.depth, depth);
            assert_eq!(decoded.hsync_len, mode.hsync_len);
            assert_eq!(decoded.vsync_len, mode.vsync_len);
            assert_eq!(decoded.left_margin, mode.left_margin);
            assert_eq!(decoded.right_margin, mode.right_margin);
            assert_eq!(decoded.upper_margin, mode.upper_margin);
            assert_eq!(decoded.lower_margin, mode.lower_margin);
            assert_eq!(decoded.sync, mode.sync);
            assert_eq!(decoded.bus_width, bus);
            assert_eq!(decoded.dotclk_delay, 3);
        }
    }

    #[test]
    fn decode_rejects_reserved_word_length() {
        let mut words = encode(&mode_480x272_16bpp(), BusWidth::Bits24, 0);
        words.ctrl = (words.ctrl & !ctrl::WORD_LENGTH_MASK) | ctrl::set_word_length(1);
        assert_eq!(decode(&words), Err(DecodeError::InvalidWordLength(1)));
    }

    #[test]
    fn decode_rejects_underflowing_wait_counts() {
        let mut words = encode(&mode_480x272_16bpp(), BusWidth::Bits24, 0);
        // Wait count smaller than the pulse width cannot come from encode.
        words.vdctrl3 = vdctrl3::set_hor_wait_cnt(1) | vdctrl3::set_vert_wait_cnt(4);
        assert!(matches!(
            decode(&words),
            Err(DecodeError::InconsistentTiming(_))
        ));
    }
}
