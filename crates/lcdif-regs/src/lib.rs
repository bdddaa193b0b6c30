//! Register-level layout of the LCDIF dot-clock display controller.
//!
//! This crate is intentionally pure: it defines the controller's register map
//! and bit fields, the video-mode data model, and the bidirectional codec
//! between a [`VideoMode`] and the hardware timing words. It performs no I/O,
//! so both the driver core (`lcdif-core`) and any register-file model of the
//! controller can share one definition of the layout.
//!
//! Every control-class register has write-only `+0x04` set-bits and `+0x08`
//! clear-bits alias offsets (see [`REG_SET`]/[`REG_CLR`]); the codec itself
//! only deals in full register values.
#![forbid(unsafe_code)]

mod codec;
mod mode;

pub use codec::{decode, encode, DecodeError, DecodedMode, TimingWords};
pub use mode::{
    khz_to_picos, BusWidth, ColorField, PixelFormat, SyncFlags, VideoMode, MAX_XRES, MAX_YRES,
    MIN_XRES, MIN_YRES, RGB565, RGB666, RGB888,
};

/// Byte offset of the write-only set-bits alias of a control-class register.
pub const REG_SET: u32 = 0x04;
/// Byte offset of the write-only clear-bits alias of a control-class register.
pub const REG_CLR: u32 = 0x08;

/// Register byte offsets from the controller base.
pub mod reg {
    pub const CTRL: u32 = 0x00;
    /// IRQ enable/status register ("control-extra").
    pub const CTRL1: u32 = 0x10;
    pub const CTRL2: u32 = 0x20;
    /// Bits 31:16 = vertical count, 15:0 = horizontal count.
    pub const TRANSFER_COUNT: u32 = 0x30;
    /// Read-only: the scanout address of the frame currently being emitted.
    pub const CUR_BUF: u32 = 0x40;
    /// Latched at the next vertical blank.
    pub const NEXT_BUF: u32 = 0x50;
    pub const TIMING: u32 = 0x60;
    pub const VDCTRL0: u32 = 0x70;
    pub const VDCTRL1: u32 = 0x80;
    pub const VDCTRL2: u32 = 0x90;
    pub const VDCTRL3: u32 = 0xA0;
    pub const VDCTRL4: u32 = 0xB0;
}

/// `CTRL` register bits.
pub mod ctrl {
    pub const SFTRST: u32 = 1 << 31;
    pub const CLKGATE: u32 = 1 << 30;
    pub const BYPASS_COUNT: u32 = 1 << 19;
    pub const VSYNC_MODE: u32 = 1 << 18;
    pub const DOTCLK_MODE: u32 = 1 << 17;
    pub const DATA_SELECT: u32 = 1 << 16;
    pub const MASTER: u32 = 1 << 5;
    /// Force 16-bit data format.
    pub const DF16: u32 = 1 << 3;
    /// Force 18-bit data format.
    pub const DF18: u32 = 1 << 2;
    /// Force 24-bit data format (drop the upper 2 bits of each byte).
    pub const DF24: u32 = 1 << 1;
    pub const RUN: u32 = 1 << 0;

    pub const BUS_WIDTH_SHIFT: u32 = 10;
    pub const BUS_WIDTH_MASK: u32 = 0x3 << BUS_WIDTH_SHIFT;
    pub const WORD_LENGTH_SHIFT: u32 = 8;
    pub const WORD_LENGTH_MASK: u32 = 0x3 << WORD_LENGTH_SHIFT;

    pub fn set_bus_width(x: u32) -> u32 {
        (x & 0x3) << BUS_WIDTH_SHIFT
    }

    pub fn get_bus_width(reg: u32) -> u32 {
        (reg >> BUS_WIDTH_SHIFT) & 0x3
    }

    pub fn set_word_length(x: u32) -> u32 {
        (x & 0x3) << WORD_LENGTH_SHIFT
    }

    pub fn get_word_length(reg: u32) -> u32 {
        (reg >> WORD_LENGTH_SHIFT) & 0x3
    }
}

/// `CTRL1` register bits: byte packaging plus the IRQ enable/status block.
///
/// Enable bits occupy bits 15:12; the matching status bits mirror them at
/// 11:8. Status bits are write-one-to-clear through the `+0x08` alias.
pub mod ctrl1 {
    pub const RECOVER_ON_UNDERFLOW: u32 = 1 << 24;
    pub const FIFO_CLEAR: u32 = 1 << 21;

    pub const BYTE_PACKAGING_SHIFT: u32 = 16;
    pub const BYTE_PACKAGING_MASK: u32 = 0xf << BYTE_PACKAGING_SHIFT;

    pub const OVERFLOW_IRQ_EN: u32 = 1 << 15;
    pub const UNDERFLOW_IRQ_EN: u32 = 1 << 14;
    pub const CUR_FRAME_DONE_IRQ_EN: u32 = 1 << 13;
    pub const VSYNC_EDGE_IRQ_EN: u32 = 1 << 12;
    pub const OVERFLOW_IRQ: u32 = 1 << 11;
    pub const UNDERFLOW_IRQ: u32 = 1 << 10;
    pub const CUR_FRAME_DONE_IRQ: u32 = 1 << 9;
    pub const VSYNC_EDGE_IRQ: u32 = 1 << 8;

    pub const IRQ_ENABLE_MASK: u32 =
        OVERFLOW_IRQ_EN | UNDERFLOW_IRQ_EN | CUR_FRAME_DONE_IRQ_EN | VSYNC_EDGE_IRQ_EN;
    pub const IRQ_ENABLE_SHIFT: u32 = 12;
    pub const IRQ_STATUS_MASK: u32 =
        OVERFLOW_IRQ | UNDERFLOW_IRQ | CUR_FRAME_DONE_IRQ | VSYNC_EDGE_IRQ;
    pub const IRQ_STATUS_SHIFT: u32 = 8;

    pub fn set_byte_packaging(x: u32) -> u32 {
        (x & 0xf) << BYTE_PACKAGING_SHIFT
    }

    pub fn get_byte_packaging(reg: u32) -> u32 {
        (reg >> BYTE_PACKAGING_SHIFT) & 0xf
    }
}

/// `CTRL2` register bits.
pub mod ctrl2 {
    pub const OUTSTANDING_REQS_REQ_16: u32 = 3 << 21;
}

/// `TRANSFER_COUNT` packing.
pub mod transfer_count {
    pub fn pack(hcount: u32, vcount: u32) -> u32 {
        ((vcount & 0xffff) << 16) | (hcount & 0xffff)
    }

    pub fn hcount(reg: u32) -> u32 {
        reg & 0xffff
    }

    pub fn vcount(reg: u32) -> u32 {
        (reg >> 16) & 0xffff
    }
}

/// `VDCTRL0` bits: vsync pulse width plus polarity selection.
pub mod vdctrl0 {
    pub const ENABLE_PRESENT: u32 = 1 << 28;
    pub const VSYNC_ACT_HIGH: u32 = 1 << 27;
    pub const HSYNC_ACT_HIGH: u32 = 1 << 26;
    pub const DOTCLK_ACT_FALLING: u32 = 1 << 25;
    pub const ENABLE_ACT_HIGH: u32 = 1 << 24;
    pub const VSYNC_PERIOD_UNIT: u32 = 1 << 21;
    pub const VSYNC_PULSE_WIDTH_UNIT: u32 = 1 << 20;
    pub const HALF_LINE: u32 = 1 << 19;
    pub const HALF_LINE_MODE: u32 = 1 << 18;

    pub const VSYNC_PULSE_WIDTH_MASK: u32 = 0x3ffff;

    pub fn set_vsync_pulse_width(x: u32) -> u32 {
        x & VSYNC_PULSE_WIDTH_MASK
    }

    pub fn get_vsync_pulse_width(reg: u32) -> u32 {
        reg & VSYNC_PULSE_WIDTH_MASK
    }
}

/// `VDCTRL2` packing: hsync pulse width (31:18) and hsync period (17:0).
pub mod vdctrl2 {
    pub const HSYNC_PERIOD_MASK: u32 = 0x3ffff;
    pub const HSYNC_PULSE_WIDTH_SHIFT: u32 = 18;
    pub const HSYNC_PULSE_WIDTH_MASK: u32 = 0x3fff;

    pub fn set_hsync_pulse_width(x: u32) -> u32 {
        (x & HSYNC_PULSE_WIDTH_MASK) << HSYNC_PULSE_WIDTH_SHIFT
    }

    pub fn get_hsync_pulse_width(reg: u32) -> u32 {
        (reg >> HSYNC_PULSE_WIDTH_SHIFT) & HSYNC_PULSE_WIDTH_MASK
    }

    pub fn set_hsync_period(x: u32) -> u32 {
        x & HSYNC_PERIOD_MASK
    }

    pub fn get_hsync_period(reg: u32) -> u32 {
        reg & HSYNC_PERIOD_MASK
    }
}

/// `VDCTRL3` packing: horizontal wait count (27:16) and vertical wait count
/// (15:0).
pub mod vdctrl3 {
    pub const MUX_SYNC_SIGNALS: u32 = 1 << 29;
    pub const VSYNC_ONLY: u32 = 1 << 28;

    pub fn set_hor_wait_cnt(x: u32) -> u32 {
        (x & 0xfff) << 16
    }

    pub fn get_hor_wait_cnt(reg: u32) -> u32 {
        (reg >> 16) & 0xfff
    }

    pub fn set_vert_wait_cnt(x: u32) -> u32 {
        x & 0xffff
    }

    pub fn get_vert_wait_cnt(reg: u32) -> u32 {
        reg & 0xffff
    }
}

/// `VDCTRL4` packing: dot-clock delay (31:29) and horizontal valid-data
/// count (17:0).
pub mod vdctrl4 {
    pub const SYNC_SIGNALS_ON: u32 = 1 << 18;

    pub fn set_dotclk_dly(x: u32) -> u32 {
        (x & 0x7) << 29
    }

    pub fn get_dotclk_dly(reg: u32) -> u32 {
        (reg >> 29) & 0x7
    }

    pub fn set_h_valid_data_cnt(x: u32) -> u32 {
        x & 0x3ffff
    }

    pub fn get_h_valid_data_cnt(reg: u32) -> u32 {
        reg & 0x3ffff
    }
}
