use bitflags::bitflags;

/// Smallest active resolution the controller supports in either axis.
pub const MIN_XRES: u32 = 64;
pub const MIN_YRES: u32 = 64;

/// Largest active resolution in either axis: the transfer-count register
/// holds each count in 16 bits.
pub const MAX_XRES: u32 = 0xffff;
pub const MAX_YRES: u32 = 0xffff;

/// Width of the parallel bus between the controller and the panel.
///
/// The discriminants are the hardware encoding used in the `CTRL` bus-width
/// field, which is not in numeric order of the widths.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum BusWidth {
    Bits16 = 0,
    Bits8 = 1,
    Bits18 = 2,
    Bits24 = 3,
}

impl BusWidth {
    /// Decodes the 2-bit `CTRL` bus-width field.
    pub fn from_code(code: u32) -> Self {
        match code & 0x3 {
            0 => Self::Bits16,
            1 => Self::Bits8,
            2 => Self::Bits18,
            _ => Self::Bits24,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

bitflags! {
    /// Sync-signal polarity and latch-edge selection.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct SyncFlags: u32 {
        const HSYNC_ACTIVE_HIGH = 1 << 0;
        const VSYNC_ACTIVE_HIGH = 1 << 1;
        /// Output-enable is active low (active high when absent).
        const OE_ACTIVE_LOW = 1 << 2;
        /// Pixel data is latched on the falling clock edge.
        const CLK_LATCH_FALLING = 1 << 3;
    }
}

/// One color channel's position inside a pixel word.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorField {
    pub offset: u32,
    pub length: u32,
}

/// Fixed RGB bitfield layout for one wire format.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PixelFormat {
    pub red: ColorField,
    pub green: ColorField,
    pub blue: ColorField,
    pub transp: ColorField,
}

const fn field(offset: u32, length: u32) -> ColorField {
    ColorField { offset, length }
}

pub const RGB565: PixelFormat = PixelFormat {
    red: field(11, 5),
    green: field(5, 6),
    blue: field(0, 5),
    transp: field(0, 0),
};

pub const RGB666: PixelFormat = PixelFormat {
    red: field(16, 6),
    green: field(8, 6),
    blue: field(0, 6),
    transp: field(0, 0),
};

pub const RGB888: PixelFormat = PixelFormat {
    red: field(16, 8),
    green: field(8, 8),
    blue: field(0, 8),
    transp: field(0, 0),
};

/// An abstract video timing description, resolution-first.
///
/// Margins are the blanking porches around the sync pulse, in pixels
/// (horizontal) or lines (vertical). `pixclock_ps` is the dot-clock period in
/// picoseconds. The RGB bitfields are outputs of mode validation; callers may
/// leave them zeroed and let `check_mode` fill them in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct VideoMode {
    pub xres: u32,
    pub yres: u32,
    pub xres_virtual: u32,
    pub yres_virtual: u32,
    pub xoffset: u32,
    pub yoffset: u32,

    /// Bits per pixel; 16 or 32 after validation.
    pub depth: u32,
    pub grayscale: bool,

    /// Dot-clock period in picoseconds.
    pub pixclock_ps: u32,
    pub hsync_len: u32,
    pub vsync_len: u32,
    pub left_margin: u32,
    pub right_margin: u32,
    pub upper_margin: u32,
    pub lower_margin: u32,
    pub sync: SyncFlags,

    pub red: ColorField,
    pub green: ColorField,
    pub blue: ColorField,
    pub transp: ColorField,
}

impl VideoMode {
    /// Bytes per scanout line for the active resolution.
    pub fn stride_bytes(&self) -> u32 {
        self.xres * (self.depth / 8)
    }

    /// Bytes covered by one full frame at the active resolution.
    pub fn frame_bytes(&self) -> u64 {
        u64::from(self.stride_bytes()) * u64::from(self.yres)
    }

    /// Dot-clock rate implied by `pixclock_ps`, in kHz. Zero when the period
    /// is unset.
    pub fn pixclock_khz(&self) -> u32 {
        if self.pixclock_ps == 0 {
            return 0;
        }
        1_000_000_000 / self.pixclock_ps
    }

    /// Whether this mode's RGB bitfields equal `fmt`'s (transparency is not
    /// compared, matching how formats are negotiated).
    pub fn pixfmt_is(&self, fmt: &PixelFormat) -> bool {
        self.red == fmt.red && self.green == fmt.green && self.blue == fmt.blue
    }

    /// Overwrites the RGB/transparency bitfields with `fmt`'s fixed layout.
    pub fn apply_pixfmt(&mut self, fmt: &PixelFormat) {
        self.red = fmt.red;
        self.green = fmt.green;
        self.blue = fmt.blue;
        self.transp = fmt.transp;
    }

    /// Equality ignoring pan offsets, used by the mode-set idempotence guard.
    pub fn same_timings(&self, other: &VideoMode) -> bool {
        let mut a = *self;
        let mut b = *other;
        a.xoffset = 0;
        a.yoffset = 0;
        b.xoffset = 0;
        b.yoffset = 0;
        a == b
    }
}

/// Converts a pixel-clock rate in kHz back to a period in picoseconds.
pub fn khz_to_picos(khz: u32) -> u32 {
    if khz == 0 {
        return 0;
    }
    1_000_000_000 / khz
}
