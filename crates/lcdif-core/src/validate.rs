//! Mode validation: clamps or rejects a requested mode and negotiates the
//! RGB wire format from depth + bus width.

use lcdif_regs::{
    vdctrl2, BusWidth, VideoMode, MAX_XRES, MAX_YRES, MIN_XRES, MIN_YRES, RGB565, RGB666, RGB888,
};

use crate::error::{LcdifError, Result};

// VDCTRL3 wait-count field widths.
const HOR_WAIT_MAX: u64 = 0xfff;
const VERT_WAIT_MAX: u64 = 0xffff;

/// Corrects `mode` in place or fails.
///
/// Geometry is clamped upward to the controller minimum and bounded above by
/// the timing-register field widths, so a validated mode always encodes
/// without sub-field overflow. An explicit virtual horizontal resolution
/// wider than the physical one is rejected because the controller cannot
/// change line stride. A depth outside {16, 32} is forced to 32 and never an
/// error. The negotiated format's fixed bitfield layout overwrites whatever
/// the caller supplied.
pub fn check_mode(mode: &mut VideoMode, bus_width: BusWidth) -> Result<()> {
    if mode.xres < MIN_XRES {
        mode.xres = MIN_XRES;
    }
    if mode.yres < MIN_YRES {
        mode.yres = MIN_YRES;
    }
    if mode.xres > MAX_XRES || mode.yres > MAX_YRES {
        return Err(LcdifError::InvalidMode(
            "resolution exceeds transfer-count width",
        ));
    }

    // Blanking sums are bounded by the wait-count and period fields they
    // land in; the sums are taken in u64 so the checks themselves cannot
    // wrap.
    if u64::from(mode.hsync_len) + u64::from(mode.left_margin) > HOR_WAIT_MAX {
        return Err(LcdifError::InvalidMode(
            "horizontal blanking exceeds wait-count width",
        ));
    }
    if u64::from(mode.vsync_len) + u64::from(mode.upper_margin) > VERT_WAIT_MAX {
        return Err(LcdifError::InvalidMode(
            "vertical blanking exceeds wait-count width",
        ));
    }
    let hsync_period = u64::from(mode.hsync_len)
        + u64::from(mode.left_margin)
        + u64::from(mode.xres)
        + u64::from(mode.right_margin);
    if hsync_period > u64::from(vdctrl2::HSYNC_PERIOD_MASK) {
        return Err(LcdifError::InvalidMode(
            "horizontal period exceeds register width",
        ));
    }

    if mode.xres_virtual > mode.xres {
        return Err(LcdifError::InvalidMode("line stride changes not supported"));
    }
    if mode.xres_virtual < mode.xres {
        mode.xres_virtual = mode.xres;
    }
    if mode.yres_virtual < mode.yres {
        mode.yres_virtual = mode.yres;
    }

    if mode.depth != 16 && mode.depth != 32 {
        mode.depth = 32;
    }

    let format = match mode.depth {
        16 => &RGB565,
        _ => match bus_width {
            BusWidth::Bits8 => {
                return Err(LcdifError::UnsupportedFormat {
                    depth: mode.depth,
                    bus_width,
                })
            }
            BusWidth::Bits16 => &RGB666,
            // An 18-bit bus keeps RGB666 only when the caller already runs
            // it; everything else is widened to RGB888.
            BusWidth::Bits18 if mode.pixfmt_is(&RGB666) => &RGB666,
            BusWidth::Bits18 => &RGB888,
            BusWidth::Bits24 => &RGB888,
        },
    };
    mode.apply_pixfmt(format);

    Ok(())
}
