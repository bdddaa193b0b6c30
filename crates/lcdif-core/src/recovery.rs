//! Mode recovery: reconstructing the mode a previous owner left running.
//!
//! Runs once at attach, before the first explicit program cycle. If the
//! controller is live, the timing registers are decoded back into a
//! [`VideoMode`] and the scanout buffer is realigned to the start of our
//! region, so the panel never glitches across the ownership handover.

use lcdif_regs::{ctrl, ctrl1, decode, khz_to_picos, reg, TimingWords, VideoMode};

use crate::bus::RegisterBus;
use crate::error::{LcdifError, Result};
use crate::fb::FramebufferRegion;
use crate::validate::check_mode;

/// Rebuilds the running mode from live registers and realigns the scanout
/// buffer to the region base.
///
/// `pixclock_khz` is the rate read back from the pixel-clock capability;
/// the registers themselves carry no clock information. Fails with
/// [`LcdifError::RecoveryFailed`] when the controller is not running or the
/// registers are not a mode this driver could have programmed, and with
/// [`LcdifError::RecoveryOutOfRange`] when the active scanout address lies
/// outside `region`. The caller falls back to a fresh program cycle on any
/// error.
pub(crate) fn restore_mode<B: RegisterBus>(
    bus: &mut B,
    region: &mut FramebufferRegion,
    pixclock_khz: u32,
) -> Result<VideoMode> {
    let control = bus.read(reg::CTRL);
    if control & ctrl::RUN == 0 || control & ctrl::DOTCLK_MODE == 0 {
        return Err(LcdifError::RecoveryFailed("controller not running"));
    }

    let words = TimingWords {
        ctrl: control,
        byte_packaging: ctrl1::get_byte_packaging(bus.read(reg::CTRL1)),
        transfer_count: bus.read(reg::TRANSFER_COUNT),
        vdctrl0: bus.read(reg::VDCTRL0),
        vdctrl1: bus.read(reg::VDCTRL1),
        vdctrl2: bus.read(reg::VDCTRL2),
        vdctrl3: bus.read(reg::VDCTRL3),
        vdctrl4: bus.read(reg::VDCTRL4),
    };
    let decoded = decode(&words).map_err(|err| {
        tracing::debug!(%err, "timing registers do not decode");
        LcdifError::RecoveryFailed("timing registers do not decode")
    })?;

    let mut mode = VideoMode {
        xres: decoded.xres,
        yres: decoded.yres,
        xres_virtual: decoded.xres,
        yres_virtual: decoded.yres,
        depth: decoded.depth,
        pixclock_ps: khz_to_picos(pixclock_khz),
        hsync_len: decoded.hsync_len,
        vsync_len: decoded.vsync_len,
        left_margin: decoded.left_margin,
        right_margin: decoded.right_margin,
        upper_margin: decoded.upper_margin,
        lower_margin: decoded.lower_margin,
        sync: decoded.sync,
        ..Default::default()
    };
    // The registers carry no RGB bitfields; the validator reconstructs them
    // from depth + bus width.
    check_mode(&mut mode, decoded.bus_width)?;

    let stride = mode.stride_bytes() as usize;
    let frame = mode.frame_bytes() as usize;
    if frame > region.len() {
        return Err(LcdifError::RecoveryFailed("running mode exceeds region"));
    }

    let cur_buf = u64::from(bus.read(reg::CUR_BUF));
    if cur_buf < region.base() || cur_buf >= region.base() + region.len() as u64 {
        return Err(LcdifError::RecoveryOutOfRange {
            addr: cur_buf,
            base: region.base(),
            len: region.len(),
        });
    }

    let offset = (cur_buf - region.base()) as usize;
    if offset != 0 {
        // A previous owner left a pan in effect. One overlapping block move
        // pulls the visible frame back to offset 0, then the next frame
        // scans out from the region base.
        let move_len = frame.min(region.len() - offset);
        region.shift_down(offset, move_len);
        bus.write(reg::NEXT_BUF, region.base() as u32);
        tracing::debug!(offset, move_len, "realigned scanout buffer");
    }

    tracing::debug!(
        xres = mode.xres,
        yres = mode.yres,
        depth = mode.depth,
        stride,
        pixclock_khz,
        "recovered running mode"
    );
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LcdifModel;
    use lcdif_regs::{encode, BusWidth, SyncFlags, RGB565};
    use pretty_assertions::assert_eq;

    const BASE: u64 = 0x8000_0000;

    fn running_model(mode: &VideoMode, cur_buf: u32) -> LcdifModel {
        let words = encode(mode, BusWidth::Bits24, 0);
        let mut model = LcdifModel::new();
        model.write(reg::CTRL, words.ctrl | ctrl::DOTCLK_MODE | ctrl::RUN);
        model.write(reg::CTRL1, ctrl1::set_byte_packaging(words.byte_packaging));
        model.write(reg::TRANSFER_COUNT, words.transfer_count);
        model.write(reg::VDCTRL0, words.vdctrl0);
        model.write(reg::VDCTRL1, words.vdctrl1);
        model.write(reg::VDCTRL2, words.vdctrl2);
        model.write(reg::VDCTRL3, words.vdctrl3);
        model.write(reg::VDCTRL4, words.vdctrl4);
        model.set_cur_buf(cur_buf);
        model
    }

    fn mode_480x272() -> VideoMode {
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
            sync: SyncFlags::empty(),
            ..Default::default()
        };
        mode.apply_pixfmt(&RGB565);
        mode
    }

    #[test]
    fn recovers_running_mode_and_geometry() {
        let mode = mode_480x272();
        let mut model = running_model(&mode, BASE as u32);
        let mut region = FramebufferRegion::alloc(BASE, mode.frame_bytes() as usize).unwrap();

        let recovered = restore_mode(&mut model, &mut region, 9009).unwrap();
        assert_eq!(recovered.xres, 480);
        assert_eq!(recovered.yres, 272);
        assert_eq!(recovered.depth, 16);
        assert_eq!(recovered.hsync_len, 2);
        assert_eq!(recovered.red, RGB565.red);
        // 9009 kHz read back from the clock -> 111000 ps after flooring.
        assert_eq!(recovered.pixclock_ps, 111_000);

        // Aligned buffer: no moves, no next-buffer reprogram.
        assert!(model
            .take_writes()
            .iter()
            .all(|&(offset, _)| offset & !0xf != reg::NEXT_BUF));
    }

    #[test]
    fn realigns_a_panned_scanout_buffer() {
        let mode = mode_480x272();
        // Stride 960; the previous owner left the scanout 64 bytes in.
        let frame = mode.frame_bytes() as usize;
        let mut model = running_model(&mode, BASE as u32 + 64);
        let mut region = FramebufferRegion::alloc(BASE, frame).unwrap();
        region.as_mut_slice()[64] = 0xab;
        region.as_mut_slice()[65] = 0xcd;

        restore_mode(&mut model, &mut region, 9009).unwrap();

        // One block move of frame minus the 64-byte offset, down to 0.
        assert_eq!(region.as_slice()[0], 0xab);
        assert_eq!(region.as_slice()[1], 0xcd);
        // Next-buffer register points back at the region base.
        assert_eq!(model.read(reg::NEXT_BUF), BASE as u32);
    }

    #[test]
    fn fails_when_controller_is_idle() {
        let mut model = LcdifModel::new();
        let mut region = FramebufferRegion::alloc(BASE, 0x1000).unwrap();
        assert!(matches!(
            restore_mode(&mut model, &mut region, 9009),
            Err(LcdifError::RecoveryFailed(_))
        ));
    }

    #[test]
    fn fails_when_scanout_address_is_outside_the_region() {
        let mode = mode_480x272();
        let frame = mode.frame_bytes() as usize;
        let mut model = running_model(&mode, 0x1000_0000);
        let mut region = FramebufferRegion::alloc(BASE, frame).unwrap();

        assert!(matches!(
            restore_mode(&mut model, &mut region, 9009),
            Err(LcdifError::RecoveryOutOfRange {
                addr: 0x1000_0000,
                ..
            })
        ));
    }

    #[test]
    fn fails_on_undecodable_registers() {
        let mode = mode_480x272();
        let mut model = running_model(&mode, BASE as u32);
        // Reserved word-length code 1.
        model.write(
            reg::CTRL + lcdif_regs::REG_SET,
            ctrl::set_word_length(1),
        );
        let mut region =
            FramebufferRegion::alloc(BASE, mode.frame_bytes() as usize).unwrap();
        assert!(matches!(
            restore_mode(&mut model, &mut region, 9009),
            Err(LcdifError::RecoveryFailed(_))
        ));
    }

    #[test]
    fn fails_when_running_mode_does_not_fit_the_region() {
        let mode = mode_480x272();
        let mut model = running_model(&mode, BASE as u32);
        let mut region = FramebufferRegion::alloc(BASE, 0x1000).unwrap();
        assert!(matches!(
            restore_mode(&mut model, &mut region, 9009),
            Err(LcdifError::RecoveryFailed(_))
        ));
    }
}
