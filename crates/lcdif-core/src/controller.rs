//! The controller state machine and the command surface exposed to the
//! framebuffer consumer.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use lcdif_regs::{ctrl, ctrl1, ctrl2, encode, reg, vdctrl4, BusWidth, VideoMode};

use crate::bus::RegisterBus;
use crate::error::{LcdifError, Result};
use crate::fb::FramebufferRegion;
use crate::irq::{IrqDispatcher, SyncState};
use crate::palette::{chan_to_field, rgb_to_gray, PALETTE_SIZE};
use crate::power::{ClockGate, GatedClock, PixelClock, PowerRail};
use crate::recovery::restore_mode;
use crate::validate::check_mode;

/// Blank states, ordered from fully lit to fully dark.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlankMode {
    Unblank,
    Normal,
    VsyncSuspend,
    HsyncSuspend,
    Powerdown,
}

/// Fixed per-instance configuration, decided by the platform at attach time.
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    pub bus_width: BusWidth,
    /// Dot-clock output delay tap (3 bits).
    pub dotclk_delay: u32,
    /// Mode programmed when no running mode can be recovered at attach.
    pub default_mode: VideoMode,
    /// Bus address and length of the scanout region.
    pub fb_base: u64,
    pub fb_len: usize,
    pub vsync_timeout: Duration,
    pub flip_timeout: Duration,
}

impl ControllerConfig {
    pub fn new(bus_width: BusWidth, default_mode: VideoMode, fb_base: u64, fb_len: usize) -> Self {
        Self {
            bus_width,
            dotclk_delay: 0,
            default_mode,
            fb_base,
            fb_len,
            vsync_timeout: Duration::from_secs(1),
            flip_timeout: Duration::from_millis(500),
        }
    }
}

/// Number of polls allowed for the run bit to drop during disable. Exhaustion
/// is logged, not fatal.
const RUN_POLL_BUDGET: u32 = 1000;

/// One display controller instance.
///
/// All mode-set and blank transitions go through `&mut self`, which
/// serializes them. The interrupt dispatcher obtained from
/// [`LcdController::irq_dispatcher`] is the only piece that runs in another
/// context; it shares only the completion state, never the controller.
pub struct LcdController<B, C, A, P>
where
    B: RegisterBus,
    C: PixelClock,
    A: ClockGate,
    P: PowerRail,
{
    bus: B,
    config: ControllerConfig,
    region: FramebufferRegion,

    clk_pix: GatedClock<C>,
    clk_axi: GatedClock<A>,
    power: Option<P>,
    power_on: bool,

    /// The mode most recently accepted from the consumer, pan offsets
    /// included.
    var: VideoMode,
    /// Timings last written to hardware; `None` before the first program
    /// cycle.
    programmed: Option<VideoMode>,
    enabled: bool,
    blank: BlankMode,
    /// Counts consecutive mode-set requests with unchanged timings. The
    /// first two identical requests still program (one-time activation
    /// semantics of the surrounding framework); later ones are no-ops.
    equal_bypass: u32,

    sync: Arc<SyncState>,
    pseudo_palette: [u32; PALETTE_SIZE],
}

impl<B, C, A, P> LcdController<B, C, A, P>
where
    B: RegisterBus,
    C: PixelClock,
    A: ClockGate,
    P: PowerRail,
{
    /// Builds a disabled, unblanked controller around an already-allocated
    /// region. Most callers want [`LcdController::attach`] instead.
    pub fn new(
        bus: B,
        config: ControllerConfig,
        clk_pix: Option<C>,
        clk_axi: Option<A>,
        power: Option<P>,
        region: FramebufferRegion,
    ) -> Self {
        let var = config.default_mode;
        Self {
            bus,
            config,
            region,
            clk_pix: GatedClock::new(clk_pix),
            clk_axi: GatedClock::new(clk_axi),
            power,
            power_on: false,
            var,
            programmed: None,
            enabled: false,
            blank: BlankMode::Unblank,
            equal_bypass: 0,
            sync: Arc::new(SyncState::default()),
            pseudo_palette: [0; PALETTE_SIZE],
        }
    }

    /// Full attach lifecycle: allocate the region, adopt a running mode if
    /// the controller is live, otherwise zero-fill and bring it up with the
    /// configured default mode.
    pub fn attach(
        bus: B,
        config: ControllerConfig,
        clk_pix: Option<C>,
        clk_axi: Option<A>,
        power: Option<P>,
    ) -> Result<Self> {
        let region = FramebufferRegion::alloc(config.fb_base, config.fb_len)?;
        let mut this = Self::new(bus, config, clk_pix, clk_axi, power, region);

        // Register access needs the bus clock up first.
        this.clk_axi.enable();

        let pix_khz = this.clk_pix.get().map(|c| c.rate_khz()).unwrap_or(0);
        match restore_mode(&mut this.bus, &mut this.region, pix_khz) {
            Ok(mode) => {
                // The panel is already lit; take over the running mode
                // without a glitch. Capabilities are acquired to match the
                // state we inherited.
                this.var = mode;
                this.programmed = Some(mode);
                this.equal_bypass = 1;
                this.clk_pix.enable();
                if let Some(rail) = this.power.as_mut() {
                    rail.enable().map_err(|_| LcdifError::PowerEnableFailed)?;
                    this.power_on = true;
                }
                this.enabled = true;
                tracing::info!(
                    xres = mode.xres,
                    yres = mode.yres,
                    depth = mode.depth,
                    "adopted running mode"
                );
            }
            Err(err) => {
                tracing::debug!(%err, "no running mode, cold start");
                this.region.fill_zero();
                let mode = this.config.default_mode;
                this.set_mode(mode)?;
            }
        }

        this.blank(BlankMode::Unblank)?;
        Ok(this)
    }

    /// Validates and corrects `mode` against this instance's bus width and
    /// region size without touching hardware.
    pub fn check_mode(&self, mode: &mut VideoMode) -> Result<()> {
        check_mode(mode, self.config.bus_width)?;
        let needed = mode.stride_bytes() as usize * mode.yres_virtual as usize;
        if needed > self.region.len() {
            return Err(LcdifError::InvalidMode("mode exceeds framebuffer region"));
        }
        Ok(())
    }

    /// Accepts a new mode: validate, then reprogram and re-enable unless the
    /// timings are unchanged or the controller is blanked.
    pub fn set_mode(&mut self, mut mode: VideoMode) -> Result<()> {
        self.check_mode(&mut mode)?;

        let unchanged = self
            .programmed
            .as_ref()
            .is_some_and(|p| p.same_timings(&mode));
        if unchanged && self.equal_bypass > 1 {
            // Identical timings past the warm-up window: keep the pan
            // offsets, skip the register traffic.
            self.var = mode;
            return Ok(());
        }
        if self.equal_bypass < 2 {
            self.equal_bypass += 1;
        }

        self.var = mode;
        if self.blank != BlankMode::Unblank {
            // Deferred: the unblank transition programs the stored mode.
            return Ok(());
        }

        if self.enabled {
            self.disable_controller();
        }
        self.program();
        self.enable_controller()
    }

    /// Blank-state transition. The target state is recorded first so
    /// re-entrant queries see it immediately.
    pub fn blank(&mut self, target: BlankMode) -> Result<()> {
        tracing::debug!(?target, "blank transition");
        self.blank = target;

        if target == BlankMode::Unblank {
            self.clk_axi.enable();
            if !self.enabled {
                self.program();
                self.enable_controller()?;
            }
        } else {
            if self.enabled {
                self.disable_controller();
            }
            self.clk_pix.disable();
            self.clk_axi.disable();
        }
        Ok(())
    }

    /// Moves the visible window to `yoffset` lines into the virtual surface
    /// and blocks until the flip lands or the flip timeout elapses.
    pub fn pan(&mut self, xoffset: u32, yoffset: u32) -> Result<()> {
        if xoffset != 0 {
            return Err(LcdifError::InvalidMode("horizontal panning not supported"));
        }
        // Checked: a huge offset must land in InvalidMode, not wrap past the
        // bound and scan out a garbage address.
        let in_bounds = yoffset
            .checked_add(self.var.yres)
            .is_some_and(|end| end <= self.var.yres_virtual);
        if !in_bounds {
            return Err(LcdifError::InvalidMode("pan beyond virtual resolution"));
        }
        if self.blank != BlankMode::Unblank {
            return Err(LcdifError::NotUnblanked);
        }

        let addr =
            self.region.base() + u64::from(self.var.stride_bytes()) * u64::from(yoffset);

        self.sync.flip.rearm();
        self.bus.clear_bits(reg::CTRL1, ctrl1::CUR_FRAME_DONE_IRQ);
        self.bus.set_bits(reg::CTRL1, ctrl1::CUR_FRAME_DONE_IRQ_EN);
        self.bus.write(reg::NEXT_BUF, addr as u32);

        if !self.sync.flip.wait_timeout(self.config.flip_timeout) {
            self.bus.clear_bits(reg::CTRL1, ctrl1::CUR_FRAME_DONE_IRQ_EN);
            tracing::warn!(yoffset, "flip did not complete");
            return Err(LcdifError::FlipTimeout);
        }

        self.var.xoffset = 0;
        self.var.yoffset = yoffset;
        Ok(())
    }

    /// Blocks until the next vsync edge or the vsync timeout elapses.
    pub fn wait_vsync(&mut self) -> Result<()> {
        if self.blank != BlankMode::Unblank {
            return Err(LcdifError::NotUnblanked);
        }

        self.sync.vsync.rearm();
        self.sync.wait_for_vsync.store(true, Ordering::SeqCst);
        self.bus.clear_bits(reg::CTRL1, ctrl1::VSYNC_EDGE_IRQ);
        self.bus.set_bits(reg::CTRL1, ctrl1::VSYNC_EDGE_IRQ_EN);

        if !self.sync.vsync.wait_timeout(self.config.vsync_timeout) {
            self.sync.wait_for_vsync.store(false, Ordering::SeqCst);
            self.bus.clear_bits(reg::CTRL1, ctrl1::VSYNC_EDGE_IRQ_EN);
            tracing::warn!("vsync did not arrive");
            return Err(LcdifError::VsyncTimeout);
        }
        Ok(())
    }

    /// The consumer's mapping of the scanout region.
    pub fn map_region(&self) -> (u64, usize) {
        self.region.map()
    }

    /// Bounds-checked mapping at a byte offset into the region.
    pub fn map_region_at(&self, offset: usize) -> Result<(u64, usize)> {
        self.region.map_at(offset)
    }

    /// Programs one truecolor pseudo-palette entry.
    pub fn set_color_reg(
        &mut self,
        index: usize,
        red: u16,
        green: u16,
        blue: u16,
        transp: u16,
    ) -> Result<()> {
        if index >= PALETTE_SIZE {
            return Err(LcdifError::InvalidMode("palette index out of range"));
        }
        let (red, green, blue) = if self.var.grayscale {
            let gray = rgb_to_gray(red, green, blue);
            (gray, gray, gray)
        } else {
            (red, green, blue)
        };
        self.pseudo_palette[index] = chan_to_field(red, &self.var.red)
            | chan_to_field(green, &self.var.green)
            | chan_to_field(blue, &self.var.blue)
            | chan_to_field(transp, &self.var.transp);
        Ok(())
    }

    pub fn pseudo_palette(&self) -> &[u32; PALETTE_SIZE] {
        &self.pseudo_palette
    }

    /// A dispatcher for this controller's interrupt line. `bus` is the
    /// interrupt context's own handle to the same register window.
    pub fn irq_dispatcher<B2: RegisterBus>(&self, bus: B2) -> IrqDispatcher<B2> {
        IrqDispatcher::new(bus, Arc::clone(&self.sync))
    }

    pub fn current_mode(&self) -> &VideoMode {
        &self.var
    }

    pub fn blank_mode(&self) -> BlankMode {
        self.blank
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Tears the instance down: darkens the panel and releases every
    /// capability. The region is freed on drop.
    pub fn detach(mut self) {
        if self.enabled {
            self.disable_controller();
        }
        self.clk_pix.disable();
        self.clk_axi.disable();
        tracing::info!("controller detached");
    }

    /// Writes the full register image of `self.var` in the fixed programming
    /// order, finishing with the initial scanout address.
    fn program(&mut self) {
        let words = encode(&self.var, self.config.bus_width, self.config.dotclk_delay);

        self.bus.set_bits(reg::CTRL1, ctrl1::FIFO_CLEAR);

        self.bus.write(reg::CTRL, words.ctrl);
        // CTRL1 carries live IRQ state, so only the packaging field moves.
        self.bus.clear_bits(reg::CTRL1, ctrl1::BYTE_PACKAGING_MASK);
        self.bus
            .set_bits(reg::CTRL1, ctrl1::set_byte_packaging(words.byte_packaging));
        self.bus.write(reg::TRANSFER_COUNT, words.transfer_count);
        self.bus.write(reg::VDCTRL0, words.vdctrl0);
        self.bus.write(reg::VDCTRL1, words.vdctrl1);
        self.bus.write(reg::VDCTRL2, words.vdctrl2);
        self.bus.write(reg::VDCTRL3, words.vdctrl3);
        self.bus.write(reg::VDCTRL4, words.vdctrl4);

        // Stage the first frame one line past the current pan position, so
        // the first displayed frame lags the write by one line.
        let stride = u64::from(self.var.stride_bytes());
        let addr = self.region.base() + stride * u64::from(self.var.yoffset + 1);
        self.bus.write(reg::NEXT_BUF, addr as u32);

        self.bus.clear_bits(reg::CTRL1, ctrl1::FIFO_CLEAR);

        self.programmed = Some(self.var);
        tracing::debug!(
            xres = self.var.xres,
            yres = self.var.yres,
            depth = self.var.depth,
            ctrl = format_args!("{:#010x}", words.ctrl),
            "programmed timing registers"
        );
    }

    /// Powers the data path up: rail, pixel clock, then run bits, with
    /// sync-signal output last to avoid spurious pulses on the panel.
    fn enable_controller(&mut self) -> Result<()> {
        if let Some(rail) = self.power.as_mut() {
            rail.enable().map_err(|_| LcdifError::PowerEnableFailed)?;
            self.power_on = true;
        }

        // Rate changes require the clock stopped.
        self.clk_pix.disable();
        let khz = self.var.pixclock_khz();
        if let Some(pix) = self.clk_pix.get_mut() {
            if pix.set_rate_khz(khz).is_err() {
                if let Some(rail) = self.power.as_mut() {
                    rail.disable();
                    self.power_on = false;
                }
                return Err(LcdifError::PowerEnableFailed);
            }
        }
        self.clk_pix.enable();

        self.bus.set_bits(reg::CTRL2, ctrl2::OUTSTANDING_REQS_REQ_16);
        self.bus.set_bits(reg::CTRL1, ctrl1::RECOVER_ON_UNDERFLOW);

        self.bus.set_bits(reg::CTRL, ctrl::DOTCLK_MODE);
        self.bus.set_bits(reg::CTRL, ctrl::MASTER | ctrl::RUN);
        self.bus.set_bits(reg::VDCTRL4, vdctrl4::SYNC_SIGNALS_ON);

        self.enabled = true;
        tracing::debug!(khz, "controller enabled");
        Ok(())
    }

    /// Winds the data path down. A run bit that never drops is logged and
    /// ignored; disable proceeds regardless.
    fn disable_controller(&mut self) {
        self.bus.clear_bits(reg::CTRL, ctrl::DOTCLK_MODE);

        let mut polls = 0;
        while self.bus.read(reg::CTRL) & ctrl::RUN != 0 {
            polls += 1;
            if polls == RUN_POLL_BUDGET {
                tracing::warn!("run bit did not clear within the poll budget");
                break;
            }
        }

        self.bus.clear_bits(reg::CTRL, ctrl::MASTER);
        self.bus.clear_bits(reg::VDCTRL4, vdctrl4::SYNC_SIGNALS_ON);

        if self.power_on {
            if let Some(rail) = self.power.as_mut() {
                rail.disable();
            }
            self.power_on = false;
        }

        self.enabled = false;
        tracing::debug!("controller disabled");
    }
}
