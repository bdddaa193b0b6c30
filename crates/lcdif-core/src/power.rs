//! Clock and power capabilities consumed by the controller.
//!
//! Clock-source and voltage-regulator enablement is owned by the platform;
//! the driver core only sees opaque enable/disable capabilities through these
//! traits.

/// The power capability refused to enable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PowerFault;

/// A gateable clock.
pub trait ClockGate {
    fn enable(&mut self);
    fn disable(&mut self);
}

/// The dot clock: gateable and rate-programmable.
///
/// `rate_khz` is a live readback; mode recovery uses it to reconstruct the
/// pixel-clock period of a mode it did not program itself.
pub trait PixelClock: ClockGate {
    /// Programs the clock rate. The clock must be disabled while the rate
    /// changes; the controller enforces that ordering.
    fn set_rate_khz(&mut self, khz: u32) -> Result<(), PowerFault>;
    fn rate_khz(&self) -> u32;
}

/// A voltage-regulator style power rail.
pub trait PowerRail {
    fn enable(&mut self) -> Result<(), PowerFault>;
    fn disable(&mut self);
}

/// Wraps an optional clock capability with an enabled flag so repeated
/// blank/unblank transitions never double-enable or double-release it.
pub struct GatedClock<C> {
    clock: Option<C>,
    enabled: bool,
}

impl<C: ClockGate> GatedClock<C> {
    pub fn new(clock: Option<C>) -> Self {
        Self {
            clock,
            enabled: false,
        }
    }

    pub fn enable(&mut self) {
        if self.enabled {
            return;
        }
        if let Some(clock) = self.clock.as_mut() {
            clock.enable();
        }
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        if let Some(clock) = self.clock.as_mut() {
            clock.disable();
        }
        self.enabled = false;
    }

    pub fn get(&self) -> Option<&C> {
        self.clock.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut C> {
        self.clock.as_mut()
    }
}

/// Always-available clocks for platforms (and tests) without real gating.
#[derive(Debug, Default, Clone)]
pub struct FixedClock {
    rate_khz: u32,
    pub enabled: bool,
    pub enable_count: u32,
}

impl FixedClock {
    pub fn new(rate_khz: u32) -> Self {
        Self {
            rate_khz,
            enabled: false,
            enable_count: 0,
        }
    }
}

impl ClockGate for FixedClock {
    fn enable(&mut self) {
        self.enabled = true;
        self.enable_count += 1;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }
}

impl PixelClock for FixedClock {
    fn set_rate_khz(&mut self, khz: u32) -> Result<(), PowerFault> {
        self.rate_khz = khz;
        Ok(())
    }

    fn rate_khz(&self) -> u32 {
        self.rate_khz
    }
}
