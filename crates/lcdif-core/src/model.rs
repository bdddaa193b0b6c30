//! An in-memory model of the controller's register file.
//!
//! Implements the set/clear write aliases, the read-only current-buffer
//! register, and just enough dot-clock behavior (run self-clearing at end of
//! frame, buffer latching) to exercise the driver without hardware. Tests
//! both in this crate and downstream drive the core against this model.

use lcdif_regs::{ctrl, reg, REG_CLR, REG_SET};

use crate::bus::RegisterBus;

const REG_COUNT: usize = 12;

/// Software model of the register window.
pub struct LcdifModel {
    regs: [u32; REG_COUNT],
    writes: Vec<(u32, u32)>,
    hang_run: bool,
}

impl Default for LcdifModel {
    fn default() -> Self {
        Self::new()
    }
}

impl LcdifModel {
    pub fn new() -> Self {
        Self {
            // Reset state: soft reset asserted and clock gated, as after
            // power-on.
            regs: {
                let mut regs = [0u32; REG_COUNT];
                regs[(reg::CTRL >> 4) as usize] = ctrl::SFTRST | ctrl::CLKGATE;
                regs
            },
            writes: Vec::new(),
            hang_run: false,
        }
    }

    /// When set, the run bit never self-clears, modeling a panel that stops
    /// responding mid-frame.
    pub fn set_hang_run(&mut self, hang: bool) {
        self.hang_run = hang;
    }

    /// Latches the next-buffer address into the current-buffer register, as
    /// the hardware does at the start of each frame.
    pub fn latch_next_buf(&mut self) {
        self.regs[(reg::CUR_BUF >> 4) as usize] = self.regs[(reg::NEXT_BUF >> 4) as usize];
    }

    /// Forces the current-buffer register, for staging pre-owned controller
    /// states.
    pub fn set_cur_buf(&mut self, addr: u32) {
        self.regs[(reg::CUR_BUF >> 4) as usize] = addr;
    }

    /// Latches interrupt status bits, as the hardware does when an event
    /// fires.
    pub fn raise_irq(&mut self, status_bits: u32) {
        self.regs[(reg::CTRL1 >> 4) as usize] |= status_bits;
    }

    /// Drains the raw write log: `(offset, value)` in issue order, aliases
    /// unresolved.
    pub fn take_writes(&mut self) -> Vec<(u32, u32)> {
        std::mem::take(&mut self.writes)
    }

    fn slot(offset: u32) -> usize {
        let idx = (offset >> 4) as usize;
        assert!(idx < REG_COUNT, "offset {offset:#x} outside register window");
        idx
    }
}

impl RegisterBus for LcdifModel {
    fn read(&mut self, offset: u32) -> u32 {
        self.regs[Self::slot(offset)]
    }

    fn write(&mut self, offset: u32, value: u32) {
        self.writes.push((offset, value));

        let base = offset & !0xf;
        if base == reg::CUR_BUF {
            return;
        }
        let slot = Self::slot(base);
        match offset & 0xf {
            0x0 => self.regs[slot] = value,
            REG_SET => self.regs[slot] |= value,
            REG_CLR => self.regs[slot] &= !value,
            alias => panic!("unknown write alias {alias:#x}"),
        }

        // Dropping out of dot-clock mode ends the frame; the run bit
        // self-clears unless the panel hangs.
        if base == reg::CTRL {
            let c = self.regs[slot];
            if c & ctrl::RUN != 0 && c & ctrl::DOTCLK_MODE == 0 && !self.hang_run {
                self.regs[slot] &= !ctrl::RUN;
            }
        }
    }
}
