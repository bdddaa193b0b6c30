//! Access to the controller's memory-mapped register window.

use std::sync::{Arc, Mutex};

use lcdif_regs::{REG_CLR, REG_SET};

/// 32-bit register access at byte offsets from the controller base.
///
/// Reads take `&mut self` because MMIO reads may have side effects. The
/// provided helpers target the write-only `+0x04` set-bits and `+0x08`
/// clear-bits aliases that every control-class register carries.
pub trait RegisterBus {
    fn read(&mut self, offset: u32) -> u32;
    fn write(&mut self, offset: u32, value: u32);

    fn set_bits(&mut self, offset: u32, bits: u32) {
        self.write(offset + REG_SET, bits);
    }

    fn clear_bits(&mut self, offset: u32, bits: u32) {
        self.write(offset + REG_CLR, bits);
    }
}

/// The requester and interrupt contexts each hold their own handle to the
/// same register window; a shared, locked bus models that.
impl<B: RegisterBus> RegisterBus for Arc<Mutex<B>> {
    fn read(&mut self, offset: u32) -> u32 {
        self.lock().unwrap().read(offset)
    }

    fn write(&mut self, offset: u32, value: u32) {
        self.lock().unwrap().write(offset, value)
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read(&mut self, offset: u32) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: u32, value: u32) {
        (**self).write(offset, value)
    }
}
