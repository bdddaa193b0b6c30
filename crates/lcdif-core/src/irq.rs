//! Interrupt demultiplexing.
//!
//! The dispatcher runs in the hardware's asynchronous notification context:
//! it must not block and must complete quickly. It reads the IRQ
//! enable/status block of `CTRL1`, acknowledges what was both enabled and
//! raised, and resolves any outstanding completion. It never re-arms a
//! source; re-arming belongs to the next wait call.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use lcdif_regs::{ctrl1, reg};

use crate::bus::RegisterBus;
use crate::completion::Completion;

/// State shared between the requester context and the interrupt context:
/// the two completions, the pending-vsync flag, and the underflow/overflow
/// observability counters.
#[derive(Default)]
pub(crate) struct SyncState {
    pub vsync: Completion,
    pub flip: Completion,
    pub wait_for_vsync: AtomicBool,
    pub underflows: AtomicU64,
    pub overflows: AtomicU64,
}

/// Demultiplexes the controller's interrupt line.
///
/// Holds its own handle to the register window so it can acknowledge status
/// bits while the requester context is blocked inside a wait.
pub struct IrqDispatcher<B: RegisterBus> {
    bus: B,
    state: Arc<SyncState>,
}

impl<B: RegisterBus> IrqDispatcher<B> {
    pub(crate) fn new(bus: B, state: Arc<SyncState>) -> Self {
        Self { bus, state }
    }

    /// Services one interrupt: acknowledges every asked source and resolves
    /// outstanding waits.
    pub fn dispatch(&mut self) {
        let c1 = self.bus.read(reg::CTRL1);
        let enabled = (c1 & ctrl1::IRQ_ENABLE_MASK) >> ctrl1::IRQ_ENABLE_SHIFT;
        let raised = (c1 & ctrl1::IRQ_STATUS_MASK) >> ctrl1::IRQ_STATUS_SHIFT;
        let asked = (enabled & raised) << ctrl1::IRQ_STATUS_SHIFT;

        if asked & ctrl1::VSYNC_EDGE_IRQ != 0 && self.state.wait_for_vsync.load(Ordering::SeqCst)
        {
            self.bus.clear_bits(reg::CTRL1, ctrl1::VSYNC_EDGE_IRQ);
            self.bus.clear_bits(reg::CTRL1, ctrl1::VSYNC_EDGE_IRQ_EN);
            self.state.wait_for_vsync.store(false, Ordering::SeqCst);
            self.state.vsync.complete();
        }

        // No pending guard here: a program cycle can also raise frame-done,
        // and a stale resolve is harmless because pan re-arms before waiting.
        if asked & ctrl1::CUR_FRAME_DONE_IRQ != 0 {
            self.bus.clear_bits(reg::CTRL1, ctrl1::CUR_FRAME_DONE_IRQ);
            self.bus.clear_bits(reg::CTRL1, ctrl1::CUR_FRAME_DONE_IRQ_EN);
            self.state.flip.complete();
        }

        // Underflow/overflow are observability events: the hardware recovers
        // on its own once status is cleared, nothing escalates to a waiter.
        if asked & ctrl1::UNDERFLOW_IRQ != 0 {
            self.bus.clear_bits(reg::CTRL1, ctrl1::UNDERFLOW_IRQ);
            let n = self.state.underflows.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(count = n, "fifo underflow");
        }

        if asked & ctrl1::OVERFLOW_IRQ != 0 {
            self.bus.clear_bits(reg::CTRL1, ctrl1::OVERFLOW_IRQ);
            let n = self.state.overflows.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(count = n, "fifo overflow");
        }
    }

    pub fn underflow_count(&self) -> u64 {
        self.state.underflows.load(Ordering::Relaxed)
    }

    pub fn overflow_count(&self) -> u64 {
        self.state.overflows.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LcdifModel;
    use std::time::Duration;

    fn dispatcher_with_model() -> (IrqDispatcher<LcdifModel>, Arc<SyncState>) {
        let state = Arc::new(SyncState::default());
        (
            IrqDispatcher::new(LcdifModel::new(), Arc::clone(&state)),
            state,
        )
    }

    #[test]
    fn frame_done_resolves_flip_without_a_pending_guard() {
        let (mut dispatcher, state) = dispatcher_with_model();
        state.flip.rearm();

        dispatcher.bus.set_bits(reg::CTRL1, ctrl1::CUR_FRAME_DONE_IRQ_EN);
        dispatcher.bus.raise_irq(ctrl1::CUR_FRAME_DONE_IRQ);
        dispatcher.dispatch();

        assert!(state.flip.wait_timeout(Duration::ZERO));
        let c1 = dispatcher.bus.read(reg::CTRL1);
        assert_eq!(c1 & ctrl1::CUR_FRAME_DONE_IRQ, 0);
        assert_eq!(c1 & ctrl1::CUR_FRAME_DONE_IRQ_EN, 0);
    }

    #[test]
    fn vsync_without_pending_wait_is_left_alone() {
        let (mut dispatcher, state) = dispatcher_with_model();
        state.vsync.rearm();

        dispatcher.bus.set_bits(reg::CTRL1, ctrl1::VSYNC_EDGE_IRQ_EN);
        dispatcher.bus.raise_irq(ctrl1::VSYNC_EDGE_IRQ);
        dispatcher.dispatch();

        // No waiter: the status bit stays latched and the completion stays
        // unresolved.
        assert!(!state.vsync.wait_timeout(Duration::ZERO));
        let c1 = dispatcher.bus.read(reg::CTRL1);
        assert_ne!(c1 & ctrl1::VSYNC_EDGE_IRQ, 0);
    }

    #[test]
    fn vsync_with_pending_wait_is_acked_and_resolved() {
        let (mut dispatcher, state) = dispatcher_with_model();
        state.vsync.rearm();
        state.wait_for_vsync.store(true, Ordering::SeqCst);

        dispatcher.bus.set_bits(reg::CTRL1, ctrl1::VSYNC_EDGE_IRQ_EN);
        dispatcher.bus.raise_irq(ctrl1::VSYNC_EDGE_IRQ);
        dispatcher.dispatch();

        assert!(state.vsync.wait_timeout(Duration::ZERO));
        assert!(!state.wait_for_vsync.load(Ordering::SeqCst));
        let c1 = dispatcher.bus.read(reg::CTRL1);
        assert_eq!(c1 & ctrl1::VSYNC_EDGE_IRQ, 0);
        assert_eq!(c1 & ctrl1::VSYNC_EDGE_IRQ_EN, 0);
    }

    #[test]
    fn disabled_sources_are_ignored() {
        let (mut dispatcher, state) = dispatcher_with_model();
        state.flip.rearm();

        // Raised but not enabled: not asked, nothing acknowledged.
        dispatcher.bus.raise_irq(ctrl1::CUR_FRAME_DONE_IRQ);
        dispatcher.dispatch();

        assert!(!state.flip.wait_timeout(Duration::ZERO));
        assert_ne!(
            dispatcher.bus.read(reg::CTRL1) & ctrl1::CUR_FRAME_DONE_IRQ,
            0
        );
    }

    #[test]
    fn underflow_and_overflow_are_counted_and_cleared() {
        let (mut dispatcher, _state) = dispatcher_with_model();

        dispatcher
            .bus
            .set_bits(reg::CTRL1, ctrl1::UNDERFLOW_IRQ_EN | ctrl1::OVERFLOW_IRQ_EN);
        dispatcher
            .bus
            .raise_irq(ctrl1::UNDERFLOW_IRQ | ctrl1::OVERFLOW_IRQ);
        dispatcher.dispatch();

        assert_eq!(dispatcher.underflow_count(), 1);
        assert_eq!(dispatcher.overflow_count(), 1);
        let c1 = dispatcher.bus.read(reg::CTRL1);
        assert_eq!(c1 & (ctrl1::UNDERFLOW_IRQ | ctrl1::OVERFLOW_IRQ), 0);
        // Enable bits stay set: the dispatcher never disarms these sources.
        assert_ne!(c1 & ctrl1::UNDERFLOW_IRQ_EN, 0);
        assert_ne!(c1 & ctrl1::OVERFLOW_IRQ_EN, 0);
    }
}
