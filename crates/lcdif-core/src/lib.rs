//! Driver core for the LCDIF dot-clock display controller.
//!
//! The crate is organized around one [`LcdController`] instance per
//! controller, constructed at attach and torn down at detach. The instance
//! owns the scanout region, the clock/power capabilities, and the requester
//! side of the vsync/flip synchronization protocol; the matching
//! [`IrqDispatcher`] runs in the interrupt context and shares only the
//! completion state.
//!
//! Hardware access goes through the [`RegisterBus`] trait, so the core runs
//! unchanged against a real register window or against the bundled
//! [`LcdifModel`], the software register-file model the test suite drives.
#![forbid(unsafe_code)]

mod bus;
mod completion;
mod controller;
mod error;
mod fb;
mod irq;
mod model;
mod palette;
mod power;
mod recovery;
mod validate;

pub use bus::RegisterBus;
pub use completion::Completion;
pub use controller::{BlankMode, ControllerConfig, LcdController};
pub use error::{LcdifError, Result};
pub use fb::FramebufferRegion;
pub use irq::IrqDispatcher;
pub use model::LcdifModel;
pub use palette::{chan_to_field, rgb_to_gray, PALETTE_SIZE};
pub use power::{ClockGate, FixedClock, GatedClock, PixelClock, PowerFault, PowerRail};
pub use validate::check_mode;
