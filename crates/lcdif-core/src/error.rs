use lcdif_regs::BusWidth;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LcdifError>;

/// Unified error type for the LCDIF driver core.
///
/// Validation errors are returned synchronously and never retried by the
/// core. Timeout errors are surfaced as-is; whether to re-issue the wait is
/// the caller's decision. Recovery errors are non-fatal to attach: the caller
/// falls back to a zero-filled buffer and a fresh program/enable cycle.
#[derive(Debug, Error)]
pub enum LcdifError {
    #[error("invalid mode: {0}")]
    InvalidMode(&'static str),

    #[error("no RGB layout for depth {depth} on a {bus_width:?} bus")]
    UnsupportedFormat { depth: u32, bus_width: BusWidth },

    #[error("power-enable capability refused")]
    PowerEnableFailed,

    #[error("operation requires the controller to be unblanked")]
    NotUnblanked,

    #[error("vsync interrupt did not arrive within the wait bound")]
    VsyncTimeout,

    #[error("frame-done interrupt did not arrive within the wait bound")]
    FlipTimeout,

    #[error(
        "scanout address {addr:#x} outside framebuffer region {base:#x}+{len:#x}"
    )]
    RecoveryOutOfRange { addr: u64, base: u64, len: usize },

    #[error("mode recovery failed: {0}")]
    RecoveryFailed(&'static str),

    #[error("framebuffer memory could not be obtained ({needed} bytes)")]
    AllocationFailed { needed: usize },
}
