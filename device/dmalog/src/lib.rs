#![cfg_attr(not(test), no_std)]
//! Interrupt-driven serial logging over a one-shot DMA transmitter.
//!
//! Producers render a message into a bounded compose buffer, the rendered bytes are copied into a
//! circular queue, and the transmit pump keeps the DMA engine fed from that queue. The engine's
//! completion interrupt advances the queue and chains the next transfer, so a log call never waits
//! for the line.
//!
//! ```txt
//!  log_message ──render──► ComposeBuffer ──enqueue──► LogRing ──ensure_running──► TransferEngine
//!                                                        ▲                            │
//!                                                        └──── on_transfer_complete ◄─┘
//! ```

/// ANSI escape sequences for coloring log text.
pub mod color;
/// Error taxonomy.
pub mod error;
/// Contract for the hardware transfer engine.
pub mod engine;
/// Adapter for the `log` crate.
pub mod facade;
/// Canonical hex+ASCII dump formatting.
pub mod hexdump;
/// The composed logger, and its interrupt-safe shared handle.
pub mod logger;
/// The transmit pump state machine.
pub mod pump;
/// Message rendering into a bounded compose buffer.
pub mod render;
/// The circular log buffer.
pub mod ring;

pub use engine::{TransferEngine, TransferWindow};
pub use error::Error;
pub use facade::{DbgLevel, DmaLogFacade};
pub use logger::{DmaLogger, SharedLogger};
pub use pump::{Arm, StatusIndicator, TransmitPump};
pub use render::{ComposeBuffer, MillisClock, NoClock, Rendered};
pub use ring::LogRing;

/// Maximum size of a single rendered log item, including the timestamp prefix and the trailing
/// line feed.
pub const LOG_ITEM_MAX_SIZE: usize = 128;
/// Size of the circular DMA queue. One byte of it is never used.
pub const LOG_DMA_BUFFER_SIZE: usize = 4096;

/// [`DmaLogger`] at the standard queue and item sizes.
pub type DefaultLogger<E, K, I = ()> = DmaLogger<E, K, I, LOG_DMA_BUFFER_SIZE, LOG_ITEM_MAX_SIZE>;
/// [`SharedLogger`] at the standard queue and item sizes.
pub type DefaultSharedLogger<E, K, I = ()> =
    SharedLogger<E, K, I, LOG_DMA_BUFFER_SIZE, LOG_ITEM_MAX_SIZE>;

/// Format a message and log it through a [`DmaLogger`] or [`SharedLogger`].
///
/// Evaluates to the `Result` of `log_message`: the number of bytes queued, or the reason the
/// message was dropped.
#[macro_export]
macro_rules! logmsg {
    ($logger:expr, $($arg:tt)*) => {
        $logger.log_message(::core::format_args!($($arg)*))
    };
}
