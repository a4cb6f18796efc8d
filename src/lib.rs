//! # RustScpiController
//!
//! SCPI-style command engine for a USB-serial instrument controller.
//!
//! ## Architecture
//!
//! ```text
//! transport RX ──▶ Framer::receive ──▶ rx buffer
//!                                         │ one command in flight
//! poll loop ─────▶ Framer::poll ──▶ scpi::parse ──▶ handlers ──▶ Reply
//!                                                                 │
//! transport TX ◀──────────────────────── "reply\r" | "#NNNN\r" ◀──┘
//! ```
//!
//! - The receive side runs in interrupt context: no blocking, no heap
//! - The command tree is immutable data; features are gated by a mask
//! - Failures surface exactly once, as a `#NNNN` wire reply

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod framer;
pub mod hal;
pub mod instrument;
pub mod latch;
pub mod log_drain;
pub mod log_globals;
pub mod logging;
pub mod scpi;

pub use config::{FramingConfig, Identity, IDENTITY};
pub use error::{BusError, ErrorKind, TransportError};
pub use framer::{DefaultFramer, Framer};
pub use hal::Transport;
pub use instrument::{with_tree, Board};
pub use latch::ErrorLatch;
pub use log_globals::CLI_LOG;
pub use logging::{LogLevel, LogStream};
pub use scpi::{parse, Handler, Node, Reply, Tree};
