//! Line framer between the transport and the dispatcher.
//!
//! # Architecture
//!
//! ```text
//! receive ISR ──▶ Framer::receive ──▶ rx slot ────┐ state: READY
//!                                                 ▼
//! poll loop   ──▶ Framer::poll ──▶ dispatch::parse ──▶ tx buffer ──▶ Transport
//! ```
//!
//! # Handoff
//!
//! Two receive slots. The producer fills one while the consumer may be
//! dispatching the other. One atomic `state` is the mailbox:
//!
//! | state         | meaning                                      |
//! |---------------|----------------------------------------------|
//! | `FREE`        | producer accumulating the next command       |
//! | `READY` + slot| command published in `slot`, waiting for poll |
//! | `ERROR`       | latched error waiting to be reported         |
//!
//! The producer moves `FREE → READY | ERROR`, `READY → ERROR` and
//! `READY | ERROR → FREE` (resync). The consumer moves `READY → FREE`
//! when it takes a command and `ERROR → FREE` when it reports one.
//!
//! A second atomic, `job`, announces the slot being dispatched. The
//! producer never writes that slot, and a resync marks the job
//! cancelled so its reply is dropped.
//!
//! Strict one-in-flight: bytes arriving while a command is published
//! but not yet polled are a protocol error. They are dropped and the
//! error is reported in place of the pending command.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicU8, AtomicUsize, Ordering};

use crate::config::{FramingConfig, ERROR_CODE_WIDTH};
use crate::error::ErrorKind;
use crate::hal::Transport;
use crate::latch::ErrorLatch;
use crate::logging::LogStream;
use crate::scpi::{parse, Reply, Tree};

// Mailbox states. `READY` carries the slot index in bit 0.
const FREE: u8 = 0;
const ERROR: u8 = 1;
const READY: u8 = 2;
const READY_SLOT: u8 = 1;

// Job flags
const IDLE: u8 = 0;
const ACTIVE: u8 = 1;
const CANCELLED: u8 = 2;
const JOB_SLOT: u8 = 4;

/// `#` + code digits + terminator.
const ERROR_REPLY_LEN: usize = 1 + ERROR_CODE_WIDTH + 1;

#[inline]
fn job_slot(job: u8) -> usize {
    usize::from(job & JOB_SLOT != 0)
}

/// Producer-side receive cursor.
struct Cursor {
    /// Slot being filled.
    slot: usize,
    /// Bytes buffered for the current command.
    len: usize,
    /// Last byte seen, for resync token detection.
    prev: Option<u8>,
}

/// Command framer (single producer, single consumer).
///
/// # Safety
///
/// `receive()` must only be called from one context (the transport
/// receive callback) and `poll()` from one other context (the main loop).
/// Neither may be re-entered. Under that contract:
/// - `cursor` is touched by the producer only
/// - the producer writes `rx[cursor.slot]` only in `FREE`, and never the
///   slot announced in `job`
/// - the consumer reads a slot only after taking it out of `READY`
/// - `tx` is touched by the consumer only
pub struct Framer<'a, const RX: usize, const TX: usize> {
    config: FramingConfig,
    log: &'a LogStream,

    rx: [UnsafeCell<[u8; RX]>; 2],
    cursor: UnsafeCell<Cursor>,
    /// Receive-side error, raised by the producer.
    latch: ErrorLatch,

    state: AtomicU8,
    /// Length of the published command (valid in `READY`).
    command_len: AtomicUsize,
    /// Error to report (valid in `ERROR`).
    error_code: AtomicU8,
    /// Command being dispatched by the consumer.
    job: AtomicU8,

    tx: UnsafeCell<[u8; TX]>,
    processed: AtomicU32,
}

// SAFETY: Single producer, single consumer, slot ownership handed over
// through `state` and `job` with acquire/release ordering.
unsafe impl<const RX: usize, const TX: usize> Sync for Framer<'_, RX, TX> {}
unsafe impl<const RX: usize, const TX: usize> Send for Framer<'_, RX, TX> {}

impl<'a, const RX: usize, const TX: usize> Framer<'a, RX, TX> {
    /// Create an idle framer.
    pub const fn new(config: FramingConfig, log: &'a LogStream) -> Self {
        assert!(RX > 0 && TX > 0, "Framer buffers must not be empty");

        Self {
            config,
            log,
            rx: [UnsafeCell::new([0; RX]), UnsafeCell::new([0; RX])],
            cursor: UnsafeCell::new(Cursor {
                slot: 0,
                len: 0,
                prev: None,
            }),
            latch: ErrorLatch::new(),
            state: AtomicU8::new(FREE),
            command_len: AtomicUsize::new(0),
            error_code: AtomicU8::new(0),
            job: AtomicU8::new(IDLE),
            tx: UnsafeCell::new([0; TX]),
            processed: AtomicU32::new(0),
        }
    }

    /// Framing parameters in use.
    pub fn config(&self) -> &FramingConfig {
        &self.config
    }

    /// Feed bytes from the transport (producer side, never blocks).
    pub fn receive(&self, bytes: &[u8]) {
        // SAFETY: producer-only state, see type-level contract.
        let cursor = unsafe { &mut *self.cursor.get() };

        for &byte in bytes {
            let prev = cursor.prev.replace(byte);

            if prev == Some(self.config.abort) && byte == self.config.terminator {
                self.resync(cursor);
                continue;
            }

            if self.state.load(Ordering::Acquire) != FREE && !self.latch.is_active() {
                crate::cli_warn!(self.log, self.now(), "command received while one is pending");
                self.latch.raise(ErrorKind::Protocol);
            }

            if byte == self.config.terminator {
                self.complete(cursor);
                continue;
            }

            if self.latch.is_active() {
                continue;
            }

            if cursor.len == RX {
                crate::cli_warn!(self.log, self.now(), "rx overflow at {} bytes", RX);
                self.latch.raise(ErrorKind::Protocol);
                continue;
            }

            // SAFETY: state is FREE (the latch is raised otherwise), and
            // cursor.slot is never the slot being dispatched.
            unsafe {
                (*self.rx[cursor.slot].get())[cursor.len] = byte;
            }
            cursor.len += 1;
        }
    }

    /// Terminator seen: publish the command or the latched error.
    fn complete(&self, cursor: &mut Cursor) {
        let len = cursor.len;
        cursor.len = 0;

        match self.latch.take() {
            None => {
                self.command_len.store(len, Ordering::Relaxed);
                // Only reached in FREE: any other state latches above.
                self.state.store(READY | cursor.slot as u8, Ordering::Release);
                cursor.slot ^= 1;
            }
            Some(err) => self.publish_error(err),
        }
    }

    /// Replace whatever is pending with `err`. A pending error wins.
    fn publish_error(&self, err: ErrorKind) {
        let mut current = self.state.load(Ordering::Acquire);
        while current != ERROR {
            self.error_code.store(err.code(), Ordering::Relaxed);
            match self.state.compare_exchange_weak(
                current,
                ERROR,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(now) => current = now,
            }
        }
    }

    /// Resync token: drop everything the producer knows about.
    fn resync(&self, cursor: &mut Cursor) {
        cursor.len = 0;
        cursor.prev = None;
        self.latch.clear();

        let pending = self.state.load(Ordering::Acquire);
        // Losing the race means the consumer took it: already FREE.
        if pending != FREE
            && self
                .state
                .compare_exchange(pending, FREE, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            && pending & READY != 0
        {
            // Dropped command: its slot is free again.
            cursor.slot = usize::from(pending & READY_SLOT);
        }

        // A stale flag on an idle job is overwritten by the next announce.
        let job = self.job.fetch_or(CANCELLED, Ordering::AcqRel);
        if job & ACTIVE != 0 {
            cursor.slot = job_slot(job) ^ 1;
            crate::cli_debug!(self.log, self.now(), "in-flight reply cancelled");
        }

        crate::cli_info!(self.log, self.now(), "resync");
    }

    /// Dispatch a pending command or report a pending error (consumer side).
    ///
    /// No-op while the transport is disconnected or still draining the
    /// previous reply.
    pub fn poll<T: Transport + ?Sized>(&self, transport: &mut T, tree: &Tree<'_>) {
        if !transport.is_connected() || transport.is_busy() {
            return;
        }

        match self.state.load(Ordering::Acquire) {
            FREE => {}
            ERROR => {
                let code = self.error_code.load(Ordering::Relaxed);
                if self
                    .state
                    .compare_exchange(ERROR, FREE, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    let err = ErrorKind::from_code(code).unwrap_or(ErrorKind::Internal);
                    self.send_error(transport, err);
                }
            }
            ready => self.dispatch(transport, tree, ready),
        }
    }

    fn dispatch<T: Transport + ?Sized>(&self, transport: &mut T, tree: &Tree<'_>, ready: u8) {
        let slot = usize::from(ready & READY_SLOT);

        // Announce before taking, so a resync that frees the command
        // first sees which slot to stay clear of.
        let announce = if slot == 1 { ACTIVE | JOB_SLOT } else { ACTIVE };
        self.job.store(announce, Ordering::Release);
        if self
            .state
            .compare_exchange(ready, FREE, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Dropped by a resync, or replaced by an error.
            self.job.store(IDLE, Ordering::Release);
            return;
        }
        let len = self.command_len.load(Ordering::Relaxed).min(RX);

        // SAFETY: the slot was taken out of READY and is announced in
        // `job`, so the producer does not write it. tx is consumer-only.
        let (command, tx) = unsafe { (&(&*self.rx[slot].get())[..len], &mut *self.tx.get()) };

        let mut out = Reply::new(&mut tx[..]);
        let result = parse(command, tree, &mut out)
            .and_then(|()| out.put(&[self.config.terminator]))
            .map(|()| out.len());

        if self.job.swap(IDLE, Ordering::AcqRel) & CANCELLED != 0 {
            crate::cli_debug!(self.log, self.now(), "reply dropped by resync");
            return;
        }

        match result {
            Ok(reply_len) => {
                if transport.transmit(&tx[..reply_len]).is_err() {
                    crate::cli_error!(self.log, self.now(), "transmit failed ({} bytes)", reply_len);
                    self.send_error(transport, ErrorKind::Internal);
                    return;
                }
                self.processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                crate::cli_debug!(self.log, self.now(), "command failed: {}", err);
                self.send_error(transport, err);
            }
        }
    }

    /// Send `#NNNN` + terminator.
    fn send_error<T: Transport + ?Sized>(&self, transport: &mut T, err: ErrorKind) {
        let mut buf = [0u8; ERROR_REPLY_LEN];
        let mut out = Reply::new(&mut buf);
        let framed = crate::reply!(out, "#{:0w$}", err.code(), w = ERROR_CODE_WIDTH)
            .and_then(|()| out.put(&[self.config.terminator]));

        if framed.is_err() || transport.transmit(out.as_bytes()).is_err() {
            crate::cli_error!(self.log, self.now(), "error reply {} lost", err.code());
        }
    }

    /// Drop all framing state, as if the resync token had been received.
    ///
    /// Producer side: call from the receive context, or while it is idle
    /// (e.g. on host reconnect).
    pub fn reset(&self) {
        // SAFETY: producer-only state, see type-level contract.
        let cursor = unsafe { &mut *self.cursor.get() };
        self.resync(cursor);
    }

    /// Commands dispatched successfully since boot (diagnostics only).
    pub fn commands_processed(&self) -> u32 {
        self.processed.load(Ordering::Relaxed)
    }

    /// A command or an error report is waiting for `poll()`.
    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) != FREE
    }

    /// Receive-side errors raised since boot.
    pub fn receive_errors(&self) -> u32 {
        self.latch.count()
    }

    fn now(&self) -> i64 {
        (self.config.clock)()
    }
}

/// Framer sized for the controller's default buffers.
pub type DefaultFramer<'a> =
    Framer<'a, { crate::config::RX_BUFFER_SIZE }, { crate::config::TX_BUFFER_SIZE }>;
