//! Framer tests: line framing, error replies, resync and one-in-flight

use std::sync::atomic::{AtomicUsize, Ordering};

use rust_scpi_controller::config::FramingConfig;
use rust_scpi_controller::error::{ErrorKind, TransportError};
use rust_scpi_controller::framer::Framer;
use rust_scpi_controller::hal::Transport;
use rust_scpi_controller::logging::{LogLevel, LogStream};
use rust_scpi_controller::scpi::{Func, Node, Reply, Tree};

/// Records every transmitted reply.
struct MockTransport {
    sent: Vec<Vec<u8>>,
    connected: bool,
    busy: bool,
    fail_next: bool,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            sent: Vec::new(),
            connected: true,
            busy: false,
            fail_next: false,
        }
    }

    fn replies(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|r| String::from_utf8(r.clone()).unwrap())
            .collect()
    }
}

impl Transport for MockTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn is_busy(&self) -> bool {
        self.busy
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.fail_next {
            self.fail_next = false;
            return Err(TransportError);
        }
        self.sent.push(bytes.to_vec());
        Ok(())
    }
}

fn version(input: &[u8], out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
    if input != b"?" {
        return Err(ErrorKind::Command);
    }
    out.put(b"X.Y")?;
    Ok(1)
}

static VERSION: Func = Func(version);
static SYSTEM_NODES: &[Node<'static>] = &[Node::leaf("VERSion", &VERSION)];
static COLON_NODES: &[Node<'static>] = &[Node::dir("SYSTem", SYSTEM_NODES)];
static TREE: Tree<'static> = Tree::new(&[], COLON_NODES);

const QUERY: &[u8] = b":SYSTem:VERS?\r";

type TestFramer<'a> = Framer<'a, 32, 64>;

fn framer(log: &LogStream) -> TestFramer<'_> {
    Framer::new(FramingConfig::DEFAULT, log)
}

#[test]
fn test_query_reply() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();

    framer.receive(QUERY);
    framer.poll(&mut wire, &TREE);

    assert_eq!(wire.replies(), vec!["X.Y\r"]);
    assert_eq!(framer.commands_processed(), 1);
}

#[test]
fn test_bytes_split_across_calls() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();

    for chunk in QUERY.chunks(3) {
        framer.poll(&mut wire, &TREE);
        framer.receive(chunk);
    }
    framer.poll(&mut wire, &TREE);

    assert_eq!(wire.replies(), vec!["X.Y\r"]);
}

#[test]
fn test_unknown_command_error_reply() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();

    framer.receive(b":SYSTem:VERSIO?\r");
    framer.poll(&mut wire, &TREE);

    assert_eq!(wire.replies(), vec!["#0003\r"]);
    assert_eq!(framer.commands_processed(), 0);
}

#[test]
fn test_empty_line_is_protocol_error() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();

    framer.receive(b"\r");
    framer.poll(&mut wire, &TREE);

    assert_eq!(wire.replies(), vec!["#0004\r"]);
}

#[test]
fn test_overflow_reports_protocol_error() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();

    framer.receive(b":SYSTem:VERS?");
    framer.receive(&[b' '; 40]);
    framer.poll(&mut wire, &TREE);
    assert!(wire.sent.is_empty());

    framer.receive(b"\r");
    framer.poll(&mut wire, &TREE);
    assert_eq!(wire.replies(), vec!["#0004\r"]);
    assert_eq!(framer.receive_errors(), 1);

    // Framing recovers on the next line
    framer.receive(QUERY);
    framer.poll(&mut wire, &TREE);
    assert_eq!(wire.replies(), vec!["#0004\r", "X.Y\r"]);
}

#[test]
fn test_overflow_is_logged() {
    let log = LogStream::new();
    let framer = framer(&log);

    framer.receive(&[b'A'; 33]);

    let entry = log.drain().expect("overflow warning");
    assert_eq!(entry.level, LogLevel::Warn);
    assert!(entry.message().contains("overflow"));
}

#[test]
fn test_rx_capacity_excludes_terminator() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();

    // A full slot still frames: the command is parsed (and rejected)
    framer.receive(&[b'A'; 32]);
    framer.receive(b"\r");
    framer.poll(&mut wire, &TREE);
    assert_eq!(framer.receive_errors(), 0);

    // One byte more overflows
    framer.receive(&[b'A'; 33]);
    framer.receive(b"\r");
    framer.poll(&mut wire, &TREE);

    assert_eq!(wire.replies(), vec!["#0003\r", "#0004\r"]);
    assert_eq!(framer.receive_errors(), 1);
}

#[test]
fn test_resync_mid_buffer() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();

    framer.receive(b":SYST:VE-\r");
    framer.poll(&mut wire, &TREE);
    assert!(wire.sent.is_empty());
    assert!(!framer.is_pending());

    framer.receive(QUERY);
    framer.poll(&mut wire, &TREE);
    assert_eq!(wire.replies(), vec!["X.Y\r"]);
}

#[test]
fn test_resync_clears_latched_error() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();

    framer.receive(&[b'A'; 40]);
    framer.receive(b"-\r");
    framer.receive(QUERY);
    framer.poll(&mut wire, &TREE);

    assert_eq!(wire.replies(), vec!["X.Y\r"]);
}

#[test]
fn test_resync_drops_pending_command_and_error() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();

    // Pending command
    framer.receive(QUERY);
    framer.receive(b"-\r");
    framer.poll(&mut wire, &TREE);
    assert!(wire.sent.is_empty());

    // Pending error report
    framer.receive(&[b'A'; 40]);
    framer.receive(b"\r");
    assert!(framer.is_pending());
    framer.receive(b"-\r");
    framer.poll(&mut wire, &TREE);
    assert!(wire.sent.is_empty());

    framer.receive(QUERY);
    framer.poll(&mut wire, &TREE);
    assert_eq!(wire.replies(), vec!["X.Y\r"]);
}

#[test]
fn test_reset_behaves_like_resync() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();

    framer.receive(b":SYSTem:VE");
    framer.reset();
    framer.receive(QUERY);
    framer.poll(&mut wire, &TREE);

    assert_eq!(wire.replies(), vec!["X.Y\r"]);
}

#[test]
fn test_pipelined_command_replaced_by_single_error() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();

    framer.receive(QUERY);
    framer.receive(QUERY);
    framer.poll(&mut wire, &TREE);
    framer.poll(&mut wire, &TREE);

    assert_eq!(wire.replies(), vec!["#0004\r"]);
    assert_eq!(framer.commands_processed(), 0);

    framer.receive(QUERY);
    framer.poll(&mut wire, &TREE);
    assert_eq!(wire.replies(), vec!["#0004\r", "X.Y\r"]);
}

#[test]
fn test_busy_or_disconnected_transport_defers() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();

    framer.receive(QUERY);

    wire.connected = false;
    framer.poll(&mut wire, &TREE);
    wire.connected = true;
    wire.busy = true;
    framer.poll(&mut wire, &TREE);
    assert!(wire.sent.is_empty());
    assert!(framer.is_pending());

    wire.busy = false;
    framer.poll(&mut wire, &TREE);
    assert_eq!(wire.replies(), vec!["X.Y\r"]);
}

#[test]
fn test_transmit_failure_sends_internal_error() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();
    wire.fail_next = true;

    framer.receive(QUERY);
    framer.poll(&mut wire, &TREE);

    assert_eq!(wire.replies(), vec!["#0005\r"]);
    assert_eq!(framer.commands_processed(), 0);
}

#[test]
fn test_repeated_query_is_idempotent() {
    let log = LogStream::new();
    let framer = framer(&log);
    let mut wire = MockTransport::new();

    for _ in 0..2 {
        framer.receive(QUERY);
        framer.poll(&mut wire, &TREE);
    }

    assert_eq!(wire.sent[0], wire.sent[1]);
    assert_eq!(framer.commands_processed(), 2);
}

#[test]
fn test_custom_terminator() {
    let log = LogStream::new();
    let config = FramingConfig {
        terminator: b'\n',
        ..FramingConfig::DEFAULT
    };
    let framer: TestFramer<'_> = Framer::new(config, &log);
    let mut wire = MockTransport::new();

    framer.receive(b":SYST:VERS?\n");
    framer.poll(&mut wire, &TREE);

    assert_eq!(wire.replies(), vec!["X.Y\n"]);
}

// Framers fed from inside a handler, as an ISR would while the main
// loop is busy dispatching.

static RESYNC_LOG: LogStream = LogStream::new();
static RESYNC_FRAMER: TestFramer<'static> = Framer::new(FramingConfig::DEFAULT, &RESYNC_LOG);

fn slow_with_resync(input: &[u8], out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
    RESYNC_FRAMER.receive(b"-\r:SYSTem:VERS?\r");
    out.put(b"STALE")?;
    Ok(input.len())
}

static PIPELINE_LOG: LogStream = LogStream::new();
static PIPELINE_FRAMER: TestFramer<'static> = Framer::new(FramingConfig::DEFAULT, &PIPELINE_LOG);

fn slow_with_next_command(input: &[u8], out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
    PIPELINE_FRAMER.receive(QUERY);
    out.put(b"DONE")?;
    Ok(input.len())
}

static SLOW_RESYNC: Func = Func(slow_with_resync);
static SLOW_NEXT: Func = Func(slow_with_next_command);
static SLOW_NODES: &[Node<'static>] = &[
    Node::leaf("RESYnc", &SLOW_RESYNC),
    Node::leaf("NEXT", &SLOW_NEXT),
];
static SLOW_COLON_NODES: &[Node<'static>] = &[
    Node::dir("SYSTem", SYSTEM_NODES),
    Node::dir("SLOW", SLOW_NODES),
];
static SLOW_TREE: Tree<'static> = Tree::new(&[], SLOW_COLON_NODES);

#[test]
fn test_resync_during_dispatch_recovers() {
    let mut wire = MockTransport::new();

    RESYNC_FRAMER.receive(b":SLOW:RESY\r");
    for _ in 0..3 {
        RESYNC_FRAMER.poll(&mut wire, &SLOW_TREE);
    }

    // The cancelled reply is dropped, the command after the resync runs
    assert_eq!(wire.replies(), vec!["X.Y\r"]);
    assert_eq!(RESYNC_FRAMER.commands_processed(), 1);
    assert!(!RESYNC_FRAMER.is_pending());

    RESYNC_FRAMER.receive(QUERY);
    RESYNC_FRAMER.poll(&mut wire, &SLOW_TREE);
    assert_eq!(wire.replies(), vec!["X.Y\r", "X.Y\r"]);
}

#[test]
fn test_command_received_during_dispatch_is_queued() {
    let mut wire = MockTransport::new();

    PIPELINE_FRAMER.receive(b":SLOW:NEXT\r");
    PIPELINE_FRAMER.poll(&mut wire, &SLOW_TREE);
    assert!(PIPELINE_FRAMER.is_pending());
    PIPELINE_FRAMER.poll(&mut wire, &SLOW_TREE);

    assert_eq!(wire.replies(), vec!["DONE\r", "X.Y\r"]);
    assert_eq!(PIPELINE_FRAMER.commands_processed(), 2);
    assert_eq!(PIPELINE_FRAMER.receive_errors(), 0);
}

/// Transport shared with the producer thread through a reply counter.
struct CountingTransport<'a> {
    replies: &'a AtomicUsize,
    errors: usize,
}

impl Transport for CountingTransport<'_> {
    fn is_connected(&self) -> bool {
        true
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if bytes != b"X.Y\r" {
            self.errors += 1;
        }
        self.replies.fetch_add(1, Ordering::Release);
        Ok(())
    }
}

#[test]
fn test_threaded_producer_consumer() {
    const COMMANDS: usize = 500;

    let log = LogStream::new();
    let framer: Framer<'_, 32, 64> = Framer::new(FramingConfig::DEFAULT, &log);
    let replies = AtomicUsize::new(0);

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..COMMANDS {
                // Split the command to interleave with polls
                framer.receive(&QUERY[..5]);
                framer.receive(&QUERY[5..]);
                while replies.load(Ordering::Acquire) <= i {
                    std::thread::yield_now();
                }
            }
        });

        let mut wire = CountingTransport {
            replies: &replies,
            errors: 0,
        };
        while replies.load(Ordering::Acquire) < COMMANDS {
            framer.poll(&mut wire, &TREE);
        }
        assert_eq!(wire.errors, 0);
    });

    assert_eq!(framer.commands_processed(), COMMANDS as u32);
    assert_eq!(framer.receive_errors(), 0);
}
