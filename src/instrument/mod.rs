//! Module: instrument
//!
//! Purpose: The controller's command vocabulary, built on the SCPI engine.
//!
//! ```text
//! *IDN?                          identification string
//! :SYSTem:VERSion?               firmware version
//! :SYSTem:RESet[:LOADer]         reset, optionally into the boot loader
//! :SYSTem:PERiph:RESet (0|1)     peripheral reset line (active low)
//! :SYSTem:PERiph:EEPRom:WR/RD    peripheral EEPROM pages   [EEPROM]
//! :TEST:ECHO                     loopback (hidden)         [TEST]
//! ```
//!
//! The tree borrows its collaborators, so it is assembled on the stack
//! by [`with_tree`] and lives as long as the poll loop that uses it.

pub mod eeprom;
pub mod identity;
pub mod system;

pub use eeprom::{EepromRead, EepromWrite};
pub use identity::{echo, serial_number, Identify, Version};
pub use system::{Loader, Reset};

use crate::config::{features, IDENTITY};
use crate::error::ErrorKind;
use crate::hal::{ActiveLow, OutputPin, PageStore, SystemControl};
use crate::scpi::{BoolValue, Func, Node, Tree};

/// Hardware the vocabulary talks to.
pub struct Board<'a> {
    pub system: &'a dyn SystemControl,
    /// Peripheral reset input, driven low to hold the peripheral in reset.
    pub periph_reset: &'a dyn OutputPin,
    pub eeprom: &'a dyn PageStore,
    /// 96-bit unique device id.
    pub uid: [u32; 3],
    /// Feature bits enabled at startup.
    pub features: u32,
}

static ECHO: Func = Func(echo);

/// Build the command tree for `board` and run `f` with it.
///
/// Fails only if the identification string cannot be rendered.
pub fn with_tree<R>(board: &Board<'_>, f: impl FnOnce(&Tree<'_>) -> R) -> Result<R, ErrorKind> {
    let idn = Identify::new(&IDENTITY, board.uid)?;
    let version = Version(&IDENTITY);
    let reset = Reset(board.system);
    let loader = Loader(board.system);
    let line = ActiveLow(board.periph_reset);
    let periph_reset = BoolValue::port(&line);
    let eeprom_wr = EepromWrite(board.eeprom);
    let eeprom_rd = EepromRead(board.eeprom);

    let star_nodes = [Node::leaf("IDN", &idn).with_help("? returns device identification string")];

    let reset_nodes = [Node::leaf("LOADer", &loader)
        .with_help(" ensures the boot loader will be launched after reset")];

    let eeprom_nodes = [
        Node::leaf("WR", &eeprom_wr)
            .with_help(" ADDR BYTE0 [BYTE1 ..] writes up to 64 bytes starting at the ADDR"),
        Node::leaf("RD", &eeprom_rd).with_help(" ADDR? returns 64-byte page starting at the ADDR"),
    ];

    let periph_nodes = [
        Node::leaf("RESet", &periph_reset)
            .with_help("(0|1) clear|assert peripheral reset input. RESet? returns its current state."),
        Node::dir("EEPRom", &eeprom_nodes)
            .with_help(" provides access to the peripheral EEPROM by means of the following tags:")
            .disabled_by(features::EEPROM),
    ];

    let system_nodes = [
        Node::leaf("VERSion", &version).with_help("? returns the controller version information"),
        Node::dir("RESet", &reset_nodes)
            .with_handler(&reset)
            .with_help(" performs controller reset. The following tag is optional:"),
        Node::dir("PERiph", &periph_nodes)
            .with_help(" provides access to the peripheral controller by means of the following tags:"),
    ];

    let test_nodes = [Node::leaf("ECHO", &ECHO)
        .with_help(" echos back all characters that follows it")
        .hidden()];

    let colon_nodes = [
        Node::dir("SYSTem", &system_nodes),
        Node::dir("TEST", &test_nodes).disabled_by(features::TEST),
    ];

    let tree = Tree::new(&star_nodes, &colon_nodes);
    tree.enable(board.features);

    Ok(f(&tree))
}
