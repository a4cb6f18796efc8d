//! Hardware Abstraction Layer for the controller.
//!
//! Collaborator contracts only. The engine never touches peripherals
//! directly: it reads and writes through these small synchronous traits,
//! and the firmware binary supplies the implementations.

pub mod eeprom;
pub mod gpio;
pub mod system;
pub mod transport;

pub use eeprom::PageStore;
pub use gpio::{ActiveLow, OutputPin};
pub use system::SystemControl;
pub use transport::Transport;
