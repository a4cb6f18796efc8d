//! SCPI command engine
//!
//! Framing-independent: takes one complete message, walks the command
//! tree and writes the reply into a caller-provided buffer.
//! Zero heap allocation, trees are static data.

pub mod dispatch;
pub mod matcher;
pub mod node;
pub mod reply;
pub mod scan;
pub mod value;

pub use dispatch::{parse, DELIMITER, USAGE};
pub use matcher::match_name;
pub use node::{Func, Handler, HandlerFn, Node, Tree};
pub use reply::Reply;
pub use value::{Access, Binding, BoolValue, Port, Scalar, U16Value, U32Value, Value};
