//! Command tree declarations.
//!
//! Trees are plain data: slices of [`Node`] built by `const fn`
//! constructors, usually in `static` items. Nothing is inserted or
//! removed at runtime; capability gating goes through the tree's
//! enabled mask.
//!
//! ```ignore
//! static VERSION: Func = Func(version_handler);
//!
//! static SYSTEM_NODES: &[Node<'static>] = &[
//!     Node::leaf("VERSion", &VERSION).with_help("? returns the version"),
//! ];
//!
//! static COLON_NODES: &[Node<'static>] = &[
//!     Node::dir("SYSTem", SYSTEM_NODES),
//! ];
//!
//! static TREE: Tree<'static> = Tree::new(&[], COLON_NODES);
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use super::reply::Reply;
use crate::error::ErrorKind;

/// Node callback.
///
/// Receives the input following the node name and returns how many bytes
/// it consumed. It must never report more than it was given.
pub trait Handler: Sync {
    fn handle(&self, input: &[u8], out: &mut Reply<'_>) -> Result<usize, ErrorKind>;
}

/// Plain function handler signature.
pub type HandlerFn = fn(&[u8], &mut Reply<'_>) -> Result<usize, ErrorKind>;

/// Adapter turning a plain function into a [`Handler`].
pub struct Func(pub HandlerFn);

impl Handler for Func {
    #[inline]
    fn handle(&self, input: &[u8], out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
        (self.0)(input, out)
    }
}

/// One vocabulary entry: a directory (has children), a leaf (has a
/// handler) or both (a directory with a default action).
pub struct Node<'a> {
    /// Uppercase mandatory stem followed by an optional lowercase suffix.
    pub name: &'static str,
    /// Child nodes in match order. Empty for a leaf.
    pub children: &'a [Node<'a>],
    pub handler: Option<&'a dyn Handler>,
    /// One-line description, printed after the name in help mode.
    pub help: Option<&'static str>,
    /// Feature bits that must all be enabled for the node to be reachable.
    pub disabled: u32,
    /// Excluded from help listings, still invocable.
    pub hidden: bool,
}

impl<'a> Node<'a> {
    /// Leaf bound to a handler.
    pub const fn leaf(name: &'static str, handler: &'a dyn Handler) -> Self {
        Self {
            name,
            children: &[],
            handler: Some(handler),
            help: None,
            disabled: 0,
            hidden: false,
        }
    }

    /// Directory without a default handler.
    pub const fn dir(name: &'static str, children: &'a [Node<'a>]) -> Self {
        Self {
            name,
            children,
            handler: None,
            help: None,
            disabled: 0,
            hidden: false,
        }
    }

    /// Attach a handler (default action for directories).
    pub const fn with_handler(mut self, handler: &'a dyn Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    /// Gate the node behind feature bits.
    pub const fn disabled_by(mut self, mask: u32) -> Self {
        self.disabled = mask;
        self
    }

    /// Hide from help listings.
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Check the node against an enabled-feature mask.
    #[inline]
    pub fn is_enabled(&self, enabled: u32) -> bool {
        self.disabled & !enabled == 0
    }
}

/// The two roots of the vocabulary plus the enabled-feature mask.
pub struct Tree<'a> {
    star: &'a [Node<'a>],
    colon: &'a [Node<'a>],
    enabled: AtomicU32,
}

impl<'a> Tree<'a> {
    /// Tree with star-anchored (`*IDN?`) and colon-anchored (`:SYST...`)
    /// roots. No feature is enabled.
    pub const fn new(star: &'a [Node<'a>], colon: &'a [Node<'a>]) -> Self {
        Self {
            star,
            colon,
            enabled: AtomicU32::new(0),
        }
    }

    /// Enable nodes gated by the given feature bits.
    pub fn enable(&self, what: u32) {
        self.enabled.fetch_or(what, Ordering::AcqRel);
    }

    /// Current enabled-feature mask.
    #[inline]
    pub fn enabled(&self) -> u32 {
        self.enabled.load(Ordering::Acquire)
    }

    #[inline]
    pub fn star_nodes(&self) -> &'a [Node<'a>] {
        self.star
    }

    #[inline]
    pub fn colon_nodes(&self) -> &'a [Node<'a>] {
        self.colon
    }
}
