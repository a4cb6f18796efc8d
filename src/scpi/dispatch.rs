//! Command dispatcher.
//!
//! Walks the command tree against one message, resolving each path
//! segment with [`match_name`] and invoking node handlers.
//!
//! ```text
//! ?        help mode prefix (optional)
//! *  :     root selector, colon root by default
//! SYST:    descend into a directory
//! VERS?    invoke a leaf with the rest of the input
//! ;        separate sibling leaves under the same directory
//! ```

use super::matcher::match_name;
use super::node::{Node, Tree};
use super::reply::Reply;
use crate::error::ErrorKind;

/// Sibling command delimiter.
pub const DELIMITER: u8 = b';';

/// Reply to a bare `?`.
pub const USAGE: &str = "use\n\
    ?* or ?: to list top level tags,\n\
    ?<path>: to list tags rooting at given path,\n\
    ?<path>  to get help about particular parameter";

#[inline]
fn is_root_marker(c: u8) -> bool {
    c == b':' || c == b'*'
}

/// Parse and execute one command message.
///
/// Handler output is appended to `out`. On error the reply content is
/// unspecified and the caller is expected to discard it.
pub fn parse(input: &[u8], tree: &Tree<'_>, out: &mut Reply<'_>) -> Result<(), ErrorKind> {
    if input.is_empty() {
        return Err(ErrorKind::Protocol);
    }

    let mut rest = input;
    let help = rest[0] == b'?';
    if help {
        rest = &rest[1..];
        if rest.is_empty() {
            return out.put(USAGE.as_bytes());
        }
    }

    let star_root = Node::dir("", tree.star_nodes());
    let colon_root = Node::dir("", tree.colon_nodes());
    let mut root = &colon_root;

    let mut walk = Walk {
        enabled: tree.enabled(),
        help,
        out,
    };

    while let Some(&c) = rest.first() {
        match c {
            b'*' => {
                root = &star_root;
                rest = &rest[1..];
            }
            b':' => {
                root = &colon_root;
                rest = &rest[1..];
            }
            _ => {}
        }
        let used = walk.node(rest, root)?;
        if used > rest.len() {
            return Err(ErrorKind::Internal);
        }
        rest = &rest[used..];
    }

    Ok(())
}

/// Per-message walk state.
struct Walk<'r, 'o> {
    enabled: u32,
    help: bool,
    out: &'r mut Reply<'o>,
}

impl Walk<'_, '_> {
    /// Resolve `input` against `node`. Returns the bytes consumed.
    fn node(&mut self, input: &[u8], node: &Node<'_>) -> Result<usize, ErrorKind> {
        if node.is_leaf() {
            if !self.help {
                return invoke(node, input, self.out);
            }
            if !input.is_empty() {
                return Err(ErrorKind::Command);
            }
            match node.help {
                Some(help) => crate::reply!(self.out, "{}{}", node.name, help)?,
                None => crate::reply!(self.out, "{} is a value", node.name)?,
            }
            return Ok(0);
        }

        if input.is_empty() {
            if self.help {
                self.list(node)?;
                return Ok(0);
            }
            if node.handler.is_none() {
                return Err(ErrorKind::Command);
            }
        }

        let mut rest = input;
        while let Some(&c) = rest.first() {
            if is_root_marker(c) {
                break;
            }

            let (child, matched) = node
                .children
                .iter()
                .filter(|n| n.is_enabled(self.enabled))
                .find_map(|n| match match_name(rest, n.name) {
                    0 => None,
                    m => Some((n, m)),
                })
                .ok_or(ErrorKind::Command)?;
            rest = &rest[matched..];

            let used = if rest.first() == Some(&b':') {
                rest = &rest[1..];
                self.node(rest, child)?
            } else if self.help {
                if !rest.is_empty() {
                    return Err(ErrorKind::Command);
                }
                self.describe(child)?;
                return Ok(input.len());
            } else {
                invoke(child, rest, self.out)?
            };

            if used > rest.len() {
                return Err(ErrorKind::Internal);
            }
            rest = &rest[used..];

            let delimiters = rest.iter().take_while(|&&c| c == DELIMITER).count();
            rest = &rest[delimiters..];
        }

        // Directory default action, runs after every sub-loop
        if !self.help && node.handler.is_some() {
            invoke(node, &[], self.out)?;
        }

        Ok(input.len() - rest.len())
    }

    /// Help text for a node addressed as a value.
    fn describe(&mut self, node: &Node<'_>) -> Result<(), ErrorKind> {
        if !node.is_leaf() {
            return crate::reply!(self.out, "{} is not a value", node.name);
        }
        match node.help {
            Some(help) => crate::reply!(self.out, "{}{}", node.name, help),
            None => crate::reply!(self.out, "value {} has no help", node.name),
        }
    }

    /// List visible children of a directory.
    fn list(&mut self, node: &Node<'_>) -> Result<(), ErrorKind> {
        if let Some(help) = node.help {
            crate::reply!(self.out, "{}{}\n", node.name, help)?;
        }

        for child in node.children {
            if child.hidden || !child.is_enabled(self.enabled) {
                continue;
            }
            self.out.put(child.name.as_bytes())?;
            if !child.is_leaf() {
                self.out.put(b":")?;
            }
            self.out.put(b" ")?;
        }
        Ok(())
    }
}

/// Call a node handler and check its consumed count.
fn invoke(node: &Node<'_>, input: &[u8], out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
    let handler = node.handler.ok_or(ErrorKind::Command)?;
    let used = handler.handle(input, out)?;
    if used > input.len() {
        return Err(ErrorKind::Internal);
    }
    Ok(used)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scpi::node::Func;

    fn answer(input: &[u8], out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
        if input != b"?" {
            return Err(ErrorKind::Command);
        }
        out.put(b"X.Y")?;
        Ok(1)
    }

    fn greedy(input: &[u8], _out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
        Ok(input.len() + 1)
    }

    static ANSWER: Func = Func(answer);
    static GREEDY: Func = Func(greedy);

    static SYSTEM_NODES: &[Node<'static>] = &[
        Node::leaf("VERSion", &ANSWER).with_help("? returns the version"),
        Node::leaf("GREEdy", &GREEDY),
    ];

    static COLON_NODES: &[Node<'static>] = &[Node::dir("SYSTem", SYSTEM_NODES)];

    fn run(input: &[u8]) -> (Result<(), ErrorKind>, String) {
        let tree = Tree::new(&[], COLON_NODES);
        let mut buf = [0u8; 256];
        let mut out = Reply::new(&mut buf);
        let rc = parse(input, &tree, &mut out);
        (rc, String::from_utf8(out.as_bytes().to_vec()).unwrap())
    }

    #[test]
    fn test_query_leaf() {
        assert_eq!(run(b":SYSTem:VERS?"), (Ok(()), "X.Y".to_string()));
        assert_eq!(run(b"SYST:VERSION?"), (Ok(()), "X.Y".to_string()));
    }

    #[test]
    fn test_bad_abbreviation() {
        assert_eq!(run(b":SYSTem:VERSIO?").0, Err(ErrorKind::Command));
    }

    #[test]
    fn test_empty_message() {
        assert_eq!(run(b"").0, Err(ErrorKind::Protocol));
    }

    #[test]
    fn test_overconsuming_handler() {
        assert_eq!(run(b":SYST:GREE").0, Err(ErrorKind::Internal));
    }

    #[test]
    fn test_usage() {
        let (rc, text) = run(b"?");
        assert_eq!(rc, Ok(()));
        assert_eq!(text, USAGE);
    }
}
