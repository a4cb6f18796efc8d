//! Generic value leaves.
//!
//! A [`Value`] binds a leaf to one scalar (bool, u16 or u32) and
//! implements the uniform convention:
//!
//! - `NAME?` replies with the current value
//! - `NAME <literal>` stores a new value
//!
//! The scalar lives in an atomic cell, behind a getter/setter function
//! pair, or behind a [`Port`] object (e.g. a GPIO line).

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use super::node::Handler;
use super::reply::Reply;
use super::scan::{has_prefix_ignore_case, scan_unsigned, skip_spaces};
use crate::error::ErrorKind;

/// Scalar types a [`Value`] can be bound to.
pub trait Scalar: Copy + 'static {
    /// Atomic storage cell for direct binding.
    type Cell: Sync;

    fn load(cell: &Self::Cell) -> Self;
    fn store(cell: &Self::Cell, value: Self);

    /// Parse a literal. Returns the value and the bytes consumed.
    fn scan(input: &[u8]) -> Result<(Self, usize), ErrorKind>;

    /// Append the value to the reply.
    fn format(self, out: &mut Reply<'_>) -> Result<(), ErrorKind>;
}

impl Scalar for bool {
    type Cell = AtomicBool;

    fn load(cell: &AtomicBool) -> bool {
        cell.load(Ordering::Acquire)
    }

    fn store(cell: &AtomicBool, value: bool) {
        cell.store(value, Ordering::Release);
    }

    /// `0`, `1`, `ON` or `OFF` after optional spaces.
    fn scan(input: &[u8]) -> Result<(bool, usize), ErrorKind> {
        let skip = skip_spaces(input);
        let rest = &input[skip..];

        match rest.first() {
            Some(b'1') => return Ok((true, skip + 1)),
            Some(b'0') => return Ok((false, skip + 1)),
            _ => {}
        }
        if has_prefix_ignore_case(rest, "ON") {
            return Ok((true, skip + 2));
        }
        if has_prefix_ignore_case(rest, "OFF") {
            return Ok((false, skip + 3));
        }
        Err(ErrorKind::Param)
    }

    fn format(self, out: &mut Reply<'_>) -> Result<(), ErrorKind> {
        out.put(if self { b"1" } else { b"0" })
    }
}

impl Scalar for u16 {
    type Cell = AtomicU16;

    fn load(cell: &AtomicU16) -> u16 {
        cell.load(Ordering::Acquire)
    }

    fn store(cell: &AtomicU16, value: u16) {
        cell.store(value, Ordering::Release);
    }

    fn scan(input: &[u8]) -> Result<(u16, usize), ErrorKind> {
        let (value, used) = scan_unsigned(input)?;
        let value = u16::try_from(value).map_err(|_| ErrorKind::Param)?;
        Ok((value, used))
    }

    fn format(self, out: &mut Reply<'_>) -> Result<(), ErrorKind> {
        crate::reply!(out, "{}", self)
    }
}

impl Scalar for u32 {
    type Cell = AtomicU32;

    fn load(cell: &AtomicU32) -> u32 {
        cell.load(Ordering::Acquire)
    }

    fn store(cell: &AtomicU32, value: u32) {
        cell.store(value, Ordering::Release);
    }

    fn scan(input: &[u8]) -> Result<(u32, usize), ErrorKind> {
        scan_unsigned(input)
    }

    fn format(self, out: &mut Reply<'_>) -> Result<(), ErrorKind> {
        crate::reply!(out, "{}", self)
    }
}

/// Accessor object for values that live outside plain memory.
pub trait Port<T>: Sync {
    fn get(&self) -> T;
    fn set(&self, value: T);
}

/// Where a [`Value`] reads and writes its scalar.
pub enum Binding<'a, T: Scalar> {
    /// Direct atomic storage cell.
    Cell(&'a T::Cell),
    /// Getter/setter function pair.
    Accessor { get: fn() -> T, set: fn(T) },
    /// Accessor object.
    Port(&'a dyn Port<T>),
}

/// Which directions a [`Value`] accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    /// Only `NAME?`; anything else is an unknown command.
    ReadOnly,
    /// Only assignments; a query is a bad parameter.
    WriteOnly,
}

/// Value leaf handler.
pub struct Value<'a, T: Scalar> {
    binding: Binding<'a, T>,
    access: Access,
}

/// Boolean value leaf.
pub type BoolValue<'a> = Value<'a, bool>;
/// 16-bit value leaf.
pub type U16Value<'a> = Value<'a, u16>;
/// 32-bit value leaf.
pub type U32Value<'a> = Value<'a, u32>;

impl<'a, T: Scalar> Value<'a, T> {
    /// Bind to an atomic cell.
    pub const fn cell(cell: &'a T::Cell) -> Self {
        Self {
            binding: Binding::Cell(cell),
            access: Access::ReadWrite,
        }
    }

    /// Bind to a getter/setter pair.
    pub const fn accessor(get: fn() -> T, set: fn(T)) -> Self {
        Self {
            binding: Binding::Accessor { get, set },
            access: Access::ReadWrite,
        }
    }

    /// Bind to an accessor object.
    pub const fn port(port: &'a dyn Port<T>) -> Self {
        Self {
            binding: Binding::Port(port),
            access: Access::ReadWrite,
        }
    }

    pub const fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    pub const fn write_only(mut self) -> Self {
        self.access = Access::WriteOnly;
        self
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// Current value.
    pub fn get(&self) -> T {
        match &self.binding {
            Binding::Cell(cell) => T::load(cell),
            Binding::Accessor { get, .. } => get(),
            Binding::Port(port) => port.get(),
        }
    }

    /// Store a new value.
    pub fn set(&self, value: T) {
        match &self.binding {
            Binding::Cell(cell) => T::store(cell, value),
            Binding::Accessor { set, .. } => set(value),
            Binding::Port(port) => port.set(value),
        }
    }

    fn read(&self, input: &[u8], out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
        if input != b"?" {
            return Err(ErrorKind::Command);
        }
        self.get().format(out)?;
        Ok(input.len())
    }

    fn write(&self, input: &[u8]) -> Result<usize, ErrorKind> {
        let (value, used) = T::scan(input)?;
        self.set(value);
        Ok(used)
    }
}

impl<'a, T: Scalar> Handler for Value<'a, T> {
    fn handle(&self, input: &[u8], out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
        match self.access {
            Access::ReadOnly => self.read(input, out),
            Access::WriteOnly => self.write(input),
            Access::ReadWrite => match input.first() {
                None => Err(ErrorKind::Command),
                Some(b'?') => self.read(input, out),
                Some(_) => self.write(input),
            },
        }
    }
}
