//! Identification queries: `*IDN?` and `:SYSTem:VERSion?`.

use core::fmt::Write;

use heapless::String;

use crate::config::{Identity, BUILD_STRING};
use crate::error::ErrorKind;
use crate::scpi::{Handler, Reply};

/// `VENDOR,FAMILY,` + 16 hex digits + `,MAJ.MIN` fits with room to spare.
pub const IDN_CAPACITY: usize = 96;

/// Serial number text derived from the 96-bit unique device id.
pub fn serial_number(uid: [u32; 3]) -> String<16> {
    let mut sn = String::new();
    // 16 hex digits always fit
    let _ = write!(sn, "{:08X}{:08X}", uid[0].wrapping_add(uid[2]), uid[1]);
    sn
}

/// `*IDN?` handler. The reply is rendered once at construction.
pub struct Identify {
    text: String<IDN_CAPACITY>,
}

impl Identify {
    pub fn new(identity: &Identity, uid: [u32; 3]) -> Result<Self, ErrorKind> {
        let mut text = String::new();
        write!(
            text,
            "{},{},{},{}.{}",
            identity.vendor,
            identity.family,
            serial_number(uid),
            identity.version_major,
            identity.version_minor
        )
        .map_err(|_| ErrorKind::Internal)?;
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Handler for Identify {
    fn handle(&self, input: &[u8], out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
        if input != b"?" {
            return Err(ErrorKind::Command);
        }
        out.put(self.text.as_bytes())?;
        Ok(input.len())
    }
}

/// `:SYSTem:VERSion?` handler: `FAMILY v.MAJ.MIN r.REV [build]`.
pub struct Version<'a>(pub &'a Identity);

impl Handler for Version<'_> {
    fn handle(&self, input: &[u8], out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
        if input != b"?" {
            return Err(ErrorKind::Command);
        }
        let id = self.0;
        crate::reply!(
            out,
            "{} v.{}.{} r.{} [{}]",
            id.family,
            id.version_major,
            id.version_minor,
            id.revision,
            BUILD_STRING
        )?;
        Ok(input.len())
    }
}

/// `:TEST:ECHO` replies with everything that follows it.
pub fn echo(input: &[u8], out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
    out.put(input)?;
    Ok(input.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IDENTITY;

    #[test]
    fn test_serial_number() {
        assert_eq!(
            serial_number([0x1000_0001, 0xCAFE_F00D, 0x0000_0002]).as_str(),
            "10000003CAFEF00D"
        );
        assert_eq!(serial_number([u32::MAX, 0, 1]).as_str(), "0000000000000000");
    }

    #[test]
    fn test_idn_text() {
        let idn = Identify::new(&IDENTITY, [1, 2, 3]).unwrap();
        assert_eq!(idn.as_str(), "TeraSense,SmartVision,0000000400000002,0.1");
    }

    #[test]
    fn test_idn_requires_query() {
        let idn = Identify::new(&IDENTITY, [0; 3]).unwrap();
        let mut buf = [0u8; 64];
        let mut out = Reply::new(&mut buf);

        assert_eq!(idn.handle(b"", &mut out), Err(ErrorKind::Command));
        assert_eq!(idn.handle(b"??", &mut out), Err(ErrorKind::Command));
        assert!(out.is_empty());
    }
}
