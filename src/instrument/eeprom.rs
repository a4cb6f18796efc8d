//! `:SYSTem:PERiph:EEPRom` page access.
//!
//! ```text
//! WR ADDR B0 [B1 ..]   write bytes, never across a page boundary
//! RD ADDR?             dump one page as "HH HH .. "
//! ```

use heapless::Vec;

use crate::config::eeprom::{ADDR_END, PAGE_SIZE};
use crate::error::ErrorKind;
use crate::hal::PageStore;
use crate::scpi::scan::{scan_unsigned, try_scan_unsigned};
use crate::scpi::{Handler, Reply};

fn scan_address(input: &[u8]) -> Result<(u16, usize), ErrorKind> {
    let (addr, used) = scan_unsigned(input)?;
    if addr >= ADDR_END {
        return Err(ErrorKind::Param);
    }
    let addr = u16::try_from(addr).map_err(|_| ErrorKind::Param)?;
    Ok((addr, used))
}

/// `WR` handler.
pub struct EepromWrite<'a>(pub &'a dyn PageStore);

impl Handler for EepromWrite<'_> {
    fn handle(&self, input: &[u8], _out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
        let (addr, mut used) = scan_address(input)?;
        let mut data: Vec<u8, PAGE_SIZE> = Vec::new();

        while let Some((value, n)) = try_scan_unsigned(&input[used..])? {
            let byte = u8::try_from(value).map_err(|_| ErrorKind::Param)?;
            if !data.is_empty() && (addr as usize + data.len()) % PAGE_SIZE == 0 {
                return Err(ErrorKind::Param);
            }
            data.push(byte).map_err(|_| ErrorKind::Internal)?;
            used += n;
        }

        if data.is_empty() {
            return Err(ErrorKind::Param);
        }
        self.0.write(addr, &data)?;
        Ok(used)
    }
}

/// `RD` handler.
pub struct EepromRead<'a>(pub &'a dyn PageStore);

impl Handler for EepromRead<'_> {
    fn handle(&self, input: &[u8], out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
        let (addr, used) = scan_address(input)?;
        if addr as usize % PAGE_SIZE != 0 {
            return Err(ErrorKind::Param);
        }
        if &input[used..] != b"?" {
            return Err(ErrorKind::Command);
        }

        let mut page = [0u8; PAGE_SIZE];
        self.0.read(addr, &mut page)?;
        for byte in page {
            crate::reply!(out, "{:02X} ", byte)?;
        }
        Ok(input.len())
    }
}
