//! Fault types.
//!
//! [`Fault`] is what handlers and memory primitives return. A bus error is an
//! architectural event: the execution loop turns it into the vector-2
//! exception and carries on. An [`Error`] is an encoding or table state the
//! interpreter cannot handle at all and goes back to the host.

use std::fmt;

use thiserror::Error;

use crate::addressing::EaAccess;
use crate::bus::FunctionCode;

/// Translation table level, for fault reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLevel {
    Root,
    A,
    B,
    C,
}

impl fmt::Display for TableLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Root => "root pointer",
            Self::A => "level A",
            Self::B => "level B",
            Self::C => "level C",
        })
    }
}

/// Fatal interpreter faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("unsupported EA mode {mode} reg {reg} for {access} at PC {pc:#010x}")]
    UnsupportedEa {
        access: EaAccess,
        mode: u8,
        reg: u8,
        pc: u32,
    },

    #[error("PMMU: {level} descriptor tag {tag} cannot translate {address:#010x} at PC {pc:#010x}")]
    Translation {
        level: TableLevel,
        tag: u8,
        address: u32,
        pc: u32,
    },

    #[error("PMOVE to unknown MMU register {reg} at PC {pc:#010x}")]
    UnknownMmuRegister { reg: u8, pc: u32 },
}

/// A bus cycle that ended without DTACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusFault {
    /// Logical address of the failed access.
    pub address: u32,
    pub write: bool,
    pub fc: FunctionCode,
    /// True when the access was an opcode or extension-word fetch.
    pub instruction: bool,
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bus error {} {:#010x} (fc {})",
            if self.write { "writing" } else { "reading" },
            self.address,
            self.fc.bits()
        )
    }
}

impl BusFault {
    pub const RECORD_LEN: usize = 8;

    /// Fixed-size encoding stored in save states.
    #[must_use]
    pub fn to_record(&self) -> [u8; Self::RECORD_LEN] {
        let mut record = [0; Self::RECORD_LEN];
        record[..4].copy_from_slice(&self.address.to_be_bytes());
        record[4] = u8::from(self.write);
        record[5] = self.fc.bits();
        record[6] = u8::from(self.instruction);
        record
    }

    /// Decode a saved record. Returns `None` for an invalid function code.
    #[must_use]
    pub fn from_record(record: &[u8; Self::RECORD_LEN]) -> Option<Self> {
        Some(Self {
            address: u32::from_be_bytes([record[0], record[1], record[2], record[3]]),
            write: record[4] != 0,
            fc: FunctionCode::from_bits(record[5])?,
            instruction: record[6] != 0,
        })
    }
}

/// Why an instruction did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("{0}")]
    Bus(BusFault),
    #[error(transparent)]
    Fatal(#[from] Error),
}
