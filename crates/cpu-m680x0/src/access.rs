//! Named register access for hosts and debuggers.
//!
//! Register numbers follow the order of [`Register::ALL`]; the raw-number
//! entry points let a generic front end walk the list without knowing the
//! enum.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::cpu::Cpu;
use crate::model::CpuModel;
use crate::registers::StackPointer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    D0,
    D1,
    D2,
    D3,
    D4,
    D5,
    D6,
    D7,
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    Pc,
    Sr,
    /// The live stack pointer, whichever it is.
    Sp,
    Usp,
    Isp,
    Msp,
    Sfc,
    Dfc,
    Vbr,
    Cacr,
    Caar,
    PrefAddr,
    PrefData,
    Ppc,
    Ir,
    CpuType,
}

impl Register {
    pub const ALL: [Self; 32] = [
        Self::D0,
        Self::D1,
        Self::D2,
        Self::D3,
        Self::D4,
        Self::D5,
        Self::D6,
        Self::D7,
        Self::A0,
        Self::A1,
        Self::A2,
        Self::A3,
        Self::A4,
        Self::A5,
        Self::A6,
        Self::A7,
        Self::Pc,
        Self::Sr,
        Self::Sp,
        Self::Usp,
        Self::Isp,
        Self::Msp,
        Self::Sfc,
        Self::Dfc,
        Self::Vbr,
        Self::Cacr,
        Self::Caar,
        Self::PrefAddr,
        Self::PrefData,
        Self::Ppc,
        Self::Ir,
        Self::CpuType,
    ];

    #[must_use]
    pub fn from_index(index: u32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    #[must_use]
    pub const fn index(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::D0 => "d0",
            Self::D1 => "d1",
            Self::D2 => "d2",
            Self::D3 => "d3",
            Self::D4 => "d4",
            Self::D5 => "d5",
            Self::D6 => "d6",
            Self::D7 => "d7",
            Self::A0 => "a0",
            Self::A1 => "a1",
            Self::A2 => "a2",
            Self::A3 => "a3",
            Self::A4 => "a4",
            Self::A5 => "a5",
            Self::A6 => "a6",
            Self::A7 => "a7",
            Self::Pc => "pc",
            Self::Sr => "sr",
            Self::Sp => "sp",
            Self::Usp => "usp",
            Self::Isp => "isp",
            Self::Msp => "msp",
            Self::Sfc => "sfc",
            Self::Dfc => "dfc",
            Self::Vbr => "vbr",
            Self::Cacr => "cacr",
            Self::Caar => "caar",
            Self::PrefAddr => "pref_addr",
            Self::PrefData => "pref_data",
            Self::Ppc => "ppc",
            Self::Ir => "ir",
            Self::CpuType => "cpu_type",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown register \"{0}\"")]
pub struct UnknownRegister(pub String);

impl FromStr for Register {
    type Err = UnknownRegister;

    /// Case-insensitive register name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRegister(s.to_string()))
    }
}

impl Register {
    /// Parse a register name, `None` if unknown.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

impl Cpu {
    #[must_use]
    pub fn register(&self, reg: Register) -> u32 {
        let regs = &self.ctx.regs;
        let live = self.live_stack();
        match reg {
            Register::D0
            | Register::D1
            | Register::D2
            | Register::D3
            | Register::D4
            | Register::D5
            | Register::D6
            | Register::D7 => regs.d[reg.index() as usize],
            Register::A0
            | Register::A1
            | Register::A2
            | Register::A3
            | Register::A4
            | Register::A5
            | Register::A6
            | Register::A7 => regs.a[reg.index() as usize - 8],
            Register::Pc => regs.pc,
            Register::Sr => u32::from(self.sr()),
            Register::Sp => regs.a[7],
            Register::Usp => regs.stack_pointer(StackPointer::User, live),
            Register::Isp => regs.stack_pointer(StackPointer::Interrupt, live),
            Register::Msp => regs.stack_pointer(StackPointer::Master, live),
            Register::Sfc => regs.sfc,
            Register::Dfc => regs.dfc,
            Register::Vbr => regs.vbr,
            Register::Cacr => regs.cacr,
            Register::Caar => regs.caar,
            Register::PrefAddr => regs.pref_addr,
            Register::PrefData => regs.pref_data,
            Register::Ppc => regs.ppc,
            Register::Ir => u32::from(regs.ir),
            Register::CpuType => self.model().tag(),
        }
    }

    /// Write a register. Unknown `CPU_TYPE` tags are ignored.
    pub fn set_register(&mut self, reg: Register, value: u32) {
        let live = self.live_stack();
        let regs = &mut self.ctx.regs;
        match reg {
            Register::D0
            | Register::D1
            | Register::D2
            | Register::D3
            | Register::D4
            | Register::D5
            | Register::D6
            | Register::D7 => regs.d[reg.index() as usize] = value,
            Register::A0
            | Register::A1
            | Register::A2
            | Register::A3
            | Register::A4
            | Register::A5
            | Register::A6
            | Register::A7 => regs.a[reg.index() as usize - 8] = value,
            Register::Pc => self.jump(value),
            Register::Sr => self.set_sr(value as u16),
            Register::Sp => regs.a[7] = value,
            Register::Usp => regs.set_stack_pointer(StackPointer::User, live, value),
            Register::Isp => regs.set_stack_pointer(StackPointer::Interrupt, live, value),
            Register::Msp => regs.set_stack_pointer(StackPointer::Master, live, value),
            Register::Sfc => regs.sfc = value & 7,
            Register::Dfc => regs.dfc = value & 7,
            Register::Vbr => regs.vbr = value,
            Register::Cacr => regs.cacr = value,
            Register::Caar => regs.caar = value,
            Register::PrefAddr => regs.pref_addr = value,
            Register::PrefData => regs.pref_data = value,
            Register::Ppc => regs.ppc = value,
            Register::Ir => regs.ir = value as u16,
            Register::CpuType => {
                if let Some(model) = CpuModel::from_tag(value) {
                    self.set_cpu_type(model);
                }
            }
        }
    }

    /// Read by register number; unknown numbers read as 0.
    #[must_use]
    pub fn register_raw(&self, index: u32) -> u32 {
        Register::from_index(index).map_or(0, |reg| self.register(reg))
    }

    /// Write by register number; unknown numbers are ignored.
    pub fn set_register_raw(&mut self, index: u32, value: u32) {
        if let Some(reg) = Register::from_index(index) {
            self.set_register(reg, value);
        }
    }
}
