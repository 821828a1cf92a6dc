//! Effective-address field decoding.
//!
//! An instruction's 6-bit EA field is `mode << 3 | reg`. Mode 7 uses the
//! register field to pick one of the PC-relative, absolute or immediate
//! forms.

use std::fmt;

/// Addressing mode named by an EA field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// Data register direct: Dn
    DataReg(u8),
    /// Address register direct: An
    AddrReg(u8),
    /// Address register indirect: (An)
    AddrInd(u8),
    /// Address register indirect with postincrement: (An)+
    AddrIndPostInc(u8),
    /// Address register indirect with predecrement: -(An)
    AddrIndPreDec(u8),
    /// Address register indirect with displacement: d16(An)
    AddrIndDisp(u8),
    /// Address register indirect with index: d8(An,Xn)
    AddrIndIndex(u8),
    /// Absolute short: (xxx).W
    AbsShort,
    /// Absolute long: (xxx).L
    AbsLong,
    /// Program counter with displacement: d16(PC)
    PcDisp,
    /// Program counter with index: d8(PC,Xn)
    PcIndex,
    /// Immediate: #<data>
    Immediate,
}

impl AddrMode {
    /// Decode addressing mode from mode/register fields.
    #[must_use]
    pub const fn decode(mode: u8, reg: u8) -> Option<Self> {
        let reg = reg & 0x07;
        match mode & 0x07 {
            0 => Some(Self::DataReg(reg)),
            1 => Some(Self::AddrReg(reg)),
            2 => Some(Self::AddrInd(reg)),
            3 => Some(Self::AddrIndPostInc(reg)),
            4 => Some(Self::AddrIndPreDec(reg)),
            5 => Some(Self::AddrIndDisp(reg)),
            6 => Some(Self::AddrIndIndex(reg)),
            _ => match reg {
                0 => Some(Self::AbsShort),
                1 => Some(Self::AbsLong),
                2 => Some(Self::PcDisp),
                3 => Some(Self::PcIndex),
                4 => Some(Self::Immediate),
                _ => None,
            },
        }
    }

    /// Decode the low six bits of an opcode.
    #[must_use]
    pub const fn from_ea(ea: u16) -> Option<Self> {
        Self::decode(((ea >> 3) & 7) as u8, (ea & 7) as u8)
    }

    /// The `(mode, reg)` fields this mode encodes to.
    #[must_use]
    pub const fn fields(self) -> (u8, u8) {
        match self {
            Self::DataReg(r) => (0, r),
            Self::AddrReg(r) => (1, r),
            Self::AddrInd(r) => (2, r),
            Self::AddrIndPostInc(r) => (3, r),
            Self::AddrIndPreDec(r) => (4, r),
            Self::AddrIndDisp(r) => (5, r),
            Self::AddrIndIndex(r) => (6, r),
            Self::AbsShort => (7, 0),
            Self::AbsLong => (7, 1),
            Self::PcDisp => (7, 2),
            Self::PcIndex => (7, 3),
            Self::Immediate => (7, 4),
        }
    }
}

/// A sized EA access, as named in unsupported-encoding faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EaAccess {
    Read32,
    Read64,
    Write32,
    Write64,
}

impl EaAccess {
    /// Whether the resolver implements `mode` for this access.
    ///
    /// | access   | modes                                   |
    /// |----------|-----------------------------------------|
    /// | read 32  | Dn (An) (An)+ d16(An) d8(An,Xn) abs.W abs.L d16(PC) #imm |
    /// | read 64  | (An) (An)+ d16(An) d16(PC) #imm          |
    /// | write 32 | Dn An (An) (An)+ -(An) d16(An) d8(An,Xn) abs.L d16(PC) |
    /// | write 64 | (An) -(An) d16(An)                       |
    #[must_use]
    pub const fn supports(self, mode: AddrMode) -> bool {
        use AddrMode::{
            AbsLong, AbsShort, AddrInd, AddrIndDisp, AddrIndIndex, AddrIndPostInc, AddrIndPreDec,
            AddrReg, DataReg, Immediate, PcDisp,
        };
        match self {
            Self::Read32 => matches!(
                mode,
                DataReg(_)
                    | AddrInd(_)
                    | AddrIndPostInc(_)
                    | AddrIndDisp(_)
                    | AddrIndIndex(_)
                    | AbsShort
                    | AbsLong
                    | PcDisp
                    | Immediate
            ),
            Self::Read64 => matches!(
                mode,
                AddrInd(_) | AddrIndPostInc(_) | AddrIndDisp(_) | PcDisp | Immediate
            ),
            Self::Write32 => matches!(
                mode,
                DataReg(_)
                    | AddrReg(_)
                    | AddrInd(_)
                    | AddrIndPostInc(_)
                    | AddrIndPreDec(_)
                    | AddrIndDisp(_)
                    | AddrIndIndex(_)
                    | AbsLong
                    | PcDisp
            ),
            Self::Write64 => matches!(mode, AddrInd(_) | AddrIndPreDec(_) | AddrIndDisp(_)),
        }
    }
}

impl fmt::Display for EaAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read32 => "32-bit read",
            Self::Read64 => "64-bit read",
            Self::Write32 => "32-bit write",
            Self::Write64 => "64-bit write",
        })
    }
}
