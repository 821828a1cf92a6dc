//! CPU model definitions and their configuration blocks.
//!
//! Only the 68000 block is verified against hardware. The other models carry
//! their address widths, SR masks and cost tables so hosts can select them,
//! but their instruction timing is approximate and selecting one logs a
//! warning.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Selected Motorola 68k CPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuModel {
    /// Motorola MC68000.
    M68000,
    /// Motorola MC68010.
    M68010,
    /// MC68EC020 (24-bit address bus).
    M68EC020,
    /// Motorola MC68020.
    M68020,
    /// MC68EC030 (no PMMU).
    M68EC030,
    /// Motorola MC68030.
    M68030,
    /// MC68EC040 (no PMMU, no FPU).
    M68EC040,
    /// MC68LC040 (PMMU, no FPU).
    M68LC040,
    /// Motorola MC68040.
    M68040,
    /// Philips SCC68070: 68010 core with a 32-bit address bus.
    Scc68070,
}

/// Capability flags for a specific CPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCapabilities {
    /// `MOVEC` instruction family is available.
    pub movec: bool,
    /// Vector Base Register (`VBR`) is present.
    pub vbr: bool,
    /// Cache control registers (`CACR`/`CAAR`) are present.
    pub cacr: bool,
    /// The M flag and master stack pointer exist.
    pub master_stack: bool,
    /// Index scale factors in brief extension words are honoured.
    pub scaled_index: bool,
    /// A paged MMU answers the coprocessor line.
    pub pmmu: bool,
}

/// Which per-opcode cycle table and exception-cost table a model uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuFamily {
    M68000,
    M68010,
    M68020,
    M68030,
    M68040,
}

impl CpuFamily {
    pub const COUNT: usize = 5;

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Signed cycle corrections that instruction handlers apply on top of the
/// base table cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingAdjust {
    pub bcc_not_taken_byte: i8,
    pub bcc_not_taken_word: i8,
    pub dbcc_false_not_expired: i8,
    pub dbcc_false_expired: i8,
    pub scc_register_true: i8,
    pub movem_word: u8,
    pub movem_long: u8,
    pub shift: u8,
}

/// Everything `set_cpu_type` swaps in at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    pub model: CpuModel,
    pub address_mask: u32,
    pub sr_mask: u16,
    pub family: CpuFamily,
    pub exception_cycles: &'static [u8; 256],
    pub timing: TimingAdjust,
    /// Cost of the RESET instruction, for the handler that implements it.
    pub reset_cycles: i32,
    pub has_pmmu: bool,
}

impl ModelConfig {
    #[must_use]
    pub const fn exception_cost(&self, vector: u8) -> u8 {
        self.exception_cycles[vector as usize]
    }
}

// === Exception costs ===
//
// Vectors 0-63 per family; 64-255 (user vectors) always cost 4.

const USER_VECTOR_CYCLES: u8 = 4;

#[rustfmt::skip]
const M68000_EXCEPTIONS: [u8; 64] = [
    40,  4, 50, 50, 34, 38, 40, 34,   // reset SP/PC, bus, address, illegal, div0, CHK, TRAPV
    34, 34, 34, 34,  4,  4,  4, 44,   // privilege, trace, line A/F, -, -, format, uninitialised
     4,  4,  4,  4,  4,  4,  4,  4,   // reserved
    44, 44, 44, 44, 44, 44, 44, 44,   // spurious, autovectors 1-7
    34, 34, 34, 34, 34, 34, 34, 34,   // TRAP #0-15
    34, 34, 34, 34, 34, 34, 34, 34,
     4,  4,  4,  4,  4,  4,  4,  4,   // FP, MMU, reserved
     4,  4,  4,  4,  4,  4,  4,  4,
];

#[rustfmt::skip]
const M68010_EXCEPTIONS: [u8; 64] = [
    40,  4,126,126, 38, 44, 44, 34,
    38, 38,  4,  4,  4,  4,  4, 44,
     4,  4,  4,  4,  4,  4,  4,  4,
    46, 46, 46, 46, 46, 46, 46, 46,
    38, 38, 38, 38, 38, 38, 38, 38,
    38, 38, 38, 38, 38, 38, 38, 38,
     4,  4,  4,  4,  4,  4,  4,  4,
     4,  4,  4,  4,  4,  4,  4,  4,
];

// 030 and 040 have never been measured separately and reuse the 020 costs.
#[rustfmt::skip]
const M68020_EXCEPTIONS: [u8; 64] = [
     4,  4, 50, 50, 20, 38, 40, 20,
    34, 25, 20, 20,  4,  4,  4, 30,
     4,  4,  4,  4,  4,  4,  4,  4,
    30, 30, 30, 30, 30, 30, 30, 30,
    20, 20, 20, 20, 20, 20, 20, 20,
    20, 20, 20, 20, 20, 20, 20, 20,
     4,  4,  4,  4,  4,  4,  4,  4,
     4,  4,  4,  4,  4,  4,  4,  4,
];

const fn expand(head: [u8; 64]) -> [u8; 256] {
    let mut table = [USER_VECTOR_CYCLES; 256];
    let mut i = 0;
    while i < head.len() {
        table[i] = head[i];
        i += 1;
    }
    table
}

/// Exception costs, one table per [`CpuFamily`].
pub static EXCEPTION_CYCLES: [[u8; 256]; CpuFamily::COUNT] = [
    expand(M68000_EXCEPTIONS),
    expand(M68010_EXCEPTIONS),
    expand(M68020_EXCEPTIONS),
    expand(M68020_EXCEPTIONS),
    expand(M68020_EXCEPTIONS),
];

const M68000_TIMING: TimingAdjust = TimingAdjust {
    bcc_not_taken_byte: -2,
    bcc_not_taken_word: 2,
    dbcc_false_not_expired: -2,
    dbcc_false_expired: 2,
    scc_register_true: 2,
    movem_word: 2,
    movem_long: 3,
    shift: 1,
};

const M68010_TIMING: TimingAdjust = TimingAdjust {
    bcc_not_taken_byte: -4,
    bcc_not_taken_word: 0,
    dbcc_false_not_expired: 0,
    dbcc_false_expired: 6,
    scc_register_true: 0,
    movem_word: 2,
    movem_long: 3,
    shift: 1,
};

const M68020_TIMING: TimingAdjust = TimingAdjust {
    bcc_not_taken_byte: -2,
    bcc_not_taken_word: 0,
    dbcc_false_not_expired: 0,
    dbcc_false_expired: 4,
    scc_register_true: 0,
    movem_word: 2,
    movem_long: 2,
    shift: 0,
};

impl CpuModel {
    pub const ALL: [Self; 10] = [
        Self::M68000,
        Self::M68010,
        Self::M68EC020,
        Self::M68020,
        Self::M68EC030,
        Self::M68030,
        Self::M68EC040,
        Self::M68LC040,
        Self::M68040,
        Self::Scc68070,
    ];

    /// Static capability set for this CPU model.
    #[must_use]
    pub const fn capabilities(self) -> CpuCapabilities {
        let family = self.family();
        let is_000 = matches!(family, CpuFamily::M68000);
        let is_020_up = matches!(
            family,
            CpuFamily::M68020 | CpuFamily::M68030 | CpuFamily::M68040
        );
        CpuCapabilities {
            movec: !is_000,
            vbr: !is_000,
            cacr: is_020_up,
            master_stack: is_020_up,
            scaled_index: is_020_up,
            pmmu: matches!(self, Self::M68030 | Self::M68LC040 | Self::M68040),
        }
    }

    #[must_use]
    pub const fn family(self) -> CpuFamily {
        match self {
            Self::M68000 => CpuFamily::M68000,
            Self::M68010 | Self::Scc68070 => CpuFamily::M68010,
            Self::M68EC020 | Self::M68020 => CpuFamily::M68020,
            Self::M68EC030 | Self::M68030 => CpuFamily::M68030,
            Self::M68EC040 | Self::M68LC040 | Self::M68040 => CpuFamily::M68040,
        }
    }

    /// Only the 68000 timing and exception model is exact.
    #[must_use]
    pub const fn is_fully_supported(self) -> bool {
        matches!(self, Self::M68000)
    }

    /// Numeric tag used by the `CPU_TYPE` register and save states.
    #[must_use]
    pub const fn tag(self) -> u32 {
        match self {
            Self::M68000 => 1,
            Self::M68010 => 2,
            Self::M68EC020 => 3,
            Self::M68020 => 4,
            Self::M68EC030 => 5,
            Self::M68030 => 6,
            Self::M68EC040 => 7,
            Self::M68LC040 => 8,
            Self::M68040 => 9,
            Self::Scc68070 => 10,
        }
    }

    #[must_use]
    pub const fn from_tag(tag: u32) -> Option<Self> {
        Some(match tag {
            1 => Self::M68000,
            2 => Self::M68010,
            3 => Self::M68EC020,
            4 => Self::M68020,
            5 => Self::M68EC030,
            6 => Self::M68030,
            7 => Self::M68EC040,
            8 => Self::M68LC040,
            9 => Self::M68040,
            10 => Self::Scc68070,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::M68000 => "68000",
            Self::M68010 => "68010",
            Self::M68EC020 => "68EC020",
            Self::M68020 => "68020",
            Self::M68EC030 => "68EC030",
            Self::M68030 => "68030",
            Self::M68EC040 => "68EC040",
            Self::M68LC040 => "68LC040",
            Self::M68040 => "68040",
            Self::Scc68070 => "SCC68070",
        }
    }

    /// The configuration block for this model.
    #[must_use]
    pub fn config(self) -> ModelConfig {
        let family = self.family();
        let (address_mask, sr_mask, timing, reset_cycles) = match self {
            Self::M68000 => (0x00ff_ffff, 0xa71f, M68000_TIMING, 132),
            Self::M68010 => (0x00ff_ffff, 0xa71f, M68010_TIMING, 130),
            Self::Scc68070 => (0xffff_ffff, 0xa71f, M68010_TIMING, 130),
            Self::M68EC020 => (0x00ff_ffff, 0xf71f, M68020_TIMING, 518),
            _ => (0xffff_ffff, 0xf71f, M68020_TIMING, 518),
        };
        ModelConfig {
            model: self,
            address_mask,
            sr_mask,
            family,
            exception_cycles: &EXCEPTION_CYCLES[family.index()],
            timing,
            reset_cycles,
            has_pmmu: self.capabilities().pmmu,
        }
    }
}

impl fmt::Display for CpuModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown CPU model \"{0}\"")]
pub struct UnknownModel(pub String);

impl FromStr for CpuModel {
    type Err = UnknownModel;

    /// Accepts names like `68000`, `mc68020`, `68ec030` or `scc68070`,
    /// ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("mc").unwrap_or(&lower);
        Self::ALL
            .into_iter()
            .find(|model| model.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}
