//! Status register in fast-test form.
//!
//! Instruction handlers store ALU results into the flag slots without
//! normalising them, and the flag is read back by testing one fixed bit:
//!
//! | flag | slot value when set |
//! |------|---------------------|
//! | X, C | bit 8 (`0x100`)     |
//! | N, V | bit 7 (`0x80`)      |
//! | Z    | `not_z == 0`        |
//! | T1, T0 | SR bits 15, 14    |
//! | S    | `4`                 |
//! | M    | `2`                 |
//! | I2-I0 | SR bits 10-8       |

pub const XFLAG_SET: u32 = 0x100;
pub const NFLAG_SET: u32 = 0x80;
pub const VFLAG_SET: u32 = 0x80;
pub const CFLAG_SET: u32 = 0x100;
pub const SFLAG_SET: u32 = 4;
pub const MFLAG_SET: u32 = 2;

// === Architectural SR bits ===

pub const SR_T1: u16 = 0x8000;
pub const SR_T0: u16 = 0x4000;
pub const SR_S: u16 = 0x2000;
pub const SR_M: u16 = 0x1000;
pub const SR_INT_MASK: u16 = 0x0700;
pub const SR_X: u16 = 0x0010;
pub const SR_N: u16 = 0x0008;
pub const SR_Z: u16 = 0x0004;
pub const SR_V: u16 = 0x0002;
pub const SR_C: u16 = 0x0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub t1: u32,
    pub t0: u32,
    pub s: u32,
    pub m: u32,
    pub int_mask: u32,
    pub x: u32,
    pub n: u32,
    pub not_z: u32,
    pub v: u32,
    pub c: u32,
}

impl Flags {
    /// Pack into the architectural status register.
    #[must_use]
    pub const fn pack(&self) -> u16 {
        (self.t1
            | self.t0
            | (self.s << 11)
            | (self.m << 11)
            | self.int_mask
            | ((self.x & XFLAG_SET) >> 4)
            | ((self.n & NFLAG_SET) >> 4)
            | ((self.not_z == 0) as u32) << 2
            | ((self.v & VFLAG_SET) >> 6)
            | ((self.c & CFLAG_SET) >> 8)) as u16
    }

    #[must_use]
    pub const fn ccr(&self) -> u8 {
        self.pack() as u8
    }

    /// Load the condition codes (low five bits of `value`).
    pub fn set_ccr(&mut self, value: u16) {
        let value = u32::from(value);
        self.x = (value & 0x10) << 4;
        self.n = (value & 0x08) << 4;
        self.not_z = u32::from(value & 0x04 == 0);
        self.v = (value & 0x02) << 6;
        self.c = (value & 0x01) << 8;
    }

    /// Load every field from an already-masked SR.
    ///
    /// This only rewrites the flag slots. Callers that can change S or M must
    /// also move the live stack pointer; see `Cpu::set_sr`.
    pub fn unpack(&mut self, sr: u16) {
        let value = u32::from(sr);
        self.t1 = value & u32::from(SR_T1);
        self.t0 = value & u32::from(SR_T0);
        self.s = (value >> 11) & SFLAG_SET;
        self.m = (value >> 11) & MFLAG_SET;
        self.int_mask = value & u32::from(SR_INT_MASK);
        self.set_ccr(sr);
    }

    #[must_use]
    pub const fn from_sr(sr: u16) -> Self {
        let value = sr as u32;
        Self {
            t1: value & SR_T1 as u32,
            t0: value & SR_T0 as u32,
            s: (value >> 11) & SFLAG_SET,
            m: (value >> 11) & MFLAG_SET,
            int_mask: value & SR_INT_MASK as u32,
            x: (value & 0x10) << 4,
            n: (value & 0x08) << 4,
            not_z: (value & 0x04 == 0) as u32,
            v: (value & 0x02) << 6,
            c: (value & 0x01) << 8,
        }
    }

    #[must_use]
    pub const fn supervisor(&self) -> bool {
        self.s != 0
    }

    #[must_use]
    pub const fn master(&self) -> bool {
        self.m != 0
    }

    /// Interrupt priority mask as a level (0-7).
    #[must_use]
    pub const fn interrupt_level(&self) -> u8 {
        (self.int_mask >> 8) as u8
    }

    #[must_use]
    pub const fn tracing(&self) -> bool {
        self.t1 != 0
    }
}
