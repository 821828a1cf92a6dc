//! Paged MMU: table-walk translation and the coprocessor command decoder.
//!
//! Translation walks up to three table levels (A, B, C) below a root pointer.
//! The translation control register splits the logical address:
//!
//! ```text
//! TC: E . . . . . SRE . | IS | TIA | TIB | TIC | . . . .
//!     31          25      19-16 15-12 11-8  7-4
//! ```
//!
//! `IS` high bits are ignored, then `TIA`/`TIB`/`TIC` bits index each level.
//! Whatever is left is the page offset. Descriptors are read physically and
//! are never cached, so guest writes to the tables take effect immediately.

use log::{debug, error, trace, warn};

use crate::bus::{FunctionCode, M68kBus};
use crate::cpu::Cpu;
use crate::error::{BusFault, Error, Fault, TableLevel};

/// TC bit 31: translation enabled.
pub const TC_ENABLE: u32 = 0x8000_0000;
/// TC bit 25: supervisor accesses use SRP.
pub const TC_SRE: u32 = 0x0200_0000;

const DESCRIPTOR_INVALID: u32 = 0;
const DESCRIPTOR_PAGE: u32 = 1;
const DESCRIPTOR_SHORT: u32 = 2;
const DESCRIPTOR_LONG: u32 = 3;

/// A 64-bit root pointer register (SRP or CRP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RootPointer {
    /// Upper long: limit and the descriptor type of the level A table.
    pub limit: u32,
    /// Lower long: level A table address.
    pub pointer: u32,
}

impl RootPointer {
    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self {
            limit: (value >> 32) as u32,
            pointer: value as u32,
        }
    }

    #[must_use]
    pub const fn to_u64(self) -> u64 {
        (self.limit as u64) << 32 | self.pointer as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MmuState {
    pub tc: u32,
    pub srp: RootPointer,
    pub crp: RootPointer,
    /// PSR; stored for PMOVE only.
    pub sr: u32,
    pub enabled: bool,
}

const fn table_index(logical: u32, shift: u32, bits: u32) -> u32 {
    if bits == 0 {
        return 0;
    }
    match logical.checked_shl(shift) {
        Some(v) => v >> (32 - bits),
        None => 0,
    }
}

const fn page_offset(logical: u32, shift: u32) -> u32 {
    match logical.checked_shl(shift) {
        Some(v) => v >> shift,
        None => 0,
    }
}

impl MmuState {
    /// Load TC. This is the only way translation gets switched on or off,
    /// apart from reset.
    pub fn set_tc(&mut self, tc: u32) {
        let enable = tc & TC_ENABLE != 0;
        if enable != self.enabled {
            debug!("PMMU {}", if enable { "enabled" } else { "disabled" });
        }
        self.tc = tc;
        self.enabled = enable;
    }

    /// Translate `logical` by walking the tables.
    ///
    /// `read_long` fetches a physical descriptor long. Any state the walk
    /// cannot follow (invalid descriptor, table below level C, bad root
    /// type) is a fatal [`Error::Translation`]; `pc` only labels it.
    pub fn translate<F>(
        &self,
        logical: u32,
        supervisor: bool,
        pc: u32,
        mut read_long: F,
    ) -> Result<u32, Fault>
    where
        F: FnMut(u32) -> Result<u32, Fault>,
    {
        let fail = |level: TableLevel, tag: u32| -> Fault {
            let err = Error::Translation {
                level,
                tag: tag as u8,
                address: logical,
                pc,
            };
            error!("{err}");
            err.into()
        };

        let root = if self.tc & TC_SRE != 0 && supervisor {
            self.srp
        } else {
            self.crp
        };
        let mut descriptor_type = root.limit & 3;
        if descriptor_type != DESCRIPTOR_SHORT && descriptor_type != DESCRIPTOR_LONG {
            return Err(fail(TableLevel::Root, descriptor_type));
        }
        let mut table = root.pointer & !3;
        let mut shift = (self.tc >> 16) & 0xf;

        let levels = [
            (TableLevel::A, (self.tc >> 12) & 0xf),
            (TableLevel::B, (self.tc >> 8) & 0xf),
            (TableLevel::C, (self.tc >> 4) & 0xf),
        ];
        for (level, bits) in levels {
            let index = table_index(logical, shift, bits);
            let (tag, entry) = if descriptor_type == DESCRIPTOR_SHORT {
                let entry = read_long(table.wrapping_add(index * 4))?;
                (entry & 3, entry)
            } else {
                let slot = table.wrapping_add(index * 8);
                let status = read_long(slot)?;
                (status & 3, read_long(slot.wrapping_add(4))?)
            };
            shift += bits;
            trace!("PMMU {level}: index {index} tag {tag} entry {entry:#010x}");

            match tag {
                DESCRIPTOR_PAGE => {
                    let physical = page_offset(logical, shift).wrapping_add(entry & !0xff);
                    trace!("PMMU {logical:#010x} -> {physical:#010x}");
                    return Ok(physical);
                }
                DESCRIPTOR_SHORT | DESCRIPTOR_LONG if level != TableLevel::C => {
                    table = entry & !0xf;
                    descriptor_type = tag;
                }
                _ => return Err(fail(level, tag)),
            }
        }
        // Level C either terminated or failed above.
        Err(fail(TableLevel::C, DESCRIPTOR_INVALID))
    }
}

/// Decoded group-0 coprocessor command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmuCommand {
    Pload,
    Pflush,
    Pflushr,
    Ptest,
    /// PMOVE to or from TC (0), SRP (2) or CRP (3).
    Pmove { register: u8, to_ea: bool },
    /// PMOVE to or from the MMU status register.
    PmoveStatus { to_ea: bool },
    /// PMOVE with an undefined format field.
    UnknownPmove { format: u8 },
}

impl MmuCommand {
    /// Classify a command word. Earlier patterns take precedence.
    #[must_use]
    pub const fn decode(modes: u16) -> Self {
        let to_ea = modes & 0x200 != 0;
        if modes & 0xfde0 == 0x2000 {
            Self::Pload
        } else if modes & 0xe200 == 0x2000 {
            Self::Pflush
        } else if modes == 0xa000 {
            Self::Pflushr
        } else if modes & 0xe000 == 0x8000 {
            Self::Ptest
        } else {
            match (modes >> 13) & 7 {
                0 | 2 => Self::Pmove {
                    register: ((modes >> 10) & 7) as u8,
                    to_ea,
                },
                3 => Self::PmoveStatus { to_ea },
                format => Self::UnknownPmove {
                    format: format as u8,
                },
            }
        }
    }
}

const MMU_TC: u8 = 0;
const MMU_SRP: u8 = 2;
const MMU_CRP: u8 = 3;

impl Cpu {
    /// Translate through the PMMU, charging descriptor wait states to the
    /// timeslice.
    pub(crate) fn translate<B: M68kBus>(&mut self, bus: &mut B, logical: u32) -> Result<u32, Fault> {
        let mmu = self.ctx.mmu;
        let supervisor = self.ctx.flags.supervisor();
        let pc = self.ctx.regs.ppc;
        let mask = self.ctx.config.address_mask;
        let remaining = &mut self.ctx.remaining_cycles;
        mmu.translate(logical, supervisor, pc, |address| {
            let result = bus.read_long(address & mask, FunctionCode::SupervisorData);
            *remaining -= i32::from(result.wait_cycles);
            if result.bus_error {
                return Err(Fault::Bus(BusFault {
                    address,
                    write: false,
                    fc: FunctionCode::SupervisorData,
                    instruction: false,
                }));
            }
            Ok(result.data)
        })
    }

    /// Execute a PMMU coprocessor instruction (`1111 000x xxxx xxxx`).
    ///
    /// Only PMOVE does anything. Cache and ATC maintenance operations are
    /// accepted and ignored since there is no ATC.
    pub fn mmu_op<B: M68kBus>(&mut self, bus: &mut B) -> Result<(), Fault> {
        let ir = self.ctx.regs.ir;
        let pc = self.ctx.regs.ppc;
        let ea = ir & 0x3f;

        if matches!(ir & 0xffc0, 0xf0c0 | 0xf080) {
            warn!("PMMU: unhandled PBcc {ir:#06x} at {pc:#010x}");
            return Ok(());
        }
        let group = (ir >> 9) & 7;
        if group != 0 {
            warn!("PMMU: unknown instruction group {group} ({ir:#06x}) at {pc:#010x}");
            return Ok(());
        }

        let modes = self.read_imm_word(bus)?;
        match MmuCommand::decode(modes) {
            MmuCommand::Pmove { register, to_ea } => self.pmove(bus, ea, register, to_ea),
            MmuCommand::PmoveStatus { to_ea: true } => {
                let sr = self.ctx.mmu.sr;
                self.write_ea_32(bus, ea, sr)
            }
            MmuCommand::PmoveStatus { to_ea: false } => {
                self.ctx.mmu.sr = self.read_ea_32(bus, ea)?;
                Ok(())
            }
            other => {
                warn!("PMMU: {other:?} not implemented ({modes:#06x}) at {pc:#010x}");
                Ok(())
            }
        }
    }

    fn pmove<B: M68kBus>(
        &mut self,
        bus: &mut B,
        ea: u16,
        register: u8,
        to_ea: bool,
    ) -> Result<(), Fault> {
        match (register, to_ea) {
            (MMU_TC, true) => {
                let tc = self.ctx.mmu.tc;
                self.write_ea_32(bus, ea, tc)
            }
            (MMU_SRP, true) => {
                let srp = self.ctx.mmu.srp.to_u64();
                self.write_ea_64(bus, ea, srp)
            }
            (MMU_CRP, true) => {
                let crp = self.ctx.mmu.crp.to_u64();
                self.write_ea_64(bus, ea, crp)
            }
            (MMU_TC, false) => {
                let tc = self.read_ea_32(bus, ea)?;
                self.ctx.mmu.set_tc(tc);
                Ok(())
            }
            (MMU_SRP, false) => {
                self.ctx.mmu.srp = RootPointer::from_u64(self.read_ea_64(bus, ea)?);
                Ok(())
            }
            (MMU_CRP, false) => {
                self.ctx.mmu.crp = RootPointer::from_u64(self.read_ea_64(bus, ea)?);
                Ok(())
            }
            (reg, _) => {
                let err = Error::UnknownMmuRegister {
                    reg,
                    pc: self.ctx.regs.ppc,
                };
                error!("{err}");
                Err(err.into())
            }
        }
    }
}
