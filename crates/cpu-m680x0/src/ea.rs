//! Effective-address resolution for 32- and 64-bit operands.
//!
//! The coprocessor instructions move whole longs and quads through an EA
//! field, so only those widths are resolved here. Which modes each access
//! accepts is listed on [`EaAccess::supports`]; anything else is a fatal
//! [`Error::UnsupportedEa`].

use log::error;

use crate::addressing::{AddrMode, EaAccess};
use crate::bus::M68kBus;
use crate::cpu::Cpu;
use crate::error::{Error, Fault};

impl Cpu {
    pub fn read_ea_32<B: M68kBus>(&mut self, bus: &mut B, ea: u16) -> Result<u32, Fault> {
        match self.decode_ea(EaAccess::Read32, ea)? {
            AddrMode::DataReg(r) => Ok(self.ctx.regs.d[usize::from(r)]),
            AddrMode::AddrIndPostInc(r) => {
                let addr = self.post_increment(r, 4);
                self.read_long(bus, addr)
            }
            AddrMode::Immediate => self.read_imm_long(bus),
            mode => {
                let addr = self.ea_address(bus, EaAccess::Read32, mode)?;
                self.read_long(bus, addr)
            }
        }
    }

    pub fn read_ea_64<B: M68kBus>(&mut self, bus: &mut B, ea: u16) -> Result<u64, Fault> {
        match self.decode_ea(EaAccess::Read64, ea)? {
            AddrMode::AddrIndPostInc(r) => {
                let addr = self.post_increment(r, 8);
                self.read_quad(bus, addr)
            }
            AddrMode::Immediate => {
                let high = self.read_imm_long(bus)?;
                let low = self.read_imm_long(bus)?;
                Ok(u64::from(high) << 32 | u64::from(low))
            }
            mode => {
                let addr = self.ea_address(bus, EaAccess::Read64, mode)?;
                self.read_quad(bus, addr)
            }
        }
    }

    pub fn write_ea_32<B: M68kBus>(&mut self, bus: &mut B, ea: u16, value: u32) -> Result<(), Fault> {
        match self.decode_ea(EaAccess::Write32, ea)? {
            AddrMode::DataReg(r) => {
                self.ctx.regs.d[usize::from(r)] = value;
                Ok(())
            }
            AddrMode::AddrReg(r) => {
                self.ctx.regs.a[usize::from(r)] = value;
                Ok(())
            }
            AddrMode::AddrIndPostInc(r) => {
                let addr = self.post_increment(r, 4);
                self.write_long(bus, addr, value)
            }
            AddrMode::AddrIndPreDec(r) => {
                let addr = self.pre_decrement(r, 4);
                self.write_long(bus, addr, value)
            }
            mode => {
                let addr = self.ea_address(bus, EaAccess::Write32, mode)?;
                self.write_long(bus, addr, value)
            }
        }
    }

    pub fn write_ea_64<B: M68kBus>(&mut self, bus: &mut B, ea: u16, value: u64) -> Result<(), Fault> {
        let addr = match self.decode_ea(EaAccess::Write64, ea)? {
            AddrMode::AddrIndPreDec(r) => self.pre_decrement(r, 8),
            mode => self.ea_address(bus, EaAccess::Write64, mode)?,
        };
        self.write_quad(bus, addr, value)
    }

    fn decode_ea(&self, access: EaAccess, ea: u16) -> Result<AddrMode, Fault> {
        match AddrMode::from_ea(ea) {
            Some(mode) if access.supports(mode) => Ok(mode),
            _ => Err(self.unsupported(access, ((ea >> 3) & 7) as u8, (ea & 7) as u8)),
        }
    }

    fn unsupported(&self, access: EaAccess, mode: u8, reg: u8) -> Fault {
        let err = Error::UnsupportedEa {
            access,
            mode,
            reg,
            pc: self.ctx.regs.pc,
        };
        error!("{err}");
        err.into()
    }

    fn post_increment(&mut self, reg: u8, size: u32) -> u32 {
        let an = &mut self.ctx.regs.a[usize::from(reg)];
        let addr = *an;
        *an = addr.wrapping_add(size);
        addr
    }

    fn pre_decrement(&mut self, reg: u8, size: u32) -> u32 {
        let an = &mut self.ctx.regs.a[usize::from(reg)];
        *an = an.wrapping_sub(size);
        *an
    }

    /// Address of a memory operand whose calculation has no side effect on
    /// An. Extension words are consumed from the instruction stream.
    fn ea_address<B: M68kBus>(
        &mut self,
        bus: &mut B,
        access: EaAccess,
        mode: AddrMode,
    ) -> Result<u32, Fault> {
        match mode {
            AddrMode::AddrInd(r) => Ok(self.ctx.regs.a[usize::from(r)]),
            AddrMode::AddrIndDisp(r) => {
                let base = self.ctx.regs.a[usize::from(r)];
                let disp = self.read_imm_word(bus)? as i16;
                Ok(base.wrapping_add_signed(i32::from(disp)))
            }
            AddrMode::AddrIndIndex(r) => {
                let base = self.ctx.regs.a[usize::from(r)];
                let ext = self.read_imm_word(bus)?;
                self.calc_index_ea(access, r, base, ext)
            }
            AddrMode::AbsShort => {
                let addr = self.read_imm_word(bus)? as i16;
                Ok(i32::from(addr) as u32)
            }
            AddrMode::AbsLong => self.read_imm_long(bus),
            AddrMode::PcDisp => {
                let base = self.ctx.regs.pc;
                let disp = self.read_imm_word(bus)? as i16;
                Ok(base.wrapping_add_signed(i32::from(disp)))
            }
            other => {
                let (mode, reg) = other.fields();
                Err(self.unsupported(access, mode, reg))
            }
        }
    }

    /// Brief-format indexed EA: base + d8 + Xn.size * scale.
    ///
    /// On models without scaled indexing bit 8 is ignored; on the others it
    /// selects the full extension format, which is not resolved here.
    fn calc_index_ea(&self, access: EaAccess, reg: u8, base: u32, ext: u16) -> Result<u32, Fault> {
        let scaled = self.ctx.config.model.capabilities().scaled_index;
        if scaled && ext & 0x0100 != 0 {
            return Err(self.unsupported(access, 6, reg));
        }

        let disp = i32::from(ext as u8 as i8);
        let xn_value = self.ctx.regs.da(usize::from((ext >> 12) & 0x0f));
        let xn = if ext & 0x0800 != 0 {
            xn_value as i32
        } else {
            i32::from(xn_value as i16)
        };
        let scale = if scaled { (ext >> 9) & 3 } else { 0 };

        Ok(base
            .wrapping_add_signed(disp)
            .wrapping_add((xn as u32).wrapping_shl(u32::from(scale))))
    }
}
