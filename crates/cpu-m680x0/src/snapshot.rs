//! Save-state support.
//!
//! Each field goes under its own key in the `m68k` section, so the layout of
//! [`Context`](crate::Context) can change without breaking older saves.

use emu_savestate::{SectionReader, SectionWriter, StateError, StateStore};

use crate::bus::FunctionCode;
use crate::cpu::{Context, Cpu, RunMode, StopLevel};
use crate::error::BusFault;
use crate::model::CpuModel;
use crate::pmmu::RootPointer;
use crate::registers::StackPointer;

/// Section name used in the store.
pub const SECTION: &str = "m68k";

fn out_of_range(key: &str, value: u32) -> StateError {
    StateError::OutOfRange {
        key: key.to_string(),
        value: u64::from(value),
    }
}

impl Cpu {
    pub fn save_state<S: StateStore>(&self, store: &mut S) {
        let ctx = &self.ctx;
        let regs = &ctx.regs;
        let mut w = store.open_for_write(SECTION);

        let mut da = [0u8; 64];
        for (chunk, value) in da.chunks_exact_mut(4).zip(regs.d.iter().chain(&regs.a)) {
            chunk.copy_from_slice(&value.to_be_bytes());
        }
        w.set_buffer("da", &da);

        let scalars = [
            ("ppc", regs.ppc),
            ("pc", regs.pc),
            ("sp", regs.a[7]),
            ("usp", regs.shadow(StackPointer::User)),
            ("isp", regs.shadow(StackPointer::Interrupt)),
            ("msp", regs.shadow(StackPointer::Master)),
            ("vbr", regs.vbr),
            ("sfc", regs.sfc),
            ("dfc", regs.dfc),
            ("cacr", regs.cacr),
            ("caar", regs.caar),
            ("ir", u32::from(regs.ir)),
            ("sr", u32::from(ctx.flags.pack())),
            ("int_level", ctx.int_level),
            ("stopped", u32::from(ctx.stopped.bits())),
            ("run_mode", u32::from(ctx.run_mode.bits())),
            ("pref_addr", regs.pref_addr),
            ("pref_data", regs.pref_data),
            ("virq_state", ctx.virq_state),
            ("address_space", u32::from(ctx.address_space.bits())),
            ("mmu_tc", ctx.mmu.tc),
            ("mmu_srp_limit", ctx.mmu.srp.limit),
            ("mmu_srp_aptr", ctx.mmu.srp.pointer),
            ("mmu_crp_limit", ctx.mmu.crp.limit),
            ("mmu_crp_aptr", ctx.mmu.crp.pointer),
            ("mmu_sr", ctx.mmu.sr),
            ("cpu_type", ctx.config.model.tag()),
        ];
        for (key, value) in scalars {
            w.set(key, u64::from(value));
        }

        w.set_bool("nmi_pending", ctx.nmi_pending);
        w.set_bool("pmmu_enabled", ctx.mmu.enabled);
        w.set_i64("initial_cycles", i64::from(ctx.initial_cycles));
        w.set_i64("remaining_cycles", i64::from(ctx.remaining_cycles));
        w.set_i64("reset_cycles", i64::from(ctx.reset_cycles));
        w.set_buffer("fault_frame", &ctx.fault.to_record());
    }

    /// Restore a state written by [`save_state`](Self::save_state).
    ///
    /// Every field is decoded and range-checked before anything is
    /// committed, so a failed load leaves the CPU untouched. The saved model
    /// is selected before SR is applied so the SR mask matches it.
    pub fn load_state<S: StateStore>(&mut self, store: &S) -> Result<(), StateError> {
        let r = store.open_for_read(SECTION)?;

        let tag = r.get_u32("cpu_type")?;
        let model = CpuModel::from_tag(tag).ok_or_else(|| out_of_range("cpu_type", tag))?;
        let mut ctx = Context::new(model);

        let mut da = [0u8; 64];
        r.get_buffer("da", &mut da)?;
        let mut words = da
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]));
        let regs = &mut ctx.regs;
        for slot in regs.d.iter_mut().chain(regs.a.iter_mut()) {
            *slot = words.next().unwrap_or(0);
        }

        regs.ppc = r.get_u32("ppc")?;
        regs.a[7] = r.get_u32("sp")?;
        regs.set_shadow(StackPointer::User, r.get_u32("usp")?);
        regs.set_shadow(StackPointer::Interrupt, r.get_u32("isp")?);
        regs.set_shadow(StackPointer::Master, r.get_u32("msp")?);
        regs.vbr = r.get_u32("vbr")?;
        regs.sfc = r.get_u32("sfc")?;
        regs.dfc = r.get_u32("dfc")?;
        regs.cacr = r.get_u32("cacr")?;
        regs.caar = r.get_u32("caar")?;
        let ir = r.get_u32("ir")?;
        regs.ir = u16::try_from(ir).map_err(|_| out_of_range("ir", ir))?;
        regs.pref_addr = r.get_u32("pref_addr")?;
        regs.pref_data = r.get_u32("pref_data")?;

        // Interrupt level is held pre-shifted into SR's mask position.
        let int_level = r.get_u32("int_level")?;
        if int_level & !0x700 != 0 {
            return Err(out_of_range("int_level", int_level));
        }
        ctx.int_level = int_level;
        let virq_state = r.get_u32("virq_state")?;
        if virq_state > 0xff {
            return Err(out_of_range("virq_state", virq_state));
        }
        ctx.virq_state = virq_state;
        let stopped = r.get_u32("stopped")?;
        ctx.stopped = u8::try_from(stopped)
            .ok()
            .and_then(StopLevel::from_bits)
            .ok_or_else(|| out_of_range("stopped", stopped))?;
        let run_mode = r.get_u32("run_mode")?;
        ctx.run_mode = u8::try_from(run_mode)
            .ok()
            .and_then(RunMode::from_bits)
            .ok_or_else(|| out_of_range("run_mode", run_mode))?;
        ctx.nmi_pending = r.get_bool("nmi_pending")?;
        let space = r.get_u32("address_space")?;
        ctx.address_space = u8::try_from(space)
            .ok()
            .and_then(FunctionCode::from_bits)
            .ok_or_else(|| out_of_range("address_space", space))?;

        ctx.mmu.tc = r.get_u32("mmu_tc")?;
        ctx.mmu.srp = RootPointer {
            limit: r.get_u32("mmu_srp_limit")?,
            pointer: r.get_u32("mmu_srp_aptr")?,
        };
        ctx.mmu.crp = RootPointer {
            limit: r.get_u32("mmu_crp_limit")?,
            pointer: r.get_u32("mmu_crp_aptr")?,
        };
        ctx.mmu.sr = r.get_u32("mmu_sr")?;
        ctx.mmu.enabled = r.get_bool("pmmu_enabled")?;

        ctx.initial_cycles = read_i32(&r, "initial_cycles")?;
        ctx.remaining_cycles = read_i32(&r, "remaining_cycles")?;
        ctx.reset_cycles = read_i32(&r, "reset_cycles")?;

        let mut record = [0u8; BusFault::RECORD_LEN];
        r.get_buffer("fault_frame", &mut record)?;
        ctx.fault = BusFault::from_record(&record)
            .ok_or_else(|| out_of_range("fault_frame", u32::from(record[5])))?;

        let sr = r.get_u32("sr")?;
        let sr = u16::try_from(sr).map_err(|_| out_of_range("sr", sr))?;
        let pc = r.get_u32("pc")?;

        self.ctx = ctx;
        self.set_cpu_type(model);
        self.set_sr_noint_nosp(sr);
        self.jump(pc);
        Ok(())
    }
}

fn read_i32<R: SectionReader>(r: &R, key: &str) -> Result<i32, StateError> {
    let value = r.get_i64(key)?;
    i32::try_from(value).map_err(|_| StateError::OutOfRange {
        key: key.to_string(),
        value: value as u64,
    })
}
