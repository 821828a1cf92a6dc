//! Interpreter state and memory primitives.
//!
//! [`Context`] is the complete architectural and scheduling state of one CPU.
//! [`Cpu`] pairs it with the host's [`Hooks`]; hosts running several CPUs
//! either keep several `Cpu` values or swap contexts through one.
//!
//! All memory traffic goes through the primitives here so that function
//! codes, PMMU translation, address masking, wait cycles and bus errors are
//! handled in one place.

use std::fmt;

use bitflags::bitflags;
use log::{debug, warn};

use crate::bus::{BusResult, FunctionCode, M68kBus};
use crate::error::{BusFault, Fault};
use crate::flags::{Flags, MFLAG_SET, SFLAG_SET};
use crate::hooks::{Hooks, NoHooks};
use crate::model::{CpuModel, ModelConfig};
use crate::pmmu::MmuState;
use crate::registers::{Registers, StackPointer};

/// Prefetch address that no long-aligned PC can match.
pub const PREFETCH_EMPTY: u32 = 1;

bitflags! {
    /// Reasons the CPU is not executing instructions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StopLevel: u8 {
        /// STOP instruction: wait for an interrupt.
        const STOP = 0x01;
        /// HALT line or double bus fault: wait for reset.
        const HALT = 0x02;
    }
}

/// Whether the CPU is inside reset or bus-error processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Normal,
    /// A bus error in this mode is a double fault.
    ExceptionRecovery,
}

impl RunMode {
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::ExceptionRecovery => 1,
        }
    }

    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Normal),
            1 => Some(Self::ExceptionRecovery),
            _ => None,
        }
    }
}

/// Everything needed to resume a CPU exactly where it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub(crate) regs: Registers,
    pub(crate) flags: Flags,
    pub(crate) mmu: MmuState,
    pub(crate) config: ModelConfig,
    /// Latched interrupt level, pre-shifted like the SR mask.
    pub(crate) int_level: u32,
    pub(crate) virq_state: u32,
    pub(crate) nmi_pending: bool,
    pub(crate) stopped: StopLevel,
    pub(crate) run_mode: RunMode,
    pub(crate) address_space: FunctionCode,
    /// Last bus error, for the group-0 frame.
    pub(crate) fault: BusFault,
    pub(crate) initial_cycles: i32,
    pub(crate) remaining_cycles: i32,
    pub(crate) reset_cycles: i32,
}

impl Context {
    #[must_use]
    pub fn new(model: CpuModel) -> Self {
        Self {
            regs: Registers::new(),
            flags: Flags::from_sr(0x2700),
            mmu: MmuState::default(),
            config: model.config(),
            int_level: 0,
            virq_state: 0,
            nmi_pending: false,
            stopped: StopLevel::empty(),
            run_mode: RunMode::Normal,
            address_space: FunctionCode::SupervisorData,
            fault: BusFault::default(),
            initial_cycles: 0,
            remaining_cycles: 0,
            reset_cycles: 0,
        }
    }

    #[must_use]
    pub const fn model(&self) -> CpuModel {
        self.config.model
    }

    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.regs
    }

    #[must_use]
    pub const fn sr(&self) -> u16 {
        self.flags.pack()
    }
}

/// A 680x0 bound to a set of host hooks.
pub struct Cpu {
    pub(crate) ctx: Context,
    pub(crate) hooks: Box<dyn Hooks>,
    /// Set when an exception has already charged the current instruction.
    pub(crate) cost_replaced: bool,
    /// Trace state latched at instruction start; any exception cancels it.
    pub(crate) trace_pending: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

impl Cpu {
    /// A 68000 with default hooks. Call [`pulse_reset`](Self::pulse_reset)
    /// before executing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ctx: Context::new(CpuModel::M68000),
            hooks: Box::new(NoHooks),
            cost_replaced: false,
            trace_pending: false,
        }
    }

    #[must_use]
    pub fn with_model(model: CpuModel) -> Self {
        let mut cpu = Self::new();
        cpu.set_cpu_type(model);
        cpu
    }

    /// Swap in another model's configuration block. Registers are kept.
    pub fn set_cpu_type(&mut self, model: CpuModel) {
        if !model.is_fully_supported() {
            warn!("{model}: cycle timing and exception frames are approximate");
        }
        debug!("CPU model set to {model}");
        self.ctx.config = model.config();
    }

    pub fn set_hooks(&mut self, hooks: Box<dyn Hooks>) {
        self.hooks = hooks;
    }

    pub fn hooks_mut(&mut self) -> &mut dyn Hooks {
        self.hooks.as_mut()
    }

    #[must_use]
    pub fn context(&self) -> Context {
        self.ctx.clone()
    }

    pub fn set_context(&mut self, ctx: Context) {
        self.ctx = ctx;
    }

    // === State accessors ===

    #[must_use]
    pub const fn model(&self) -> CpuModel {
        self.ctx.config.model
    }

    #[must_use]
    pub const fn config(&self) -> &ModelConfig {
        &self.ctx.config
    }

    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.ctx.regs
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.ctx.regs
    }

    #[must_use]
    pub const fn flags(&self) -> &Flags {
        &self.ctx.flags
    }

    /// Direct flag access for instruction handlers. Changing S or M here
    /// does not move the stack pointer; use [`set_sr`](Self::set_sr).
    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.ctx.flags
    }

    #[must_use]
    pub const fn mmu(&self) -> &MmuState {
        &self.ctx.mmu
    }

    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.ctx.regs.pc
    }

    #[must_use]
    pub const fn stop_level(&self) -> StopLevel {
        self.ctx.stopped
    }

    #[must_use]
    pub const fn run_mode(&self) -> RunMode {
        self.ctx.run_mode
    }

    /// Latched IPL level (0-7).
    #[must_use]
    pub const fn irq_level(&self) -> u8 {
        (self.ctx.int_level >> 8) as u8
    }

    #[must_use]
    pub const fn nmi_pending(&self) -> bool {
        self.ctx.nmi_pending
    }

    /// The most recent bus error.
    #[must_use]
    pub const fn last_fault(&self) -> BusFault {
        self.ctx.fault
    }

    // === Control flow ===

    /// Load PC. Every PC change outside sequential fetch comes through here.
    pub fn jump(&mut self, pc: u32) {
        self.ctx.regs.pc = pc;
        self.hooks.pc_changed(pc);
    }

    /// STOP: sleep until an interrupt or reset. The current timeslice is
    /// consumed.
    pub fn stop(&mut self) {
        self.ctx.stopped |= StopLevel::STOP;
    }

    // === Status register ===

    #[must_use]
    pub const fn sr(&self) -> u16 {
        self.ctx.flags.pack()
    }

    #[must_use]
    pub const fn live_stack(&self) -> StackPointer {
        StackPointer::select(self.ctx.flags.supervisor(), self.ctx.flags.master())
    }

    /// Load SR through the model's mask, moving A7 if S or M changed.
    ///
    /// Lowering the interrupt mask does not take a pending interrupt here;
    /// handlers that need that call [`check_interrupts`](Self::check_interrupts).
    pub fn set_sr(&mut self, value: u16) {
        let from = self.live_stack();
        self.ctx.flags.unpack(value & self.ctx.config.sr_mask);
        self.ctx.regs.switch_stack(from, self.live_stack());
    }

    /// Load SR without touching A7 or the shadows.
    pub(crate) fn set_sr_noint_nosp(&mut self, value: u16) {
        self.ctx.flags.unpack(value & self.ctx.config.sr_mask);
    }

    /// Set S and M, moving A7 to the newly selected stack.
    pub(crate) fn set_sm(&mut self, supervisor: bool, master: bool) {
        let from = self.live_stack();
        self.ctx.flags.s = if supervisor { SFLAG_SET } else { 0 };
        self.ctx.flags.m = if master { MFLAG_SET } else { 0 };
        self.ctx.regs.switch_stack(from, self.live_stack());
    }

    // === Memory primitives ===

    const fn data_fc(&self) -> FunctionCode {
        FunctionCode::from_flags(self.ctx.flags.supervisor(), false)
    }

    const fn program_fc(&self) -> FunctionCode {
        FunctionCode::from_flags(self.ctx.flags.supervisor(), true)
    }

    fn set_address_space(&mut self, fc: FunctionCode) {
        if self.ctx.address_space != fc {
            self.ctx.address_space = fc;
            self.hooks.function_code_changed(fc);
        }
    }

    /// Run one bus cycle: translate, mask, call the host, charge wait states.
    fn access<B, F>(
        &mut self,
        bus: &mut B,
        address: u32,
        fc: FunctionCode,
        write: bool,
        cycle: F,
    ) -> Result<u32, Fault>
    where
        B: M68kBus,
        F: FnOnce(&mut B, u32, FunctionCode) -> BusResult,
    {
        self.set_address_space(fc);
        let physical = if self.ctx.mmu.enabled {
            self.translate(bus, address)?
        } else {
            address
        };
        let result = cycle(bus, physical & self.ctx.config.address_mask, fc);
        self.ctx.remaining_cycles -= i32::from(result.wait_cycles);
        if result.bus_error {
            return Err(Fault::Bus(BusFault {
                address,
                write,
                fc,
                instruction: fc.is_program(),
            }));
        }
        Ok(result.data)
    }

    pub fn read_byte<B: M68kBus>(&mut self, bus: &mut B, addr: u32) -> Result<u8, Fault> {
        let fc = self.data_fc();
        self.access(bus, addr, fc, false, |bus, a, fc| bus.read_byte(a, fc))
            .map(|v| v as u8)
    }

    pub fn read_word<B: M68kBus>(&mut self, bus: &mut B, addr: u32) -> Result<u16, Fault> {
        let fc = self.data_fc();
        self.access(bus, addr, fc, false, |bus, a, fc| bus.read_word(a, fc))
            .map(|v| v as u16)
    }

    pub fn read_long<B: M68kBus>(&mut self, bus: &mut B, addr: u32) -> Result<u32, Fault> {
        let fc = self.data_fc();
        self.access(bus, addr, fc, false, |bus, a, fc| bus.read_long(a, fc))
    }

    /// Two long reads, high half first.
    pub fn read_quad<B: M68kBus>(&mut self, bus: &mut B, addr: u32) -> Result<u64, Fault> {
        let high = self.read_long(bus, addr)?;
        let low = self.read_long(bus, addr.wrapping_add(4))?;
        Ok(u64::from(high) << 32 | u64::from(low))
    }

    pub fn write_byte<B: M68kBus>(&mut self, bus: &mut B, addr: u32, value: u8) -> Result<(), Fault> {
        let fc = self.data_fc();
        self.access(bus, addr, fc, true, |bus, a, fc| bus.write_byte(a, value, fc))
            .map(drop)
    }

    pub fn write_word<B: M68kBus>(
        &mut self,
        bus: &mut B,
        addr: u32,
        value: u16,
    ) -> Result<(), Fault> {
        let fc = self.data_fc();
        self.access(bus, addr, fc, true, |bus, a, fc| bus.write_word(a, value, fc))
            .map(drop)
    }

    pub fn write_long<B: M68kBus>(
        &mut self,
        bus: &mut B,
        addr: u32,
        value: u32,
    ) -> Result<(), Fault> {
        let fc = self.data_fc();
        self.access(bus, addr, fc, true, |bus, a, fc| bus.write_long(a, value, fc))
            .map(drop)
    }

    /// Two long writes, high half first.
    pub fn write_quad<B: M68kBus>(
        &mut self,
        bus: &mut B,
        addr: u32,
        value: u64,
    ) -> Result<(), Fault> {
        self.write_long(bus, addr, (value >> 32) as u32)?;
        self.write_long(bus, addr.wrapping_add(4), value as u32)
    }

    // === Stack ===

    pub fn push_word<B: M68kBus>(&mut self, bus: &mut B, value: u16) -> Result<(), Fault> {
        let sp = self.ctx.regs.a[7].wrapping_sub(2);
        self.ctx.regs.a[7] = sp;
        self.write_word(bus, sp, value)
    }

    pub fn push_long<B: M68kBus>(&mut self, bus: &mut B, value: u32) -> Result<(), Fault> {
        let sp = self.ctx.regs.a[7].wrapping_sub(4);
        self.ctx.regs.a[7] = sp;
        self.write_long(bus, sp, value)
    }

    pub fn pull_word<B: M68kBus>(&mut self, bus: &mut B) -> Result<u16, Fault> {
        let sp = self.ctx.regs.a[7];
        self.ctx.regs.a[7] = sp.wrapping_add(2);
        self.read_word(bus, sp)
    }

    pub fn pull_long<B: M68kBus>(&mut self, bus: &mut B) -> Result<u32, Fault> {
        let sp = self.ctx.regs.a[7];
        self.ctx.regs.a[7] = sp.wrapping_add(4);
        self.read_long(bus, sp)
    }

    // === Instruction stream ===

    /// Fetch the opcode at PC straight from program space.
    pub(crate) fn fetch_opcode<B: M68kBus>(&mut self, bus: &mut B) -> Result<u16, Fault> {
        let pc = self.ctx.regs.pc;
        let fc = self.program_fc();
        let word = self.access(bus, pc, fc, false, |bus, a, fc| {
            bus.read_immediate_word(a, fc)
        })?;
        self.ctx.regs.pc = pc.wrapping_add(2);
        Ok(word as u16)
    }

    /// Next extension word, through the one-long prefetch latch.
    pub fn read_imm_word<B: M68kBus>(&mut self, bus: &mut B) -> Result<u16, Fault> {
        let pc = self.ctx.regs.pc;
        let aligned = pc & !3;
        if aligned != self.ctx.regs.pref_addr {
            let fc = self.program_fc();
            self.ctx.regs.pref_data = self.access(bus, aligned, fc, false, |bus, a, fc| {
                bus.read_immediate_long(a, fc)
            })?;
            self.ctx.regs.pref_addr = aligned;
        }
        self.ctx.regs.pc = pc.wrapping_add(2);
        let shift = if pc & 2 == 0 { 16 } else { 0 };
        Ok((self.ctx.regs.pref_data >> shift) as u16)
    }

    pub fn read_imm_long<B: M68kBus>(&mut self, bus: &mut B) -> Result<u32, Fault> {
        let high = self.read_imm_word(bus)?;
        let low = self.read_imm_word(bus)?;
        Ok(u32::from(high) << 16 | u32::from(low))
    }

    pub(crate) fn invalidate_prefetch(&mut self) {
        self.ctx.regs.pref_addr = PREFETCH_EMPTY;
    }
}
