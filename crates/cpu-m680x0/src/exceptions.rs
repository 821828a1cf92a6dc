//! Exception and interrupt processing.
//!
//! Frames follow the 68000 layout (PC then SR, plus the group-0 fields for
//! bus errors). Later families add a format word above the PC, always format
//! 0 here.
//!
//! Exceptions raised by an instruction replace that instruction's cycle
//! cost with the vector's entry in the model's exception table. Interrupts,
//! trace and reset charge their cost on top.

use log::{debug, error};

use crate::bus::M68kBus;
use crate::cpu::{Cpu, RunMode, StopLevel};
use crate::error::{BusFault, Error, Fault};
use crate::hooks::InterruptAck;
use crate::model::CpuFamily;

/// Exception vector numbers.
pub mod vector {
    pub const RESET: u8 = 0;
    pub const BUS_ERROR: u8 = 2;
    pub const ADDRESS_ERROR: u8 = 3;
    pub const ILLEGAL_INSTRUCTION: u8 = 4;
    pub const ZERO_DIVIDE: u8 = 5;
    pub const CHK: u8 = 6;
    pub const TRAPV: u8 = 7;
    pub const PRIVILEGE_VIOLATION: u8 = 8;
    pub const TRACE: u8 = 9;
    pub const LINE_1010: u8 = 10;
    pub const LINE_1111: u8 = 11;
    pub const FORMAT_ERROR: u8 = 14;
    pub const UNINITIALIZED_INTERRUPT: u8 = 15;
    pub const SPURIOUS_INTERRUPT: u8 = 24;
    /// Autovector for level `n` is `AUTOVECTOR_BASE + n`.
    pub const AUTOVECTOR_BASE: u8 = 24;
    /// `TRAP #n` uses `TRAP_BASE + n`.
    pub const TRAP_BASE: u8 = 32;
}

const NMI_LEVEL: u32 = 7 << 8;

impl Cpu {
    /// Cycle cost of taking `vector` on the current model.
    #[must_use]
    pub fn exception_cycles(&self, vector: u8) -> u8 {
        self.ctx.config.exception_cost(vector)
    }

    // === Interrupt lines ===

    /// Latch the IPL lines. Moving to level 7 from any other level is an
    /// NMI edge and will be taken regardless of the mask.
    pub fn set_irq(&mut self, level: u8) {
        let old = self.ctx.int_level;
        self.ctx.int_level = u32::from(level & 7) << 8;
        if old != NMI_LEVEL && self.ctx.int_level == NMI_LEVEL {
            self.ctx.nmi_pending = true;
        }
    }

    /// Raise or drop one of several wired-OR interrupt sources. The IPL lines
    /// follow the highest active source.
    pub fn set_virq(&mut self, level: u8, active: bool) {
        let bit = 1u32 << (level & 7);
        if active {
            self.ctx.virq_state |= bit;
        } else {
            self.ctx.virq_state &= !bit;
        }
        let state = self.ctx.virq_state;
        let highest = (1..=7u8)
            .rev()
            .find(|l| state & (1 << l) != 0)
            .unwrap_or(0);
        self.set_irq(highest);
    }

    #[must_use]
    pub fn virq(&self, level: u8) -> bool {
        self.ctx.virq_state & (1 << (level & 7)) != 0
    }

    /// Take a pending NMI, or the latched level if it is above the mask.
    pub fn check_interrupts<B: M68kBus>(&mut self, bus: &mut B) -> Result<(), Fault> {
        if self.ctx.nmi_pending {
            self.ctx.nmi_pending = false;
            return self.service_interrupt(bus, 7);
        }
        if self.ctx.int_level > self.ctx.flags.int_mask {
            let level = (self.ctx.int_level >> 8) as u8;
            return self.service_interrupt(bus, level);
        }
        Ok(())
    }

    fn service_interrupt<B: M68kBus>(&mut self, bus: &mut B, level: u8) -> Result<(), Fault> {
        self.ctx.stopped.remove(StopLevel::STOP);
        if !self.ctx.stopped.is_empty() {
            return Ok(());
        }

        let vector = match self.hooks.interrupt_ack(level) {
            InterruptAck::Autovector => vector::AUTOVECTOR_BASE + level,
            InterruptAck::Spurious => vector::SPURIOUS_INTERRUPT,
            InterruptAck::Vector(v) => v,
        };
        if !self.hooks.holds_interrupt_line() {
            self.ctx.int_level = 0;
        }

        let sr = self.init_exception();
        self.ctx.flags.int_mask = u32::from(level) << 8;

        let mut new_pc = self.read_vector(bus, vector)?;
        if new_pc == 0 {
            new_pc = self.read_vector(bus, vector::UNINITIALIZED_INTERRUPT)?;
        }
        let pc = self.ctx.regs.pc;
        self.stack_frame_0000(bus, pc, sr, vector)?;
        self.jump(new_pc);
        self.use_exception_cycles(vector);
        Ok(())
    }

    // === External pulses ===

    /// Assert RESET: reinitialise and fetch SSP and PC from address 0.
    ///
    /// The reset cost is charged to the next [`execute`](Self::execute) call.
    /// A bus error while fetching the vectors halts the CPU.
    pub fn pulse_reset<B: M68kBus>(&mut self, bus: &mut B) {
        self.ctx.mmu.enabled = false;
        self.ctx.stopped = StopLevel::empty();
        self.ctx.remaining_cycles = 0;
        self.ctx.run_mode = RunMode::ExceptionRecovery;

        self.ctx.flags.t1 = 0;
        self.ctx.flags.t0 = 0;
        self.ctx.flags.int_mask = 0x0700;
        self.ctx.int_level = 0;
        self.ctx.virq_state = 0;
        self.ctx.regs.vbr = 0;
        self.set_sm(true, false);
        self.invalidate_prefetch();

        match self.read_reset_vectors(bus) {
            Ok(()) => {}
            Err(Fault::Bus(fault)) => {
                self.ctx.fault = fault;
                self.double_fault();
                return;
            }
            Err(Fault::Fatal(err)) => {
                error!("reset aborted: {err}");
                self.double_fault();
                return;
            }
        }

        self.ctx.run_mode = RunMode::Normal;
        self.ctx.reset_cycles = i32::from(self.exception_cycles(vector::RESET));
        debug!(
            "reset: SSP {:#010x} PC {:#010x}",
            self.ctx.regs.a[7], self.ctx.regs.pc
        );
    }

    fn read_reset_vectors<B: M68kBus>(&mut self, bus: &mut B) -> Result<(), Fault> {
        self.ctx.regs.pc = 0;
        let sp = self.read_imm_long(bus)?;
        let pc = self.read_imm_long(bus)?;
        self.ctx.regs.a[7] = sp;
        self.jump(pc);
        Ok(())
    }

    /// Take a bus error for the most recently recorded fault.
    pub fn pulse_bus_error<B: M68kBus>(&mut self, bus: &mut B) -> Result<(), Error> {
        let fault = self.ctx.fault;
        self.bus_error(bus, fault)
    }

    /// Assert HALT. Only a reset resumes execution.
    pub fn pulse_halt(&mut self) {
        self.ctx.stopped |= StopLevel::HALT;
    }

    // === Instruction exceptions ===

    /// Exception whose frame holds the address of the next instruction:
    /// TRAP #n, TRAPV, CHK, divide by zero.
    pub fn exception_trap<B: M68kBus>(&mut self, bus: &mut B, vector: u8) -> Result<(), Fault> {
        let sr = self.init_exception();
        let pc = self.ctx.regs.pc;
        self.stack_frame_0000(bus, pc, sr, vector)?;
        self.jump_vector(bus, vector)?;
        self.replace_instruction_cycles(vector);
        Ok(())
    }

    pub fn exception_privilege_violation<B: M68kBus>(&mut self, bus: &mut B) -> Result<(), Fault> {
        self.exception_at_ppc(bus, vector::PRIVILEGE_VIOLATION)
    }

    /// Illegal opcode. The host's illegal-instruction hook may claim it, in
    /// which case nothing happens.
    pub fn exception_illegal<B: M68kBus>(&mut self, bus: &mut B) -> Result<(), Fault> {
        if self.hooks.illegal_instruction(self.ctx.regs.ir) {
            return Ok(());
        }
        self.exception_at_ppc(bus, vector::ILLEGAL_INSTRUCTION)
    }

    /// A-line (`1010`) emulator trap.
    pub fn exception_1010<B: M68kBus>(&mut self, bus: &mut B) -> Result<(), Fault> {
        self.exception_at_ppc(bus, vector::LINE_1010)
    }

    /// F-line (`1111`) emulator trap, also taken for coprocessor opcodes on
    /// models without that coprocessor.
    pub fn exception_1111<B: M68kBus>(&mut self, bus: &mut B) -> Result<(), Fault> {
        self.exception_at_ppc(bus, vector::LINE_1111)
    }

    /// Exception whose frame points back at the faulting instruction.
    fn exception_at_ppc<B: M68kBus>(&mut self, bus: &mut B, vector: u8) -> Result<(), Fault> {
        let sr = self.init_exception();
        let ppc = self.ctx.regs.ppc;
        self.stack_frame_0000(bus, ppc, sr, vector)?;
        self.jump_vector(bus, vector)?;
        self.replace_instruction_cycles(vector);
        Ok(())
    }

    /// Trace exception after an instruction that started with T1 set.
    pub(crate) fn exception_trace<B: M68kBus>(&mut self, bus: &mut B) -> Result<(), Fault> {
        let sr = self.init_exception();
        let pc = self.ctx.regs.pc;
        self.stack_frame_0000(bus, pc, sr, vector::TRACE)?;
        self.jump_vector(bus, vector::TRACE)?;
        self.ctx.stopped.remove(StopLevel::STOP);
        self.use_exception_cycles(vector::TRACE);
        Ok(())
    }

    // === Bus error ===

    /// Group-0 bus error processing for `fault`.
    ///
    /// A second bus error before the frame is complete (or during reset)
    /// halts the CPU.
    pub(crate) fn bus_error<B: M68kBus>(&mut self, bus: &mut B, fault: BusFault) -> Result<(), Error> {
        self.ctx.fault = fault;
        if self.ctx.run_mode == RunMode::ExceptionRecovery {
            self.double_fault();
            return Ok(());
        }
        debug!("{fault} at PC {:#010x}", self.ctx.regs.ppc);

        self.ctx.run_mode = RunMode::ExceptionRecovery;
        match self.bus_error_frame(bus) {
            Ok(()) => {
                self.ctx.run_mode = RunMode::Normal;
                Ok(())
            }
            Err(Fault::Bus(second)) => {
                self.ctx.fault = second;
                self.double_fault();
                Ok(())
            }
            Err(Fault::Fatal(err)) => Err(err),
        }
    }

    fn bus_error_frame<B: M68kBus>(&mut self, bus: &mut B) -> Result<(), Fault> {
        let sr = self.init_exception();
        let fault = self.ctx.fault;
        // 0 .. 0 R/W I/N FC2-FC0; R/W and I/N are active low.
        let access = (if fault.write { 0 } else { 0x10 })
            | (if fault.instruction { 0 } else { 0x08 })
            | u16::from(fault.fc.bits());
        let pc = self.ctx.regs.pc;
        let ir = self.ctx.regs.ir;

        self.push_long(bus, pc)?;
        self.push_word(bus, sr)?;
        self.push_word(bus, ir)?;
        self.push_long(bus, fault.address)?;
        self.push_word(bus, access)?;
        self.jump_vector(bus, vector::BUS_ERROR)?;
        self.replace_instruction_cycles(vector::BUS_ERROR);
        Ok(())
    }

    fn double_fault(&mut self) {
        error!(
            "double bus fault at {:#010x} (PC {:#010x}): CPU halted",
            self.ctx.fault.address, self.ctx.regs.ppc
        );
        self.ctx.stopped |= StopLevel::HALT;
        self.ctx.remaining_cycles = 0;
    }

    // === Helpers ===

    /// Enter supervisor state and clear trace. Returns the SR to stack.
    fn init_exception(&mut self) -> u16 {
        let sr = self.sr();
        self.ctx.flags.t1 = 0;
        self.ctx.flags.t0 = 0;
        self.trace_pending = false;
        let master = self.ctx.flags.master();
        self.set_sm(true, master);
        sr
    }

    fn stack_frame_0000<B: M68kBus>(
        &mut self,
        bus: &mut B,
        pc: u32,
        sr: u16,
        vector: u8,
    ) -> Result<(), Fault> {
        if self.ctx.config.family != CpuFamily::M68000 {
            self.push_word(bus, u16::from(vector) << 2)?;
        }
        self.push_long(bus, pc)?;
        self.push_word(bus, sr)
    }

    fn read_vector<B: M68kBus>(&mut self, bus: &mut B, vector: u8) -> Result<u32, Fault> {
        let addr = self.ctx.regs.vbr.wrapping_add(u32::from(vector) << 2);
        self.read_long(bus, addr)
    }

    fn jump_vector<B: M68kBus>(&mut self, bus: &mut B, vector: u8) -> Result<(), Fault> {
        let pc = self.read_vector(bus, vector)?;
        self.jump(pc);
        Ok(())
    }

    fn use_exception_cycles(&mut self, vector: u8) {
        self.ctx.remaining_cycles -= i32::from(self.exception_cycles(vector));
    }

    fn replace_instruction_cycles(&mut self, vector: u8) {
        self.use_exception_cycles(vector);
        self.cost_replaced = true;
    }
}
