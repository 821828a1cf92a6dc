//! Timeslice scheduler.
//!
//! [`Cpu::execute`] runs whole instructions until the cycle budget is spent.
//! The last instruction may overrun; the overrun shows up as a negative
//! [`cycles_remaining`](Cpu::cycles_remaining) and in
//! [`cycles_run`](Cpu::cycles_run).

use crate::bus::M68kBus;
use crate::cpu::Cpu;
use crate::dispatch::OpcodeTable;
use crate::error::{Error, Fault};

impl Cpu {
    /// Run for about `cycles` clocks.
    ///
    /// Pending interrupts are sampled once on entry. A stopped or halted CPU
    /// consumes the whole budget without executing. Bus errors are handled
    /// as exceptions; a fatal fault ends the slice early with PPC still
    /// pointing at the failing instruction.
    pub fn execute<B: M68kBus>(
        &mut self,
        bus: &mut B,
        table: &OpcodeTable<B>,
        cycles: i32,
    ) -> Result<(), Error> {
        self.ctx.initial_cycles = cycles;
        self.ctx.remaining_cycles = cycles - std::mem::take(&mut self.ctx.reset_cycles);

        let pending = self.check_interrupts(bus);
        self.settle(bus, pending)?;

        if !self.ctx.stopped.is_empty() {
            self.ctx.remaining_cycles = 0;
            self.ctx.regs.ppc = self.ctx.regs.pc;
            return Ok(());
        }

        while self.ctx.remaining_cycles > 0 {
            self.trace_pending = self.ctx.flags.tracing();
            self.ctx.regs.ppc = self.ctx.regs.pc;
            self.hooks.instruction(self.ctx.regs.pc);

            let mut result = self.step(bus, table);
            if self.trace_pending && result.is_ok() {
                result = self.exception_trace(bus);
            }
            self.settle(bus, result)?;

            if !self.ctx.stopped.is_empty() {
                self.ctx.remaining_cycles = self.ctx.remaining_cycles.min(0);
            }
        }

        self.ctx.regs.ppc = self.ctx.regs.pc;
        Ok(())
    }

    fn step<B: M68kBus>(&mut self, bus: &mut B, table: &OpcodeTable<B>) -> Result<(), Fault> {
        self.cost_replaced = false;
        let opcode = self.fetch_opcode(bus)?;
        self.ctx.regs.ir = opcode;
        (table.handler(opcode))(self, bus)?;
        if !self.cost_replaced {
            let cost = table.cycles(self.ctx.config.family, opcode);
            self.ctx.remaining_cycles -= i32::from(cost);
        }
        Ok(())
    }

    /// Turn a bus fault into its exception; pass fatal faults up.
    fn settle<B: M68kBus>(&mut self, bus: &mut B, result: Result<(), Fault>) -> Result<(), Error> {
        match result {
            Ok(()) => Ok(()),
            Err(Fault::Bus(fault)) => self.bus_error(bus, fault),
            Err(Fault::Fatal(err)) => Err(err),
        }
    }

    // === Timeslice accounting ===

    /// Cycles consumed so far in the current (or last) slice.
    #[must_use]
    pub const fn cycles_run(&self) -> i32 {
        self.ctx.initial_cycles - self.ctx.remaining_cycles
    }

    #[must_use]
    pub const fn cycles_remaining(&self) -> i32 {
        self.ctx.remaining_cycles
    }

    /// Grow (or shrink) the running slice.
    pub fn modify_timeslice(&mut self, delta: i32) {
        self.ctx.initial_cycles += delta;
        self.ctx.remaining_cycles += delta;
    }

    /// Stop after the current instruction. `cycles_run` keeps reporting
    /// what was actually consumed.
    pub fn end_timeslice(&mut self) {
        self.ctx.initial_cycles -= self.ctx.remaining_cycles;
        self.ctx.remaining_cycles = 0;
    }
}
