//! Host callbacks.
//!
//! Every method has a default, so a host only overrides what its board needs.
//! Hooks run synchronously inside `execute` and receive plain values; they
//! cannot reach back into the CPU.

use crate::bus::FunctionCode;

/// Answer to an interrupt acknowledge cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAck {
    /// Use vector 24 + level (VPA asserted).
    Autovector,
    /// No device responded; use the spurious-interrupt vector (24).
    Spurious,
    /// Device supplied a vector number. Zero means the device was never
    /// programmed and selects the uninitialised-interrupt vector (15).
    Vector(u8),
}

pub trait Hooks {
    /// Interrupt acknowledge for `level` (1-7).
    fn interrupt_ack(&mut self, _level: u8) -> InterruptAck {
        InterruptAck::Autovector
    }

    /// Whether the device keeps the interrupt line asserted after it has been
    /// acknowledged. When false the CPU drops its latched level to 0.
    fn holds_interrupt_line(&self) -> bool {
        false
    }

    /// BKPT instruction acknowledge.
    fn breakpoint_ack(&mut self, _data: u32) {}

    /// RESET instruction asserted the reset line.
    fn reset_instruction(&mut self) {}

    /// CMPI.L #imm, Dn executed; some hosts use it for idle detection.
    fn cmpild(&mut self, _value: u32, _reg: u8) {}

    /// RTE executed.
    fn rte(&mut self) {}

    /// TAS read-modify-write: return false to suppress the write-back.
    fn tas_allowed(&mut self) -> bool {
        true
    }

    /// An illegal opcode is about to raise vector 4. Return true if the host
    /// emulated it instead.
    fn illegal_instruction(&mut self, _opcode: u16) -> bool {
        false
    }

    /// PC was loaded by a jump, exception or state restore.
    fn pc_changed(&mut self, _pc: u32) {}

    /// The CPU started driving a different function code.
    fn function_code_changed(&mut self, _fc: FunctionCode) {}

    /// Called before every instruction with its address.
    fn instruction(&mut self, _pc: u32) {}
}

/// Hooks that take every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl Hooks for NoHooks {}
