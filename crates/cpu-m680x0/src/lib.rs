//! Motorola 680x0 interpreter control plane.
//!
//! This crate owns everything around the instruction bodies: the timeslice
//! loop, exception and interrupt processing with per-model cycle costs,
//! effective-address resolution for long and quad operands, the 68030-style
//! PMMU, register access and save states. Instruction handlers are supplied
//! by the host through an [`OpcodeTable`].
//!
//! ```ignore
//! let mut cpu = Cpu::new();
//! let mut table = OpcodeTable::new();
//! table.insert_uniform(0xffff, 0x4e71, nop, 4);
//! cpu.pulse_reset(&mut bus);
//! cpu.execute(&mut bus, &table, 7_093)?;
//! ```

mod access;
mod addressing;
mod bus;
mod cpu;
mod dispatch;
mod ea;
mod error;
mod exceptions;
mod execute;
mod flags;
mod hooks;
mod model;
mod pmmu;
mod registers;
mod snapshot;

pub use access::{Register, UnknownRegister};
pub use addressing::{AddrMode, EaAccess};
pub use bus::{BusResult, FunctionCode, M68kBus};
pub use cpu::{Context, Cpu, PREFETCH_EMPTY, RunMode, StopLevel};
pub use dispatch::{Handler, OpcodeTable};
pub use error::{BusFault, Error, Fault, TableLevel};
pub use exceptions::vector;
pub use flags::Flags;
pub use hooks::{Hooks, InterruptAck, NoHooks};
pub use model::{
    CpuCapabilities, CpuFamily, CpuModel, EXCEPTION_CYCLES, ModelConfig, TimingAdjust,
    UnknownModel,
};
pub use pmmu::{MmuCommand, MmuState, RootPointer, TC_ENABLE, TC_SRE};
pub use registers::{Registers, StackPointer};
pub use snapshot::SECTION as SNAPSHOT_SECTION;

pub mod sr {
    //! Architectural status register bits and fast-test flag values.
    pub use crate::flags::{
        CFLAG_SET, MFLAG_SET, NFLAG_SET, SFLAG_SET, SR_C, SR_INT_MASK, SR_M, SR_N, SR_S, SR_T0,
        SR_T1, SR_V, SR_X, SR_Z, VFLAG_SET, XFLAG_SET,
    };
}
