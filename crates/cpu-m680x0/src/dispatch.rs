//! Opcode dispatch table.
//!
//! The instruction bodies live outside this crate. A host builds an
//! [`OpcodeTable`] once, registers its handlers by mask/pattern, and hands
//! it to every [`Cpu::execute`] call. Unregistered opcodes raise the
//! architectural exception for their line.

use crate::bus::M68kBus;
use crate::cpu::Cpu;
use crate::error::Fault;
use crate::model::CpuFamily;

/// Instruction handler. The opcode is in `IR` and PC points past it.
pub type Handler<B> = fn(&mut Cpu, &mut B) -> Result<(), Fault>;

const OPCODES: usize = 0x1_0000;

/// Cost charged for unregistered opcodes whose exception was suppressed by
/// the illegal-instruction hook.
const DEFAULT_CYCLES: u8 = 4;

/// 65536 handlers plus one cycle-cost table per CPU family.
pub struct OpcodeTable<B> {
    handlers: Box<[Handler<B>]>,
    cycles: Box<[u8]>,
}

impl<B: M68kBus> Default for OpcodeTable<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: M68kBus> OpcodeTable<B> {
    /// A table where every opcode raises illegal, line-A or line-F.
    #[must_use]
    pub fn new() -> Self {
        let handlers = (0..OPCODES)
            .map(|op| default_handler::<B>(op as u16))
            .collect();
        Self {
            handlers,
            cycles: vec![DEFAULT_CYCLES; CpuFamily::COUNT * OPCODES].into_boxed_slice(),
        }
    }

    /// Route every opcode with `opcode & mask == pattern` to `handler`,
    /// with one base cost per family (000, 010, 020, 030, 040).
    pub fn insert(
        &mut self,
        mask: u16,
        pattern: u16,
        handler: Handler<B>,
        cycles: [u8; CpuFamily::COUNT],
    ) {
        for opcode in (0..=u16::MAX).filter(|op| op & mask == pattern) {
            let index = usize::from(opcode);
            self.handlers[index] = handler;
            for (family, &cost) in cycles.iter().enumerate() {
                self.cycles[family * OPCODES + index] = cost;
            }
        }
    }

    /// Same cost on every family.
    pub fn insert_uniform(&mut self, mask: u16, pattern: u16, handler: Handler<B>, cycles: u8) {
        self.insert(mask, pattern, handler, [cycles; CpuFamily::COUNT]);
    }

    pub fn set_cycles(&mut self, family: CpuFamily, opcode: u16, cycles: u8) {
        self.cycles[family.index() * OPCODES + usize::from(opcode)] = cycles;
    }

    /// Route the PMMU coprocessor range (`1111 000x xxxx xxxx`) to
    /// [`Cpu::mmu_op`]. Models without a PMMU still take line-F there.
    pub fn install_pmmu(&mut self) {
        self.insert(0xfe00, 0xf000, pmmu_op::<B>, [4, 4, 4, 8, 8]);
    }

    #[must_use]
    pub fn handler(&self, opcode: u16) -> Handler<B> {
        self.handlers[usize::from(opcode)]
    }

    #[must_use]
    pub fn cycles(&self, family: CpuFamily, opcode: u16) -> u8 {
        self.cycles[family.index() * OPCODES + usize::from(opcode)]
    }
}

fn default_handler<B: M68kBus>(opcode: u16) -> Handler<B> {
    match opcode >> 12 {
        0xa => line_1010::<B>,
        0xf => line_1111::<B>,
        _ => illegal::<B>,
    }
}

fn illegal<B: M68kBus>(cpu: &mut Cpu, bus: &mut B) -> Result<(), Fault> {
    cpu.exception_illegal(bus)
}

fn line_1010<B: M68kBus>(cpu: &mut Cpu, bus: &mut B) -> Result<(), Fault> {
    cpu.exception_1010(bus)
}

fn line_1111<B: M68kBus>(cpu: &mut Cpu, bus: &mut B) -> Result<(), Fault> {
    cpu.exception_1111(bus)
}

fn pmmu_op<B: M68kBus>(cpu: &mut Cpu, bus: &mut B) -> Result<(), Fault> {
    if cpu.config().has_pmmu {
        cpu.mmu_op(bus)
    } else {
        cpu.exception_1111(bus)
    }
}
