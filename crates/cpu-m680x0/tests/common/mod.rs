#![allow(dead_code)]

use std::ops::Range;

use cpu_m680x0::{BusResult, Cpu, Fault, FunctionCode, M68kBus, OpcodeTable, Register};

pub const NOP: u16 = 0x4e71;
pub const STOP: u16 = 0x4e72;
/// `MOVE.L (A0),D0`, registered by [`table`] as a plain long load.
pub const LOAD_A0: u16 = 0x2010;
pub const CODE: u32 = 0x1000;
pub const SSP: u32 = 0x8000;

/// Flat 16 MB big-endian memory with an optional unmapped window.
pub struct TestBus {
    pub mem: Vec<u8>,
    pub unmapped: Option<Range<u32>>,
    pub wait_cycles: u8,
    pub fcs: Vec<FunctionCode>,
}

/// Route `log` output to the test harness; `RUST_LOG=trace` shows PMMU walks.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

impl TestBus {
    pub fn new() -> Self {
        init_logging();
        Self {
            mem: vec![0; 0x100_0000],
            unmapped: None,
            wait_cycles: 0,
            fcs: Vec::new(),
        }
    }

    fn index(addr: u32) -> usize {
        (addr & 0x00ff_ffff) as usize
    }

    pub fn poke_word(&mut self, addr: u32, value: u16) {
        let i = Self::index(addr);
        self.mem[i..i + 2].copy_from_slice(&value.to_be_bytes());
    }

    pub fn poke_long(&mut self, addr: u32, value: u32) {
        let i = Self::index(addr);
        self.mem[i..i + 4].copy_from_slice(&value.to_be_bytes());
    }

    pub fn peek_word(&self, addr: u32) -> u16 {
        let i = Self::index(addr);
        u16::from_be_bytes([self.mem[i], self.mem[i + 1]])
    }

    pub fn peek_long(&self, addr: u32) -> u32 {
        let i = Self::index(addr);
        u32::from_be_bytes([self.mem[i], self.mem[i + 1], self.mem[i + 2], self.mem[i + 3]])
    }

    pub fn load_words(&mut self, addr: u32, words: &[u16]) {
        for (n, &word) in words.iter().enumerate() {
            self.poke_word(addr + 2 * n as u32, word);
        }
    }

    pub fn fill_nops(&mut self, addr: u32, count: usize) {
        self.load_words(addr, &vec![NOP; count]);
    }

    /// Point `vector` at `handler`.
    pub fn set_vector(&mut self, vector: u8, handler: u32) {
        self.poke_long(u32::from(vector) * 4, handler);
    }

    fn faults(&self, addr: u32) -> bool {
        self.unmapped.as_ref().is_some_and(|r| r.contains(&addr))
    }

    fn read(&mut self, addr: u32, fc: FunctionCode, len: usize) -> BusResult {
        self.fcs.push(fc);
        if self.faults(addr) {
            return BusResult::error();
        }
        let i = Self::index(addr);
        let data = self.mem[i..i + len]
            .iter()
            .fold(0u32, |acc, &b| acc << 8 | u32::from(b));
        BusResult::with_wait(data, self.wait_cycles)
    }

    fn write(&mut self, addr: u32, fc: FunctionCode, bytes: &[u8]) -> BusResult {
        self.fcs.push(fc);
        if self.faults(addr) {
            return BusResult::error();
        }
        let i = Self::index(addr);
        self.mem[i..i + bytes.len()].copy_from_slice(bytes);
        BusResult::write_wait(self.wait_cycles)
    }
}

impl M68kBus for TestBus {
    fn read_byte(&mut self, addr: u32, fc: FunctionCode) -> BusResult {
        self.read(addr, fc, 1)
    }

    fn read_word(&mut self, addr: u32, fc: FunctionCode) -> BusResult {
        self.read(addr, fc, 2)
    }

    fn read_long(&mut self, addr: u32, fc: FunctionCode) -> BusResult {
        self.read(addr, fc, 4)
    }

    fn write_byte(&mut self, addr: u32, value: u8, fc: FunctionCode) -> BusResult {
        self.write(addr, fc, &[value])
    }

    fn write_word(&mut self, addr: u32, value: u16, fc: FunctionCode) -> BusResult {
        self.write(addr, fc, &value.to_be_bytes())
    }

    fn write_long(&mut self, addr: u32, value: u32, fc: FunctionCode) -> BusResult {
        self.write(addr, fc, &value.to_be_bytes())
    }
}

pub fn nop(_cpu: &mut Cpu, _bus: &mut TestBus) -> Result<(), Fault> {
    Ok(())
}

/// `STOP #imm`: load SR from the extension word and sleep.
pub fn stop(cpu: &mut Cpu, bus: &mut TestBus) -> Result<(), Fault> {
    let sr = cpu.read_imm_word(bus)?;
    cpu.set_sr(sr);
    cpu.stop();
    Ok(())
}

pub fn load_a0(cpu: &mut Cpu, bus: &mut TestBus) -> Result<(), Fault> {
    let addr = cpu.registers().a[0];
    let value = cpu.read_long(bus, addr)?;
    cpu.registers_mut().d[0] = value;
    Ok(())
}

/// NOP (4), STOP (4) and the A0 load (12) on every family.
pub fn table() -> OpcodeTable<TestBus> {
    let mut table = OpcodeTable::new();
    table.insert_uniform(0xffff, NOP, nop, 4);
    table.insert_uniform(0xffff, STOP, stop, 4);
    table.insert_uniform(0xffff, LOAD_A0, load_a0, 12);
    table
}

/// A supervisor-mode CPU at `pc` with A7 = [`SSP`], no reset pending.
pub fn cpu_at(pc: u32) -> Cpu {
    let mut cpu = Cpu::new();
    cpu.set_register(Register::A7, SSP);
    cpu.set_register(Register::Pc, pc);
    cpu
}
