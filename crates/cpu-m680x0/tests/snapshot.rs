mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{CODE, LOAD_A0, SSP, STOP, TestBus, table};
use cpu_m680x0::{
    Cpu, CpuModel, Hooks, OpcodeTable, Register, RootPointer, SNAPSHOT_SECTION, StopLevel,
};
use emu_savestate::{MemoryStore, StateError};

/// A 68020 that has taken an interrupt and gone to sleep in its handler,
/// with two virtual sources latched.
fn busy_cpu() -> (Cpu, TestBus) {
    let mut bus = TestBus::new();
    bus.fill_nops(CODE, 64);
    bus.load_words(0x3000, &[STOP, 0x2000]);
    bus.set_vector(26, 0x3000);
    let mut cpu = Cpu::with_model(CpuModel::M68020);
    cpu.set_register(Register::A7, SSP);
    cpu.set_register(Register::Pc, CODE);
    cpu.set_register(Register::Usp, 0x0000_f000);
    cpu.set_register(Register::Msp, 0x0000_c000);
    cpu.set_register(Register::Sr, 0x2000);
    cpu.set_register(Register::Vbr, 0);
    cpu.set_register(Register::Cacr, 0x0101);
    for n in 0..7 {
        cpu.registers_mut().d[n] = 0x0101_0101 * n as u32;
    }
    cpu.set_virq(2, true);
    cpu.set_virq(1, true);

    cpu.execute(&mut bus, &table(), 100).unwrap();
    assert_eq!(cpu.stop_level(), StopLevel::STOP);
    (cpu, bus)
}

fn saved(cpu: &Cpu) -> MemoryStore {
    let mut store = MemoryStore::new();
    cpu.save_state(&mut store);
    store
}

#[test]
fn restore_reproduces_the_context_exactly() {
    let (cpu, _bus) = busy_cpu();
    let store = saved(&cpu);

    let mut restored = Cpu::new();
    restored.load_state(&store).unwrap();

    assert_eq!(restored.model(), CpuModel::M68020);
    assert_eq!(restored.context(), cpu.context());
    assert_eq!(saved(&restored), store);
}

#[test]
fn state_survives_json_persistence() {
    let (cpu, _bus) = busy_cpu();
    let text = serde_json::to_string(&saved(&cpu)).unwrap();

    let store: MemoryStore = serde_json::from_str(&text).unwrap();
    let mut restored = Cpu::new();
    restored.load_state(&store).unwrap();

    assert_eq!(restored.context(), cpu.context());
}

#[test]
fn restored_cpu_continues_identically() {
    let (mut cpu, mut bus) = busy_cpu();
    let mut twin = Cpu::new();
    twin.load_state(&saved(&cpu)).unwrap();
    let mut twin_bus = TestBus::new();
    twin_bus.mem.clone_from(&bus.mem);

    cpu.set_irq(3);
    twin.set_irq(3);
    bus.set_vector(27, CODE);
    twin_bus.set_vector(27, CODE);
    cpu.execute(&mut bus, &table(), 60).unwrap();
    twin.execute(&mut twin_bus, &table(), 60).unwrap();

    assert_eq!(twin.context(), cpu.context());
    assert_eq!(twin_bus.mem, bus.mem);
}

#[test]
fn context_swap_restores_the_earlier_cpu() {
    let (mut cpu, mut bus) = busy_cpu();
    let before = cpu.context();

    cpu.set_irq(7);
    cpu.execute(&mut bus, &table(), 80).unwrap();
    assert_ne!(cpu.context(), before);

    cpu.set_context(before.clone());
    assert_eq!(cpu.context(), before);
    assert_eq!(cpu.registers().pc, before.registers().pc);
}

#[test]
fn loading_from_an_empty_store_fails() {
    let mut cpu = Cpu::new();
    let err = cpu.load_state(&MemoryStore::new()).unwrap_err();
    assert_eq!(err, StateError::MissingSection(SNAPSHOT_SECTION.to_string()));
}

/// Rewrite one scalar in the persisted form of `store`.
fn edit_scalar(store: &MemoryStore, key: &str, value: Option<u64>) -> MemoryStore {
    let mut json = serde_json::to_value(store).unwrap();
    let scalars = json["sections"][SNAPSHOT_SECTION]["scalars"]
        .as_object_mut()
        .unwrap();
    match value {
        Some(v) => {
            scalars.insert(key.to_string(), v.into());
        }
        None => {
            scalars.remove(key);
        }
    }
    serde_json::from_value(json).unwrap()
}

#[test]
fn missing_key_is_reported_by_name() {
    let (cpu, _bus) = busy_cpu();
    let store = edit_scalar(&saved(&cpu), "vbr", None);

    let err = Cpu::new().load_state(&store).unwrap_err();

    assert_eq!(
        err,
        StateError::MissingKey {
            section: SNAPSHOT_SECTION.to_string(),
            key: "vbr".to_string(),
        }
    );
}

#[test]
fn unknown_cpu_type_is_rejected_before_anything_changes() {
    let (cpu, _bus) = busy_cpu();
    let store = edit_scalar(&saved(&cpu), "cpu_type", Some(99));

    let mut target = Cpu::new();
    let untouched = target.context();
    let err = target.load_state(&store).unwrap_err();

    assert_eq!(
        err,
        StateError::OutOfRange {
            key: "cpu_type".to_string(),
            value: 99,
        }
    );
    assert_eq!(target.context(), untouched);
}

/// A 68010 with enough non-default state that a partial restore shows.
fn bystander() -> Cpu {
    let mut cpu = Cpu::with_model(CpuModel::M68010);
    cpu.set_register(Register::A7, 0x0000_7000);
    cpu.set_register(Register::Pc, 0x0000_2000);
    cpu.set_register(Register::D3, 0x3333_3333);
    cpu.set_register(Register::Vbr, 0x0000_0400);
    cpu
}

fn assert_rejected_untouched(store: &MemoryStore, key: &str, value: u64) {
    let mut target = bystander();
    let untouched = target.context();

    let err = target.load_state(store).unwrap_err();

    assert_eq!(
        err,
        StateError::OutOfRange {
            key: key.to_string(),
            value,
        }
    );
    assert_eq!(target.context(), untouched);
    assert_eq!(target.model(), CpuModel::M68010);
}

#[test]
fn invalid_stop_bits_are_out_of_range() {
    let (cpu, _bus) = busy_cpu();
    let store = edit_scalar(&saved(&cpu), "stopped", Some(0x10));

    assert_rejected_untouched(&store, "stopped", 0x10);
}

#[test]
fn interrupt_level_must_be_a_shifted_level() {
    let (cpu, _bus) = busy_cpu();
    let store = saved(&cpu);

    assert_rejected_untouched(&edit_scalar(&store, "int_level", Some(0x150)), "int_level", 0x150);
    assert_rejected_untouched(&edit_scalar(&store, "int_level", Some(0x800)), "int_level", 0x800);
}

#[test]
fn virtual_irq_state_is_limited_to_eight_lines() {
    let (cpu, _bus) = busy_cpu();
    let store = edit_scalar(&saved(&cpu), "virq_state", Some(0x100));

    assert_rejected_untouched(&store, "virq_state", 0x100);
}

#[test]
fn status_register_wider_than_16_bits_is_rejected() {
    let (cpu, _bus) = busy_cpu();
    let store = edit_scalar(&saved(&cpu), "sr", Some(0x1_2000));

    assert_rejected_untouched(&store, "sr", 0x1_2000);
}

#[test]
fn failed_restore_does_not_announce_a_pc() {
    let (cpu, _bus) = busy_cpu();
    let store = edit_scalar(&saved(&cpu), "run_mode", Some(7));
    let last = Rc::new(Cell::new(None));
    let mut target = bystander();
    target.set_hooks(Box::new(PcWatch {
        last: Rc::clone(&last),
    }));

    assert!(target.load_state(&store).is_err());
    assert_eq!(last.get(), None);
}

#[derive(Default)]
struct PcWatch {
    last: Rc<Cell<Option<u32>>>,
}

impl Hooks for PcWatch {
    fn pc_changed(&mut self, pc: u32) {
        self.last.set(Some(pc));
    }
}

#[test]
fn restore_announces_the_pc_to_hooks() {
    let (cpu, _bus) = busy_cpu();
    let store = saved(&cpu);
    let last = Rc::new(Cell::new(None));
    let mut target = Cpu::new();
    target.set_hooks(Box::new(PcWatch {
        last: Rc::clone(&last),
    }));

    target.load_state(&store).unwrap();

    assert_eq!(last.get(), Some(cpu.pc()));
}

// === PMMU state ===

const ROOT_TABLE: u32 = 0x6000;
const OPERANDS: u32 = 0x5000;

/// `PMOVE (An),<reg>` with the given mode word.
const fn pmove_an(reg: u16) -> u16 {
    0xf010 | reg
}

/// A 68030 that loaded CRP, SRP and PSR and then turned translation on.
/// Its root table maps `0x01xxxxxx` onto `0x002xxxxx`.
fn translating_cpu() -> (Cpu, TestBus, OpcodeTable<TestBus>) {
    let mut bus = TestBus::new();
    bus.fill_nops(CODE, 64);
    bus.load_words(
        CODE,
        &[
            pmove_an(2),
            0x4c00, // CRP
            pmove_an(4),
            0x4800, // SRP
            pmove_an(5),
            0x6000, // PSR
            pmove_an(3),
            0x4000, // TC
            LOAD_A0,
        ],
    );
    bus.poke_long(OPERANDS, 0x0000_0002);
    bus.poke_long(OPERANDS + 4, ROOT_TABLE);
    bus.poke_long(OPERANDS + 8, 0x8000_8000);
    bus.poke_long(OPERANDS + 16, 0x0000_0003);
    bus.poke_long(OPERANDS + 20, 0x0000_7000);
    bus.poke_long(OPERANDS + 24, 0x0000_8400);
    bus.poke_long(ROOT_TABLE, 0x0000_0001);
    bus.poke_long(ROOT_TABLE + 4, 0x0020_0001);
    bus.poke_long(0x0020_0040, 0xcafe_f00d);
    bus.poke_long(0x0000_0040, 0x1111_1111);

    let mut table = table();
    table.install_pmmu();
    let mut cpu = Cpu::with_model(CpuModel::M68030);
    cpu.set_register(Register::A7, SSP);
    cpu.set_register(Register::Pc, CODE);
    cpu.set_register(Register::A0, 0x0100_0040);
    cpu.set_register(Register::A2, OPERANDS);
    cpu.set_register(Register::A3, OPERANDS + 8);
    cpu.set_register(Register::A4, OPERANDS + 16);
    cpu.set_register(Register::A5, OPERANDS + 24);
    for _ in 0..4 {
        cpu.execute(&mut bus, &table, 1).unwrap();
    }
    (cpu, bus, table)
}

#[test]
fn restored_pmmu_translates_like_the_original() {
    let (cpu, mut bus, table) = translating_cpu();
    assert!(cpu.mmu().enabled);
    assert_eq!(cpu.mmu().tc, 0x8000_8000);
    assert_eq!(
        cpu.mmu().srp,
        RootPointer {
            limit: 3,
            pointer: 0x7000
        }
    );
    assert_eq!(cpu.mmu().sr, 0x8400);

    let mut restored = Cpu::new();
    restored.load_state(&saved(&cpu)).unwrap();
    assert_eq!(restored.model(), CpuModel::M68030);
    assert_eq!(restored.context(), cpu.context());

    restored.execute(&mut bus, &table, 1).unwrap();

    assert_eq!(restored.register(Register::D0), 0xcafe_f00d);
    assert_eq!(restored.register(Register::Pc), CODE + 18);
}
