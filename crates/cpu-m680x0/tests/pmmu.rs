mod common;

use common::{CODE, LOAD_A0, SSP, TestBus, table};
use cpu_m680x0::{
    Cpu, CpuModel, EaAccess, Error, OpcodeTable, Register, RootPointer, TableLevel,
};

const ROOT_TABLE: u32 = 0x6000;
const OPERANDS: u32 = 0x5000;
const TC_8BIT_LEVEL_A: u32 = 0x8000_8000;

/// `PMOVE (An),<reg>` / `PMOVE <reg>,(An)` opcode words.
const fn pmove_an(reg: u16) -> u16 {
    0xf010 | reg
}

const LOAD_CRP: u16 = 0x4c00;
const LOAD_TC: u16 = 0x4000;
const STORE_TC: u16 = 0x4200;

fn pmmu_table() -> OpcodeTable<TestBus> {
    let mut table = table();
    table.install_pmmu();
    table
}

fn m68030_at(pc: u32) -> Cpu {
    let mut cpu = Cpu::with_model(CpuModel::M68030);
    cpu.set_register(Register::A7, SSP);
    cpu.set_register(Register::Pc, pc);
    cpu
}

/// Level A resolves the top 8 bits with early-termination page descriptors:
/// `0x00xxxxxx` is identity mapped and `0x01xxxxxx` lands at `0x002xxxxx`.
fn bus_with_tables() -> TestBus {
    let mut bus = TestBus::new();
    bus.fill_nops(CODE, 64);
    bus.poke_long(OPERANDS, 0x0000_0002);
    bus.poke_long(OPERANDS + 4, ROOT_TABLE);
    bus.poke_long(OPERANDS + 8, TC_8BIT_LEVEL_A);
    bus.poke_long(ROOT_TABLE, 0x0000_0001);
    bus.poke_long(ROOT_TABLE + 4, 0x0020_0001);
    bus
}

#[test]
fn pmove_loads_root_pointer_and_enables_translation() {
    let mut bus = bus_with_tables();
    bus.load_words(
        CODE,
        &[pmove_an(2), LOAD_CRP, pmove_an(3), LOAD_TC, LOAD_A0],
    );
    bus.poke_long(0x0020_0040, 0xcafe_f00d);
    bus.poke_long(0x0000_0040, 0x1111_1111);
    let mut cpu = m68030_at(CODE);
    cpu.set_register(Register::A0, 0x0100_0040);
    cpu.set_register(Register::A2, OPERANDS);
    cpu.set_register(Register::A3, OPERANDS + 8);

    cpu.execute(&mut bus, &pmmu_table(), 8 + 8 + 12).unwrap();

    assert_eq!(
        cpu.mmu().crp,
        RootPointer {
            limit: 2,
            pointer: ROOT_TABLE
        }
    );
    assert!(cpu.mmu().enabled);
    assert_eq!(cpu.mmu().tc, TC_8BIT_LEVEL_A);
    assert_eq!(cpu.register(Register::D0), 0xcafe_f00d);
    assert_eq!(cpu.register(Register::Pc), CODE + 10);
}

#[test]
fn pmove_stores_tc_through_translation() {
    let mut bus = bus_with_tables();
    bus.load_words(
        CODE,
        &[pmove_an(2), LOAD_CRP, pmove_an(3), LOAD_TC, pmove_an(4), STORE_TC],
    );
    let mut cpu = m68030_at(CODE);
    cpu.set_register(Register::A2, OPERANDS);
    cpu.set_register(Register::A3, OPERANDS + 8);
    cpu.set_register(Register::A4, 0x0100_0100);

    cpu.execute(&mut bus, &pmmu_table(), 24).unwrap();

    assert_eq!(bus.peek_long(0x0020_0100), TC_8BIT_LEVEL_A);
    assert_eq!(bus.peek_long(0x0000_0100), 0);
}

#[test]
fn clearing_tc_enable_turns_translation_off() {
    let mut bus = bus_with_tables();
    bus.poke_long(OPERANDS + 12, 0);
    bus.load_words(
        CODE,
        &[pmove_an(2), LOAD_CRP, pmove_an(3), LOAD_TC, pmove_an(3), LOAD_TC],
    );
    let mut cpu = m68030_at(CODE);
    cpu.set_register(Register::A2, OPERANDS);
    cpu.set_register(Register::A3, OPERANDS + 8);

    cpu.execute(&mut bus, &pmmu_table(), 16).unwrap();
    assert!(cpu.mmu().enabled);

    cpu.set_register(Register::A3, OPERANDS + 12);
    cpu.execute(&mut bus, &pmmu_table(), 8).unwrap();
    assert!(!cpu.mmu().enabled);
    assert_eq!(cpu.mmu().tc, 0);
}

#[test]
fn unknown_pmove_register_stops_the_slice() {
    let mut bus = bus_with_tables();
    bus.load_words(CODE, &[0x4e71, pmove_an(2), 0x4400]);
    let mut cpu = m68030_at(CODE);
    cpu.set_register(Register::A2, OPERANDS);

    let err = cpu.execute(&mut bus, &pmmu_table(), 100).unwrap_err();

    assert_eq!(err, Error::UnknownMmuRegister { reg: 1, pc: CODE + 2 });
    assert_eq!(cpu.register(Register::Ppc), CODE + 2);
}

#[test]
fn pc_indexed_root_pointer_source_is_rejected() {
    let mut bus = bus_with_tables();
    bus.load_words(CODE, &[0xf03b, LOAD_CRP, 0x0000]);
    let mut cpu = m68030_at(CODE);

    let err = cpu.execute(&mut bus, &pmmu_table(), 100).unwrap_err();

    assert!(matches!(
        err,
        Error::UnsupportedEa {
            access: EaAccess::Read64,
            mode: 7,
            reg: 3,
            ..
        }
    ));
}

#[test]
fn conditional_branches_are_ignored() {
    let mut bus = bus_with_tables();
    bus.load_words(CODE, &[0xf081]);
    let mut cpu = m68030_at(CODE);

    cpu.execute(&mut bus, &pmmu_table(), 1).unwrap();

    assert_eq!(cpu.register(Register::Pc), CODE + 2);
}

#[test]
fn enabling_without_a_valid_root_is_fatal() {
    let mut bus = bus_with_tables();
    bus.load_words(CODE, &[pmove_an(3), LOAD_TC]);
    let mut cpu = m68030_at(CODE);
    cpu.set_register(Register::A3, OPERANDS + 8);

    let err = cpu.execute(&mut bus, &pmmu_table(), 100).unwrap_err();

    assert_eq!(
        err,
        Error::Translation {
            level: TableLevel::Root,
            tag: 0,
            address: CODE + 4,
            pc: CODE + 4,
        }
    );
}

#[test]
fn models_without_a_pmmu_take_line_f() {
    let mut bus = bus_with_tables();
    bus.set_vector(11, 0x3000);
    bus.fill_nops(0x3000, 4);
    bus.load_words(CODE, &[pmove_an(3), LOAD_TC]);
    let mut cpu = Cpu::with_model(CpuModel::M68EC030);
    cpu.set_register(Register::A7, SSP);
    cpu.set_register(Register::Pc, CODE);
    cpu.set_register(Register::A3, OPERANDS + 8);

    cpu.execute(&mut bus, &pmmu_table(), 1).unwrap();

    assert_eq!(cpu.register(Register::Pc), 0x3000);
    assert!(!cpu.mmu().enabled);
}

#[test]
fn reset_disables_translation() {
    let mut bus = bus_with_tables();
    bus.poke_long(0, SSP);
    bus.poke_long(4, CODE);
    bus.load_words(CODE, &[pmove_an(2), LOAD_CRP, pmove_an(3), LOAD_TC]);
    let mut cpu = m68030_at(CODE);
    cpu.set_register(Register::A2, OPERANDS);
    cpu.set_register(Register::A3, OPERANDS + 8);
    cpu.execute(&mut bus, &pmmu_table(), 16).unwrap();
    assert!(cpu.mmu().enabled);

    cpu.pulse_reset(&mut bus);

    assert!(!cpu.mmu().enabled);
    assert_eq!(cpu.register(Register::Pc), CODE);
}
