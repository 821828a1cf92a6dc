//! A store written by one session must survive being persisted by the host.

use emu_savestate::{MemoryStore, SectionReader, SectionWriter, StateStore};

fn sample() -> MemoryStore {
    let mut store = MemoryStore::new();
    {
        let mut cpu = store.open_for_write("m68k");
        cpu.set("pc", 0x00FC_0030);
        cpu.set("sr", 0x2700);
        cpu.set_i64("remaining_cycles", -6);
        cpu.set_buffer("da", &[0xAA; 64]);
    }
    store.open_for_write("video").set("line", 262);
    store
}

#[test]
fn json_round_trip_preserves_every_section() {
    let store = sample();
    let text = serde_json::to_string(&store).unwrap();
    let back: MemoryStore = serde_json::from_str(&text).unwrap();
    assert_eq!(back, store);
    assert_eq!(back.section_names().collect::<Vec<_>>(), ["m68k", "video"]);
}

#[test]
fn msgpack_round_trip_reads_back_typed_values() {
    let store = sample();
    let bytes = rmp_serde::to_vec(&store).unwrap();
    let back: MemoryStore = rmp_serde::from_slice(&bytes).unwrap();

    let cpu = back.open_for_read("m68k").unwrap();
    assert_eq!(cpu.get_u32("pc").unwrap(), 0x00FC_0030);
    assert_eq!(cpu.get_i64("remaining_cycles").unwrap(), -6);
    let mut da = [0u8; 64];
    cpu.get_buffer("da", &mut da).unwrap();
    assert!(da.iter().all(|&b| b == 0xAA));
    assert_eq!(back.section("video").map(|s| s.len()), Some(1));
}
