#![no_main]
use irtree::{AddressIndex, IndexConfig, IndexEntry, OverlapStrategy};
use libfuzzer_sys::fuzz_target;

fn index(strategy: OverlapStrategy) -> AddressIndex<u32> {
    AddressIndex::with_config(&IndexConfig {
        overlap_strategy: strategy,
    })
}

fn word(chunk: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..chunk.len()].copy_from_slice(chunk);
    u64::from_le_bytes(buf)
}

// Each 9-byte record is an opcode plus operand. Both strategies must agree
// on every query.
fuzz_target!(|data: &[u8]| {
    let mut scan = index(OverlapStrategy::Scan);
    let mut augmented = index(OverlapStrategy::Augmented);
    let mut live: Vec<IndexEntry<u32>> = Vec::new();
    let mut next_id = 0u32;

    for record in data.chunks(9) {
        let (op, rest) = match record.split_first() {
            Some(split) => split,
            None => continue,
        };
        let operand = word(rest);
        match op % 4 {
            0 => {
                let address = if op & 0x80 == 0 { Some(operand >> 8) } else { None };
                let entry = IndexEntry::new(next_id, address, operand & 0xffff);
                next_id += 1;
                scan.insert_entry(entry);
                augmented.insert_entry(entry);
                live.push(entry);
            }
            1 if !live.is_empty() => {
                let victim = live.remove(operand as usize % live.len());
                assert!(scan.remove_at(victim.key(), victim.id));
                assert!(augmented.remove_at(victim.key(), victim.id));
            }
            2 => {
                let address = operand >> 8;
                assert_eq!(scan.query_containing(address), augmented.query_containing(address));
            }
            _ => {
                let lo = operand >> 8;
                let hi = lo.saturating_add(operand & 0xff);
                assert_eq!(
                    scan.query_containing_range(lo, hi),
                    augmented.query_containing_range(lo, hi)
                );
            }
        }
    }

    assert_eq!(scan.len(), live.len());
    assert!(scan.iter().eq(augmented.iter()));
});
