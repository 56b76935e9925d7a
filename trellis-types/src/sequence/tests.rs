use super::*;
use crate::Node;

#[derive(Debug, Clone, Default, PartialEq)]
struct Item {
    key: i32,
    tag: u32,
}

impl Keyed for Item {
    fn key(&self) -> i32 {
        self.key
    }
    fn set_key(&mut self, key: i32) {
        self.key = key;
    }
}

fn item(key: i32, tag: u32) -> Item {
    Item { key, tag }
}

fn keys<T: Keyed>(seq: &PositionIndexedSequence<T>) -> Vec<i32> {
    seq.iter().map(Keyed::key).collect()
}

fn assert_ordered<T: Keyed>(seq: &PositionIndexedSequence<T>) {
    let k = keys(seq);
    assert!(
        k.windows(2).all(|w| w[0] <= w[1]),
        "sequence out of order: {:?}",
        k
    );
}

fn seq_of(key_list: &[i32]) -> PositionIndexedSequence<Item> {
    PositionIndexedSequence::from_sorted(key_list.iter().map(|&k| item(k, 0)).collect())
        .expect("sorted input")
}

/// Fixed-seed xorshift so stress runs are reproducible.
struct XorShift(u32);

impl XorShift {
    fn next(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    fn below(&mut self, n: u32) -> u32 {
        self.next() % n
    }
}

fn naive_geq(key_list: &[i32], key: i32) -> usize {
    key_list.iter().position(|&k| k >= key).unwrap_or(key_list.len())
}

#[test]
fn search_geq_and_less() {
    let seq = seq_of(&[10, 20, 30]);
    assert_eq!(seq.search(5, Comparison::GreaterOrEqual), 0);
    assert_eq!(seq.search(10, Comparison::GreaterOrEqual), 0);
    assert_eq!(seq.search(11, Comparison::GreaterOrEqual), 1);
    assert_eq!(seq.search(31, Comparison::GreaterOrEqual), 3);
    assert_eq!(seq.search(10, Comparison::Less), -1);
    assert_eq!(seq.search(25, Comparison::Less), 1);
    assert_eq!(seq.search_less(10), None);
    assert_eq!(seq.search_less(11), Some(0));
}

#[test]
fn search_on_empty_sequence() {
    let seq: PositionIndexedSequence<Item> = PositionIndexedSequence::new();
    assert_eq!(seq.search(0, Comparison::GreaterOrEqual), 0);
    assert_eq!(seq.search(0, Comparison::Less), -1);
    assert_eq!(seq.search_exact(0), None);
    assert_eq!(seq.search_dual(0, 10), (0, 0));
}

#[test]
fn search_exact_finds_only_matching_keys() {
    let seq = seq_of(&[0, 5, 9]);
    assert_eq!(seq.search_exact(5), Some(1));
    assert_eq!(seq.search_exact(6), None);
    assert_eq!(seq.search_exact(100), None);
}

#[test]
fn duplicate_keys_resolve_leftmost_and_rightmost() {
    let seq = PositionIndexedSequence::from_sorted(vec![
        item(1, 0),
        item(4, 1),
        item(4, 2),
        item(4, 3),
        item(8, 4),
    ])
    .unwrap();
    assert_eq!(seq.search(4, Comparison::GreaterOrEqual), 1);
    assert_eq!(seq.search(4, Comparison::Less), 0);
    assert_eq!(seq.search(5, Comparison::Less), 3);
    assert_eq!(seq.search_exact(4), Some(1));
}

#[test]
fn search_dual_matches_two_single_searches() {
    let seq = seq_of(&[0, 3, 3, 7, 12, 12, 15, 40]);
    for low in -1..45 {
        for high in low..45 {
            assert_eq!(
                seq.search_dual(low, high),
                (seq.search_geq(low), seq.search_geq(high)),
                "low {} high {}",
                low,
                high
            );
        }
    }
}

#[test]
fn search_multiple_matches_single_searches() {
    let key_list: Vec<i32> = (0..200).map(|i| i * 3).collect();
    let seq = seq_of(&key_list);
    let terms = [-5, 0, 0, 1, 2, 90, 91, 300, 301, 301, 597, 598, 1000];
    let mut results = [0usize; 13];
    seq.search_multiple(&terms, &mut results, None);
    for (term, result) in terms.iter().zip(results.iter()) {
        assert_eq!(*result, seq.search_geq(*term), "term {}", term);
    }
}

#[test]
fn search_multiple_respects_range_end() {
    let seq = seq_of(&[0, 10, 20, 30, 40]);
    let terms = [5, 25, 45];
    let mut results = [0usize; 3];
    seq.search_multiple(&terms, &mut results, Some(3));
    assert_eq!(results, [1, 3, 3]);
}

#[test]
fn insert_at_key_keeps_order() {
    let mut seq: PositionIndexedSequence<Item> = PositionIndexedSequence::new();
    for k in [50, 10, 30, 70, 20] {
        seq.insert_at_key(k, false).unwrap();
        assert_ordered(&seq);
    }
    assert_eq!(keys(&seq), vec![10, 20, 30, 50, 70]);

    let i = seq.insert_at_key(90, true).unwrap();
    assert_eq!(i, 5);
    assert_ordered(&seq);
}

#[test]
fn insert_places_duplicates_before_existing() {
    let mut seq = seq_of(&[10, 20]);
    let i = seq.insert(item(20, 7)).unwrap();
    assert_eq!(i, 1);
    assert_eq!(seq.get(1).map(|e| e.tag), Some(7));
}

#[test]
fn insert_at_index_rejects_out_of_order() {
    let mut seq = seq_of(&[10, 20, 30]);
    assert_eq!(
        seq.insert_at_index(1, item(25, 0)),
        Err(SequenceError::InvariantViolation { index: 1, key: 25 })
    );
    assert_eq!(keys(&seq), vec![10, 20, 30]);
    seq.insert_at_index(2, item(25, 0)).unwrap();
    assert_eq!(keys(&seq), vec![10, 20, 25, 30]);
}

#[test]
fn insert_at_index_past_end_is_refused() {
    let mut seq = seq_of(&[1, 2]);
    assert_eq!(
        seq.insert_at_index(5, item(9, 0)),
        Err(SequenceError::InvariantViolation { index: 5, key: 9 })
    );
    assert_eq!(keys(&seq), vec![1, 2]);
    seq.insert_at_index(2, item(9, 0)).unwrap();
    assert_eq!(keys(&seq), vec![1, 2, 9]);
}

#[test]
fn push_in_order_refuses_descending_key() {
    let mut seq = PositionIndexedSequence::new();
    seq.push_in_order(item(0, 0)).unwrap();
    seq.push_in_order(item(5, 0)).unwrap();
    seq.push_in_order(item(5, 0)).unwrap();
    assert!(seq.push_in_order(item(4, 0)).is_err());
    assert_eq!(keys(&seq), vec![0, 5, 5]);
}

#[test]
fn delete_at_key_and_index() {
    let mut seq = seq_of(&[1, 2, 3, 4, 5]);
    assert!(seq.delete_at_key(3));
    assert!(!seq.delete_at_key(3));
    assert_ordered(&seq);
    seq.delete_at_index(1, 2);
    assert_eq!(keys(&seq), vec![1, 5]);
    // Overlong count is clamped
    seq.delete_at_index(1, 10);
    assert_eq!(keys(&seq), vec![1]);
    seq.delete_at_index(4, 1);
    assert_eq!(keys(&seq), vec![1]);
}

#[test]
fn truncate_from_key_drops_tail() {
    let mut seq = seq_of(&[0, 10, 20, 30]);
    seq.truncate_from_key(15);
    assert_eq!(keys(&seq), vec![0, 10]);
}

#[test]
fn shift_horizontal_zero_is_identity() {
    let mut seq = seq_of(&[0, 10, 60, 99]);
    seq.shift_horizontal(0, 100);
    assert_eq!(keys(&seq), vec![0, 10, 60, 99]);
    seq.shift_horizontal(300, 100);
    assert_eq!(keys(&seq), vec![0, 10, 60, 99]);
}

#[test]
fn shift_horizontal_rotates_keys() {
    let mut seq = PositionIndexedSequence::from_sorted(vec![
        item(10, 1),
        item(40, 2),
        item(80, 3),
    ])
    .unwrap();
    seq.shift_horizontal(30, 100);
    assert_eq!(keys(&seq), vec![10, 40, 70]);
    let tags: Vec<u32> = seq.iter().map(|e| e.tag).collect();
    assert_eq!(tags, vec![3, 1, 2]);

    seq.shift_horizontal(-30, 100);
    assert_eq!(keys(&seq), vec![10, 40, 80]);
    let tags: Vec<u32> = seq.iter().map(|e| e.tag).collect();
    assert_eq!(tags, vec![1, 2, 3]);
}

#[test]
fn shift_horizontal_round_trip_for_many_amounts() {
    let original = [0, 1, 17, 32, 50, 63, 95];
    for length in [96, 100, 384] {
        for amount in -2 * length..=2 * length {
            let mut seq = seq_of(&original);
            seq.shift_horizontal(amount, length);
            assert_ordered(&seq);
            assert!(seq.iter().all(|e| e.key >= 0 && e.key < length));
            seq.shift_horizontal(-amount, length);
            assert_eq!(keys(&seq), original, "amount {} length {}", amount, length);
        }
    }
}

#[test]
fn generate_repeats_tiles_one_cycle() {
    let mut seq = seq_of(&[10, 40, 70]);
    seq.generate_repeats(100, 250).unwrap();
    assert_eq!(keys(&seq), vec![10, 40, 70, 110, 140, 170, 210, 240]);
    assert!(seq.iter().all(|e| e.key < 250));
}

#[test]
fn generate_repeats_discards_keys_past_wrap_point() {
    let mut seq = seq_of(&[0, 50, 120, 180]);
    seq.generate_repeats(100, 200).unwrap();
    assert_eq!(keys(&seq), vec![0, 50, 100, 150]);
}

#[test]
fn generate_repeats_shorter_than_one_cycle_truncates() {
    let mut seq = seq_of(&[0, 30, 60, 90]);
    seq.generate_repeats(100, 50).unwrap();
    assert_eq!(keys(&seq), vec![0, 30]);
}

#[test]
fn generate_repeats_copies_payloads() {
    let mut seq: PositionIndexedSequence<Node> =
        PositionIndexedSequence::from_sorted(vec![Node::new(0, -3), Node::interpolating(5, 9)])
            .unwrap();
    seq.generate_repeats(10, 30).unwrap();
    let nodes: Vec<Node> = seq.iter().copied().collect();
    assert_eq!(nodes.len(), 6);
    assert_eq!(nodes[4], Node::new(20, -3));
    assert_eq!(nodes[5], Node::interpolating(25, 9));
}

#[test]
fn swap_with_exchanges_storage() {
    let mut a = seq_of(&[1, 2]);
    let mut b = seq_of(&[7]);
    a.swap_with(&mut b);
    assert_eq!(keys(&a), vec![7]);
    assert_eq!(keys(&b), vec![1, 2]);

    let taken = b.take();
    assert!(b.is_empty());
    assert_eq!(keys(&taken), vec![1, 2]);
}

#[test]
fn try_clone_is_independent() {
    let original = seq_of(&[3, 6]);
    let mut copy = original.try_clone().unwrap();
    copy.insert_at_key(4, false).unwrap();
    assert_eq!(keys(&original), vec![3, 6]);
    assert_eq!(keys(&copy), vec![3, 4, 6]);
}

#[test]
fn check_sequentiality_strictness() {
    let seq = seq_of(&[1, 1, 2]);
    assert!(seq.check_sequentiality(false).is_ok());
    assert_eq!(
        seq.check_sequentiality(true),
        Err(SequenceError::InvariantViolation { index: 1, key: 1 })
    );
}

#[test]
fn deserialize_rejects_unsorted_input() {
    let ok: PositionIndexedSequence<Node> =
        serde_json::from_str(r#"[{"pos":0,"value":1,"interpolated":false}]"#).unwrap();
    assert_eq!(ok.len(), 1);

    let bad: Result<PositionIndexedSequence<Node>, _> = serde_json::from_str(
        r#"[{"pos":5,"value":1,"interpolated":false},{"pos":2,"value":1,"interpolated":false}]"#,
    );
    assert!(bad.is_err());

    let round_trip = serde_json::to_string(&ok).unwrap();
    assert!(round_trip.starts_with('['));
}

#[test]
fn stress_random_inserts_deletes_and_searches() {
    let mut rng = XorShift(0x2545_f491);
    let mut seq: PositionIndexedSequence<Item> = PositionIndexedSequence::new();
    let mut model: Vec<i32> = Vec::new();

    for step in 0..4000u32 {
        match rng.below(5) {
            0 | 1 | 2 => {
                // Small key range forces plenty of duplicates
                let key = rng.below(64) as i32;
                seq.insert(item(key, step)).unwrap();
                let at = naive_geq(&model, key);
                model.insert(at, key);
            }
            3 => {
                let key = rng.below(64) as i32;
                let removed = seq.delete_at_key(key);
                let at = model.iter().position(|&k| k == key);
                assert_eq!(removed, at.is_some());
                if let Some(at) = at {
                    model.remove(at);
                }
            }
            _ => {
                let length = 64;
                let amount = rng.below(200) as i32 - 100;
                seq.shift_horizontal(amount, length);
                let mut shifted: Vec<i32> = model
                    .iter()
                    .map(|&k| (k + amount).rem_euclid(length))
                    .collect();
                shifted.sort_unstable();
                model = shifted;
            }
        }

        assert_ordered(&seq);
        assert_eq!(keys(&seq), model);

        let probe = rng.below(70) as i32 - 3;
        let geq = naive_geq(&model, probe);
        assert_eq!(seq.search(probe, Comparison::GreaterOrEqual), geq as isize);
        assert_eq!(seq.search(probe, Comparison::Less), geq as isize - 1);
    }

    let mut terms: Vec<i32> = (0..20).map(|_| rng.below(70) as i32 - 3).collect();
    terms.sort_unstable();
    let mut results = vec![0usize; terms.len()];
    seq.search_multiple(&terms, &mut results, None);
    for (term, result) in terms.iter().zip(results.iter()) {
        assert_eq!(*result, naive_geq(&model, *term));
    }
}
