//! Tests for the priority selector against a sorted reference model

use prometheus_job_scheduler::infra::queue::{PrioritySelector, Sequence};
use rand::Rng;

/// Reference: stable sort by descending priority keeps arrival order among ties.
fn reference_order(items: &[(usize, i64)]) -> Vec<usize> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    sorted.into_iter().map(|(seq, _)| seq).collect()
}

#[test]
fn test_random_insertions_match_stable_sort() {
    let mut rng = rand::rng();
    for _ in 0..50 {
        let len = rng.random_range(0..64);
        let items: Vec<(usize, i64)> = (0..len).map(|seq| (seq, rng.random_range(-3..4))).collect();

        let mut selector = PrioritySelector::new();
        for &(seq, priority) in &items {
            selector.insert(seq, priority);
        }

        let mut extracted = Vec::with_capacity(len);
        while let Some(seq) = selector.extract_highest() {
            extracted.push(seq);
        }
        assert_eq!(extracted, reference_order(&items));
    }
}

#[test]
fn test_interleaved_insert_and_extract() {
    let mut rng = rand::rng();
    let mut selector = PrioritySelector::new();
    let mut model: Vec<(usize, i64)> = Vec::new();

    for seq in 0..500 {
        if rng.random_bool(0.6) || model.is_empty() {
            let priority = rng.random_range(0..5);
            selector.insert(seq, priority);
            model.push((seq, priority));
        } else {
            let expected = reference_order(&model)[0];
            model.retain(|&(s, _)| s != expected);
            assert_eq!(selector.extract_highest(), Some(expected));
        }
        assert_eq!(selector.len(), model.len());
    }
}

#[test]
fn test_retain_keeps_relative_order() {
    let mut selector = PrioritySelector::new();
    for (value, priority) in [("a", 1), ("b", 2), ("c", 1), ("d", 2), ("e", 1)] {
        selector.insert(value, priority);
    }

    let removed = selector.retain(|value, _| *value != "b");
    assert_eq!(removed, 1);

    let mut out = Vec::new();
    while let Some(value) = selector.extract_highest() {
        out.push(value);
    }
    assert_eq!(out, vec!["d", "a", "c", "e"]);
}

#[test]
fn test_sequence_fifo() {
    let mut seq: Sequence<u32> = (1..=3).collect();
    seq.push(4);
    assert_eq!(seq.peek_front(), Some(&1));
    assert_eq!(seq.remove_at(1), Some(2));
    assert_eq!(seq.iter().copied().collect::<Vec<_>>(), vec![1, 3, 4]);
    assert_eq!(seq.pop(), Some(1));
    assert_eq!(seq.len(), 2);
}
