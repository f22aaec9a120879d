//! Merges extractions recovered across multiple extraction passes.
//!
//! Running the same chunk through the model several times (`extraction_passes
//! > 1`) trades cost for recall: different passes surface different
//! entities. Passes are merged first-pass-wins, but only extractions of the
//! *same class* are considered overlapping — a `location` span fully nested
//! inside a `dialogue` span from an earlier pass is a legitimate, separate
//! extraction, not a duplicate.

use crate::data::{CharInterval, Extraction};

/// Merges extractions from multiple extraction passes.
///
/// When extractions from different passes overlap in character position
/// *and* share an `extraction_class`, the earliest pass's extraction wins.
/// Extractions of a different class are always kept, even if their spans
/// overlap or nest, since classes are independent semantic layers over the
/// same text.
pub fn merge_non_overlapping_extractions(all_extractions: &[Vec<Extraction>]) -> Vec<Extraction> {
    if all_extractions.is_empty() {
        return vec![];
    }
    if all_extractions.len() == 1 {
        return all_extractions[0].clone();
    }

    let mut merged: Vec<Extraction> = all_extractions[0].clone();
    for pass_extractions in &all_extractions[1..] {
        for extraction in pass_extractions {
            let overlaps = merged
                .iter()
                .any(|existing| same_class_overlap(extraction, existing));
            if !overlaps {
                merged.push(extraction.clone());
            }
        }
    }
    merged
}

fn same_class_overlap(a: &Extraction, b: &Extraction) -> bool {
    if a.extraction_class != b.extraction_class {
        return false;
    }
    extractions_overlap(a, b)
}

/// Checks if two extractions' character intervals overlap. Extractions
/// lacking a resolved interval (e.g. `Unaligned`) never overlap anything.
pub fn extractions_overlap(extraction1: &Extraction, extraction2: &Extraction) -> bool {
    let (start1, end1) = match resolved_bounds(&extraction1.char_interval) {
        Some(bounds) => bounds,
        None => return false,
    };
    let (start2, end2) = match resolved_bounds(&extraction2.char_interval) {
        Some(bounds) => bounds,
        None => return false,
    };
    start1 < end2 && start2 < end1
}

fn resolved_bounds(interval: &Option<CharInterval>) -> Option<(usize, usize)> {
    let interval = interval.as_ref()?;
    match (interval.start_pos, interval.end_pos) {
        (Some(s), Some(e)) => Some((s, e)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AlignmentStatus;

    fn grounded(class: &str, text: &str, start: usize, end: usize) -> Extraction {
        Extraction::new(
            class.to_string(),
            text.to_string(),
            None,
            Some(CharInterval::new(Some(start), Some(end))),
            Some(AlignmentStatus::Exact),
            None,
            None,
            None,
            None,
        )
    }

    #[test]
    fn test_single_pass_returned_unchanged() {
        let pass = vec![grounded("person", "Alice", 0, 5)];
        let merged = merge_non_overlapping_extractions(&[pass.clone()]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_same_class_overlap_keeps_first_pass() {
        let pass1 = vec![grounded("person", "Alice Smith", 0, 11)];
        let pass2 = vec![grounded("person", "Alice", 0, 5)];
        let merged = merge_non_overlapping_extractions(&[pass1, pass2]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].extraction_text, "Alice Smith");
    }

    #[test]
    fn test_different_class_overlap_both_kept() {
        let pass1 = vec![grounded("dialogue", "said \"hello\"", 0, 20)];
        let pass2 = vec![grounded("location", "hello", 5, 10)];
        let merged = merge_non_overlapping_extractions(&[pass1, pass2]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_non_overlapping_same_class_both_kept() {
        let pass1 = vec![grounded("person", "Alice", 0, 5)];
        let pass2 = vec![grounded("person", "Bob", 20, 23)];
        let merged = merge_non_overlapping_extractions(&[pass1, pass2]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_unaligned_extraction_never_overlaps() {
        let mut unaligned = grounded("person", "Alice", 0, 5);
        unaligned.char_interval = None;
        unaligned.alignment_status = Some(AlignmentStatus::Unaligned);
        let pass1 = vec![grounded("person", "Alice", 0, 5)];
        let pass2 = vec![unaligned];
        let merged = merge_non_overlapping_extractions(&[pass1, pass2]);
        assert_eq!(merged.len(), 2);
    }
}
