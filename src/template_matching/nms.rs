//! Non-maximum suppression

use super::types::Match;
use std::cmp::Ordering;

/// Greedy IoU suppression
///
/// Candidates are visited by descending confidence (stable, so ties keep input order);
/// each one is kept unless it overlaps an already kept match by more than `iou_threshold`.
/// Matches from different scales compete on their actual pixel footprint.
pub fn suppress_overlapping(mut matches: Vec<Match>, iou_threshold: f32) -> Vec<Match> {
    if matches.len() < 2 {
        return matches;
    }

    matches.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<Match> = Vec::with_capacity(matches.len().min(16));
    for candidate in matches {
        if keep.iter().all(|kept| kept.iou(&candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_matching::types::MatchMethod;

    fn candidate(x: u32, y: u32, confidence: f32) -> Match {
        Match {
            template_name: "haemon".to_string(),
            x,
            y,
            width: 40,
            height: 40,
            confidence,
            scale: 1.0,
            method: MatchMethod::default(),
        }
    }

    #[test]
    fn test_overlapping_keeps_strongest() {
        // 2px shift on a 40px box: IoU well above 0.5
        let weak = candidate(100, 100, 0.82);
        let strong = candidate(102, 101, 0.95);
        assert!(weak.iou(&strong) > 0.5);

        let kept = suppress_overlapping(vec![weak, strong.clone()], 0.5);
        assert_eq!(kept, vec![strong]);
    }

    #[test]
    fn test_disjoint_both_survive() {
        let a = candidate(0, 0, 0.9);
        let b = candidate(200, 0, 0.85);
        let kept = suppress_overlapping(vec![a, b], 0.5);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9, "Output ordered by confidence");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let first = candidate(10, 10, 0.9);
        let second = candidate(11, 10, 0.9);
        let kept = suppress_overlapping(vec![first.clone(), second], 0.5);
        assert_eq!(kept, vec![first]);
    }

    #[test]
    fn test_chain_suppression_is_greedy() {
        // b overlaps a and c, a and c do not overlap each other
        let a = candidate(0, 0, 0.99);
        let b = candidate(12, 0, 0.95);
        let c = candidate(24, 0, 0.90);
        assert!(a.iou(&b) > 0.5 && b.iou(&c) > 0.5 && a.iou(&c) <= 0.5);

        let kept = suppress_overlapping(vec![c.clone(), b, a.clone()], 0.5);
        assert_eq!(kept, vec![a, c], "b is suppressed by a, so c survives");
    }

    #[test]
    fn test_empty_input() {
        assert!(suppress_overlapping(Vec::new(), 0.5).is_empty());
    }
}
