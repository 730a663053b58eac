extern crate pardalote;

use approx::assert_relative_eq;

use pardalote::correctness::metric::PhasingCorrectness;
use pardalote::correctness::phased_variant::{MatchedPair, PhasedVariant, VariantMatcher};

fn het_variant(pos: i64, ref_allele: &str, alt_allele: &str, gt1: usize, gt2: usize, phase_set: &str) -> PhasedVariant {
    PhasedVariant {
        contig: "chr1".to_string(),
        ref_pos: pos,
        quality: 60.0,
        alleles: vec![ref_allele.as_bytes().to_vec(), alt_allele.as_bytes().to_vec()],
        gt1,
        gt2,
        phase_set: phase_set.to_string(),
    }
}

fn pair(query_ps: usize, truth_ps: usize, match11: bool) -> MatchedPair {
    MatchedPair {
        query_ps,
        truth_ps,
        match11,
    }
}

fn concordant_variants(count: usize, phase_set: &str) -> Vec<PhasedVariant> {
    (0..count)
        .map(|i| het_variant(100 + 10 * i as i64, "A", "T", 0, 1, phase_set))
        .collect()
}

#[test]
fn identical_inputs_score_one_for_every_decay() {
    let variants = concordant_variants(6, "ps1");
    let matched = VariantMatcher::match_variants(&variants, &variants);
    assert_eq!(matched.pairs.len(), 6);
    for decay in [0.0, 0.1, 0.5, 0.9, 1.0] {
        let correctness =
            PhasingCorrectness::phasing_correctness(&matched.pairs, decay).unwrap();
        assert_relative_eq!(correctness, 1.0, epsilon = 1e-12);
    }
}

#[test]
fn two_concordant_phase_sets_score_one_at_full_decay() {
    let mut query = concordant_variants(3, "ps1");
    query.extend((0..3).map(|i| het_variant(500 + 10 * i, "C", "G", 0, 1, "ps2")));
    let matched = VariantMatcher::match_variants(&query, &query);
    assert_eq!(matched.pairs.len(), 6);
    let correctness = PhasingCorrectness::phasing_correctness(&matched.pairs, 1.0).unwrap();
    assert_relative_eq!(correctness, 1.0, epsilon = 1e-12);
}

#[test]
fn switch_correctness_counts_one_of_two_consecutive_pairs() {
    // two concordant pairs then a switch inside the same phase-set pair
    let pairs = vec![pair(0, 0, true), pair(0, 0, true), pair(0, 0, false)];
    let correctness = PhasingCorrectness::phasing_correctness(&pairs, 0.0).unwrap();
    assert_relative_eq!(correctness, 0.5, epsilon = 1e-12);
    assert_relative_eq!(
        PhasingCorrectness::switch_correctness(&pairs),
        correctness,
        epsilon = 1e-12
    );
}

#[test]
fn switched_data_at_half_decay_lands_strictly_between_zero_and_one() {
    let pairs = vec![pair(0, 0, true), pair(0, 0, true), pair(0, 0, false)];
    let correctness = PhasingCorrectness::phasing_correctness(&pairs, 0.5).unwrap();
    assert!(correctness > 0.0);
    assert!(correctness < 1.0);
}

#[test]
fn switches_across_phase_set_boundaries_are_not_errors() {
    // the flip happens exactly at the phase-set boundary
    let pairs = vec![
        pair(0, 0, true),
        pair(0, 0, true),
        pair(1, 1, false),
        pair(1, 1, false),
    ];
    let correctness = PhasingCorrectness::phasing_correctness(&pairs, 0.0).unwrap();
    assert_relative_eq!(correctness, 1.0, epsilon = 1e-12);
}

#[test]
fn metric_is_symmetric_under_list_reversal() {
    let pairs = vec![
        pair(0, 0, true),
        pair(0, 0, false),
        pair(0, 1, true),
        pair(1, 1, true),
        pair(1, 1, false),
        pair(1, 1, true),
    ];
    let reversed: Vec<MatchedPair> = pairs.iter().rev().copied().collect();
    for decay in [0.25, 0.5, 1.0] {
        let forward = PhasingCorrectness::phasing_correctness(&pairs, decay).unwrap();
        let backward = PhasingCorrectness::phasing_correctness(&reversed, decay).unwrap();
        assert_relative_eq!(forward, backward, epsilon = 1e-12);
    }
}

#[test]
fn flipping_every_match_within_one_phase_set_pair_is_neutral() {
    let pairs = vec![
        pair(0, 0, true),
        pair(0, 0, false),
        pair(0, 0, true),
        pair(1, 1, true),
        pair(1, 1, true),
    ];
    // gt1/gt2 swapped on query phase set 0 and equally on the truth side:
    // every pair of that phase-set pair flips its match orientation
    let flipped: Vec<MatchedPair> = pairs
        .iter()
        .map(|p| {
            if p.query_ps == 0 {
                pair(p.query_ps, p.truth_ps, !p.match11)
            } else {
                *p
            }
        })
        .collect();
    for decay in [0.0, 0.5, 1.0] {
        let original = PhasingCorrectness::phasing_correctness(&pairs, decay).unwrap();
        let swapped = PhasingCorrectness::phasing_correctness(&flipped, decay).unwrap();
        assert_relative_eq!(original, swapped, epsilon = 1e-12);
    }
}

#[test]
fn empty_and_singleton_matches_return_nan() {
    let no_pairs: Vec<MatchedPair> = Vec::new();
    assert!(PhasingCorrectness::phasing_correctness(&no_pairs, 0.0)
        .unwrap()
        .is_nan());
    let one_pair = vec![pair(0, 0, true)];
    assert!(PhasingCorrectness::phasing_correctness(&one_pair, 0.0)
        .unwrap()
        .is_nan());
    assert!(PhasingCorrectness::phasing_correctness(&one_pair, 0.7)
        .unwrap()
        .is_nan());
}

#[test]
fn decay_outside_unit_interval_is_rejected() {
    let pairs = vec![pair(0, 0, true), pair(0, 0, true)];
    assert!(PhasingCorrectness::phasing_correctness(&pairs, -0.1).is_err());
    assert!(PhasingCorrectness::phasing_correctness(&pairs, 1.5).is_err());
}

#[test]
fn matcher_skips_mismatched_allele_sets() {
    let query = vec![
        het_variant(100, "A", "T", 0, 1, "ps1"),
        het_variant(110, "A", "G", 0, 1, "ps1"),
    ];
    let truth = vec![
        het_variant(100, "A", "T", 0, 1, "ps1"),
        // different alternative allele: no pairing either way
        het_variant(110, "A", "C", 0, 1, "ps1"),
    ];
    let matched = VariantMatcher::match_variants(&query, &truth);
    assert_eq!(matched.pairs.len(), 1);
    assert_eq!(matched.skipped_mismatched_alleles, 1);
}

#[test]
fn matcher_skips_sites_matching_both_ways() {
    // degenerate allele set: both pairings hold and the site is ambiguous
    let query = vec![het_variant(100, "A", "A", 0, 1, "ps1")];
    let truth = vec![het_variant(100, "A", "A", 0, 1, "ps1")];
    let matched = VariantMatcher::match_variants(&query, &truth);
    assert!(matched.pairs.is_empty());
    assert_eq!(matched.skipped_ambiguous, 1);
}

#[test]
fn matcher_records_crossed_pairings() {
    let query = vec![
        het_variant(100, "A", "T", 0, 1, "ps1"),
        het_variant(110, "C", "G", 1, 0, "ps1"),
    ];
    let truth = vec![
        het_variant(100, "A", "T", 0, 1, "ps1"),
        het_variant(110, "C", "G", 0, 1, "ps1"),
    ];
    let matched = VariantMatcher::match_variants(&query, &truth);
    assert_eq!(matched.pairs.len(), 2);
    assert!(matched.pairs[0].match11);
    assert!(!matched.pairs[1].match11);
}

#[test]
fn positions_unique_to_one_side_are_ignored() {
    let query = vec![
        het_variant(100, "A", "T", 0, 1, "ps1"),
        het_variant(120, "C", "G", 0, 1, "ps1"),
    ];
    let truth = vec![
        het_variant(100, "A", "T", 0, 1, "ps1"),
        het_variant(110, "A", "G", 0, 1, "ps1"),
        het_variant(120, "C", "G", 0, 1, "ps1"),
    ];
    let matched = VariantMatcher::match_variants(&query, &truth);
    assert_eq!(matched.pairs.len(), 2);
}
