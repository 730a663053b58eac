use crate::correctness::phased_variant::{phase_set_intervals, MatchedPair};
use crate::utils::errors::PardaloteError;

/// Per-(query phase set, truth phase set) partial sums of the decay pass.
#[derive(Debug, Clone)]
struct PartialSum {
    query_ps: usize,
    truth_ps: usize,
    phase_sum1: f64,
    phase_sum2: f64,
    unphased_sum: f64,
}

/**
 * The decay-weighted local phasing-correctness statistic between two matched
 * phased variant lists. Every pair of matched variants contributes, weighted
 * by decay^distance; decay 1 weighs all pair distances equally and decay 0
 * collapses to nearest-neighbour switch correctness.
 */
pub struct PhasingCorrectness {}

impl PhasingCorrectness {
    /// The metric as a fraction: numerator and denominator pooled over the
    /// forward and backward passes. Dividing yields the correctness; a zero
    /// denominator yields NaN.
    pub fn correctness_fraction(
        pairs: &[MatchedPair],
        decay: f64,
    ) -> Result<(f64, f64), PardaloteError> {
        if !(0.0..=1.0).contains(&decay) {
            return Err(PardaloteError::InvalidParameter(format!(
                "decay {} outside [0, 1]",
                decay
            )));
        }
        if decay == 0.0 {
            return Ok(Self::switch_fraction(pairs));
        }
        let (forward_numer, forward_denom) = Self::decay_pass(pairs, decay);
        let reversed: Vec<MatchedPair> = pairs.iter().rev().copied().collect();
        let (backward_numer, backward_denom) = Self::decay_pass(&reversed, decay);
        Ok((forward_numer + backward_numer, forward_denom + backward_denom))
    }

    pub fn phasing_correctness(
        pairs: &[MatchedPair],
        decay: f64,
    ) -> Result<f64, PardaloteError> {
        let (numer, denom) = Self::correctness_fraction(pairs, decay)?;
        Ok(numer / denom)
    }

    /**
     * One directional pass. Partial sums accumulate per phase-set pair;
     * every step credits the matching accumulator (or the unphased one for
     * foreign pairs), decays everything, and retires partial sums whose
     * phase sets have gone out of scope.
     */
    fn decay_pass(pairs: &[MatchedPair], decay: f64) -> (f64, f64) {
        let query_intervals = phase_set_intervals(pairs, true);
        let truth_intervals = phase_set_intervals(pairs, false);

        let mut partial_sums: Vec<PartialSum> = Vec::new();
        let mut total_sum = 0.0;
        let mut partition_sum = 0.0;
        let mut partition_total_sum = 0.0;
        let mut out_of_scope_sum = 0.0;

        for (i, pair) in pairs.iter().enumerate() {
            let mut seen = false;
            for ps in partial_sums.iter_mut() {
                if ps.query_ps == pair.query_ps && ps.truth_ps == pair.truth_ps {
                    seen = true;
                    if pair.match11 {
                        total_sum += ps.phase_sum1;
                        ps.phase_sum1 += 1.0;
                    } else {
                        total_sum += ps.phase_sum2;
                        ps.phase_sum2 += 1.0;
                    }
                } else {
                    total_sum += ps.unphased_sum;
                }
                ps.unphased_sum += 1.0;
            }
            total_sum += out_of_scope_sum;

            partition_total_sum += partition_sum;
            partition_sum += 1.0;

            if !seen {
                partial_sums.push(PartialSum {
                    query_ps: pair.query_ps,
                    truth_ps: pair.truth_ps,
                    phase_sum1: if pair.match11 { 1.0 } else { 0.0 },
                    phase_sum2: if pair.match11 { 0.0 } else { 1.0 },
                    unphased_sum: 1.0,
                });
            }

            for ps in partial_sums.iter_mut() {
                ps.phase_sum1 *= decay;
                ps.phase_sum2 *= decay;
                ps.unphased_sum *= decay;
            }
            partition_sum *= decay;
            out_of_scope_sum *= decay;

            partial_sums.retain(|ps| {
                let query_done = query_intervals[&ps.query_ps].1 <= i;
                let truth_done = truth_intervals[&ps.truth_ps].1 <= i;
                if query_done || truth_done {
                    out_of_scope_sum += ps.unphased_sum;
                    false
                } else {
                    true
                }
            });
        }
        (total_sum, partition_total_sum)
    }

    /// Switch correctness as a fraction: correct consecutive pairs over
    /// comparable consecutive pairs.
    pub fn switch_fraction(pairs: &[MatchedPair]) -> (f64, f64) {
        if pairs.len() < 2 {
            return (0.0, pairs.len().saturating_sub(1) as f64);
        }
        let mut correct = 0usize;
        for window in pairs.windows(2) {
            let same_phase_sets = window[0].query_ps == window[1].query_ps
                && window[0].truth_ps == window[1].truth_ps;
            // a switch is only defined within an unchanged phase-set pair
            if !same_phase_sets || window[0].match11 == window[1].match11 {
                correct += 1;
            }
        }
        (correct as f64, (pairs.len() - 1) as f64)
    }

    /// The decay-zero limit of the metric: the fraction of consecutive
    /// matched pairs without a switch error.
    pub fn switch_correctness(pairs: &[MatchedPair]) -> f64 {
        let (numer, denom) = Self::switch_fraction(pairs);
        numer / denom
    }
}
