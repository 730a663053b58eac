use crate::model::params::PolishParams;
use crate::model::reads::VcfEntry;
use crate::poa::poa_graph::Poa;

/// Window over which per-position candidate thresholds are averaged.
pub const THRESHOLD_WINDOW_SIZE: usize = 100;

/// Detector output: candidate variant positions and the anchor skeleton that
/// the bubble graph is built on.
#[derive(Debug, Clone)]
pub struct CandidateSites {
    pub variant_positions: Vec<bool>,
    pub anchors: Vec<bool>,
    pub thresholds: Vec<f64>,
}

impl CandidateSites {
    /// Maximal non-anchor intervals, each a candidate bubble, as
    /// (start, length) in compressed reference coordinates.
    pub fn bubble_intervals(&self) -> Vec<(usize, usize)> {
        let mut intervals = Vec::new();
        let mut i = 0;
        while i < self.anchors.len() {
            if !self.anchors[i] {
                let start = i;
                while i < self.anchors.len() && !self.anchors[i] {
                    i += 1;
                }
                intervals.push((start, i - start));
            } else {
                i += 1;
            }
        }
        intervals
    }
}

pub struct CandidateSiteFinder {}

impl CandidateSiteFinder {
    /**
     * Scans POA columns for positions with enough non-reference weight to be
     * variant candidates, then derives the anchor array by dilating the
     * candidate set by `column_anchor_trim` and complementing.
     *
     * When VCF entries are supplied, the candidate set is replaced by the
     * entries' positions; the detector's own calls are kept only to report
     * confusion counts against the given sites.
     */
    pub fn find(
        poa: &Poa,
        params: &PolishParams,
        vcf_entries: Option<&[VcfEntry]>,
    ) -> CandidateSites {
        let thresholds = Self::position_thresholds(poa, params);
        let mut variant_positions = vec![false; poa.len()];

        for (i, node) in poa.nodes.iter().enumerate() {
            let threshold = thresholds[i];
            let ref_symbol = params.symbol_index(node.base);

            for (symbol, weight) in node.base_weights.iter().enumerate() {
                if Some(symbol) != ref_symbol && *weight > threshold {
                    variant_positions[i] = true;
                }
            }

            // Repeat-count-only candidates are deliberately deflated by
            // requiring twice the weight.
            let ref_count = poa.ref_rle.run_length_at(i) as usize;
            for (count, weight) in node.repeat_count_weights.iter().enumerate() {
                if count != ref_count && *weight > 2.0 * threshold {
                    variant_positions[i] = true;
                }
            }

            if node.inserts.iter().any(|ins| ins.weight > threshold) {
                variant_positions[i] = true;
            }

            for delete in &node.deletes {
                if delete.weight > threshold {
                    let end = std::cmp::min(i + delete.length, poa.len());
                    for position in variant_positions.iter_mut().take(end).skip(i) {
                        *position = true;
                    }
                }
            }
        }

        if let Some(entries) = vcf_entries {
            let mut named = vec![false; poa.len()];
            for entry in entries {
                if entry.ref_pos < poa.len() {
                    named[entry.ref_pos] = true;
                }
            }
            let (mut tp, mut fp, mut fn_, mut tn) = (0usize, 0usize, 0usize, 0usize);
            for i in 0..poa.len() {
                match (named[i], variant_positions[i]) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => tn += 1,
                }
            }
            info!(
                "Candidate sites vs provided VCF sites: TP {} FP {} FN {} TN {}",
                tp, fp, fn_, tn
            );
            variant_positions = named;
        }

        let mut anchors = vec![true; poa.len()];
        for i in 0..poa.len() {
            if variant_positions[i] {
                let lo = i.saturating_sub(params.column_anchor_trim);
                let hi = std::cmp::min(i + params.column_anchor_trim, poa.len().saturating_sub(1));
                for anchor in anchors.iter_mut().take(hi + 1).skip(lo) {
                    *anchor = false;
                }
            }
        }

        CandidateSites {
            variant_positions,
            anchors,
            thresholds,
        }
    }

    /**
     * Per-position candidate thresholds: a sliding-window average of total
     * node weight scaled by `candidate_variant_weight`. Positions within
     * half a window of either end inherit the nearest interior threshold.
     */
    fn position_thresholds(poa: &Poa, params: &PolishParams) -> Vec<f64> {
        let len = poa.len();
        let weights: Vec<f64> = poa.nodes.iter().map(|n| n.total_weight()).collect();
        if len == 0 {
            return Vec::new();
        }

        let half = THRESHOLD_WINDOW_SIZE / 2;
        if len <= THRESHOLD_WINDOW_SIZE {
            let mean = weights.iter().sum::<f64>() / len as f64;
            return vec![mean * params.candidate_variant_weight; len];
        }

        let mut prefix = vec![0.0; len + 1];
        for (i, w) in weights.iter().enumerate() {
            prefix[i + 1] = prefix[i] + w;
        }

        let mut thresholds = vec![0.0; len];
        let first_interior = half;
        let last_interior = len - half;
        for i in first_interior..last_interior {
            let lo = i - half;
            let hi = i + half;
            let mean = (prefix[hi] - prefix[lo]) / THRESHOLD_WINDOW_SIZE as f64;
            thresholds[i] = mean * params.candidate_variant_weight;
        }
        for i in 0..first_interior {
            thresholds[i] = thresholds[first_interior];
        }
        for i in last_interior..len {
            thresholds[i] = thresholds[last_interior - 1];
        }
        thresholds
    }
}
