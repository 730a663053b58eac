use crate::utils::math_utils::MathUtils;

/**
 * Transition and emission probabilities of the three-state pair HMM used to
 * score a read substring against a candidate allele. Separate instances are
 * carried for forward- and reverse-strand reads, since long-read error
 * profiles are strand asymmetric.
 */
#[derive(Debug, Clone)]
pub struct PairHmmParameters {
    pub gap_open_prob: f64,
    pub gap_extend_prob: f64,
    pub mismatch_prob: f64,
    pub alphabet_size: usize,
}

impl Default for PairHmmParameters {
    fn default() -> Self {
        PairHmmParameters {
            gap_open_prob: 0.05,
            gap_extend_prob: 0.5,
            mismatch_prob: 0.05,
            alphabet_size: 4,
        }
    }
}

/**
 * Forward-algorithm scorer over expanded sequences. The full-probability
 * forward recursion of Durbin et al. with states match / read-insertion /
 * read-deletion; the result is the natural-log likelihood of the read given
 * the allele, summed over all alignments.
 */
#[derive(Debug, Clone)]
pub struct PairHmm {
    ln_match_continue: f64,
    ln_gap_open: f64,
    ln_gap_extend: f64,
    ln_gap_close: f64,
    ln_emit_match: f64,
    ln_emit_mismatch: f64,
    ln_emit_gap: f64,
}

impl PairHmm {
    pub fn new(params: &PairHmmParameters) -> PairHmm {
        let delta = params.gap_open_prob;
        let epsilon = params.gap_extend_prob;
        PairHmm {
            ln_match_continue: (1.0 - 2.0 * delta).ln(),
            ln_gap_open: delta.ln(),
            ln_gap_extend: epsilon.ln(),
            ln_gap_close: (1.0 - epsilon).ln(),
            ln_emit_match: (1.0 - params.mismatch_prob).ln(),
            ln_emit_mismatch: (params.mismatch_prob / (params.alphabet_size as f64 - 1.0)).ln(),
            ln_emit_gap: (1.0 / params.alphabet_size as f64).ln(),
        }
    }

    /// Log-likelihood of `read` given `allele`, both as expanded sequences.
    pub fn forward_log_prob(&self, allele: &[u8], read: &[u8]) -> f64 {
        let m = allele.len();
        let n = read.len();
        if m == 0 && n == 0 {
            return 0.0;
        }

        // Row-major (m + 1) x (n + 1) lattices for the three states.
        let width = n + 1;
        let mut mat = vec![f64::NEG_INFINITY; (m + 1) * width];
        let mut ins = vec![f64::NEG_INFINITY; (m + 1) * width];
        let mut del = vec![f64::NEG_INFINITY; (m + 1) * width];
        mat[0] = 0.0;

        for i in 0..=m {
            for j in 0..=n {
                let idx = i * width + j;
                if i > 0 && j > 0 {
                    let prev = (i - 1) * width + (j - 1);
                    let emit = if allele[i - 1] == read[j - 1] {
                        self.ln_emit_match
                    } else {
                        self.ln_emit_mismatch
                    };
                    mat[idx] = emit
                        + MathUtils::log_add_exp(
                            mat[prev] + self.ln_match_continue,
                            MathUtils::log_add_exp(
                                ins[prev] + self.ln_gap_close,
                                del[prev] + self.ln_gap_close,
                            ),
                        );
                }
                if j > 0 {
                    let prev = i * width + (j - 1);
                    ins[idx] = self.ln_emit_gap
                        + MathUtils::log_add_exp(
                            mat[prev] + self.ln_gap_open,
                            ins[prev] + self.ln_gap_extend,
                        );
                }
                if i > 0 {
                    let prev = (i - 1) * width + j;
                    del[idx] = self.ln_emit_gap
                        + MathUtils::log_add_exp(
                            mat[prev] + self.ln_gap_open,
                            del[prev] + self.ln_gap_extend,
                        );
                }
            }
        }

        let last = m * width + n;
        MathUtils::log_sum_exp(&[mat[last], ins[last], del[last]])
    }
}
