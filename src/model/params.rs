use crate::pair_hmm::pair_hmm::PairHmmParameters;
use crate::utils::errors::PardaloteError;

/// Scale factor between natural-log probabilities and the quantized bytes
/// stored in profile sequences. Part of the public contract: a profile byte
/// is `round(PROFILE_PROB_SCALAR * (total - log_prob))`, clamped to 255.
pub const PROFILE_PROB_SCALAR: f64 = 30.0;

/// Hard cap on active reads per site. Cell partitions are packed into a
/// 64-bit word, so phasing never considers more than this many reads at once.
pub const MAX_ACTIVE_READS_PER_SITE: usize = 64;

/**
 * Parameters governing candidate detection, allele enumeration and bubble
 * scoring. Defaults follow long-read polishing practice; callers override
 * individual fields.
 */
#[derive(Debug, Clone)]
pub struct PolishParams {
    pub use_run_length_encoding: bool,
    pub use_read_alleles: bool,
    pub use_read_alleles_in_phasing: bool,
    pub candidate_variant_weight: f64,
    pub column_anchor_trim: usize,
    pub max_consensus_strings: usize,
    pub filter_reads_while_have_at_least_this_coverage: usize,
    pub min_avg_base_quality: f64,
    pub use_repeat_counts_in_alignment: bool,
    pub alphabet: Vec<u8>,
    pub max_repeat_count: usize,
    pub het_substitution_probability: f64,
    pub forward_strand_model: PairHmmParameters,
    pub reverse_strand_model: PairHmmParameters,
}

impl Default for PolishParams {
    fn default() -> Self {
        PolishParams {
            use_run_length_encoding: true,
            use_read_alleles: true,
            use_read_alleles_in_phasing: false,
            candidate_variant_weight: 0.18,
            column_anchor_trim: 2,
            max_consensus_strings: 100,
            filter_reads_while_have_at_least_this_coverage: 64,
            min_avg_base_quality: 12.0,
            use_repeat_counts_in_alignment: true,
            alphabet: b"ACGT".to_vec(),
            max_repeat_count: 50,
            het_substitution_probability: 1e-4,
            forward_strand_model: PairHmmParameters::default(),
            reverse_strand_model: PairHmmParameters::default(),
        }
    }
}

impl PolishParams {
    pub fn symbol_index(&self, base: u8) -> Option<usize> {
        self.alphabet.iter().position(|&b| b == base)
    }
}

/// Parameters of the read-partition HMM and its refinement loop.
#[derive(Debug, Clone)]
pub struct PhaseParams {
    pub max_coverage_depth: usize,
    pub rounds_of_iterative_refinement: usize,
    pub include_ancestor_sub_prob: bool,
}

impl Default for PhaseParams {
    fn default() -> Self {
        PhaseParams {
            max_coverage_depth: MAX_ACTIVE_READS_PER_SITE,
            rounds_of_iterative_refinement: 10,
            include_ancestor_sub_prob: true,
        }
    }
}

impl PhaseParams {
    pub fn validate(&self) -> Result<(), PardaloteError> {
        if self.max_coverage_depth == 0 || self.max_coverage_depth > MAX_ACTIVE_READS_PER_SITE {
            return Err(PardaloteError::InvalidParameter(format!(
                "max coverage depth {} outside [1, {}]",
                self.max_coverage_depth, MAX_ACTIVE_READS_PER_SITE
            )));
        }
        Ok(())
    }
}
