use crate::bubbles::bubble::BubbleGraph;
use crate::phasing::genome_fragment::GenomeFragment;
use crate::utils::math_utils::MathUtils;

/// Outcome of attaching the reads excluded from phasing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReadAttachmentResult {
    pub hap1_reads: Vec<usize>,
    pub hap2_reads: Vec<usize>,
    pub unclassified_reads: Vec<usize>,
    /// Reads that spanned no heterozygous bubble at all; these stay
    /// unclassified and are counted separately for observability.
    pub no_score_count: usize,
}

/**
 * Assigns each read that was not used in phasing (coverage-capped or
 * supplied separately) to the haplotype with higher cumulative log-odds
 * support over the heterozygous bubbles it spans. Ties stay unclassified.
 */
pub struct ReadAttachmentEngine {}

impl ReadAttachmentEngine {
    pub fn attach(
        graph: &BubbleGraph,
        fragment: &GenomeFragment,
        excluded_reads: &[usize],
    ) -> ReadAttachmentResult {
        let mut result = ReadAttachmentResult::default();
        for &read_id in excluded_reads {
            let mut support1 = 0.0;
            let mut support2 = 0.0;
            let mut scored = false;
            for (site, bubble) in graph.bubbles.iter().enumerate() {
                if fragment.is_empty() || !fragment.is_het_site(site) {
                    continue;
                }
                if let Some(k) = bubble.read_index(read_id) {
                    let sup1 = bubble.support(fragment.hap1[site], k);
                    let sup2 = bubble.support(fragment.hap2[site], k);
                    support1 += sup1 - MathUtils::log_add_exp(sup1, sup2);
                    support2 += sup2 - MathUtils::log_add_exp(sup2, sup1);
                    scored = true;
                }
            }
            if !scored {
                result.no_score_count += 1;
                result.unclassified_reads.push(read_id);
            } else if support1 > support2 {
                result.hap1_reads.push(read_id);
            } else if support2 > support1 {
                result.hap2_reads.push(read_id);
            } else {
                result.unclassified_reads.push(read_id);
            }
        }
        info!(
            "Attached filtered reads: {} to haplotype 1, {} to haplotype 2, {} unclassified \
             ({} with no het site spanned)",
            result.hap1_reads.len(),
            result.hap2_reads.len(),
            result.unclassified_reads.len(),
            result.no_score_count
        );
        result
    }
}
