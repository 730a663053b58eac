use std::collections::HashMap;

/**
 * One heterozygous, phased record of a VCF as the correctness metric sees
 * it. `gt1`/`gt2` index into `alleles`; the phase set groups records phased
 * together.
 */
#[derive(Debug, Clone)]
pub struct PhasedVariant {
    pub contig: String,
    pub ref_pos: i64,
    pub quality: f64,
    pub alleles: Vec<Vec<u8>>,
    pub gt1: usize,
    pub gt2: usize,
    pub phase_set: String,
}

impl PhasedVariant {
    fn allele(&self, gt: usize) -> &[u8] {
        &self.alleles[gt]
    }
}

/// A pair of query/truth variants at the same position with compatible
/// allele sets. `match11` records whether the direct pairing
/// (query gt1 = truth gt1) held, as opposed to the crossed one.
#[derive(Debug, Clone, Copy)]
pub struct MatchedPair {
    pub query_ps: usize,
    pub truth_ps: usize,
    pub match11: bool,
}

/// Matching outcome plus the skip counters surfaced in the logs.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub pairs: Vec<MatchedPair>,
    pub skipped_mismatched_alleles: usize,
    pub skipped_ambiguous: usize,
}

pub struct VariantMatcher {}

impl VariantMatcher {
    /**
     * Walks both position-sorted lists and pairs up variants at shared
     * positions. Allele sets must match either directly or crossed; a site
     * matching both ways is ambiguous (logged and skipped), one matching
     * neither way is counted and skipped. Phase sets are interned to dense
     * ids per side.
     */
    pub fn match_variants(query: &[PhasedVariant], truth: &[PhasedVariant]) -> MatchResult {
        let mut result = MatchResult::default();
        let mut query_ps_ids: HashMap<String, usize> = HashMap::new();
        let mut truth_ps_ids: HashMap<String, usize> = HashMap::new();

        let (mut qi, mut ti) = (0, 0);
        while qi < query.len() && ti < truth.len() {
            let qpv = &query[qi];
            let tpv = &truth[ti];
            match qpv.ref_pos.cmp(&tpv.ref_pos) {
                std::cmp::Ordering::Less => {
                    qi += 1;
                    continue;
                }
                std::cmp::Ordering::Greater => {
                    ti += 1;
                    continue;
                }
                std::cmp::Ordering::Equal => {}
            }

            let direct = qpv.allele(qpv.gt1) == tpv.allele(tpv.gt1)
                && qpv.allele(qpv.gt2) == tpv.allele(tpv.gt2);
            let crossed = qpv.allele(qpv.gt1) == tpv.allele(tpv.gt2)
                && qpv.allele(qpv.gt2) == tpv.allele(tpv.gt1);

            if direct && crossed {
                warn!(
                    "Variant at {}:{} matches truth alleles both ways; skipping",
                    qpv.contig, qpv.ref_pos
                );
                result.skipped_ambiguous += 1;
            } else if direct || crossed {
                let next_query_id = query_ps_ids.len();
                let query_ps = *query_ps_ids
                    .entry(qpv.phase_set.clone())
                    .or_insert(next_query_id);
                let next_truth_id = truth_ps_ids.len();
                let truth_ps = *truth_ps_ids
                    .entry(tpv.phase_set.clone())
                    .or_insert(next_truth_id);
                result.pairs.push(MatchedPair {
                    query_ps,
                    truth_ps,
                    match11: direct,
                });
            } else {
                result.skipped_mismatched_alleles += 1;
            }
            qi += 1;
            ti += 1;
        }
        result
    }
}

/// Inclusive [first, last] occurrence indices of each phase set over a
/// matched-pair list; out-of-scope pruning in the decay pass keys on these.
pub fn phase_set_intervals(
    pairs: &[MatchedPair],
    select_query: bool,
) -> HashMap<usize, (usize, usize)> {
    let mut intervals: HashMap<usize, (usize, usize)> = HashMap::new();
    for (i, pair) in pairs.iter().enumerate() {
        let ps = if select_query {
            pair.query_ps
        } else {
            pair.truth_ps
        };
        intervals
            .entry(ps)
            .and_modify(|iv| iv.1 = i)
            .or_insert((i, i));
    }
    intervals
}
