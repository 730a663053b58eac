use crate::phasing::genome_fragment::GenomeFragment;
use crate::phasing::partition_hmm::best_site_genotype;
use crate::phasing::profile_seq::{ProfileSeq, ProfileStore, SiteReference};

/**
 * Greedy post-HMM refinement: every read is rescored against both haplotype
 * strings and moved to the better-supporting one, all moves applied
 * simultaneously, then the per-column partitions and the haplotype alleles
 * are re-derived. Repeats until a fixed point or the round bound.
 */
pub struct RefinementEngine {}

impl RefinementEngine {
    /// Runs up to `max_rounds` refinement rounds; returns the number of
    /// rounds in which at least one read moved.
    pub fn refine(
        fragment: &mut GenomeFragment,
        reference: &SiteReference,
        store: &ProfileStore,
        max_rounds: usize,
        include_ancestor_sub_prob: bool,
    ) -> usize {
        if fragment.is_empty() {
            return 0;
        }
        let mut rounds_with_flips = 0;
        for round in 0..max_rounds {
            let mut flips: Vec<usize> = Vec::new();
            for &read_id in &fragment.reads1 {
                if let Some(profile) = store.get(read_id) {
                    let p1 = Self::log_prob_read_given_hap(profile, reference, &fragment.hap1);
                    let p2 = Self::log_prob_read_given_hap(profile, reference, &fragment.hap2);
                    if p2 > p1 {
                        flips.push(read_id);
                    }
                }
            }
            for &read_id in &fragment.reads2 {
                if let Some(profile) = store.get(read_id) {
                    let p1 = Self::log_prob_read_given_hap(profile, reference, &fragment.hap1);
                    let p2 = Self::log_prob_read_given_hap(profile, reference, &fragment.hap2);
                    if p1 > p2 {
                        flips.push(read_id);
                    }
                }
            }
            if flips.is_empty() {
                debug!("Refinement reached a fixed point after {} rounds", round);
                break;
            }
            rounds_with_flips += 1;
            Self::apply_flips(fragment, reference, store, &flips, include_ancestor_sub_prob);
        }
        rounds_with_flips
    }

    /// Expected log-likelihood of a read under one haplotype: the sum over
    /// its covered sites of the substitution-weighted profile probability of
    /// the haplotype's allele.
    pub fn log_prob_read_given_hap(
        profile: &ProfileSeq,
        reference: &SiteReference,
        hap: &[usize],
    ) -> f64 {
        (profile.ref_start..profile.ref_start + profile.length)
            .map(|site| {
                let bytes = profile.bytes_for_site(reference, site);
                reference.read_allele_score(site, bytes, hap[site])
            })
            .sum()
    }

    fn apply_flips(
        fragment: &mut GenomeFragment,
        reference: &SiteReference,
        store: &ProfileStore,
        flips: &[usize],
        include_ancestor_sub_prob: bool,
    ) {
        debug!("Refinement moving {} reads between haplotypes", flips.len());
        for &read_id in flips {
            if fragment.reads1.remove(&read_id) {
                fragment.reads2.insert(read_id);
            } else if fragment.reads2.remove(&read_id) {
                fragment.reads1.insert(read_id);
            }
        }

        // XOR the membership delta of the flipped reads into each column,
        // then re-derive the haplotype alleles from the new partitions.
        for i in 0..fragment.length {
            for (bit_idx, read_id) in fragment.active_reads[i].iter().enumerate() {
                if flips.contains(read_id) {
                    fragment.partitions[i] ^= 1u64 << bit_idx;
                }
            }
            let site = fragment.ref_start + i;
            let genotype = best_site_genotype(
                reference,
                site,
                &fragment.active_reads[i],
                fragment.partitions[i],
                store,
                include_ancestor_sub_prob,
            );
            fragment.hap1[i] = genotype.hap1;
            fragment.hap2[i] = genotype.hap2;
            fragment.ancestors[i] = genotype.ancestor;
            fragment.genotype_posteriors[i] = genotype.posterior;
        }
    }
}
