use ndarray::Array2;

use crate::model::params::PhaseParams;
use crate::phasing::genome_fragment::GenomeFragment;
use crate::phasing::profile_seq::{ProfileStore, SiteReference};
use crate::utils::math_utils::{MathUtils, LOG_ONE_HALF};

/// One hidden state: a packed bit-partition of the column's active reads.
/// Canonical form has bit 0 clear; a partition and its complement describe
/// the same split of reads over the two haplotypes.
#[derive(Debug, Clone)]
pub struct HmmCell {
    pub partition: u64,
    pub emission_log_prob: f64,
    pub forward_log_prob: f64,
    pub backward_log_prob: f64,
}

impl HmmCell {
    fn new(partition: u64) -> HmmCell {
        HmmCell {
            partition,
            emission_log_prob: f64::NEG_INFINITY,
            forward_log_prob: f64::NEG_INFINITY,
            backward_log_prob: f64::NEG_INFINITY,
        }
    }
}

/// One HMM column, i.e. one bubble of the graph.
#[derive(Debug, Clone)]
pub struct HmmColumn {
    pub site: usize,
    pub active_reads: Vec<usize>,
    pub cells: Vec<HmmCell>,
}

impl HmmColumn {
    fn bit_mask(&self) -> u64 {
        let n = self.active_reads.len();
        if n >= 64 {
            u64::MAX
        } else {
            (1u64 << n) - 1
        }
    }
}

/// The most probable genotype of one site given a read partition.
#[derive(Debug, Clone, Copy)]
pub struct SiteGenotype {
    pub hap1: usize,
    pub hap2: usize,
    pub ancestor: usize,
    pub posterior: f64,
}

/**
 * The column HMM over bubbles whose hidden state is a bit-partition of the
 * active reads. Emissions marginalize the haplotype allele pair (and the
 * ancestral allele when enabled); transitions carry shared-read assignments
 * forward and give entering reads an unbiased coin flip.
 */
pub struct ReadPartitionHmm {
    pub columns: Vec<HmmColumn>,
    pub include_ancestor_sub_prob: bool,
    pub total_log_prob: f64,
}

impl ReadPartitionHmm {
    /**
     * Builds an HMM over every site, with every canonical partition of the
     * active reads as a cell. `strand` restricts the active reads to one
     * strand, the per-strand phasing mode.
     */
    pub fn build_exhaustive(
        reference: &SiteReference,
        store: &ProfileStore,
        strand: Option<bool>,
        include_ancestor_sub_prob: bool,
    ) -> ReadPartitionHmm {
        let columns = (0..reference.site_no())
            .map(|site| {
                let active_reads: Vec<usize> = store
                    .iter()
                    .filter(|p| p.covers(site))
                    .filter(|p| strand.map_or(true, |s| p.forward_strand == s))
                    .map(|p| p.read_id)
                    .collect();
                let n = active_reads.len();
                if n > 20 {
                    warn!(
                        "Site {} has {} active reads; exhaustive partition enumeration \
                         will be expensive",
                        site, n
                    );
                }
                let cell_count = 1usize << n.saturating_sub(1);
                let cells = (0..cell_count)
                    .map(|m| HmmCell::new((m as u64) << 1))
                    .collect();
                HmmColumn {
                    site,
                    active_reads,
                    cells,
                }
            })
            .collect();
        ReadPartitionHmm {
            columns,
            include_ancestor_sub_prob,
            total_log_prob: f64::NEG_INFINITY,
        }
    }

    /// Per-read, per-allele scores for a column's active reads.
    fn column_scores(
        reference: &SiteReference,
        store: &ProfileStore,
        site: usize,
        active_reads: &[usize],
    ) -> Array2<f64> {
        let allele_no = reference.sites[site].allele_no;
        let mut scores = Array2::zeros((active_reads.len(), allele_no));
        for (r, read_id) in active_reads.iter().enumerate() {
            let profile = store.get(*read_id).expect("active read without profile");
            let bytes = profile.bytes_for_site(reference, site);
            for a in 0..allele_no {
                scores[[r, a]] = reference.read_allele_score(site, bytes, a);
            }
        }
        scores
    }

    /// The ancestor marginalization term per haplotype allele pair, constant
    /// across a column's cells.
    fn ancestor_terms(
        reference: &SiteReference,
        site: usize,
        include_ancestor_sub_prob: bool,
    ) -> Array2<f64> {
        let site_ref = &reference.sites[site];
        let allele_no = site_ref.allele_no;
        let mut terms = Array2::zeros((allele_no, allele_no));
        if !include_ancestor_sub_prob {
            return terms;
        }
        for a in 0..allele_no {
            for b in 0..allele_no {
                let summands: Vec<f64> = (0..allele_no)
                    .map(|anc| {
                        site_ref.log_priors[anc]
                            + reference.substitution_log_prob(site, anc, a)
                            + reference.substitution_log_prob(site, anc, b)
                    })
                    .collect();
                terms[[a, b]] = MathUtils::log_sum_exp(&summands);
            }
        }
        terms
    }

    fn cell_emission(
        reference: &SiteReference,
        site: usize,
        scores: &Array2<f64>,
        ancestor_terms: &Array2<f64>,
        partition: u64,
    ) -> f64 {
        let site_ref = &reference.sites[site];
        let allele_no = site_ref.allele_no;
        let mut part0 = vec![0.0; allele_no];
        let mut part1 = vec![0.0; allele_no];
        for r in 0..scores.nrows() {
            let target = if (partition >> r) & 1 == 0 {
                &mut part0
            } else {
                &mut part1
            };
            for (a, entry) in target.iter_mut().enumerate() {
                *entry += scores[[r, a]];
            }
        }
        let mut terms = Vec::with_capacity(allele_no * allele_no);
        for a in 0..allele_no {
            for b in 0..allele_no {
                terms.push(
                    site_ref.log_priors[a]
                        + site_ref.log_priors[b]
                        + ancestor_terms[[a, b]]
                        + part0[a]
                        + part1[b],
                );
            }
        }
        MathUtils::log_sum_exp(&terms)
    }

    /// Shared reads between two columns as (previous index, next index)
    /// pairs; active lists are sorted by read id.
    fn shared_read_indices(prev: &HmmColumn, next: &HmmColumn) -> Vec<(usize, usize)> {
        let mut shared = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < prev.active_reads.len() && j < next.active_reads.len() {
            match prev.active_reads[i].cmp(&next.active_reads[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    shared.push((i, j));
                    i += 1;
                    j += 1;
                }
            }
        }
        shared
    }

    fn masks_agree(
        shared: &[(usize, usize)],
        prev_mask: u64,
        next_mask: u64,
    ) -> bool {
        shared
            .iter()
            .all(|&(pi, ni)| (prev_mask >> pi) & 1 == (next_mask >> ni) & 1)
    }

    /**
     * Log-probability of moving from one canonical cell to another: shared
     * reads must keep their assignment under one of the successor's two
     * orientations, and each entering read contributes an unbiased bit.
     */
    fn transition_log_prob(
        prev_mask: u64,
        next_mask: u64,
        next_bits: u64,
        next_active_len: usize,
        shared: &[(usize, usize)],
    ) -> f64 {
        let entering = next_active_len - shared.len();
        let complement = (!next_mask) & next_bits;
        let mut orientations = 0;
        if Self::masks_agree(shared, prev_mask, next_mask) {
            orientations += 1;
        }
        if complement != next_mask && Self::masks_agree(shared, prev_mask, complement) {
            orientations += 1;
        }
        if orientations == 0 {
            return f64::NEG_INFINITY;
        }
        (orientations as f64).ln() + entering as f64 * *LOG_ONE_HALF
    }

    /// Forward-backward over sites x cells; fills emissions, forward and
    /// backward log-probabilities and the total.
    pub fn run_forward_backward(&mut self, reference: &SiteReference, store: &ProfileStore) {
        let column_count = self.columns.len();
        if column_count == 0 {
            self.total_log_prob = 0.0;
            return;
        }

        for column in self.columns.iter_mut() {
            let scores = Self::column_scores(reference, store, column.site, &column.active_reads);
            let ancestor_terms =
                Self::ancestor_terms(reference, column.site, self.include_ancestor_sub_prob);
            for cell in column.cells.iter_mut() {
                cell.emission_log_prob = Self::cell_emission(
                    reference,
                    column.site,
                    &scores,
                    &ancestor_terms,
                    cell.partition,
                );
            }
        }

        // forward
        for i in 0..column_count {
            if i == 0 {
                for cell in self.columns[0].cells.iter_mut() {
                    cell.forward_log_prob = cell.emission_log_prob;
                }
                continue;
            }
            let (head, tail) = self.columns.split_at_mut(i);
            let prev = &head[i - 1];
            let next = &mut tail[0];
            let shared = Self::shared_read_indices(prev, next);
            let next_bits = next.bit_mask();
            let next_active_len = next.active_reads.len();
            for cell in next.cells.iter_mut() {
                let incoming: Vec<f64> = prev
                    .cells
                    .iter()
                    .map(|p| {
                        p.forward_log_prob
                            + Self::transition_log_prob(
                                p.partition,
                                cell.partition,
                                next_bits,
                                next_active_len,
                                &shared,
                            )
                    })
                    .collect();
                cell.forward_log_prob = cell.emission_log_prob + MathUtils::log_sum_exp(&incoming);
            }
        }

        let finals: Vec<f64> = self.columns[column_count - 1]
            .cells
            .iter()
            .map(|c| c.forward_log_prob)
            .collect();
        self.total_log_prob = MathUtils::log_sum_exp(&finals);

        // backward
        for cell in self.columns[column_count - 1].cells.iter_mut() {
            cell.backward_log_prob = 0.0;
        }
        for i in (0..column_count - 1).rev() {
            let (head, tail) = self.columns.split_at_mut(i + 1);
            let prev = &mut head[i];
            let next = &tail[0];
            let shared = Self::shared_read_indices(prev, next);
            let next_bits = next.bit_mask();
            let next_active_len = next.active_reads.len();
            for cell in prev.cells.iter_mut() {
                let outgoing: Vec<f64> = next
                    .cells
                    .iter()
                    .map(|n| {
                        Self::transition_log_prob(
                            cell.partition,
                            n.partition,
                            next_bits,
                            next_active_len,
                            &shared,
                        ) + n.emission_log_prob
                            + n.backward_log_prob
                    })
                    .collect();
                cell.backward_log_prob = MathUtils::log_sum_exp(&outgoing);
            }
        }
    }

    /// Most probable cell path by forward traceback: the argmax final cell,
    /// then the best-scoring predecessor at each step.
    pub fn traceback(&self) -> Vec<usize> {
        let column_count = self.columns.len();
        let mut path = vec![0; column_count];
        if column_count == 0 {
            return path;
        }
        let finals: Vec<f64> = self.columns[column_count - 1]
            .cells
            .iter()
            .map(|c| c.forward_log_prob)
            .collect();
        path[column_count - 1] = MathUtils::max_element_index(&finals);
        for i in (0..column_count - 1).rev() {
            let prev = &self.columns[i];
            let next = &self.columns[i + 1];
            let shared = Self::shared_read_indices(prev, next);
            let next_mask = next.cells[path[i + 1]].partition;
            let candidates: Vec<f64> = prev
                .cells
                .iter()
                .map(|p| {
                    p.forward_log_prob
                        + Self::transition_log_prob(
                            p.partition,
                            next_mask,
                            next.bit_mask(),
                            next.active_reads.len(),
                            &shared,
                        )
                })
                .collect();
            path[i] = MathUtils::max_element_index(&candidates);
        }
        path
    }

    /**
     * Orients the path's canonical partitions so consecutive columns agree on
     * shared reads, then derives per-site genotypes, posteriors and the two
     * read sets.
     */
    pub fn derive_fragment(&self, reference: &SiteReference, store: &ProfileStore) -> GenomeFragment {
        if self.columns.is_empty() {
            return GenomeFragment::empty();
        }
        let path = self.traceback();

        let mut partitions: Vec<u64> = Vec::with_capacity(self.columns.len());
        for (i, column) in self.columns.iter().enumerate() {
            let mask = column.cells[path[i]].partition;
            let oriented = if i == 0 {
                mask
            } else {
                let prev = &self.columns[i - 1];
                let shared = Self::shared_read_indices(prev, column);
                let complement = (!mask) & column.bit_mask();
                if Self::masks_agree(&shared, partitions[i - 1], mask) {
                    mask
                } else if Self::masks_agree(&shared, partitions[i - 1], complement) {
                    complement
                } else {
                    mask
                }
            };
            partitions.push(oriented);
        }

        let mut fragment = GenomeFragment::empty();
        fragment.ref_start = self.columns[0].site;
        fragment.length = self.columns.len();
        for (i, column) in self.columns.iter().enumerate() {
            let genotype = best_site_genotype(
                reference,
                column.site,
                &column.active_reads,
                partitions[i],
                store,
                self.include_ancestor_sub_prob,
            );
            fragment.hap1.push(genotype.hap1);
            fragment.hap2.push(genotype.hap2);
            fragment.ancestors.push(genotype.ancestor);
            fragment.genotype_posteriors.push(genotype.posterior);
            let cell = &column.cells[path[i]];
            fragment
                .cell_posteriors
                .push((cell.forward_log_prob + cell.backward_log_prob - self.total_log_prob).exp());
            for (r, read_id) in column.active_reads.iter().enumerate() {
                if (partitions[i] >> r) & 1 == 0 {
                    fragment.reads1.insert(*read_id);
                } else {
                    fragment.reads2.insert(*read_id);
                }
            }
            fragment.active_reads.push(column.active_reads.clone());
        }
        fragment.partitions = partitions;
        fragment
    }
}

/**
 * The most probable (hap1, hap2, ancestor) at one site given an oriented read
 * partition, with the genotype's posterior over all allele pairs.
 */
pub fn best_site_genotype(
    reference: &SiteReference,
    site: usize,
    active_reads: &[usize],
    partition: u64,
    store: &ProfileStore,
    include_ancestor_sub_prob: bool,
) -> SiteGenotype {
    let site_ref = &reference.sites[site];
    let allele_no = site_ref.allele_no;
    let scores = ReadPartitionHmm::column_scores(reference, store, site, active_reads);
    let ancestor_terms =
        ReadPartitionHmm::ancestor_terms(reference, site, include_ancestor_sub_prob);

    let mut part0 = vec![0.0; allele_no];
    let mut part1 = vec![0.0; allele_no];
    for r in 0..scores.nrows() {
        let target = if (partition >> r) & 1 == 0 {
            &mut part0
        } else {
            &mut part1
        };
        for (a, entry) in target.iter_mut().enumerate() {
            *entry += scores[[r, a]];
        }
    }

    let mut terms = Vec::with_capacity(allele_no * allele_no);
    let mut best = (0usize, 0usize);
    let mut best_term = f64::NEG_INFINITY;
    for a in 0..allele_no {
        for b in 0..allele_no {
            let term = site_ref.log_priors[a]
                + site_ref.log_priors[b]
                + ancestor_terms[[a, b]]
                + part0[a]
                + part1[b];
            if term > best_term {
                best_term = term;
                best = (a, b);
            }
            terms.push(term);
        }
    }

    let ancestor_scores: Vec<f64> = (0..allele_no)
        .map(|anc| {
            site_ref.log_priors[anc]
                + reference.substitution_log_prob(site, anc, best.0)
                + reference.substitution_log_prob(site, anc, best.1)
        })
        .collect();

    SiteGenotype {
        hap1: best.0,
        hap2: best.1,
        ancestor: MathUtils::max_element_index(&ancestor_scores),
        posterior: (best_term - MathUtils::log_sum_exp(&terms)).exp(),
    }
}

/**
 * Top-level phasing: the reads of each strand are phased separately with an
 * exhaustive HMM, the two tiling partitions are fused into one HMM over all
 * bubbles with only the strand-consistent cells, and the fused chain is
 * decoded with the ancestor substitution model enabled.
 */
pub struct PhasingAlgorithm {}

impl PhasingAlgorithm {
    pub fn phase(
        reference: &SiteReference,
        store: &ProfileStore,
        phase_params: &PhaseParams,
    ) -> GenomeFragment {
        if store.is_empty() || reference.site_no() == 0 {
            return GenomeFragment::empty();
        }

        let forward_fragment = Self::phase_strand(reference, store, true);
        let reverse_fragment = Self::phase_strand(reference, store, false);

        let mut fused = Self::build_fused(
            reference,
            store,
            &forward_fragment,
            &reverse_fragment,
            phase_params.include_ancestor_sub_prob,
        );
        fused.run_forward_backward(reference, store);
        fused.derive_fragment(reference, store)
    }

    fn phase_strand(
        reference: &SiteReference,
        store: &ProfileStore,
        forward_strand: bool,
    ) -> GenomeFragment {
        let mut hmm =
            ReadPartitionHmm::build_exhaustive(reference, store, Some(forward_strand), false);
        hmm.run_forward_backward(reference, store);
        hmm.derive_fragment(reference, store)
    }

    fn build_fused(
        reference: &SiteReference,
        store: &ProfileStore,
        forward_fragment: &GenomeFragment,
        reverse_fragment: &GenomeFragment,
        include_ancestor_sub_prob: bool,
    ) -> ReadPartitionHmm {
        let columns = (0..reference.site_no())
            .map(|site| {
                let active_reads: Vec<usize> = store
                    .iter()
                    .filter(|p| p.covers(site))
                    .map(|p| p.read_id)
                    .collect();
                let bit_count = active_reads.len();
                let bits = if bit_count >= 64 {
                    u64::MAX
                } else {
                    (1u64 << bit_count) - 1
                };

                let mut masks: Vec<u64> = Vec::new();
                for flip_forward in [false, true] {
                    for flip_reverse in [false, true] {
                        let mut mask = 0u64;
                        for (bit_idx, read_id) in active_reads.iter().enumerate() {
                            let profile = store.get(*read_id).unwrap();
                            let (strand_fragment, flip) = if profile.forward_strand {
                                (forward_fragment, flip_forward)
                            } else {
                                (reverse_fragment, flip_reverse)
                            };
                            let strand_active = &strand_fragment.active_reads[site];
                            let strand_idx = strand_active
                                .iter()
                                .position(|id| id == read_id)
                                .expect("read missing from its strand partition");
                            let mut bit = (strand_fragment.partitions[site] >> strand_idx) & 1;
                            if flip {
                                bit ^= 1;
                            }
                            mask |= bit << bit_idx;
                        }
                        let canonical = if mask & 1 == 1 { (!mask) & bits } else { mask };
                        if !masks.contains(&canonical) {
                            masks.push(canonical);
                        }
                    }
                }
                HmmColumn {
                    site,
                    active_reads,
                    cells: masks.into_iter().map(HmmCell::new).collect(),
                }
            })
            .collect();
        ReadPartitionHmm {
            columns,
            include_ancestor_sub_prob,
            total_log_prob: f64::NEG_INFINITY,
        }
    }
}
