use ndarray::Array2;

use crate::bubbles::bubble::BubbleGraph;
use crate::model::params::{PolishParams, PROFILE_PROB_SCALAR};
use crate::utils::math_utils::MathUtils;

/**
 * A read's quantized per-bubble, per-allele log-probabilities: the emission
 * distribution the partition HMM phases on. One byte per allele over the
 * read's bubble span; a LOWER byte value denotes a HIGHER posterior allele
 * probability.
 */
#[derive(Debug, Clone)]
pub struct ProfileSeq {
    pub read_id: usize,
    pub forward_strand: bool,
    /// First covered bubble, in bubble index space.
    pub ref_start: usize,
    /// Covered span, in bubbles.
    pub length: usize,
    /// Allele-dimension offset of `ref_start` in the graph's flat allele space.
    pub allele_offset: usize,
    pub profile_probs: Vec<u8>,
}

impl ProfileSeq {
    pub fn covers(&self, site: usize) -> bool {
        site >= self.ref_start && site < self.ref_start + self.length
    }

    /// The profile bytes of one covered site.
    pub fn bytes_for_site<'a>(&'a self, reference: &SiteReference, site: usize) -> &'a [u8] {
        let site_ref = &reference.sites[site];
        let from = site_ref.allele_offset - self.allele_offset;
        &self.profile_probs[from..from + site_ref.allele_no]
    }
}

/// Converts per-allele supports into profile sequences, one per read that
/// appears anywhere in the bubble graph.
pub struct ProfileSeqProjector {}

impl ProfileSeqProjector {
    pub fn project(graph: &BubbleGraph, read_count: usize) -> Vec<ProfileSeq> {
        let mut spans: Vec<Option<(usize, usize, bool)>> = vec![None; read_count];
        for (i, bubble) in graph.bubbles.iter().enumerate() {
            for read in &bubble.reads {
                let entry = spans[read.read_id]
                    .get_or_insert((i, i, read.forward_strand));
                entry.1 = i;
            }
        }

        let mut profiles = Vec::new();
        for (read_id, span) in spans.iter().enumerate() {
            let (first, last, forward_strand) = match span {
                Some(s) => *s,
                None => continue,
            };
            let allele_offset = graph.bubbles[first].allele_offset;
            let mut profile_probs = Vec::new();
            for bubble in &graph.bubbles[first..=last] {
                let allele_no = bubble.allele_no();
                match bubble.read_index(read_id) {
                    Some(k) => {
                        let column: Vec<f64> =
                            (0..allele_no).map(|j| bubble.support(j, k)).collect();
                        let total = MathUtils::log_sum_exp(&column);
                        for log_prob in column {
                            let byte = (PROFILE_PROB_SCALAR * (total - log_prob)).round();
                            profile_probs.push(byte.min(255.0) as u8);
                        }
                    }
                    None => {
                        // the read skips this bubble: a flat, uninformative row
                        let byte = (PROFILE_PROB_SCALAR * (allele_no as f64).ln()).round();
                        profile_probs.extend(std::iter::repeat(byte.min(255.0) as u8).take(allele_no));
                    }
                }
            }
            profiles.push(ProfileSeq {
                read_id,
                forward_strand,
                ref_start: first,
                length: last - first + 1,
                allele_offset,
                profile_probs,
            });
        }
        profiles
    }
}

/// Profile sequences indexed by stable read id, the lookup structure the HMM
/// and refiner address reads through.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    by_read: Vec<Option<ProfileSeq>>,
}

impl ProfileStore {
    pub fn new(read_count: usize, profiles: Vec<ProfileSeq>) -> ProfileStore {
        let mut by_read = vec![None; read_count];
        for profile in profiles {
            let read_id = profile.read_id;
            by_read[read_id] = Some(profile);
        }
        ProfileStore { by_read }
    }

    pub fn get(&self, read_id: usize) -> Option<&ProfileSeq> {
        self.by_read.get(read_id).and_then(|p| p.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProfileSeq> {
        self.by_read.iter().filter_map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.by_read.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.by_read.iter().all(|p| p.is_none())
    }
}

/// Per-site allele bookkeeping mirroring the bubble graph: allele counts and
/// offsets, uniform priors and the scaled allele-substitution matrix.
#[derive(Debug, Clone)]
pub struct SiteRef {
    pub allele_no: usize,
    pub allele_offset: usize,
    pub log_priors: Vec<f64>,
    /// A x A, scaled by PROFILE_PROB_SCALAR; identity is 0, off-diagonal is
    /// -ln(het_substitution_probability) * PROFILE_PROB_SCALAR.
    pub sub_matrix: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct SiteReference {
    pub sites: Vec<SiteRef>,
    pub total_alleles: usize,
}

impl SiteReference {
    pub fn from_bubble_graph(graph: &BubbleGraph, params: &PolishParams) -> SiteReference {
        let off_diagonal = -params.het_substitution_probability.ln() * PROFILE_PROB_SCALAR;
        let sites = graph
            .bubbles
            .iter()
            .map(|bubble| {
                let allele_no = bubble.allele_no();
                let mut sub_matrix = Array2::from_elem((allele_no, allele_no), off_diagonal);
                for a in 0..allele_no {
                    sub_matrix[[a, a]] = 0.0;
                }
                SiteRef {
                    allele_no,
                    allele_offset: bubble.allele_offset,
                    log_priors: vec![-(allele_no as f64).ln(); allele_no],
                    sub_matrix,
                }
            })
            .collect();
        SiteReference {
            sites,
            total_alleles: graph.total_alleles,
        }
    }

    pub fn site_no(&self) -> usize {
        self.sites.len()
    }

    /// Expected log-probability of a read's profile row given the haplotype
    /// carries `hap_allele` at `site`: log-sum-exp over observed alleles of
    /// profile probability times substitution probability.
    pub fn read_allele_score(&self, site: usize, profile_bytes: &[u8], hap_allele: usize) -> f64 {
        let site_ref = &self.sites[site];
        let mut terms = Vec::with_capacity(site_ref.allele_no);
        for (j, byte) in profile_bytes.iter().enumerate() {
            let scaled = *byte as f64 + site_ref.sub_matrix[[hap_allele, j]];
            terms.push(-scaled / PROFILE_PROB_SCALAR);
        }
        MathUtils::log_sum_exp(&terms)
    }

    /// Scaled substitution log-probability of observing allele `to` when the
    /// ancestral allele is `from`.
    pub fn substitution_log_prob(&self, site: usize, from: usize, to: usize) -> f64 {
        -self.sites[site].sub_matrix[[from, to]] / PROFILE_PROB_SCALAR
    }
}
