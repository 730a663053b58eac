use std::collections::BTreeSet;

use serde_json::json;

use crate::bubbles::bubble::BubbleGraph;
use crate::bubbles::graph_builder::BubbleGraphBuilder;
use crate::model::params::{PhaseParams, PolishParams};
use crate::model::reads::{SequenceRead, VcfEntry};
use crate::phasing::genome_fragment::GenomeFragment;
use crate::phasing::partition_hmm::PhasingAlgorithm;
use crate::phasing::profile_seq::{ProfileSeq, ProfileSeqProjector, ProfileStore, SiteReference};
use crate::phasing::read_attachment::{ReadAttachmentEngine, ReadAttachmentResult};
use crate::phasing::refinement::RefinementEngine;
use crate::poa::poa_graph::Poa;
use crate::rle::rle_string::RleString;
use crate::utils::errors::PardaloteError;

/// Everything the phasing of one reference chunk produces.
#[derive(Debug, Clone)]
pub struct PhasedChunk {
    pub bubble_graph: BubbleGraph,
    pub fragment: GenomeFragment,
    pub hap1: RleString,
    pub hap2: RleString,
    pub attachment: ReadAttachmentResult,
    pub refinement_rounds: usize,
}

/**
 * Orchestrates one chunk end to end: bubble graph construction and scoring,
 * profile projection, coverage capping, strand-split HMM phasing, iterative
 * refinement and filtered-read attachment.
 */
pub struct PhasingEngine {
    polish_params: PolishParams,
    phase_params: PhaseParams,
}

impl PhasingEngine {
    pub fn new(
        polish_params: PolishParams,
        phase_params: PhaseParams,
    ) -> Result<PhasingEngine, PardaloteError> {
        phase_params.validate()?;
        Ok(PhasingEngine {
            polish_params,
            phase_params,
        })
    }

    pub fn phase_chunk(
        &self,
        poa: &Poa,
        reads: &[SequenceRead],
        vcf_entries: Option<&[VcfEntry]>,
    ) -> Result<PhasedChunk, PardaloteError> {
        let graph = BubbleGraphBuilder::build(poa, reads, &self.polish_params, vcf_entries)?;
        let profiles = ProfileSeqProjector::project(&graph, reads.len());
        let reference = SiteReference::from_bubble_graph(&graph, &self.polish_params);

        let (store, dropped) = Self::filter_profiles_by_coverage(
            profiles,
            reference.site_no(),
            self.phase_params.max_coverage_depth,
            reads.len(),
        );
        if !dropped.is_empty() {
            info!(
                "Coverage cap {} dropped {} reads from phasing; they will be reattached",
                self.phase_params.max_coverage_depth,
                dropped.len()
            );
        }

        let mut fragment = if store.is_empty() {
            info!("No profile sequences to phase; emitting an empty fragment");
            GenomeFragment::empty()
        } else {
            PhasingAlgorithm::phase(&reference, &store, &self.phase_params)
        };

        let refinement_rounds = RefinementEngine::refine(
            &mut fragment,
            &reference,
            &store,
            self.phase_params.rounds_of_iterative_refinement,
            self.phase_params.include_ancestor_sub_prob,
        );

        // Everything that appears in the graph but ended up in neither read
        // set gets attached by cumulative het-site support.
        let mut excluded: BTreeSet<usize> = dropped.iter().map(|p| p.read_id).collect();
        for bubble in &graph.bubbles {
            for read in &bubble.reads {
                if !fragment.reads1.contains(&read.read_id)
                    && !fragment.reads2.contains(&read.read_id)
                {
                    excluded.insert(read.read_id);
                }
            }
        }
        let excluded: Vec<usize> = excluded.into_iter().collect();
        let attachment = ReadAttachmentEngine::attach(&graph, &fragment, &excluded);

        let (hap1, hap2) = if fragment.is_empty() {
            (graph.ref_rle.clone(), graph.ref_rle.clone())
        } else {
            (
                fragment.haplotype_string(&graph, &fragment.hap1),
                fragment.haplotype_string(&graph, &fragment.hap2),
            )
        };

        Self::log_strand_skew(&graph, &fragment);

        Ok(PhasedChunk {
            bubble_graph: graph,
            fragment,
            hap1,
            hap2,
            attachment,
            refinement_rounds,
        })
    }

    /**
     * Drops profile sequences until no site's active-read count exceeds the
     * coverage cap. Sites are processed in order; the highest-numbered read
     * active at an over-cap site is removed first, which keeps the choice
     * deterministic.
     */
    fn filter_profiles_by_coverage(
        profiles: Vec<ProfileSeq>,
        site_no: usize,
        max_coverage_depth: usize,
        read_count: usize,
    ) -> (ProfileStore, Vec<ProfileSeq>) {
        let mut kept: Vec<ProfileSeq> = profiles;
        let mut dropped: Vec<ProfileSeq> = Vec::new();
        for site in 0..site_no {
            loop {
                let active: Vec<usize> = kept
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.covers(site))
                    .map(|(i, _)| i)
                    .collect();
                if active.len() <= max_coverage_depth {
                    break;
                }
                let victim = *active
                    .iter()
                    .max_by_key(|&&i| kept[i].read_id)
                    .unwrap();
                dropped.push(kept.swap_remove(victim));
            }
        }
        (ProfileStore::new(read_count, kept), dropped)
    }

    /// Per-bubble counts of forward- and reverse-strand reads backing each
    /// haplotype allele. A pronounced asymmetry is a quality signal only.
    fn log_strand_skew(graph: &BubbleGraph, fragment: &GenomeFragment) {
        if fragment.is_empty() || !log_enabled!(log::Level::Debug) {
            return;
        }
        for (site, bubble) in graph.bubbles.iter().enumerate() {
            if !fragment.is_het_site(site) {
                continue;
            }
            let (mut fwd1, mut rev1, mut fwd2, mut rev2) = (0usize, 0usize, 0usize, 0usize);
            for (k, read) in bubble.reads.iter().enumerate() {
                let sup1 = bubble.support(fragment.hap1[site], k);
                let sup2 = bubble.support(fragment.hap2[site], k);
                match (sup1 > sup2, read.forward_strand) {
                    (true, true) => fwd1 += 1,
                    (true, false) => rev1 += 1,
                    (false, true) => fwd2 += 1,
                    (false, false) => rev2 += 1,
                }
            }
            debug!(
                "Strand support at bubble {} (ref {}): hap1 {}F/{}R hap2 {}F/{}R",
                site, bubble.ref_start, fwd1, rev1, fwd2, rev2
            );
        }
    }

    /// The phased result as JSON: both haplotype sequences and the read-name
    /// partition, plus the attachment of the filtered reads.
    pub fn fragment_json(chunk: &PhasedChunk, reads: &[SequenceRead]) -> serde_json::Value {
        let names = |ids: &[usize]| -> Vec<String> {
            ids.iter().map(|id| reads[*id].read_name.clone()).collect()
        };
        json!({
            "hap1Sequence": String::from_utf8_lossy(&chunk.hap1.expand()),
            "hap2Sequence": String::from_utf8_lossy(&chunk.hap2.expand()),
            "hap1Reads": names(&chunk.fragment.reads1.iter().copied().collect::<Vec<usize>>()),
            "hap2Reads": names(&chunk.fragment.reads2.iter().copied().collect::<Vec<usize>>()),
            "attachedHap1Reads": names(&chunk.attachment.hap1_reads),
            "attachedHap2Reads": names(&chunk.attachment.hap2_reads),
            "unclassifiedReads": names(&chunk.attachment.unclassified_reads),
            "refinementRounds": chunk.refinement_rounds,
        })
    }

    /// Per-bubble, per-read haplotype supports as JSON, the optional debug
    /// output of a phased chunk.
    pub fn bubble_supports_json(
        chunk: &PhasedChunk,
        reads: &[SequenceRead],
    ) -> serde_json::Value {
        let bubbles: Vec<serde_json::Value> = chunk
            .bubble_graph
            .bubbles
            .iter()
            .enumerate()
            .map(|(site, bubble)| {
                let read_supports: Vec<serde_json::Value> = bubble
                    .reads
                    .iter()
                    .enumerate()
                    .map(|(k, read)| {
                        let (sup1, sup2) = if chunk.fragment.is_empty() {
                            (0.0, 0.0)
                        } else {
                            (
                                bubble.support(chunk.fragment.hap1[site], k),
                                bubble.support(chunk.fragment.hap2[site], k),
                            )
                        };
                        let strand = if read.forward_strand { "+" } else { "-" };
                        json!({
                            "readName": reads[read.read_id].read_name,
                            "strand": strand,
                            "hap1Support": sup1,
                            "hap2Support": sup2,
                        })
                    })
                    .collect();
                let (hap1_allele, hap2_allele) = if chunk.fragment.is_empty() {
                    (0, 0)
                } else {
                    (chunk.fragment.hap1[site], chunk.fragment.hap2[site])
                };
                json!({
                    "refStart": bubble.ref_start,
                    "alleleNo": bubble.allele_no(),
                    "hap1Allele": hap1_allele,
                    "hap2Allele": hap2_allele,
                    "reads": read_supports,
                })
            })
            .collect();
        json!({ "bubbles": bubbles })
    }
}
