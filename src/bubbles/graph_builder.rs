use crate::bubbles::allele_enumerator::AlleleEnumerator;
use crate::bubbles::bubble::{Bubble, BubbleGraph};
use crate::bubbles::bubble_scorer::BubbleScorer;
use crate::bubbles::candidate_sites::{CandidateSiteFinder, CandidateSites};
use crate::model::params::PolishParams;
use crate::model::reads::{SequenceRead, VcfEntry};
use crate::poa::poa_graph::Poa;
use crate::rle::rle_string::RleString;
use crate::utils::errors::PardaloteError;

/**
 * Builds the scored bubble graph for one reference chunk: candidate-site
 * detection, allele enumeration per non-anchor interval, read-substring
 * gathering and support-matrix scoring.
 */
pub struct BubbleGraphBuilder {}

impl BubbleGraphBuilder {
    pub fn build(
        poa: &Poa,
        reads: &[SequenceRead],
        params: &PolishParams,
        vcf_entries: Option<&[VcfEntry]>,
    ) -> Result<BubbleGraph, PardaloteError> {
        let sites = CandidateSiteFinder::find(poa, params, vcf_entries);
        let scorer = BubbleScorer::new(params);
        let mut bubbles = Vec::new();

        let explicit_entries: Vec<&VcfEntry> = vcf_entries
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| !e.raw_ref_pos_informative_only)
                    .collect()
            })
            .unwrap_or_default();

        if !explicit_entries.is_empty() {
            for entry in explicit_entries {
                if let Some(bubble) = Self::bubble_from_entry(poa, reads, params, &scorer, entry) {
                    bubbles.push(bubble);
                }
            }
        } else {
            for interval in sites.bubble_intervals() {
                if let Some(bubble) =
                    Self::bubble_from_interval(poa, reads, params, &scorer, &sites, interval)?
                {
                    bubbles.push(bubble);
                }
            }
        }

        let graph = BubbleGraph::new(bubbles, poa.ref_rle.clone());
        info!(
            "Built bubble graph with {} bubbles and {} alleles over {} reference positions",
            graph.bubble_no(),
            graph.total_alleles,
            poa.len()
        );
        Ok(graph)
    }

    fn bubble_from_interval(
        poa: &Poa,
        reads: &[SequenceRead],
        params: &PolishParams,
        scorer: &BubbleScorer,
        sites: &CandidateSites,
        interval: (usize, usize),
    ) -> Result<Option<Bubble>, PardaloteError> {
        let (ref_start, bubble_length) = interval;
        let ref_allele = poa.ref_rle.substring(ref_start, bubble_length);

        let substrings =
            scorer.filter_by_quality(BubbleScorer::gather_read_substrings(poa, reads, interval));

        let use_read_alleles = params.use_read_alleles || params.use_read_alleles_in_phasing;
        let alleles = if use_read_alleles {
            AlleleEnumerator::alleles_from_reads(&substrings, &ref_allele)
        } else {
            match AlleleEnumerator::alleles_from_poa(poa, interval, &sites.thresholds, params) {
                Ok(alleles) => alleles,
                Err(PardaloteError::OverflowBudget { budget }) => {
                    warn!(
                        "Enumeration over [{}, {}) stayed above {} strings after retries, \
                         falling back to read-derived alleles",
                        ref_start,
                        ref_start + bubble_length,
                        budget
                    );
                    AlleleEnumerator::alleles_from_reads(&substrings, &ref_allele)
                }
                Err(e) => return Err(e),
            }
        };

        // A site with no alternative allele folds back into the anchors.
        if alleles.len() < 2 {
            return Ok(None);
        }

        let variant_position_offsets = (ref_start..ref_start + bubble_length)
            .filter(|p| sites.variant_positions[*p])
            .map(|p| p - ref_start)
            .collect();

        let mut bubble = Bubble {
            ref_start,
            bubble_length,
            ref_allele,
            alleles,
            reads: substrings,
            allele_read_supports: Vec::new(),
            variant_position_offsets,
            allele_offset: 0,
        };
        scorer.score_bubble(&mut bubble);
        Ok(Some(bubble))
    }

    /// One bubble per pre-called VCF site: the entry's alleles spliced into
    /// the reference over the entry's alignment interval.
    fn bubble_from_entry(
        poa: &Poa,
        reads: &[SequenceRead],
        params: &PolishParams,
        scorer: &BubbleScorer,
        entry: &VcfEntry,
    ) -> Option<Bubble> {
        if poa.is_empty() {
            return None;
        }
        let ref_start = entry.ref_aln_start;
        let stop = std::cmp::min(entry.ref_aln_stop_incl, poa.len() - 1);
        if ref_start > stop || entry.ref_pos < ref_start || entry.ref_pos > stop {
            warn!(
                "Skipping VCF entry at {}:{} with alignment interval [{}, {}] outside the chunk",
                entry.contig, entry.ref_pos, entry.ref_aln_start, entry.ref_aln_stop_incl
            );
            return None;
        }
        let bubble_length = stop - ref_start + 1;
        let ref_allele = poa.ref_rle.substring(ref_start, bubble_length);
        let offset = entry.ref_pos - ref_start;

        let mut alleles = vec![ref_allele.clone()];
        for allele_bytes in &entry.alleles {
            let mut spliced = ref_allele.substring(0, offset).expand();
            spliced.extend(allele_bytes);
            spliced.extend(
                ref_allele
                    .substring(offset + 1, bubble_length - offset - 1)
                    .expand(),
            );
            let allele = RleString::from_expanded(&spliced, params.use_run_length_encoding);
            if !alleles.iter().any(|a| a.eq_expanded(&allele)) {
                alleles.push(allele);
            }
        }
        if alleles.len() < 2 {
            return None;
        }

        let substrings = scorer.filter_by_quality(BubbleScorer::gather_read_substrings(
            poa,
            reads,
            (ref_start, bubble_length),
        ));

        let mut bubble = Bubble {
            ref_start,
            bubble_length,
            ref_allele,
            alleles,
            reads: substrings,
            allele_read_supports: Vec::new(),
            variant_position_offsets: vec![offset],
            allele_offset: 0,
        };
        scorer.score_bubble(&mut bubble);
        Some(bubble)
    }
}
