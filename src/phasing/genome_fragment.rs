use std::collections::BTreeSet;

use crate::bubbles::bubble::BubbleGraph;
use crate::rle::rle_string::RleString;

/**
 * The phased output over one reference chunk: per-site haplotype allele
 * indices, the ancestral allele, posteriors, and the two disjoint read sets
 * whose union is exactly the reads used in phasing. Sites are bubble
 * indices.
 */
#[derive(Debug, Clone, Serialize)]
pub struct GenomeFragment {
    pub ref_start: usize,
    pub length: usize,
    pub hap1: Vec<usize>,
    pub hap2: Vec<usize>,
    pub ancestors: Vec<usize>,
    pub genotype_posteriors: Vec<f64>,
    pub cell_posteriors: Vec<f64>,
    pub reads1: BTreeSet<usize>,
    pub reads2: BTreeSet<usize>,
    /// Active read ids per site, parallel to `partitions`.
    #[serde(skip)]
    pub active_reads: Vec<Vec<usize>>,
    /// Oriented partition bitmask per site; bit k is the haplotype of the
    /// k-th active read.
    #[serde(skip)]
    pub partitions: Vec<u64>,
}

impl GenomeFragment {
    /// The fragment returned for an empty alignment: spans no sites.
    pub fn empty() -> GenomeFragment {
        GenomeFragment {
            ref_start: 0,
            length: 0,
            hap1: Vec::new(),
            hap2: Vec::new(),
            ancestors: Vec::new(),
            genotype_posteriors: Vec::new(),
            cell_posteriors: Vec::new(),
            reads1: BTreeSet::new(),
            reads2: BTreeSet::new(),
            active_reads: Vec::new(),
            partitions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn is_het_site(&self, site: usize) -> bool {
        self.hap1[site] != self.hap2[site]
    }

    /**
     * Splices the chosen alleles into the anchor regions of the reference,
     * yielding the full haplotype sequence for this chunk.
     */
    pub fn haplotype_string(&self, graph: &BubbleGraph, hap: &[usize]) -> RleString {
        assert_eq!(hap.len(), graph.bubble_no());
        let mut expanded = Vec::new();
        let mut cursor = 0;
        for (i, bubble) in graph.bubbles.iter().enumerate() {
            expanded.extend(
                graph
                    .ref_rle
                    .substring(cursor, bubble.ref_start - cursor)
                    .expand(),
            );
            expanded.extend(bubble.alleles[hap[i]].expand());
            cursor = bubble.ref_start + bubble.bubble_length;
        }
        expanded.extend(
            graph
                .ref_rle
                .substring(cursor, graph.ref_rle.len() - cursor)
                .expand(),
        );
        RleString::from_expanded(&expanded, graph.ref_rle.rle_enabled())
    }
}
