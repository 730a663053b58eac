use crate::rle::rle_string::RleString;

/**
 * A read's substring over one bubble interval, in the read's compressed
 * coordinates, together with the mean base quality used by the coverage
 * filter. A quality of -1 marks a read without qualities.
 */
#[derive(Debug, Clone)]
pub struct ReadSubstring {
    pub read_id: usize,
    pub start: usize,
    pub length: usize,
    pub qual: f64,
    pub forward_strand: bool,
    pub substring: RleString,
}

/**
 * A candidate variant site: a non-anchor reference interval, its allele set
 * (the reference allele is always a member) and the per-(allele, read)
 * log-likelihood support matrix, row-major with allele j, read k at
 * `j * read_no + k`.
 */
#[derive(Debug, Clone)]
pub struct Bubble {
    pub ref_start: usize,
    pub bubble_length: usize,
    pub ref_allele: RleString,
    pub alleles: Vec<RleString>,
    pub reads: Vec<ReadSubstring>,
    pub allele_read_supports: Vec<f64>,
    /// Offsets within the bubble that correspond to called variant positions,
    /// populated in VCF-driven mode.
    pub variant_position_offsets: Vec<usize>,
    /// Prefix sum of allele counts of preceding bubbles; set by the graph.
    pub allele_offset: usize,
}

impl Bubble {
    pub fn allele_no(&self) -> usize {
        self.alleles.len()
    }

    pub fn read_no(&self) -> usize {
        self.reads.len()
    }

    pub fn support(&self, allele: usize, read: usize) -> f64 {
        self.allele_read_supports[allele * self.reads.len() + read]
    }

    /// Index of the reference allele in the allele list.
    pub fn ref_allele_index(&self) -> usize {
        self.alleles
            .iter()
            .position(|a| a.eq_expanded(&self.ref_allele))
            .expect("bubble without reference allele")
    }

    /// Position of a read in this bubble's read list.
    pub fn read_index(&self, read_id: usize) -> Option<usize> {
        self.reads.iter().position(|r| r.read_id == read_id)
    }
}

/**
 * The ordered bubble graph over one reference chunk. Bubbles are disjoint
 * and sorted by `ref_start`; between any two bubbles the reference is an
 * anchor region in which all reads agree.
 */
#[derive(Debug, Clone)]
pub struct BubbleGraph {
    pub bubbles: Vec<Bubble>,
    pub ref_rle: RleString,
    pub total_alleles: usize,
}

impl BubbleGraph {
    /// Assembles the graph, assigning each bubble its allele offset.
    pub fn new(mut bubbles: Vec<Bubble>, ref_rle: RleString) -> BubbleGraph {
        bubbles.sort_by_key(|b| b.ref_start);
        let mut total_alleles = 0;
        for bubble in bubbles.iter_mut() {
            bubble.allele_offset = total_alleles;
            total_alleles += bubble.allele_no();
        }
        debug_assert!(bubbles
            .windows(2)
            .all(|w| w[0].ref_start + w[0].bubble_length <= w[1].ref_start));
        BubbleGraph {
            bubbles,
            ref_rle,
            total_alleles,
        }
    }

    pub fn bubble_no(&self) -> usize {
        self.bubbles.len()
    }
}
