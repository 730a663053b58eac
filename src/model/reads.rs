use crate::rle::rle_string::RleString;

/**
 * A long read as handed to the phasing core: run-length compressed bases and
 * one averaged phred quality per run. Reads are addressed everywhere by their
 * index in the input list.
 */
#[derive(Debug, Clone)]
pub struct SequenceRead {
    pub read_name: String,
    pub forward_strand: bool,
    pub rle_read: RleString,
    /// Per-run phred qualities, parallel to the compressed read. Empty when
    /// the read carries no qualities.
    pub qualities: Vec<u8>,
}

impl SequenceRead {
    pub fn new(
        read_name: &str,
        forward_strand: bool,
        rle_read: RleString,
        qualities: Vec<u8>,
    ) -> SequenceRead {
        SequenceRead {
            read_name: read_name.to_string(),
            forward_strand,
            rle_read,
            qualities,
        }
    }

    /// Mean base quality over `length` runs starting at `start`, or -1.0 for
    /// a read without qualities.
    pub fn mean_quality(&self, start: usize, length: usize) -> f64 {
        if self.qualities.is_empty() || length == 0 {
            return -1.0;
        }
        let end = std::cmp::min(start + length, self.qualities.len());
        if end <= start {
            return -1.0;
        }
        let total: u64 = self.qualities[start..end].iter().map(|q| *q as u64).sum();
        total as f64 / (end - start) as f64
    }
}

/// A pre-called variant site used to drive bubble construction instead of the
/// candidate detector.
#[derive(Debug, Clone)]
pub struct VcfEntry {
    pub contig: String,
    /// Variant position in compressed reference coordinates.
    pub ref_pos: usize,
    pub alleles: Vec<Vec<u8>>,
    pub gt1: usize,
    pub gt2: usize,
    /// Bubble interval around the site, inclusive of the stop position.
    pub ref_aln_start: usize,
    pub ref_aln_stop_incl: usize,
    /// When set, the entry only pins the candidate position and its alleles
    /// are not substituted into the reference.
    pub raw_ref_pos_informative_only: bool,
}
