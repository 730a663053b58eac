use hashlink::LinkedHashMap;
use ordered_float::OrderedFloat;

use crate::bubbles::bubble::{Bubble, ReadSubstring};
use crate::model::params::PolishParams;
use crate::model::reads::SequenceRead;
use crate::pair_hmm::pair_hmm::PairHmm;
use crate::poa::poa_graph::Poa;
use crate::rle::rle_string::RleString;

/**
 * Fills each bubble's allele/read support matrix by scoring every
 * participating read substring against every allele with the strand-matched
 * pair HMM. Identical read substrings are scored once per bubble: the memo
 * cache copies the whole allele support column on a hit.
 */
pub struct BubbleScorer<'a> {
    params: &'a PolishParams,
    forward_hmm: PairHmm,
    reverse_hmm: PairHmm,
}

impl<'a> BubbleScorer<'a> {
    pub fn new(params: &'a PolishParams) -> BubbleScorer<'a> {
        BubbleScorer {
            params,
            forward_hmm: PairHmm::new(&params.forward_strand_model),
            reverse_hmm: PairHmm::new(&params.reverse_strand_model),
        }
    }

    /**
     * Read substrings spanning the interval, located through the POA
     * observation offsets at the flanking anchor columns. A bubble at the
     * start of the graph takes read prefixes up to the end anchor; one at the
     * end takes suffixes from the start anchor; interior bubbles take the
     * substring between both anchors of the same read.
     */
    pub fn gather_read_substrings(
        poa: &Poa,
        reads: &[SequenceRead],
        interval: (usize, usize),
    ) -> Vec<ReadSubstring> {
        let (ref_start, length) = interval;
        let end = ref_start + length;
        let mut substrings = Vec::new();

        for (read_id, read) in reads.iter().enumerate() {
            let start_offset = if ref_start == 0 {
                Some(0)
            } else {
                poa.observation_offset(ref_start - 1, read_id).map(|o| o + 1)
            };
            let end_offset = if end >= poa.len() {
                Some(read.rle_read.len())
            } else {
                poa.observation_offset(end, read_id)
            };
            if let (Some(from), Some(to)) = (start_offset, end_offset) {
                if to >= from && to <= read.rle_read.len() {
                    let substring = read.rle_read.substring(from, to - from);
                    substrings.push(ReadSubstring {
                        read_id,
                        start: from,
                        length: to - from,
                        qual: read.mean_quality(from, to - from),
                        forward_strand: read.forward_strand,
                        substring,
                    });
                }
            }
        }
        substrings
    }

    /**
     * Quality-based participation filter: sorted by descending mean base
     * quality, the lowest-quality entries are dropped while coverage strictly
     * exceeds the configured floor and the candidate falls below the minimum
     * average quality. Reads without qualities are never dropped.
     */
    pub fn filter_by_quality(
        &self,
        mut substrings: Vec<ReadSubstring>,
    ) -> Vec<ReadSubstring> {
        substrings.sort_by_key(|s| {
            std::cmp::Reverse(OrderedFloat(if s.qual < 0.0 { f64::MAX } else { s.qual }))
        });
        while substrings.len() > self.params.filter_reads_while_have_at_least_this_coverage {
            match substrings.last() {
                Some(last) if last.qual >= 0.0 && last.qual < self.params.min_avg_base_quality => {
                    substrings.pop();
                }
                _ => break,
            }
        }
        substrings
    }

    /// Computes the bubble's full support matrix in place.
    pub fn score_bubble(&self, bubble: &mut Bubble) {
        let allele_no = bubble.allele_no();
        let read_no = bubble.read_no();
        let mut supports = vec![0.0; allele_no * read_no];

        let allele_seqs: Vec<Vec<u8>> = bubble
            .alleles
            .iter()
            .map(|a| self.alignment_sequence(a))
            .collect();

        let mut cache: LinkedHashMap<(RleString, bool), usize> = LinkedHashMap::new();
        for k in 0..read_no {
            let read = &bubble.reads[k];
            let key = (read.substring.clone(), read.forward_strand);
            if let Some(&hit) = cache.get(&key) {
                for j in 0..allele_no {
                    supports[j * read_no + k] = supports[j * read_no + hit];
                }
                continue;
            }
            let read_seq = self.alignment_sequence(&read.substring);
            let hmm = if read.forward_strand {
                &self.forward_hmm
            } else {
                &self.reverse_hmm
            };
            for (j, allele_seq) in allele_seqs.iter().enumerate() {
                supports[j * read_no + k] = hmm.forward_log_prob(allele_seq, &read_seq);
            }
            cache.insert(key, k);
        }

        bubble.allele_read_supports = supports;
    }

    /// The sequence actually aligned: expanded when repeat counts take part
    /// in alignment, compressed characters otherwise.
    fn alignment_sequence(&self, rle: &RleString) -> Vec<u8> {
        if self.params.use_repeat_counts_in_alignment {
            rle.expand()
        } else {
            rle.chars().to_vec()
        }
    }
}
