use crate::utils::errors::PardaloteError;

/// Largest representable run length. Longer homopolymers are clamped.
pub const MAX_RUN_LENGTH: u8 = u8::MAX;

/**
 * A run-length encoded sequence: the compressed characters plus a parallel
 * array of run lengths. When encoding is disabled the structure degenerates
 * to one run of length 1 per character and equality falls back to plain
 * string comparison.
 *
 * Invariant (encoding enabled): adjacent runs carry distinct characters and
 * every run length is at least 1.
 */
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RleString {
    chars: Vec<u8>,
    run_lengths: Vec<u8>,
    expanded_length: usize,
    rle_enabled: bool,
}

impl RleString {
    /// Encodes an expanded sequence. With `rle_enabled == false` every
    /// character becomes its own run of length 1.
    pub fn from_expanded(sequence: &[u8], rle_enabled: bool) -> RleString {
        if !rle_enabled {
            return RleString {
                chars: sequence.to_vec(),
                run_lengths: vec![1; sequence.len()],
                expanded_length: sequence.len(),
                rle_enabled,
            };
        }
        let mut chars = Vec::new();
        let mut run_lengths: Vec<u8> = Vec::new();
        for &c in sequence {
            match chars.last() {
                Some(&last) if last == c && *run_lengths.last().unwrap() < MAX_RUN_LENGTH => {
                    *run_lengths.last_mut().unwrap() += 1;
                }
                Some(&last) if last == c => {
                    // run length saturated at the cap, nothing to record
                }
                _ => {
                    chars.push(c);
                    run_lengths.push(1);
                }
            }
        }
        let expanded_length = run_lengths.iter().map(|l| *l as usize).sum();
        RleString {
            chars,
            run_lengths,
            expanded_length,
            rle_enabled,
        }
    }

    /// Builds from precomputed runs. A zero run length is rejected; lengths
    /// above the cap are clamped.
    pub fn from_parts(chars: &[u8], run_lengths: &[usize]) -> Result<RleString, PardaloteError> {
        assert_eq!(chars.len(), run_lengths.len());
        let mut lengths = Vec::with_capacity(run_lengths.len());
        for (i, &l) in run_lengths.iter().enumerate() {
            if l == 0 {
                return Err(PardaloteError::ZeroRunLength(i));
            }
            lengths.push(std::cmp::min(l, MAX_RUN_LENGTH as usize) as u8);
        }
        let expanded_length = lengths.iter().map(|l| *l as usize).sum();
        Ok(RleString {
            chars: chars.to_vec(),
            run_lengths: lengths,
            expanded_length,
            rle_enabled: true,
        })
    }

    /// Number of runs (compressed length).
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn expanded_len(&self) -> usize {
        self.expanded_length
    }

    pub fn rle_enabled(&self) -> bool {
        self.rle_enabled
    }

    pub fn chars(&self) -> &[u8] {
        &self.chars
    }

    pub fn run_lengths(&self) -> &[u8] {
        &self.run_lengths
    }

    pub fn char_at(&self, index: usize) -> u8 {
        self.chars[index]
    }

    pub fn run_length_at(&self, index: usize) -> u8 {
        self.run_lengths[index]
    }

    /// Expands back to a plain sequence.
    pub fn expand(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.expanded_length);
        for (c, l) in self.chars.iter().zip(self.run_lengths.iter()) {
            out.extend(std::iter::repeat(*c).take(*l as usize));
        }
        out
    }

    /// Copies `length` runs starting at compressed position `start`.
    pub fn substring(&self, start: usize, length: usize) -> RleString {
        let end = std::cmp::min(start + length, self.chars.len());
        let chars = self.chars[start..end].to_vec();
        let run_lengths = self.run_lengths[start..end].to_vec();
        let expanded_length = run_lengths.iter().map(|l| *l as usize).sum();
        RleString {
            chars,
            run_lengths,
            expanded_length,
            rle_enabled: self.rle_enabled,
        }
    }

    /// Concatenation: joins the expansions and re-encodes, so a run split
    /// across the seam is merged back together.
    pub fn concat(&self, other: &RleString) -> RleString {
        let mut joined = self.expand();
        joined.extend(other.expand());
        RleString::from_expanded(&joined, self.rle_enabled)
    }

    /// Equality over characters and run lengths. With encoding disabled this
    /// is plain string equality.
    pub fn eq_expanded(&self, other: &RleString) -> bool {
        self.chars == other.chars && self.run_lengths == other.run_lengths
    }

    /// Equality over the compressed characters only.
    pub fn eq_chars(&self, other: &RleString) -> bool {
        self.chars == other.chars
    }
}
