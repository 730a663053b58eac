use std::collections::BTreeSet;

use crate::bubbles::bubble::ReadSubstring;
use crate::model::params::PolishParams;
use crate::poa::poa_graph::Poa;
use crate::rle::rle_string::RleString;
use crate::utils::errors::PardaloteError;

/// Retries of POA enumeration with an inflated weight threshold before the
/// caller falls back to read-derived alleles.
pub const MAX_ENUMERATION_RETRIES: usize = 5;

/// Multiplier applied to the weight threshold after each overflowing attempt.
const THRESHOLD_INFLATION: f64 = 1.5;

pub struct AlleleEnumerator {}

impl AlleleEnumerator {
    /**
     * Read-derived allele set: spanning read substrings are grouped by
     * RLE-string equality and each group is collapsed to a consensus whose
     * per-position run count is the rounded mean of the members, clamped to
     * [1, 255]. The reference allele is always a member of the result.
     */
    pub fn alleles_from_reads(
        read_substrings: &[ReadSubstring],
        ref_allele: &RleString,
    ) -> Vec<RleString> {
        let mut groups: Vec<Vec<&ReadSubstring>> = Vec::new();
        for substring in read_substrings {
            match groups
                .iter_mut()
                .find(|g| g[0].substring.eq_chars(&substring.substring))
            {
                Some(group) => group.push(substring),
                None => groups.push(vec![substring]),
            }
        }

        let mut alleles = Vec::new();
        for group in &groups {
            let chars = group[0].substring.chars().to_vec();
            let mut counts = Vec::with_capacity(chars.len());
            for position in 0..chars.len() {
                let total: usize = group
                    .iter()
                    .map(|m| m.substring.run_length_at(position) as usize)
                    .sum();
                let mean = (total as f64 / group.len() as f64).round() as usize;
                counts.push(mean.clamp(1, 255));
            }
            // counts are clamped to [1, 255] above, so this cannot fail
            let consensus = RleString::from_parts(&chars, &counts).unwrap();
            if !alleles.iter().any(|a: &RleString| a.eq_expanded(&consensus)) {
                alleles.push(consensus);
            }
        }

        if !alleles.iter().any(|a| a.eq_expanded(ref_allele)) {
            alleles.push(ref_allele.clone());
        }
        alleles
    }

    /**
     * POA-enumeration mode: the cross product of candidate bases, repeat
     * counts and edits over the interval, deduplicated by expanded string.
     * Exceeding `max_consensus_strings` inflates the threshold and retries;
     * persistent overflow is returned for the caller's read-derived fallback.
     */
    pub fn alleles_from_poa(
        poa: &Poa,
        interval: (usize, usize),
        thresholds: &[f64],
        params: &PolishParams,
    ) -> Result<Vec<RleString>, PardaloteError> {
        let mut scale = 1.0;
        for attempt in 0..MAX_ENUMERATION_RETRIES {
            match Self::enumerate(poa, interval, thresholds, scale, params) {
                Ok(products) => {
                    let mut alleles: Vec<RleString> = products
                        .into_iter()
                        .map(|p| RleString::from_expanded(&p, params.use_run_length_encoding))
                        .collect();
                    let ref_allele = poa.ref_rle.substring(interval.0, interval.1);
                    if !alleles.iter().any(|a| a.eq_expanded(&ref_allele)) {
                        alleles.push(ref_allele);
                    }
                    return Ok(alleles);
                }
                Err(PardaloteError::OverflowBudget { budget }) => {
                    debug!(
                        "Allele enumeration over [{}, {}) exceeded {} strings on attempt {}, \
                         inflating weight threshold",
                        interval.0,
                        interval.0 + interval.1,
                        budget,
                        attempt
                    );
                    scale *= THRESHOLD_INFLATION;
                }
                Err(e) => return Err(e),
            }
        }
        Err(PardaloteError::OverflowBudget {
            budget: params.max_consensus_strings,
        })
    }

    fn enumerate(
        poa: &Poa,
        interval: (usize, usize),
        thresholds: &[f64],
        scale: f64,
        params: &PolishParams,
    ) -> Result<Vec<Vec<u8>>, PardaloteError> {
        let mut out: BTreeSet<Vec<u8>> = BTreeSet::new();
        let mut current = Vec::new();
        Self::recurse(
            poa,
            interval.0,
            interval.0 + interval.1,
            thresholds,
            scale,
            params,
            &mut current,
            &mut out,
        )?;
        Ok(out.into_iter().collect())
    }

    #[allow(clippy::too_many_arguments)]
    fn recurse(
        poa: &Poa,
        position: usize,
        end: usize,
        thresholds: &[f64],
        scale: f64,
        params: &PolishParams,
        current: &mut Vec<u8>,
        out: &mut BTreeSet<Vec<u8>>,
    ) -> Result<(), PardaloteError> {
        if position >= end {
            out.insert(current.clone());
            if out.len() > params.max_consensus_strings {
                return Err(PardaloteError::OverflowBudget {
                    budget: params.max_consensus_strings,
                });
            }
            return Ok(());
        }

        let node = &poa.nodes[position];
        let threshold = thresholds[position] * scale;

        // Deletions skip the spanned positions outright.
        for delete in &node.deletes {
            if delete.weight > threshold {
                let resume = std::cmp::min(position + delete.length, end);
                Self::recurse(poa, resume, end, thresholds, scale, params, current, out)?;
            }
        }

        let ref_symbol = params.symbol_index(node.base);
        let mut bases: Vec<u8> = vec![node.base];
        for (symbol, weight) in node.base_weights.iter().enumerate() {
            if Some(symbol) != ref_symbol && *weight > threshold {
                bases.push(params.alphabet[symbol]);
            }
        }

        let ref_count = poa.ref_rle.run_length_at(position) as usize;
        let mut counts: Vec<usize> = vec![ref_count];
        for (count, weight) in node.repeat_count_weights.iter().enumerate() {
            if count != ref_count && *weight > 2.0 * threshold {
                counts.push(count);
            }
        }

        for &base in &bases {
            for &count in &counts {
                let before = current.len();
                current.extend(std::iter::repeat(base).take(count));

                Self::recurse(poa, position + 1, end, thresholds, scale, params, current, out)?;

                for insert in &node.inserts {
                    if insert.weight > threshold {
                        let inserted = current.len();
                        current.extend(insert.insert.expand());
                        Self::recurse(
                            poa,
                            position + 1,
                            end,
                            thresholds,
                            scale,
                            params,
                            current,
                            out,
                        )?;
                        current.truncate(inserted);
                    }
                }

                current.truncate(before);
            }
        }
        Ok(())
    }
}
