use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rust_htslib::bcf::header::HeaderRecord;
use rust_htslib::bcf::record::GenotypeAllele;
use rust_htslib::bcf::{self, Read};

use crate::correctness::phased_variant::PhasedVariant;
use crate::utils::errors::PardaloteError;

/// Counters for the recoverable per-record skips of a VCF read-back.
#[derive(Debug, Clone, Default)]
pub struct VcfSkipCounters {
    pub homozygous: usize,
    pub not_pass: usize,
    pub missing_phase_set: usize,
    pub malformed_genotype: usize,
}

/// One phased VCF, grouped by contig with position-sorted records.
#[derive(Debug, Clone, Default)]
pub struct PhasedVcf {
    pub by_contig: BTreeMap<String, Vec<PhasedVariant>>,
    pub skips: VcfSkipCounters,
}

/**
 * Reads a phased VCF for the correctness metric: heterozygous PASS records
 * with a PS FORMAT value, per contig in position order. A missing PS header
 * or an unsorted/duplicate position is fatal for the file; everything else
 * is skipped and counted.
 */
pub fn read_phased_vcf(path: &Path) -> Result<PhasedVcf, PardaloteError> {
    let mut reader = bcf::Reader::from_path(path)?;

    let has_ps_header = reader.header().header_records().iter().any(|rec| {
        matches!(rec, HeaderRecord::Format { values, .. }
            if values.get("ID").map(|v| v.as_str() == "PS").unwrap_or(false))
    });
    if !has_ps_header {
        return Err(PardaloteError::InputMalformed(format!(
            "{} carries no PS FORMAT header",
            path.display()
        )));
    }

    let mut vcf = PhasedVcf::default();
    let mut last_positions: HashMap<String, i64> = HashMap::new();

    for record_result in reader.records() {
        let mut record = record_result?;
        let rid = match record.rid() {
            Some(rid) => rid,
            None => continue,
        };
        let contig = String::from_utf8_lossy(record.header().rid2name(rid)?).to_string();
        let ref_pos = record.pos();

        if let Some(&last) = last_positions.get(&contig) {
            if ref_pos <= last {
                return Err(PardaloteError::InputMalformed(format!(
                    "{} is not position-sorted on {} ({} after {})",
                    path.display(),
                    contig,
                    ref_pos,
                    last
                )));
            }
        }
        last_positions.insert(contig.clone(), ref_pos);

        let pass = {
            let filter_ids: Vec<_> = record.filters().collect();
            filter_ids.is_empty()
                || filter_ids
                    .iter()
                    .all(|id| record.header().id_to_name(*id) == b"PASS")
        };
        if !pass {
            vcf.skips.not_pass += 1;
            continue;
        }

        let genotype_indices: Vec<usize> = match record.genotypes() {
            Ok(genotypes) => genotypes
                .get(0)
                .iter()
                .filter_map(|g| GenotypeAllele::index(*g))
                .map(|i| i as usize)
                .collect(),
            Err(_) => {
                vcf.skips.malformed_genotype += 1;
                continue;
            }
        };
        if genotype_indices.len() != 2 {
            vcf.skips.malformed_genotype += 1;
            continue;
        }
        let (gt1, gt2) = (genotype_indices[0], genotype_indices[1]);
        if gt1 == gt2 {
            vcf.skips.homozygous += 1;
            continue;
        }

        let phase_set = match read_phase_set(&mut record) {
            Some(ps) => ps,
            None => {
                vcf.skips.missing_phase_set += 1;
                continue;
            }
        };

        let alleles: Vec<Vec<u8>> = record.alleles().iter().map(|a| a.to_vec()).collect();
        if gt1 >= alleles.len() || gt2 >= alleles.len() {
            vcf.skips.malformed_genotype += 1;
            continue;
        }

        vcf.by_contig
            .entry(contig.clone())
            .or_insert_with(Vec::new)
            .push(PhasedVariant {
                contig,
                ref_pos,
                quality: record.qual() as f64,
                alleles,
                gt1,
                gt2,
                phase_set,
            });
    }

    info!(
        "Read {}: {} contigs, skipped {} homozygous, {} non-PASS, {} without phase set, \
         {} with malformed genotypes",
        path.display(),
        vcf.by_contig.len(),
        vcf.skips.homozygous,
        vcf.skips.not_pass,
        vcf.skips.missing_phase_set,
        vcf.skips.malformed_genotype
    );
    Ok(vcf)
}

/// The PS FORMAT value of the first sample, integer or string.
fn read_phase_set(record: &mut bcf::Record) -> Option<String> {
    if let Ok(values) = record.format(b"PS").integer() {
        let value = *values.get(0)?.first()?;
        if value == i32::MIN {
            return None;
        }
        return Some(value.to_string());
    }
    if let Ok(values) = record.format(b"PS").string() {
        let value: &[u8] = values.get(0)?;
        if value.is_empty() || value == b".".as_slice() {
            return None;
        }
        return Some(String::from_utf8_lossy(value).to_string());
    }
    None
}
