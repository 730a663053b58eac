extern crate pardalote;

use std::path::PathBuf;

use pardalote::correctness::vcf_io::read_phased_vcf;

fn write_vcf(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "pardalote_{}_{}.vcf",
        name,
        std::process::id()
    ));
    std::fs::write(&path, body).unwrap();
    path
}

const PHASED_HEADER: &str = "##fileformat=VCFv4.2\n\
##FILTER=<ID=q10,Description=\"Quality below 10\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=PS,Number=1,Type=Integer,Description=\"Phase set\">\n\
##contig=<ID=chr1,length=1000>\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tsample\n";

#[test]
fn reader_keeps_het_pass_records_and_counts_the_rest() {
    let body = format!(
        "{}\
chr1\t100\t.\tA\tT\t60\tPASS\t.\tGT:PS\t0|1:7\n\
chr1\t200\t.\tC\tG\t60\tPASS\t.\tGT:PS\t1|1:7\n\
chr1\t300\t.\tG\tA\t60\tq10\t.\tGT:PS\t0|1:7\n\
chr1\t400\t.\tT\tC\t60\tPASS\t.\tGT\t0|1\n",
        PHASED_HEADER
    );
    let path = write_vcf("mixed", &body);
    let vcf = read_phased_vcf(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let records = &vcf.by_contig["chr1"];
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ref_pos, 99); // positions are 0-based internally
    assert_eq!(records[0].alleles, vec![b"A".to_vec(), b"T".to_vec()]);
    assert_eq!(records[0].phase_set, "7");
    assert_eq!(vcf.skips.homozygous, 1);
    assert_eq!(vcf.skips.not_pass, 1);
    assert_eq!(vcf.skips.missing_phase_set, 1);
}

#[test]
fn missing_ps_header_is_fatal() {
    let body = "##fileformat=VCFv4.2\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##contig=<ID=chr1,length=1000>\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tsample\n\
chr1\t100\t.\tA\tT\t60\tPASS\t.\tGT\t0|1\n";
    let path = write_vcf("no_ps", body);
    let result = read_phased_vcf(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(result.is_err());
}

#[test]
fn unsorted_records_are_fatal() {
    let body = format!(
        "{}\
chr1\t300\t.\tA\tT\t60\tPASS\t.\tGT:PS\t0|1:7\n\
chr1\t200\t.\tC\tG\t60\tPASS\t.\tGT:PS\t0|1:7\n",
        PHASED_HEADER
    );
    let path = write_vcf("unsorted", &body);
    let result = read_phased_vcf(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(result.is_err());
}

#[test]
fn string_phase_sets_are_accepted() {
    let header = "##fileformat=VCFv4.2\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=PS,Number=1,Type=String,Description=\"Phase set\">\n\
##contig=<ID=chr1,length=1000>\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tsample\n";
    let body = format!(
        "{}\
chr1\t100\t.\tA\tT\t60\tPASS\t.\tGT:PS\t0|1:blockA\n",
        header
    );
    let path = write_vcf("string_ps", &body);
    let vcf = read_phased_vcf(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(vcf.by_contig["chr1"][0].phase_set, "blockA");
}
