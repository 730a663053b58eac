pub mod metric;
pub mod phased_variant;
pub mod vcf_io;
