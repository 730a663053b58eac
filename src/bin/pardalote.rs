extern crate pardalote;

#[macro_use]
extern crate log;

use std::collections::BTreeMap;
use std::path::Path;
use std::process;

use anyhow::Context;
use itertools::Itertools;
use rayon::prelude::*;

use pardalote::cli::{build_cli, set_log_level};
use pardalote::correctness::metric::PhasingCorrectness;
use pardalote::correctness::phased_variant::{MatchResult, VariantMatcher};
use pardalote::correctness::vcf_io::read_phased_vcf;
use pardalote::utils::errors::PardaloteError;

fn main() {
    let mut app = build_cli();
    let matches = app.clone().get_matches();

    match matches.subcommand_name() {
        Some("correctness") => {
            let m = matches.subcommand_matches("correctness").unwrap();
            set_log_level(m);
            let threads: usize = m
                .get_one::<String>("threads")
                .unwrap()
                .parse()
                .unwrap_or(1);
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()
                .unwrap();
            match run_correctness(m) {
                Ok(()) => info!("Phasing correctness complete."),
                Err(e) => {
                    error!("Phasing correctness failed: {:?}", e);
                    process::exit(1);
                }
            }
        }
        _ => {
            app.print_help().unwrap();
            println!();
        }
    }
}

fn run_correctness(m: &clap::ArgMatches) -> anyhow::Result<()> {
    let decays: Vec<f64> = m
        .get_many::<String>("decay")
        .unwrap()
        .map(|d| {
            d.parse::<f64>().map_err(|_| {
                PardaloteError::InvalidParameter(format!("decay '{}' is not a number", d))
            })
        })
        .collect::<Result<Vec<f64>, PardaloteError>>()?;
    for decay in &decays {
        if !(0.0..=1.0).contains(decay) {
            return Err(PardaloteError::InvalidParameter(format!(
                "decay {} outside [0, 1]",
                decay
            ))
            .into());
        }
    }

    let query_path = m.get_one::<String>("query-vcf").unwrap();
    let truth_path = m.get_one::<String>("truth-vcf").unwrap();
    let query = read_phased_vcf(Path::new(query_path.as_str()))
        .with_context(|| format!("reading query VCF {}", query_path))?;
    let truth = read_phased_vcf(Path::new(truth_path.as_str()))
        .with_context(|| format!("reading truth VCF {}", truth_path))?;

    let shared_contigs: Vec<String> = query
        .by_contig
        .keys()
        .filter(|contig| truth.by_contig.contains_key(*contig))
        .cloned()
        .collect();
    if shared_contigs.is_empty() {
        warn!("Query and truth VCFs share no contigs");
    }

    struct ContigRow {
        contig: String,
        num_pairs: usize,
        fractions: Vec<(f64, f64)>,
    }

    let rows: Vec<ContigRow> = shared_contigs
        .par_iter()
        .map(|contig| {
            let matched: MatchResult = VariantMatcher::match_variants(
                &query.by_contig[contig],
                &truth.by_contig[contig],
            );
            debug!(
                "{}: {} matched pairs, {} mismatched-allele skips, {} ambiguous skips",
                contig,
                matched.pairs.len(),
                matched.skipped_mismatched_alleles,
                matched.skipped_ambiguous
            );
            let fractions = decays
                .iter()
                .map(|&decay| {
                    PhasingCorrectness::correctness_fraction(&matched.pairs, decay)
                        .expect("decay validated above")
                })
                .collect();
            ContigRow {
                contig: contig.clone(),
                num_pairs: matched.pairs.len(),
                fractions,
            }
        })
        .collect();

    let header = decays.iter().map(|d| format!("correctness_{}", d)).join("\t");
    println!("contig\tnum_pairs\t{}", header);
    let mut totals: BTreeMap<usize, (f64, f64)> = BTreeMap::new();
    let mut total_pairs = 0usize;
    for row in &rows {
        let values: Vec<String> = row
            .fractions
            .iter()
            .map(|(numer, denom)| format!("{:.6}", numer / denom))
            .collect();
        println!("{}\t{}\t{}", row.contig, row.num_pairs, values.join("\t"));
        total_pairs += row.num_pairs;
        for (i, (numer, denom)) in row.fractions.iter().enumerate() {
            let entry = totals.entry(i).or_insert((0.0, 0.0));
            entry.0 += numer;
            entry.1 += denom;
        }
    }
    if rows.len() > 1 {
        let values: Vec<String> = (0..decays.len())
            .map(|i| {
                let (numer, denom) = totals[&i];
                format!("{:.6}", numer / denom)
            })
            .collect();
        println!("all\t{}\t{}", total_pairs, values.join("\t"));
    }
    Ok(())
}
