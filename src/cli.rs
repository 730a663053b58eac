use clap::{crate_version, Arg, ArgAction, Command};
use log::LevelFilter;

pub fn build_cli() -> Command {
    Command::new("pardalote")
        .version(crate_version!())
        .about("Diploid phasing of noisy long reads and phasing-quality evaluation")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("correctness")
                .about(
                    "Decay-weighted local phasing correctness between a query and a truth \
                     phased VCF, per shared contig",
                )
                .arg(
                    Arg::new("query-vcf")
                        .long("query-vcf")
                        .required(true)
                        .help("Phased VCF under evaluation; must carry a PS FORMAT tag"),
                )
                .arg(
                    Arg::new("truth-vcf")
                        .long("truth-vcf")
                        .required(true)
                        .help("Phased truth VCF; must carry a PS FORMAT tag"),
                )
                .arg(
                    Arg::new("decay")
                        .long("decay")
                        .value_delimiter(',')
                        .default_value("1.0")
                        .help(
                            "Comma-separated decay values in [0, 1]; decay 0 reports switch \
                             correctness",
                        ),
                )
                .arg(
                    Arg::new("threads")
                        .short('t')
                        .long("threads")
                        .default_value("1")
                        .help("Contigs are evaluated in parallel with this many threads"),
                )
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .action(ArgAction::SetTrue)
                        .help("Print debug output"),
                )
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .action(ArgAction::SetTrue)
                        .help("Only print errors"),
                ),
        )
}

pub fn set_log_level(matches: &clap::ArgMatches) {
    let mut level = LevelFilter::Info;
    if matches.get_flag("quiet") {
        level = LevelFilter::Error;
    } else if matches.get_flag("verbose") {
        level = LevelFilter::Debug;
    }
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(env_filters) = std::env::var("RUST_LOG") {
        builder.parse(&env_filters);
    }
    let _ = builder.try_init();
}
