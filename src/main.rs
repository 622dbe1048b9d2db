use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use env_logger::Env;
use fgmeth_lib::config::{BaseChange, NamePolicy, TableConfig};
use fgmeth_lib::engine;
use fgmeth_lib::errors::FgmethError;
use fgmeth_lib::validation::validate_file_exists;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

/// Custom styles for CLI help output
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Tabulate converted vs. unconverted base calls per reference position.
///
/// Streams a SORTED SAM file produced by a three-nucleotide aligner against
/// a reference FASTA and writes one TSV row per reference position of
/// interest, carrying the quality string and count of converted and
/// unconverted observations.
#[derive(Debug, Parser)]
#[command(
    name = "fgmeth",
    version,
    styles = STYLES,
    after_help = "The SAM file must be coordinate-sorted within each chromosome; \
                  a violation is a fatal error."
)]
struct Args {
    /// Sorted SAM file of alignments.
    #[arg(short = 'a', long = "alignments")]
    alignments: String,

    /// Reference FASTA file.
    #[arg(short = 'r', long = "ref")]
    reference: PathBuf,

    /// Output TSV path; standard output when omitted.
    #[arg(short = 'o', long = "output-name")]
    output_name: Option<PathBuf>,

    /// Conversion pair as two comma-separated letters, e.g. C,T.
    #[arg(short = 'b', long = "base-change")]
    base_change: String,

    /// Only count bases from uniquely mapped reads (NH:i:1).
    #[arg(short = 'u', long = "unique-only", conflicts_with = "multiple_only")]
    unique_only: bool,

    /// Only count bases from multi-mapped reads (NH:i > 1).
    #[arg(short = 'm', long = "multiple-only")]
    multiple_only: bool,

    /// Number of aggregator threads to launch.
    #[arg(short = 'p', long = "threads", default_value = "1")]
    threads: usize,

    /// Restrict counting to CpG dinucleotide positions.
    #[arg(long = "CG-only", alias = "cg-only")]
    cg_only: bool,

    /// Prepend "chr" to reference FASTA sequence names.
    #[arg(long = "add-chrname", conflicts_with = "remove_chrname")]
    add_chrname: bool,

    /// Strip a leading "chr" from reference FASTA sequence names.
    #[arg(long = "remove-chrname")]
    remove_chrname: bool,
}

fn run(args: &Args) -> Result<()> {
    if args.alignments == "-" {
        return Err(FgmethError::InvalidParameter {
            parameter: "alignments".to_string(),
            reason: "standard input is not supported by the memory-mapped reader".to_string(),
        }
        .into());
    }
    let alignments = PathBuf::from(&args.alignments);
    validate_file_exists(&alignments, "Alignment SAM")?;
    validate_file_exists(&args.reference, "Reference FASTA")?;

    let mut config = TableConfig::new(BaseChange::parse(&args.base_change)?);
    config.cg_only = args.cg_only;
    config.unique_only = args.unique_only;
    config.multiple_only = args.multiple_only;
    config.threads = args.threads.max(1);
    config.name_policy = if args.remove_chrname {
        NamePolicy::StripChrPrefix
    } else if args.add_chrname {
        NamePolicy::AddChrPrefix
    } else {
        NamePolicy::AsIs
    };
    config.validate()?;

    let output: Box<dyn Write + Send> = match &args.output_name {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    engine::run(&config, &alignments, &args.reference, output)?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            use clap::error::ErrorKind;
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                e.exit();
            }
            // Usage failures exit 1, not clap's default of 2.
            let _ = e.print();
            std::process::exit(1);
        }
    };

    if let Err(error) = run(&args) {
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}
