//! artags CLI - tags file generator for AUTOSAR ARXML models

use anyhow::{Context, Result};
use artags::{
    build_index, discover, Anchor, ArtagsConfig, ArtagsError, CliOverrides, Corpus, Record,
    TagWriter, WriteMode,
};
use clap::{Parser, ValueEnum};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const LICENSE: &str = include_str!("../LICENSE");

#[derive(Parser)]
#[command(name = "artags")]
#[command(about = "Generate a tags file for AUTOSAR ARXML models")]
#[command(version)]
struct Cli {
    /// Directories to scan for model files
    #[arg(required_unless_present = "license")]
    dirs: Vec<PathBuf>,

    /// Append to the output file instead of overwriting it
    #[arg(short, long)]
    append: bool,

    /// Output file [default: ./tags]
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<PathBuf>,

    /// Charset of the output file [default: UTF-8]
    #[arg(short, long)]
    charset: Option<String>,

    /// Exclude paths fully matching this regular expression
    #[arg(short, long, value_name = "REGEX")]
    exclude: Option<String>,

    /// Locate tags with search patterns instead of line numbers
    #[arg(long)]
    pattern: bool,

    /// Where the first segment of an absolute reference may match
    #[arg(long, value_enum)]
    anchor: Option<AnchorArg>,

    /// Literal text of the root start tag used to measure the prolog
    #[arg(long, value_name = "TEXT")]
    root_marker: Option<String>,

    /// Write file paths as found instead of relative to the output file
    #[arg(long)]
    absolute_paths: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "tags")]
    format: OutputFormat,

    /// Worker threads (0 = one per core)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Config file (default: search for .artagsrc.json upward)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print indexing statistics
    #[arg(long)]
    stats: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the license and exit
    #[arg(long)]
    license: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Tags,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum AnchorArg {
    Anywhere,
    Root,
}

impl From<AnchorArg> for Anchor {
    fn from(arg: AnchorArg) -> Self {
        match arg {
            AnchorArg::Anywhere => Anchor::Anywhere,
            AnchorArg::Root => Anchor::Root,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.license {
        print!("{}", LICENSE);
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?.merge_cli(CliOverrides {
        output: cli.output,
        charset: cli.charset,
        exclude: cli.exclude,
        anchor: cli.anchor.map(Anchor::from),
        root_marker: cli.root_marker,
        pattern: cli.pattern,
        jobs: cli.jobs,
    });
    let options = config.index_options()?;
    let charset = config.charset()?;

    let output = std::path::absolute(&config.output)
        .with_context(|| format!("Cannot resolve {}", config.output.display()))?;
    let output_dir = output
        .parent()
        .ok_or_else(|| ArtagsError::OutputPath(config.output.clone()))?
        .to_path_buf();

    // Opened before indexing so a bad destination fails fast.
    let mode = if cli.append {
        WriteMode::Append
    } else {
        WriteMode::Truncate
    };
    let mut writer = TagWriter::open(&output, charset, mode)?;

    let files = discover(&cli.dirs, &config.extensions, config.exclude.as_deref())?;
    info!("Indexing {} files", files.len());

    let corpus = Corpus::load(&files, &options)?;
    let result = build_index(&corpus, &options)?;

    let lines = result
        .sorted()
        .into_iter()
        .map(|record| render(record, cli.format, cli.absolute_paths, &output_dir))
        .collect::<Result<Vec<_>>>()?;
    writer.write_records(&lines)?;
    let written = writer.finish()?;
    info!("Wrote {} lines to {}", written, output.display());

    if cli.stats {
        let stats = &result.stats;
        println!("Documents:  {}", stats.documents);
        println!("Skipped:    {}", stats.skipped);
        println!("References: {}", stats.references);
        println!("Dangling:   {}", stats.dangling);
        println!("Records:    {}", stats.records);
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ArtagsConfig> {
    if let Some(path) = path {
        return Ok(ArtagsConfig::load(path)?);
    }

    let cwd = std::env::current_dir().context("Cannot determine working directory")?;
    Ok(ArtagsConfig::find_and_load(&cwd).unwrap_or_default())
}

fn render(record: &Record, format: OutputFormat, absolute_paths: bool, output_dir: &Path) -> Result<String> {
    match (format, absolute_paths) {
        (OutputFormat::Tags, true) => Ok(record.format()),
        (OutputFormat::Tags, false) => Ok(record.format_relative(output_dir)),
        (OutputFormat::Json, true) => Ok(serde_json::to_string(record)?),
        (OutputFormat::Json, false) => {
            let relative = Record {
                file_path: record.relative_path(output_dir),
                ..record.clone()
            };
            Ok(serde_json::to_string(&relative)?)
        }
    }
}
