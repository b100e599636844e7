use anyhow::Context;
use clap::Parser;
use llm_organizer::{
    Config, ConfigBuilder, DEFAULT_CONFIG, DEFAULT_IGNORE, DEFAULT_IMPORTANT_FILES, DEFAULT_LOG_DIR,
    Pipeline, PipelineOutcome, TokenizerKind, create_log_file, write_default,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "llm-organizer",
    version,
    author,
    about = "Export the most important files of a project within an LLM token budget",
    long_about = "Export the most important files of a project within an LLM token budget.\n\n\
    This tool walks a project, drops ignored paths, ranks the remaining text files \
    by importance and copies the best ones that fit in the token budget into a \
    numbered export folder, together with a summary of what was chosen.\n\n\
    USAGE EXAMPLES:\n  \
      # Create config.toml, .ignore and important_files.txt\n  \
      llm-organizer --init\n\n  \
      # Run with config.toml from the current directory\n  \
      llm-organizer\n\n  \
      # Override the project and the budget\n  \
      llm-organizer --path ./my-project --max-tokens 30000\n\n  \
      # See what would be exported without writing anything\n  \
      llm-organizer --dry-run -v"
)]
struct Cli {
    /// Settings file
    #[arg(short, long, default_value = "config.toml", value_name = "FILE")]
    config: PathBuf,

    /// Project directory (overrides `settings.path`)
    #[arg(short, long, value_name = "PATH")]
    path: Option<PathBuf>,

    /// Base output directory (overrides `settings.output_dir`)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Token budget for the export
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Tokenizer to use
    #[arg(long, value_enum, default_value = "reference")]
    tokenizer: CliTokenizer,

    /// Do not open the export folder when done
    #[arg(long)]
    no_open: bool,

    /// Dry run (don't write files)
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for the per-run log file
    #[arg(long, default_value = DEFAULT_LOG_DIR, value_name = "PATH")]
    log_dir: PathBuf,

    /// Log to the console only
    #[arg(long)]
    no_log_file: bool,

    /// Write default config.toml, .ignore and important_files.txt, then exit
    #[arg(long)]
    init: bool,

    /// Overwrite existing files with --init
    #[arg(long, requires = "init")]
    force: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliTokenizer {
    Reference,
    Simple,
    Cl100k,
}

impl From<CliTokenizer> for TokenizerKind {
    fn from(t: CliTokenizer) -> Self {
        match t {
            CliTokenizer::Reference => Self::Reference,
            CliTokenizer::Simple => Self::Simple,
            CliTokenizer::Cl100k => Self::Cl100k,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_dir = (!cli.no_log_file).then_some(cli.log_dir.as_path());
    if let Some(path) = setup_tracing(cli.verbose, log_dir)? {
        info!("Logging to {}", path.display());
    }

    execute(&cli).inspect_err(|e| error!("{e:#}"))
}

fn execute(cli: &Cli) -> anyhow::Result<ExitCode> {
    if cli.init {
        init_defaults(&cli.config, cli.force)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = build_config(cli).context("Failed to build configuration")?;
    let open_folder = config.open_output_folder && !cli.no_open;

    let outcome = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run()
        .context("Pipeline execution failed")?;

    match outcome {
        PipelineOutcome::Completed(stats) => {
            stats.print_summary();
            if open_folder {
                if let Some(dir) = &stats.export_dir {
                    if let Err(e) = open::that(dir) {
                        warn!("Could not open {}: {e}", dir.display());
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        PipelineOutcome::NothingSelected {
            candidates,
            structure_tokens,
            max_tokens,
        } => {
            eprintln!(
                "No file fits in {max_tokens} tokens: {candidates} candidates, \
                 {structure_tokens} tokens already taken by the project structure. \
                 Raise --max-tokens or ignore more paths."
            );
            Ok(ExitCode::from(2))
        }
    }
}

/// Loads the settings file (optional when `--path` is given) and applies
/// the command-line overrides.
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut builder = if cli.config.is_file() || cli.path.is_none() {
        ConfigBuilder::from_file(&cli.config).with_context(|| {
            format!(
                "Cannot load {} (run with --init to create one)",
                cli.config.display()
            )
        })?
    } else {
        Config::builder()
    };

    if let Some(path) = &cli.path {
        builder = builder.root_dir(path);
    }
    if let Some(output) = &cli.output {
        builder = builder.output_dir(output);
    }
    if let Some(max_tokens) = cli.max_tokens {
        builder = builder.max_tokens(max_tokens);
    }

    Ok(builder
        .tokenizer(cli.tokenizer.into())
        .dry_run(cli.dry_run)
        .build()?)
}

fn init_defaults(config_path: &Path, force: bool) -> anyhow::Result<()> {
    let dir = config_path.parent().unwrap_or_else(|| Path::new(""));
    let files = [
        (config_path.to_path_buf(), DEFAULT_CONFIG),
        (dir.join(".ignore"), DEFAULT_IGNORE),
        (dir.join("important_files.txt"), DEFAULT_IMPORTANT_FILES),
    ];

    for (path, content) in files {
        let written = write_default(&path, content, force)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if written {
            info!("Created {}", path.display());
        } else {
            info!("{} already exists, keeping it (use --force to overwrite)", path.display());
        }
    }

    Ok(())
}

/// Installs console logging and, unless disabled, a timestamped log file.
/// Returns the log file path.
fn setup_tracing(verbosity: u8, log_dir: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    let filter = match verbosity {
        0 => EnvFilter::new("llm_organizer=info"),
        1 => EnvFilter::new("llm_organizer=debug"),
        _ => EnvFilter::new("llm_organizer=trace"),
    };

    let (log_path, file_layer) = match log_dir {
        Some(dir) => {
            let (path, file) = create_log_file(dir, chrono::Local::now().naive_local())
                .context("Failed to create log file")?;
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false);
            (Some(path), Some(layer))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .with(file_layer)
        .init();

    Ok(log_path)
}
