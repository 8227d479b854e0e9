// vorcheck - compare a budget estimate with a bill of quantities

mod exit_codes;
mod logger;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use vorcheck_cli::pipeline::{self, CompareRequest, Comparison, Context, PipelineError, SideInput};
use vorcheck_cli::render;
use vorcheck_config::{Settings, SettingsError};
use vorcheck_io::{ExtractOptions, PdfOptions};
use vorcheck_recon::{
    ColumnOverrides, ColumnSelectionError, Locale, MatchMode, ReconError, ReconJob, StatusFilter,
    Threshold,
};

use exit_codes::{
    EXIT_COLUMN_SELECTION, EXIT_CONFIG, EXIT_DISCREPANCIES, EXIT_ERROR, EXIT_FORMAT_READ,
    EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "vorcheck")]
#[command(about = "Compare a budget estimate (смета) with a bill of quantities (ВОР)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/vorcheck/settings.toml)
    #[arg(long, global = true, env = "VORCHECK_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two documents
    #[command(after_help = "\
Examples:
  vorcheck compare smeta.xlsx vor.pdf
  vorcheck compare smeta.xlsx vor.xml --by name --threshold 10
  vorcheck compare smeta.xlsx vor.html --key-b 'Код' --qty-b 3
  vorcheck compare smeta.xlsx vor.csv --status diverged --status missing_in_a
  vorcheck compare smeta.xlsx vor.pdf --xlsx out/ --json > result.json")]
    Compare {
        /// Budget estimate (side A): xlsx, xls, ods, csv, pdf, xml or html
        estimate: PathBuf,

        /// Bill of quantities (side B)
        boq: PathBuf,

        /// Match rows by rate code or by work item name
        #[arg(long = "by", value_enum)]
        by: Option<ByArg>,

        /// Allowed divergence in whole percent (0-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,

        /// Estimate column to match on (name or 1-based position)
        #[arg(long, value_name = "COL")]
        key_a: Option<String>,

        /// BoQ column to match on (name or 1-based position)
        #[arg(long, value_name = "COL")]
        key_b: Option<String>,

        /// Estimate quantity column
        #[arg(long, value_name = "COL")]
        qty_a: Option<String>,

        /// BoQ quantity column
        #[arg(long, value_name = "COL")]
        qty_b: Option<String>,

        /// Show only these statuses (repeatable). The xlsx report is never filtered.
        #[arg(long = "status", value_name = "STATUS")]
        statuses: Vec<String>,

        /// Write the xlsx report to this file or directory
        #[arg(long, value_name = "PATH")]
        xlsx: Option<PathBuf>,

        /// Print the full result as JSON instead of the table
        #[arg(long)]
        json: bool,

        /// Label language for the table and report
        #[arg(long, value_enum)]
        locale: Option<LocaleArg>,

        /// Comparison name stored in the result
        #[arg(long, default_value = "comparison")]
        name: String,

        /// Suppress the table and summary
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Run a comparison described by a TOML job file
    #[command(after_help = "\
Examples:
  vorcheck run korpus2.toml
  vorcheck run korpus2.toml --json")]
    Run {
        /// Path to the job file; document paths resolve against its directory
        job: PathBuf,

        /// Print the full result as JSON instead of the table
        #[arg(long)]
        json: bool,

        /// Suppress the table and summary
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Validate a job file without running it
    Validate {
        job: PathBuf,
    },

    /// Show the settings file in effect, or write one with the defaults
    #[command(after_help = "\
Examples:
  vorcheck settings
  vorcheck settings --init
  vorcheck --config ./vorcheck.toml settings --init --force")]
    Settings {
        /// Write the current settings to the settings file
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },

    /// Preview a document and the columns that would be used
    #[command(after_help = "\
Examples:
  vorcheck inspect vor.pdf
  vorcheck inspect smeta.xlsx --rows 20")]
    Inspect {
        file: PathBuf,

        /// Number of rows to show
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ByArg {
    /// Rate code (шифр расценки)
    Code,
    /// Work item name (наименование работ)
    Name,
}

impl From<ByArg> for MatchMode {
    fn from(b: ByArg) -> Self {
        match b {
            ByArg::Code => MatchMode::ByCode,
            ByArg::Name => MatchMode::ByName,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LocaleArg {
    En,
    Ru,
}

impl From<LocaleArg> for Locale {
    fn from(l: LocaleArg) -> Self {
        match l {
            LocaleArg::En => Locale::En,
            LocaleArg::Ru => Locale::Ru,
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  vorcheck-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let quiet = matches!(
        cli.command,
        Commands::Compare { quiet: true, .. } | Commands::Run { quiet: true, .. }
    );
    logger::init(cli.verbose, quiet);

    let settings_path = cli.config.clone().unwrap_or_else(Settings::config_path);
    let result = load_settings(cli.config.as_deref()).and_then(|settings| match cli.command {
        Commands::Compare {
            estimate,
            boq,
            by,
            threshold,
            key_a,
            key_b,
            qty_a,
            qty_b,
            statuses,
            xlsx,
            json,
            locale,
            name,
            quiet,
        } => {
            let req = CompareRequest {
                name,
                estimate: side_input(estimate, key_a, qty_a),
                boq: side_input(boq, key_b, qty_b),
                match_by: by.map(MatchMode::from).unwrap_or(settings.default_match_by),
                threshold: match threshold {
                    Some(t) => Threshold::new(i64::from(t)).map_err(recon_err)?,
                    None => settings.default_threshold,
                },
            };
            let output = Output {
                filter: StatusFilter::parse(statuses.as_slice())
                    .map_err(|e| CliError::usage(e.to_string()))?,
                locale: locale.map(Locale::from).unwrap_or(settings.locale),
                xlsx,
                json_file: None,
                json,
                quiet,
            };
            cmd_compare(&req, &output, &settings)
        }
        Commands::Run { job, json, quiet } => cmd_run(&job, json, quiet, &settings),
        Commands::Validate { job } => cmd_validate(&job),
        Commands::Settings { init, force } => cmd_settings(&settings_path, init, force, &settings),
        Commands::Inspect { file, rows } => cmd_inspect(&file, rows, &settings),
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint, cause }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            if let Some(cause) = cause {
                eprintln!("cause: {}", cause);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
    /// Underlying error detail, printed after the message.
    pub cause: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None, cause: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, msg)
    }

    /// Exit code only, nothing printed.
    pub fn silent(code: u8) -> Self {
        Self::new(code, String::new())
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_cause(mut self, cause: Option<String>) -> Self {
        self.cause = cause;
        self
    }
}

/// Innermost error text below `err`, if any.
fn root_cause(err: &dyn std::error::Error) -> Option<String> {
    let mut source = err.source()?;
    while let Some(next) = source.source() {
        source = next;
    }
    Some(source.to_string())
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match &err {
            PipelineError::Read { source, .. } => {
                let cli = CliError::new(EXIT_FORMAT_READ, message).with_cause(root_cause(source));
                match source.hint() {
                    Some(hint) => cli.with_hint(hint),
                    None => cli,
                }
            }
            PipelineError::Columns(e) => {
                let flags = match e.side() {
                    vorcheck_recon::Side::Estimate => "--key-a / --qty-a",
                    vorcheck_recon::Side::Boq => "--key-b / --qty-b",
                };
                let hint = match e {
                    ColumnSelectionError::NoColumns { .. } => {
                        "check that the document contains a table with a header row".to_string()
                    }
                    ColumnSelectionError::UnknownColumn { .. } => {
                        format!("pick a column by name or 1-based position with {flags}")
                    }
                };
                CliError::new(EXIT_COLUMN_SELECTION, message).with_hint(hint)
            }
            PipelineError::Export(e) => CliError::io(message).with_cause(root_cause(e)),
        }
    }
}

fn recon_err(err: ReconError) -> CliError {
    CliError::config(err.to_string())
}

fn settings_err(err: SettingsError) -> CliError {
    CliError::config(err.to_string())
        .with_cause(root_cause(&err))
        .with_hint("fix the settings file or point VORCHECK_CONFIG elsewhere")
}

// ============================================================================
// Shared
// ============================================================================

fn load_settings(explicit: Option<&Path>) -> Result<Settings, CliError> {
    match explicit {
        Some(path) => Settings::try_load_from(path).map_err(settings_err),
        None => Ok(Settings::load()),
    }
}

fn context(settings: &Settings) -> Context {
    Context {
        keywords: settings.keyword_table(),
        extract: ExtractOptions {
            pdf: PdfOptions { pdftotext: settings.pdftotext_path.clone() },
        },
    }
}

fn side_input(path: PathBuf, key: Option<String>, quantity: Option<String>) -> SideInput {
    SideInput {
        path,
        // The match column serves as key or name depending on the mode
        overrides: ColumnOverrides { name: key.clone(), key, quantity },
    }
}

struct Output {
    filter: StatusFilter,
    locale: Locale,
    xlsx: Option<PathBuf>,
    json_file: Option<PathBuf>,
    json: bool,
    quiet: bool,
}

fn color_enabled() -> bool {
    atty::is(atty::Stream::Stdout) && std::env::var_os("NO_COLOR").is_none()
}

fn write_report(comparison: &Comparison, target: &Path, locale: Locale) -> Result<(), CliError> {
    let payload = comparison.export(locale)?;
    let path = if target.is_dir() {
        target.join(payload.file_name)
    } else {
        target.to_path_buf()
    };
    std::fs::write(&path, &payload.bytes).map_err(|e| {
        CliError::io(format!("cannot write {}: {e}", path.display()))
    })?;
    tracing::info!("wrote {} ({}, {} bytes)", path.display(), payload.mime, payload.bytes.len());
    Ok(())
}

fn emit(comparison: &Comparison, output: &Output) -> Result<(), CliError> {
    if let Some(ref target) = output.xlsx {
        write_report(comparison, target, output.locale)?;
    }

    if output.json || output.json_file.is_some() {
        let json_str = serde_json::to_string_pretty(&comparison.result)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        if let Some(ref path) = output.json_file {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            tracing::info!("wrote {}", path.display());
        }
        if output.json {
            println!("{json_str}");
        }
    }

    if !output.json && !output.quiet {
        let table = comparison.display(&output.filter, output.locale);
        print!("{}", render::comparison_table(&table, color_enabled()));
        eprintln!("{}", render::summary_line(&comparison.result.summary, output.locale));
    }

    if comparison.result.summary.is_clean() {
        Ok(())
    } else {
        Err(CliError::silent(EXIT_DISCREPANCIES))
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_compare(req: &CompareRequest, output: &Output, settings: &Settings) -> Result<(), CliError> {
    let comparison = pipeline::compare(req, &context(settings))?;
    emit(&comparison, output)
}

fn read_job(path: &Path) -> Result<ReconJob, CliError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CliError::config(format!("cannot read job file {}: {e}", path.display())))?;
    ReconJob::from_toml(&contents).map_err(recon_err)
}

fn cmd_run(job_path: &Path, json: bool, quiet: bool, settings: &Settings) -> Result<(), CliError> {
    let job = read_job(job_path)?;

    // Resolve file paths relative to the job file's directory
    let base_dir = job_path.parent().unwrap_or_else(|| Path::new("."));
    let side = |s: &vorcheck_recon::config::SideConfig| SideInput {
        path: base_dir.join(&s.file),
        overrides: s.overrides(),
    };

    let req = CompareRequest {
        name: job.name.clone(),
        estimate: side(&job.estimate),
        boq: side(&job.boq),
        match_by: job.match_by_or(settings.default_match_by),
        threshold: job.threshold_or(settings.default_threshold),
    };
    let output = Output {
        filter: job.output.status_filter(),
        locale: job.output.locale.unwrap_or(settings.locale),
        xlsx: job.output.xlsx.as_ref().map(|p| base_dir.join(p)),
        json_file: job.output.json.as_ref().map(|p| base_dir.join(p)),
        json,
        quiet,
    };
    cmd_compare(&req, &output, settings)
}

fn cmd_validate(job_path: &Path) -> Result<(), CliError> {
    let job = read_job(job_path)?;
    let base_dir = job_path.parent().unwrap_or_else(|| Path::new("."));

    println!("ok: {}", job.name);
    for (label, side) in [("estimate", &job.estimate), ("boq", &job.boq)] {
        let path = base_dir.join(&side.file);
        if path.exists() {
            println!("  {label}: {}", path.display());
        } else {
            tracing::warn!("{label}: {} does not exist", path.display());
        }
    }
    Ok(())
}

fn cmd_settings(path: &Path, init: bool, force: bool, settings: &Settings) -> Result<(), CliError> {
    if init {
        if path.exists() && !force {
            return Err(CliError::usage(format!("{} already exists", path.display()))
                .with_hint("pass --force to overwrite it"));
        }
        settings.save_to(path).map_err(settings_err)?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let source = if path.exists() { "" } else { " (not found, defaults)" };
    let locale = match settings.locale {
        Locale::En => "en",
        Locale::Ru => "ru",
    };
    let pdftotext = match &settings.pdftotext_path {
        Some(p) => p.display().to_string(),
        None => "looked up on PATH".to_string(),
    };
    println!("{:<19}{}{source}", "file:", path.display());
    println!("{:<19}{}", "default_threshold:", settings.default_threshold);
    println!("{:<19}{}", "default_match_by:", settings.default_match_by.as_str());
    println!("{:<19}{locale}", "locale:");
    println!("{:<19}{pdftotext}", "pdftotext:");
    Ok(())
}

fn cmd_inspect(file: &Path, rows: usize, settings: &Settings) -> Result<(), CliError> {
    let inspection = pipeline::inspect(file, &context(settings))?;
    let table = &inspection.table;

    println!(
        "{}: {} column(s), {} row(s)",
        file.display(),
        table.column_count(),
        table.row_count()
    );
    println!();
    print!("{}", render::preview(table, rows));
    println!();
    print!("{}", render::roles(table, &inspection.mapping));
    Ok(())
}
