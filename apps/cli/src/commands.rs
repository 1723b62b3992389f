//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use horoscope_core::pipeline::{ProgressReporter, RunReport, run_pipeline};
use horoscope_core::prompt::{DEFAULT_TEMPLATE, PromptTemplate};
use horoscope_generation::{ChatCompletionsClient, GenerationClient};
use horoscope_shared::{
    AppConfig, RunConfig, init_config, load_config, load_config_from, resolve_api_key,
    resolve_base_url,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Horoscope: personal horoscopes for every employee in a spreadsheet.
#[derive(Parser)]
#[command(
    name = "horoscope",
    version,
    about = "Generate personal horoscopes for employee records and save them as CSV.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate horoscopes for every record in the data directory.
    Run(RunArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `horoscope run`. Each one overrides the config file.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Config file to use instead of ~/.horoscope/horoscope.toml.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the source spreadsheets.
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Process only this file inside the data directory.
    #[arg(short, long)]
    pub file: Option<String>,

    /// Maximum number of records to process (0 or negative = unlimited).
    #[arg(short, long, allow_negative_numbers = true)]
    pub limit: Option<i64>,

    /// Directory receiving the result CSV.
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Save a checkpoint every N successful records (0 = only at the end).
    #[arg(long)]
    pub checkpoint_every: Option<usize>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "horoscope=info",
        1 => "horoscope=debug",
        _ => "horoscope=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    apply_overrides(&mut config, &args);

    // Fail on a missing key before touching any file
    let api_key = resolve_api_key(&config.generation)?;
    let base_url = resolve_base_url(&config.generation);
    let client = ChatCompletionsClient::from_config(&config.generation, &base_url, api_key)?;

    let template = load_template(config.prompt.template_path.as_deref())?;
    let run_config = RunConfig::from(&config);

    info!(
        data_dir = %run_config.data_dir.display(),
        output_dir = %run_config.output_dir.display(),
        model = client.model_name(),
        endpoint = client.endpoint(),
        "starting run"
    );

    let reporter = CliProgress::new();
    let report = run_pipeline(&run_config, &template, &client, &reporter).await?;

    // Print summary
    println!();
    match &report.output_path {
        Some(path) => {
            println!("  Horoscopes generated!");
            println!("  Saved:    {}", report.succeeded);
            println!("  Failed:   {}", report.failed);
            if report.files_skipped > 0 {
                println!("  Skipped:  {} file(s)", report.files_skipped);
            }
            println!("  Output:   {}", path.display());
        }
        None => {
            println!("  No horoscopes generated.");
            println!("  Records:  {}", report.attempted);
            println!("  Failed:   {}", report.failed);
        }
    }
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

/// Apply `run` flags on top of the loaded config.
fn apply_overrides(config: &mut AppConfig, args: &RunArgs) {
    let run = &mut config.run;
    if let Some(dir) = &args.data_dir {
        run.data_dir = dir.clone();
    }
    if let Some(file) = &args.file {
        run.target_file = Some(file.clone());
    }
    if let Some(limit) = args.limit {
        run.limit = Some(limit);
    }
    if let Some(dir) = &args.output_dir {
        run.output_dir = dir.clone();
    }
    if let Some(every) = args.checkpoint_every {
        run.checkpoint_every = every;
    }
}

fn load_template(path: Option<&str>) -> Result<PromptTemplate> {
    let template = match path {
        Some(path) => PromptTemplate::from_file(Path::new(path))
            .map_err(|e| eyre!("invalid prompt template {path}: {e}"))?,
        None => PromptTemplate::parse(DEFAULT_TEMPLATE)?,
    };
    Ok(template)
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn record_started(&self, index: usize, source_file: &str, context: &str) {
        let indented: Vec<String> = context.lines().map(|line| format!("    {line}")).collect();
        self.spinner
            .println(format!("  [{index}] {source_file}\n{}", indented.join("\n")));
        self.spinner
            .set_message(format!("Generating [{index}] {source_file}"));
    }

    fn record_failed(&self, index: usize, error: &str) {
        self.spinner
            .println(format!("  record {index} skipped: {error}"));
    }

    fn checkpoint_written(&self, path: &Path, records: usize) {
        self.spinner
            .println(format!("  saved {records} record(s) to {}", path.display()));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "horoscope",
            "-v",
            "run",
            "--data-dir",
            "staff",
            "--file",
            "q1.xlsx",
            "--limit",
            "-1",
            "--checkpoint-every",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.data_dir.as_deref(), Some("staff"));
        assert_eq!(args.file.as_deref(), Some("q1.xlsx"));
        assert_eq!(args.limit, Some(-1));
        assert_eq!(args.checkpoint_every, Some(5));
    }

    #[test]
    fn flags_override_config() {
        let mut config = AppConfig::default();
        let args = RunArgs {
            data_dir: Some("staff".into()),
            limit: Some(3),
            output_dir: Some("results".into()),
            ..Default::default()
        };
        apply_overrides(&mut config, &args);

        let run = RunConfig::from(&config);
        assert_eq!(run.data_dir, PathBuf::from("staff"));
        assert_eq!(run.output_dir, PathBuf::from("results"));
        assert_eq!(run.record_limit, Some(3));
        assert_eq!(run.checkpoint_every, 10);
        assert_eq!(run.target_file, None);
    }

    #[test]
    fn default_template_loads() {
        assert!(load_template(None).is_ok());
        assert!(load_template(Some("/definitely/not/here.txt")).is_err());
    }
}
