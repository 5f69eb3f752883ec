use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use devmon_report::api::{ApiEndpoints, ComplianceClient, DEFAULT_SCOPE, MAX_PAGE_SIZE};
use devmon_report::config::parse_query_params;
use devmon_report::extract::EmailFilter;
use devmon_report::run::{self, DEFAULT_OUT_PREFIX, RunOptions};
use devmon_report::{ReportError, Result};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(cli.debug) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
    if let Err(error) = execute(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    let endpoints = match &cli.api_base {
        Some(base) => ApiEndpoints::with_base(base),
        None => ApiEndpoints::default(),
    };
    let client = ComplianceClient::new(endpoints, cli.scope.clone());
    let options = cli.into_options()?;

    let summary = run::run(&options, &client)?;
    eprintln!("{summary}");
    Ok(())
}

fn init_logging(debug: bool) -> Result<()> {
    let default_directive = if debug {
        "devmon_report=debug"
    } else {
        "devmon_report=off"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| ReportError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Cross-reference device-monitoring compliance across workspaces."
)]
struct Cli {
    /// Path to the JSON workspace config (comments allowed).
    #[arg(long)]
    config: PathBuf,

    /// People page size; values above the API maximum are clamped.
    #[arg(long, default_value_t = MAX_PAGE_SIZE)]
    page_size: u32,

    /// Extra query parameter for the people listing, as key=value (repeatable).
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Only include these email addresses (repeatable, case-insensitive).
    #[arg(long = "email", value_name = "ADDR")]
    emails: Vec<String>,

    /// Prefix for the generated report files.
    #[arg(long, default_value = DEFAULT_OUT_PREFIX)]
    out_prefix: String,

    /// Print per-workspace and per-person diagnostics to stderr.
    #[arg(long)]
    debug: bool,

    /// OAuth scope requested for every workspace token.
    #[arg(long, default_value = DEFAULT_SCOPE)]
    scope: String,

    /// Override the API host, e.g. for a staging environment.
    #[arg(long, value_name = "URL")]
    api_base: Option<String>,

    /// Pause between workspaces in milliseconds.
    #[arg(long, default_value_t = 200)]
    pause_ms: u64,
}

impl Cli {
    fn into_options(self) -> Result<RunOptions> {
        Ok(RunOptions {
            params: parse_query_params(&self.params)?,
            emails: EmailFilter::new(&self.emails),
            config: self.config,
            page_size: self.page_size,
            out_prefix: self.out_prefix,
            pause: Duration::from_millis(self.pause_ms),
        })
    }
}
