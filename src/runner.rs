// campaign-maintenance/src/runner.rs
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use reqwest::StatusCode;
use serde_json::Value;

use crate::config::{Settings, default_config_path, resolve_auth};
use crate::errors::{AppError, Result};
use crate::remote::cleanup::delete_dummy_records;
use crate::remote::inspect::{CampaignRow, InspectFailure, fetch_google_ads_campaigns};
use crate::remote::trigger::trigger_sync;
use crate::remote::{RemoteClient, RemoteFailure, StepResult, build_http_client};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    /// Delete the dummy campaigns, then trigger a fresh sync.
    #[default]
    Clean,
    /// List the top Google Ads campaigns currently stored.
    Inspect,
}

impl FromStr for Command {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" | "clean" => Ok(Command::Clean),
            "2" | "inspect" => Ok(Command::Inspect),
            other => Err(AppError::Usage(format!(
                "unknown command '{}'. Use '1' (clean) or '2' (inspect).",
                other
            ))),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Clean => write!(f, "clean"),
            Command::Inspect => write!(f, "inspect"),
        }
    }
}

/// What to run and which settings file to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub config_path: PathBuf,
}

impl Invocation {
    /// Parses `[COMMAND] [CONFIG_PATH]`, program name already stripped.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let command = match args.next() {
            Some(raw) => raw.parse::<Command>()?,
            None => Command::default(),
        };
        let config_path = args.next().map(PathBuf::from).unwrap_or_else(default_config_path);
        if let Some(extra) = args.next() {
            return Err(AppError::Usage(format!("unexpected argument '{}'", extra)));
        }
        Ok(Invocation {
            command,
            config_path,
        })
    }
}

/// Per-step results of a run. Failures recorded here never change the exit
/// status.
#[derive(Debug, Clone, PartialEq)]
pub enum RunSummary {
    Clean {
        delete: StepResult<StatusCode>,
        sync: StepResult<String>,
    },
    Inspect {
        campaigns: std::result::Result<Vec<CampaignRow>, InspectFailure>,
    },
}

/// Loads settings and credentials, then runs the requested command.
///
/// Fatal errors come back as `Err` before any request is sent. Remote step
/// failures are reported to `out` and collected in the [`RunSummary`].
pub async fn run<W: Write>(invocation: &Invocation, out: &mut W) -> Result<RunSummary> {
    let settings = Settings::load_from_file(&invocation.config_path)?;
    tracing::debug!(
        path = %invocation.config_path.display(),
        keys = settings.len(),
        "loaded settings"
    );

    let auth = resolve_auth(&settings)?;
    let http = build_http_client(&settings.http_options()?)?;
    let client = RemoteClient::new(http, &auth)?;
    tracing::info!(command = %invocation.command, base_url = %auth.base_url(), "starting run");

    match invocation.command {
        Command::Clean => run_clean(&client, out).await,
        Command::Inspect => run_inspect(&client, out).await,
    }
}

/// Delete then trigger. The trigger runs whatever the delete returned.
pub async fn run_clean<W: Write>(client: &RemoteClient, out: &mut W) -> Result<RunSummary> {
    writeln!(out, "🧹 Cleaning dummy data...")?;
    let started = Instant::now();
    let delete = delete_dummy_records(client).await;
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        ok = delete.is_ok(),
        "delete step finished"
    );
    report_delete(&delete, out)?;

    writeln!(out, "🔄 Triggering sync...")?;
    let started = Instant::now();
    let sync = trigger_sync(client).await;
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        ok = sync.is_ok(),
        "sync step finished"
    );
    report_sync(&sync, out)?;

    Ok(RunSummary::Clean { delete, sync })
}

pub async fn run_inspect<W: Write>(client: &RemoteClient, out: &mut W) -> Result<RunSummary> {
    writeln!(out, "🔍 Fetching Google Ads campaigns...")?;
    let campaigns = fetch_google_ads_campaigns(client).await;
    report_campaigns(&campaigns, out)?;
    Ok(RunSummary::Inspect { campaigns })
}

fn report_delete<W: Write>(result: &StepResult<StatusCode>, out: &mut W) -> std::io::Result<()> {
    match result {
        Ok(_) => writeln!(out, "✅ Dummy data deleted successfully."),
        Err(RemoteFailure::UnexpectedStatus { status }) => {
            writeln!(out, "❌ Delete failed: {}", status.as_u16())
        }
        Err(RemoteFailure::Rejected { status, body }) => {
            writeln!(out, "❌ Delete error: {} {}", status.as_u16(), body)
        }
        Err(RemoteFailure::Transport { message }) => {
            writeln!(out, "❌ Delete error: {}", message)
        }
    }
}

fn report_sync<W: Write>(result: &StepResult<String>, out: &mut W) -> std::io::Result<()> {
    match result {
        Ok(body) => {
            writeln!(out, "✅ Sync Success!")?;
            writeln!(out, "{}", body)
        }
        Err(RemoteFailure::Rejected { status, body }) => {
            writeln!(out, "❌ Sync Failed: {}", status.as_u16())?;
            writeln!(out, "Response Body (Debug):")?;
            writeln!(out, "{}", body)
        }
        Err(RemoteFailure::UnexpectedStatus { status }) => {
            writeln!(out, "❌ Sync Failed: unexpected status {}", status.as_u16())
        }
        Err(RemoteFailure::Transport { message }) => {
            writeln!(out, "❌ Sync error: {}", message)
        }
    }
}

fn report_campaigns<W: Write>(
    result: &std::result::Result<Vec<CampaignRow>, InspectFailure>,
    out: &mut W,
) -> std::io::Result<()> {
    let rows = match result {
        Ok(rows) => rows,
        Err(InspectFailure::Remote(RemoteFailure::Rejected { status, body })) => {
            return writeln!(out, "❌ Fetch failed: {} {}", status.as_u16(), body);
        }
        Err(e) => return writeln!(out, "❌ Fetch error: {}", e),
    };

    writeln!(out, "Fetched {} Google Ads rows.", rows.len())?;
    for row in rows {
        writeln!(out, "Campaign: {}", row.name.as_deref().unwrap_or("<unnamed>"))?;
        writeln!(out, "  Spend Column: {}", display_value(row.spend.as_ref()))?;
        if let Some(cost) = row.cost_micros() {
            writeln!(out, "  Raw Cost Micros: {}", display_value(Some(cost)))?;
        }
        writeln!(out, "---")?;
    }
    Ok(())
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Only fatal errors produce a non-zero status; failed remote steps still
/// exit 0.
pub fn exit_status(result: &Result<RunSummary>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}
