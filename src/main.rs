//! `nfse-lote`: run the upload service, or process one workbook from the shell.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use nfse_lote::core::{Settings, SubmissionMode};
use nfse_lote::server::{self, AppState};
use nfse_lote::session::{export_file_name, export_workbook};
use nfse_lote::webservice::{HttpTransport, Transport};
use nfse_lote::{municipio, pipeline};

#[derive(Parser)]
#[command(name = "nfse-lote", version, about = "RPS batch submission to the Curitiba NFS-e service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP service (default if no subcommand given)
    Serve {
        /// Listen address, overrides BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Resolve municipalities, submit every row and write the export next to the input
    Process {
        /// Workbook to process (rewritten in place with municipality codes)
        file: PathBuf,
        #[arg(long, value_enum)]
        mode: Option<SubmissionMode>,
        /// Write every generated envelope to this directory
        #[arg(long)]
        dump_dir: Option<PathBuf>,
        /// Generate envelopes without contacting the service
        #[arg(long)]
        dry_run: bool,
        /// Export path (default: <stem>_processada.xlsx beside the input)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env().context("loading settings")?;
    tracing::info!(categories = settings.profiles.len(), endpoint = %settings.endpoint, "settings loaded");

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                settings.bind_addr = bind;
            }
            serve(settings)
        }
        Command::Process {
            file,
            mode,
            dump_dir,
            dry_run,
            output,
        } => {
            let settings = process_settings(settings, mode, dump_dir, dry_run);
            process(&file, output, &settings)
        }
    }
}

/// Command-line flags override the environment; `--dry-run` can only turn it on.
fn process_settings(
    mut settings: Settings,
    mode: Option<SubmissionMode>,
    dump_dir: Option<PathBuf>,
    dry_run: bool,
) -> Settings {
    if let Some(mode) = mode {
        settings = settings.with_mode(mode);
    }
    if let Some(dir) = dump_dir {
        settings = settings.with_dump_dir(dir);
    }
    let dry_run = dry_run || settings.dry_run;
    settings.with_dry_run(dry_run)
}

fn serve(settings: Settings) -> Result<()> {
    // Built and dropped outside the async runtime: the blocking client owns one of its own.
    let transport: Arc<dyn Transport + Send + Sync> =
        Arc::new(HttpTransport::from_settings(&settings)?);
    let state = AppState::new(settings, transport.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    runtime.block_on(server::serve(state))?;
    drop(runtime);
    drop(transport);
    Ok(())
}

fn process(file: &Path, output: Option<PathBuf>, settings: &Settings) -> Result<()> {
    let transport = HttpTransport::from_settings(settings)?;
    let workbook = municipio::resolve_file(file, &settings.reference_path)
        .with_context(|| format!("resolving municipalities in {}", file.display()))?;
    let outcomes = pipeline::process_workbook(&workbook, settings, &transport)?;

    for o in &outcomes {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            o.sheet, o.rps, o.status, o.protocolo, o.status_verificacao
        );
    }

    let output = output.unwrap_or_else(|| {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        file.with_file_name(export_file_name(name))
    });
    export_workbook(&workbook, &outcomes)
        .save(&output)
        .with_context(|| format!("writing {}", output.display()))?;
    tracing::info!(path = %output.display(), rows = outcomes.len(), "export written");
    Ok(())
}
