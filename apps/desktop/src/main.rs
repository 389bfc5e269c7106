use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    load_settings, AnalysisSession, ClientEvent, ClientSettings, HttpAnalysisService, Navigator,
    SelectedFile, SelectionSource, SubmitOutcome,
};
use shared::domain::{Section, Theme};
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(name = "genebridge", about = "Upload genetic data for bias-aware risk analysis")]
struct Args {
    /// Settings file; defaults to ./genebridge.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_enum, default_value_t = ThemeArg::Dark)]
    theme: ThemeArg,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a CSV or VCF file. Names containing "lung" or "luad" go to the lung model.
    Analyze { file: PathBuf },
    /// Print the model-wide fairness baseline.
    Fairness,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ThemeArg {
    Dark,
    Light,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Light => Theme::Light,
        }
    }
}

/// Every section is always "mounted" in a terminal; scrolling just prints.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn is_mounted(&self, _section: Section) -> bool {
        true
    }

    fn smooth_scroll_to(&self, section: Section) {
        debug!(anchor = section.anchor(), "scroll requested");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = load_settings(args.config.as_deref())?;
    match args.command {
        Command::Analyze { file } => analyze(&settings, args.theme.into(), file).await,
        Command::Fairness => fairness(&settings).await,
    }
}

async fn analyze(settings: &ClientSettings, theme: Theme, path: PathBuf) -> Result<()> {
    let mut session = AnalysisSession::from_settings(settings, Arc::new(TerminalNavigator))
        .context("failed to set up analysis session")?;
    let mut events = session.subscribe_events();
    if session.view().theme() != theme {
        session.toggle_theme();
    }

    let file = SelectedFile::from_path(&path).await?;
    let controller = session.controller().clone();
    controller.select_file(file, SelectionSource::Picker);
    print_pending(&mut events);

    let submission = controller.submit();
    tokio::pin!(submission);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    let outcome = loop {
        tokio::select! {
            outcome = &mut submission => break outcome,
            event = events.recv() => {
                if let Ok(event) = event {
                    print_event(&event);
                }
            }
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                info!("interrupt received; cancelling analysis");
                controller.cancel();
            }
        }
    };
    print_pending(&mut events);

    session.apply_outcome(&outcome);
    print_pending(&mut events);

    match outcome {
        SubmitOutcome::Completed(_) => {
            print!("\n{}", render::dashboard(&session.dashboard_model()));
            Ok(())
        }
        SubmitOutcome::Failed { message, .. } => bail!(message),
        SubmitOutcome::Cancelled { .. } => Ok(()),
        SubmitOutcome::Ignored(reason) => bail!("submission ignored: {reason:?}"),
    }
}

async fn fairness(settings: &ClientSettings) -> Result<()> {
    let endpoints = settings.endpoints()?;
    let service = HttpAnalysisService::new(settings.request_timeout())?;
    let baseline = service
        .fetch_fairness_baseline(endpoints.fairness())
        .await
        .with_context(|| format!("failed to fetch {}", endpoints.fairness()))?;
    print!("{}", render::baseline(&baseline));
    Ok(())
}

fn print_event(event: &ClientEvent) {
    if let Some(line) = render::event_line(event) {
        println!("{line}");
    }
}

fn print_pending(events: &mut broadcast::Receiver<ClientEvent>) {
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }
}
