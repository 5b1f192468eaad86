mod manifest;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deployflow::events::{EventSink, LoggingEventSink};
use deployflow::observability::init_tracing;
use deployflow::render::{JsonSynthesizer, Synthesizer};
use tracing::info;

use crate::manifest::Manifest;

#[derive(Parser)]
#[command(name = "deployflow", version, about = "Assemble and render delivery pipelines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Default log filter, overridden by RUST_LOG.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the pipeline and write its template.
    Synth {
        manifest: PathBuf,
        /// Output file; the template goes to stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Assemble the pipeline and print its stages and actions.
    Inspect { manifest: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    match cli.command {
        Commands::Synth { manifest, output } => synth(&manifest, output).await,
        Commands::Inspect { manifest } => inspect(&manifest),
    }
}

async fn synth(path: &Path, output: Option<PathBuf>) -> Result<()> {
    let manifest = Manifest::load(path)?;
    let events: Arc<dyn EventSink> = Arc::new(LoggingEventSink::default());
    let composer = manifest.assemble(events.clone())?;

    let mut synthesizer = JsonSynthesizer::new().with_event_sink(events);
    if let Some(store) = manifest.secret_store() {
        synthesizer = synthesizer.with_secret_store(Arc::new(store));
    }
    let template = synthesizer
        .synthesize(&composer.graph())
        .await
        .context("Failed to synthesize pipeline template")?;

    match output {
        Some(output) => {
            template
                .write_to(&output)
                .await
                .with_context(|| format!("Failed to write template: {}", output.display()))?;
        }
        None => println!("{}", template.to_pretty_string()?),
    }
    info!(fingerprint = %template.fingerprint(), "Done");
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let manifest = Manifest::load(path)?;
    let events: Arc<dyn EventSink> = Arc::new(LoggingEventSink::debug());
    let graph = manifest.assemble(events)?.graph();

    println!("{}", graph.settings.name);
    for stage in &graph.stages {
        println!("  {}", stage.name());
        for (run_order, actions) in stage.execution_waves() {
            for action in actions {
                println!("    [{run_order}] {} ({})", action.name, action.kind);
            }
        }
    }
    for record in &graph.artifacts {
        let producer = record
            .producer
            .as_ref()
            .map_or_else(|| "unproduced".to_string(), ToString::to_string);
        println!("  artifact {} <- {producer}", record.name);
    }
    Ok(())
}
