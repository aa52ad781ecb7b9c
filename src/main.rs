//! gridstash - headless driver for the grid inventory engine
//!
//! Loads containers and item templates from config, replays a scripted drag
//! file and reports what happened to every item.

mod config;
mod scripted_drag;

use anyhow::{Context, Result};
use config::{build_context, load_item_factory, DemoConfig, DEFAULT_CONFIG_PATH};
use gridstash_testkit::{assert_grid_invariants, JsonlSink};
use scripted_drag::{DragScript, DragScriptRunner};
use std::{env, path::PathBuf};
use tracing::{info, warn};

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting gridstash v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    let config = DemoConfig::load_from_path(&cli.config);
    let mut factory = load_item_factory(&config.templates_path);
    let ctx = build_context(&config, &mut factory)?;

    let Some(script_path) = cli.script else {
        for (id, container) in ctx.containers() {
            info!(%id, name = container.name(), items = container.items().len(), "container loaded");
        }
        warn!("No --script given; nothing to replay");
        return Ok(());
    };
    let script = DragScript::from_path(&script_path)
        .with_context(|| format!("failed to load drag script {}", script_path.display()))?;

    let mut sink = match &cli.events {
        Some(path) => Some(
            JsonlSink::create(path)
                .with_context(|| format!("failed to create event log {}", path.display()))?,
        ),
        None => None,
    };

    let mut runner = DragScriptRunner::new(ctx, factory, config.layout, config.drag_threshold_px);
    let summary = runner.run(&script, sink.as_mut())?;

    for (id, container) in runner.context().containers() {
        assert_grid_invariants(container.items(), container.size())
            .with_context(|| format!("container {id} '{}' is inconsistent", container.name()))?;
    }
    for item in &summary.stranded {
        warn!(item = %item.item_name, id = %item.runtime_id, "item left without a container");
    }
    info!(
        steps = summary.steps,
        drags = summary.outcomes.len(),
        dropped = summary.dropped.len(),
        stranded = summary.stranded.len(),
        events = summary.events,
        "script finished"
    );
    if let (Some(sink), Some(path)) = (&sink, &cli.events) {
        info!(records = sink.written(), path = %path.display(), "wrote event log");
    }
    Ok(())
}

#[derive(Debug)]
struct CliOptions {
    config: PathBuf,
    script: Option<PathBuf>,
    events: Option<PathBuf>,
}

impl CliOptions {
    fn parse<I>(mut args: I) -> Self
    where
        I: Iterator<Item = String>,
    {
        let mut options = Self {
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
            script: None,
            events: None,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    if let Some(path) = args.next() {
                        options.config = PathBuf::from(path);
                    }
                }
                "--script" => options.script = args.next().map(PathBuf::from),
                "--events" => options.events = args.next().map(PathBuf::from),
                other => warn!("Ignoring unknown argument {other}"),
            }
        }
        options
    }
}
