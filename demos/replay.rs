//! Replay a JSON-lines command script through the headless widgets.
//!
//! ```text
//! cargo run --example replay -- demos/replay.jsonl --tick-each
//! ```
//!
//! Each line is `{"op": "mount" | "update" | "unmount", "payload": {...}}` or
//! `{"op": "reset"}`. Blank lines and lines starting with `#` are skipped.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use serde::Deserialize;
use serde_json::Value;
use spark_bridge::{
    CommandKind, Engine, EngineConfig, NativeTree, RecordingEvaluator, TickReport,
    headless_factory, init_logging,
};

#[derive(Parser)]
#[command(name = "replay")]
#[command(about = "Replay a JSON-lines command script through the headless widgets")]
struct Cli {
    /// Script to replay; stdin when omitted
    script: Option<PathBuf>,

    /// Tick after every line instead of once at the end
    #[arg(long)]
    tick_each: bool,

    /// Engine configuration as a JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Upper bound on ticks spent settling at the end
    #[arg(long, default_value_t = 100)]
    max_ticks: u32,

    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long)]
    log_dir: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "op", content = "payload", rename_all = "lowercase")]
enum Step {
    Mount(Value),
    Update(Value),
    Unmount(Value),
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_dir.as_deref()).map_err(|err| anyhow!(err))?;

    let config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            EngineConfig::from_json_str(&text)?
        }
        None => EngineConfig::default(),
    };

    let script = match &cli.script {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    let evaluator = Rc::new(RecordingEvaluator::new());
    let tree = NativeTree::new();
    let mut engine = Engine::with_evaluator(config, evaluator.clone())?;
    engine.add_factory(headless_factory(&tree));

    for (index, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let step: Step = serde_json::from_str(line)
            .with_context(|| format!("line {}: not a replay step", index + 1))?;
        let enqueued = match step {
            Step::Mount(payload) => engine.handle().try_enqueue_value(CommandKind::Mount, payload),
            Step::Update(payload) => engine.handle().try_enqueue_value(CommandKind::Update, payload),
            Step::Unmount(payload) => {
                engine.handle().try_enqueue_value(CommandKind::Unmount, payload)
            }
            Step::Reset => {
                let scheduled = engine.reset_environment();
                println!("line {}: reset, {} unmounts scheduled", index + 1, scheduled);
                Ok(())
            }
        };
        if let Err(err) = enqueued {
            println!("line {}: skipped: {}", index + 1, err);
            continue;
        }
        if cli.tick_each {
            print_report(&format!("line {}", index + 1), &engine.tick());
        }
    }

    for tick in 1..=cli.max_ticks {
        if engine.pending().total() == 0 && engine.garbage_len() == 0 {
            break;
        }
        print_report(&format!("settle {}", tick), &engine.tick());
    }

    println!();
    println!("objects: {}", engine.len());
    print!("{}", tree.outline());
    let pending = engine.pending();
    if pending.total() > 0 {
        println!(
            "still pending: {} mounts, {} updates, {} unmounts",
            pending.mounts, pending.updates, pending.unmounts
        );
    }
    println!("script calls: {}", evaluator.calls().len());
    Ok(())
}

fn print_report(label: &str, report: &TickReport) {
    if report.is_idle() {
        return;
    }
    println!(
        "{}: created={} updated={} attached={} hidden={} revived={} unmounted={} deferred={} abandoned={} finalized={}",
        label,
        report.created,
        report.updated,
        report.attached,
        report.hidden,
        report.revived,
        report.unmounted,
        report.deferred,
        report.abandoned,
        report.finalized
    );
}
