use crate::config::{Config, OutputFormat};
use crate::page::{load_script, render_tree, Page, StepResult};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;
use weave_runtime::{ActionOutcome, WriteOutcome};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Recorded page (tree + per-instance tables)
    pub page: PathBuf,

    /// Script of host calls to replay, in order
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// Output format (overrides the config file)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

pub fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let output = args.output.unwrap_or(config.output);

    let page = Page::load(&args.page)?;
    let steps = match &args.script {
        Some(path) => load_script(path)?,
        None => Vec::new(),
    };
    let fallback = page
        .default_instance()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Page has no instances"))?;

    eprintln!(
        "▶ {} {} ({} steps)",
        "Replaying".green().bold(),
        args.page.display(),
        steps.len()
    );

    let mut runtime = page.into_runtime(config.runtime);
    let ids: Vec<_> = runtime.instance_ids().cloned().collect();
    for id in &ids {
        let placed = runtime.refresh_external_children(id);
        if !placed.is_empty() {
            eprintln!("  {} [{}] placed {}", "✓".green(), id, placed.join(", "));
        }
    }

    for (index, step) in steps.into_iter().enumerate() {
        let label = step.label();
        debug!(step = index + 1, %label, "Replaying step");
        match step.apply(&mut runtime, &fallback)? {
            StepResult::Interaction(report) => {
                let issues = report.outcomes.iter().filter(|o| !is_clean(o)).count();
                print_step(index, &label, issues == 0);
                for outcome in report.outcomes.iter().filter(|o| !is_clean(o)) {
                    eprintln!("      {}", describe(outcome).dimmed());
                }
            }
            StepResult::Writes(outcomes) => {
                let clean = outcomes.iter().all(write_is_clean);
                print_step(index, &label, clean);
                for outcome in outcomes.iter().filter(|o| !write_is_clean(o)) {
                    eprintln!("      {}", describe_write(outcome).dimmed());
                }
            }
            StepResult::TornDown(found) => print_step(index, &label, found),
        }
    }

    let snapshot = runtime.surface().snapshot();
    match output {
        OutputFormat::Tree => print!("{}", render_tree(&snapshot)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
    }

    Ok(())
}

fn print_step(index: usize, label: &str, clean: bool) {
    let mark = if clean { "✓".green() } else { "⚠".yellow() };
    eprintln!("  {} {:>3} {}", mark, index + 1, label);
}

fn is_clean(outcome: &ActionOutcome) -> bool {
    match outcome {
        ActionOutcome::EventForwarded => true,
        ActionOutcome::Write(write) => write_is_clean(write),
        ActionOutcome::HostMessage { result, .. } => result.is_ok(),
        ActionOutcome::Invalid(_) | ActionOutcome::Unknown(_) => false,
    }
}

fn write_is_clean(outcome: &WriteOutcome) -> bool {
    outcome.report().is_some_and(|report| report.is_clean())
}

fn describe(outcome: &ActionOutcome) -> String {
    match outcome {
        ActionOutcome::Write(write) => describe_write(write),
        ActionOutcome::HostMessage { handler, result: Err(err) } => format!("{handler}: {err}"),
        ActionOutcome::Invalid(err) => err.to_string(),
        ActionOutcome::Unknown(name) => format!("unknown action '{name}'"),
        other => format!("{other:?}"),
    }
}

fn describe_write(outcome: &WriteOutcome) -> String {
    match outcome {
        WriteOutcome::Skipped(reason) => format!("skipped: {reason}"),
        WriteOutcome::Applied(report) => {
            let missing: Vec<String> = report
                .missing_nodes
                .iter()
                .chain(&report.detached_anchors)
                .map(ToString::to_string)
                .collect();
            format!("unrendered nodes: {}", missing.join(", "))
        }
    }
}
