// CLI commands for solving question files
use anyhow::{bail, Context, Result};
use autosolve_common::config::{SolverConfig, DEFAULT_CONFIG_PATH};
use autosolve_common::report::Report;
use autosolve_common::segment::{questions_from_document, split_questions};
use autosolve_engine::BatchRunner;
use clap::ValueEnum;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputMode {
    /// One question per non-empty line
    Document,
    /// Numbered list or free text split at "Write a program"-style lead-ins
    Pasted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
}

/// Read a question file and segment it
fn read_questions(file: &Path, mode: InputMode) -> Result<Vec<String>> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read question file: {}", file.display()))?;

    let questions = match mode {
        InputMode::Document => questions_from_document(&text),
        InputMode::Pasted => split_questions(&text),
    };

    if questions.is_empty() {
        bail!("No questions found in {}", file.display());
    }
    Ok(questions)
}

/// Explicit path wins; otherwise SOLVER_CONFIG or the default location
fn load_config(config: Option<&Path>) -> Result<SolverConfig> {
    match config {
        Some(path) => {
            let mut config = SolverConfig::load(path)?;
            config.apply_overrides(|key| std::env::var(key).ok())?;
            config.validate()?;
            Ok(config)
        }
        None => SolverConfig::load_default(),
    }
}

fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => report.to_json().context("Failed to serialize report"),
        OutputFormat::Markdown => Ok(report.to_markdown()),
    }
}

pub async fn solve(
    file: &Path,
    mode: InputMode,
    name: &str,
    reg_no: &str,
    out: Option<&Path>,
    format: OutputFormat,
    config: Option<&Path>,
) -> Result<()> {
    let questions = read_questions(file, mode)?;
    let config = load_config(config)?;

    eprintln!("🚀 Solving {} question(s) from {}", questions.len(), file.display());

    let runner = BatchRunner::from_config(&config)?;
    let items = runner.run(&questions).await;
    let report = Report::new(name, reg_no, items);
    let rendered = render(&report, format)?;

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            eprintln!("  ✅ Report written: {}", path.display());
        }
        None => println!("{}", rendered),
    }

    let summary = &report.summary;
    eprintln!(
        "✅ Solved {}/{} (generation failed: {}, execution failed: {}, no output: {})",
        summary.solved,
        summary.total,
        summary.generation_failed,
        summary.execution_failed,
        summary.no_output
    );
    info!(solved = summary.solved, total = summary.total, "Solve command finished");

    Ok(())
}

pub fn split(file: &Path, mode: InputMode) -> Result<()> {
    let questions = read_questions(file, mode)?;
    for (i, question) in questions.iter().enumerate() {
        println!("{}. {}", i + 1, question);
    }
    Ok(())
}

/// Write config/solver.json under `path`; returns false when one already exists
fn write_default_config(path: &Path) -> Result<bool> {
    let config_path = path.join(DEFAULT_CONFIG_PATH);
    if config_path.exists() {
        return Ok(false);
    }
    SolverConfig::default().save(&config_path)?;
    Ok(true)
}

pub fn init_project(path: &Path) -> Result<()> {
    println!("🚀 Initializing autosolve project at: {}", path.display());

    if write_default_config(path)? {
        println!("  ✅ Created: {}", DEFAULT_CONFIG_PATH);
    } else {
        println!("  ⏭️  Exists: {}", DEFAULT_CONFIG_PATH);
    }

    println!("\n📋 Next steps:");
    println!("  1. Export API_KEY for the generation service");
    println!("  2. Build or pull the sandbox image named in sandbox.image");
    println!("  3. Solve a file: autosolve-cli solve --file questions.txt --name <name> --reg-no <reg>");

    Ok(())
}
