mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{InputMode, OutputFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "autosolve-cli")]
#[command(about = "Autosolve CLI - Generate, run and report solutions for a batch of questions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve every question in a file and write the report
    Solve {
        /// Question file (plain text)
        #[arg(short, long)]
        file: PathBuf,

        /// How to split the file into questions
        #[arg(short, long, value_enum, default_value_t = InputMode::Document)]
        mode: InputMode,

        /// Name printed at the top of the report
        #[arg(short, long)]
        name: String,

        /// Register number printed at the top of the report
        #[arg(short, long)]
        reg_no: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,

        /// Solver config path (defaults to SOLVER_CONFIG or config/solver.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the questions a file splits into, without solving them
    Split {
        /// Question file (plain text)
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = InputMode::Document)]
        mode: InputMode,
    },

    /// Write a default config/solver.json
    Init {
        /// Project path
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so a report written to stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            file,
            mode,
            name,
            reg_no,
            out,
            format,
            config,
        } => {
            commands::solve(
                &file,
                mode,
                &name,
                &reg_no,
                out.as_deref(),
                format,
                config.as_deref(),
            )
            .await?;
        }
        Commands::Split { file, mode } => {
            commands::split(&file, mode)?;
        }
        Commands::Init { path } => {
            commands::init_project(&path)?;
        }
    }

    Ok(())
}
