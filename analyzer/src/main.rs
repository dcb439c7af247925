//! Trace Kernel Analyzer binary
//!
//! Prints per-kernel duration statistics for a trace file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};

use analyzer::{DEFAULT_CATEGORY, OutputFormat, analyze_trace_file, render};
use shared::Component;
use shared::logging::{init_tracing, log_startup};

#[derive(Parser)]
#[command(name = "analyzer")]
#[command(about = "Aggregate per-kernel durations from a JSON trace file")]
struct Args {
    /// Trace file (JSON, optionally gzip-compressed)
    trace_file: Option<PathBuf>,

    /// Event category to aggregate
    #[arg(long, default_value = DEFAULT_CATEGORY)]
    category: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Only show the N kernels with the largest total duration
    #[arg(long)]
    top: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let Some(trace_file) = args.trace_file else {
        let _ = Args::command().print_help();
        return ExitCode::FAILURE;
    };

    init_tracing(Component::Analyzer, args.log_level.as_deref());
    log_startup(Component::Analyzer, &format!("analysis of {}", trace_file.display()));

    let mut stats = analyze_trace_file(&trace_file, &args.category);
    if let Some(top) = args.top {
        stats.truncate(top);
    }

    match render(&stats, args.format) {
        Ok(output) => {
            print!("{output}");
            if args.format == OutputFormat::Json {
                println!();
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("❌ Failed to render report: {}", e);
            ExitCode::FAILURE
        }
    }
}
