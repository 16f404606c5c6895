use std::path::Path;

use clap::{Parser, Subcommand};
use eyre::{Context, Result, bail};
use tokio::fs::read_to_string;
use tracing::error;
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod analyze;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long)]
    log: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse benchmark report files and write the combined summary
    Analyze {
        /// Directory scanned for report files
        #[arg(short, long, default_value = "measurements")]
        dir: String,
        /// Filename pattern for report discovery
        #[arg(short, long, default_value = "benchmark_results*.md")]
        pattern: String,
    },
    /// Render the comparison charts
    Plot {
        /// Previously generated summary file; uses built-in sample data when omitted
        #[arg(short, long)]
        file: Option<String>,
        /// Output directory for chart images
        #[arg(short, long, default_value = "figures")]
        out_dir: String,
    },
}

const MODULES: &[&str] = &[
    "llama_bench_report",
    "llama_bench",
    "analysis",
    "report_charts",
    "common",
];

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "log.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("llama_bench_report={log_level}"));
    for log in &args.log {
        env_filter = env_filter.add_directive(log.parse()?);
    }
    for module in MODULES.iter().skip(1) {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    match args.command {
        Commands::Analyze { dir, pattern } => {
            if let Err(err) = analyze::run(&dir, &pattern).await {
                error!("{err:#?}");
                return Err(err);
            }
        }
        Commands::Plot { file, out_dir } => plot(file, &out_dir).await?,
    }
    Ok(())
}

async fn plot(file: Option<String>, out_dir: &str) -> Result<()> {
    let rows = match file {
        Some(path) => {
            let content = read_to_string(&path)
                .await
                .context(format!("read summary {path}"))?;
            let rows = report_charts::parse_summary(&content);
            if rows.is_empty() {
                bail!("no comparison-table rows found in {path}");
            }
            rows
        }
        None => report_charts::sample_rows(),
    };

    for path in report_charts::render_all(&rows, Path::new(out_dir))? {
        println!("Saved: {}", path.display());
    }
    Ok(())
}
