use std::{io::Write, path::Path};

use chrono::Local;
use common::{tee::Tee, util::glob_to_regex};
use eyre::{Context, Result, bail};
use tokio::fs::{read_dir, read_to_string, write};
use tracing::{error, warn};

const RULE: &str = "======================================================================";

/// Discovers report files, parses them sequentially, and writes the combined
/// summary to the console and a timestamped markdown artifact, plus a JSON
/// dump of the parsed reports.
pub async fn run(dir: &str, pattern: &str) -> Result<()> {
    let dir = Path::new(dir);
    let matcher = glob_to_regex(pattern)?;

    let mut files = Vec::new();
    let mut items = read_dir(dir)
        .await
        .context(format!("read directory {}", dir.display()))?;
    while let Some(entry) = items.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type().await?.is_file() && matcher.is_match(&name) {
            files.push(entry.path());
        }
    }
    // Sorted names define the file iteration order, so baseline selection is
    // deterministic across runs.
    files.sort();
    if files.is_empty() {
        bail!("no benchmark files found in {}", dir.display());
    }

    let mut names = Vec::new();
    let mut reports = Vec::new();
    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        names.push(name.clone());
        let content = match read_to_string(path).await {
            Ok(content) => content,
            Err(err) => {
                error!("Skipping {name}: {err}");
                continue;
            }
        };
        match llama_bench::parse_report(&name, &content) {
            Ok(report) if report.results.is_empty() => {
                warn!("No recognizable test sections in {name}, excluded");
            }
            Ok(report) => reports.push(report),
            Err(err) => error!("Error parsing {name}: {err:#}"),
        }
    }
    if reports.is_empty() {
        bail!("no valid results found");
    }

    let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let summary_path = dir.join(format!("analysis_{stamp}.md"));
    let json_path = dir.join(format!("reports_{stamp}.json"));
    write(&json_path, serde_json::to_string_pretty(&reports)?).await?;

    let mut tee = Tee::create(&summary_path)?;
    writeln!(tee, "{RULE}")?;
    writeln!(tee, "LLAMA.CPP BENCHMARK ANALYSIS")?;
    writeln!(tee, "{RULE}")?;
    writeln!(tee, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(tee, "\nScanning directory: {}", dir.display())?;
    writeln!(tee, "Found {} benchmark file(s)", names.len())?;
    for name in &names {
        writeln!(tee, "  - {name}")?;
    }

    analysis::write_summary(&mut tee, &reports)?;

    writeln!(tee, "\n{RULE}")?;
    writeln!(tee, "ANALYSIS COMPLETE")?;
    writeln!(tee, "{RULE}")?;
    tee.finish()?;

    println!("\nAnalysis saved to: {}", summary_path.display());
    println!("Parsed reports saved to: {}", json_path.display());
    Ok(())
}
