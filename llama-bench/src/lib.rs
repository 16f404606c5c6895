//! Parser for llama-bench markdown report files.
//!
//! One call to [`parse_report`] turns the text of one report into a
//! [`BenchReport`]. Malformed content never fails the parse: fields that
//! cannot be found stay `None`, headings that cannot be classified go to the
//! `Unknown` bucket, and rows that do not match are ignored. The `Result`
//! only covers pattern construction, so the caller can log and skip a file.

use common::report::{BenchReport, ConfigKind, ConfigResult, MetricKind, RawMeasurement, SectionCue};
use eyre::Result;
use regex::Regex;
use tracing::debug;

/// The evaluated workload; result rows must name it to be counted.
pub const WORKLOAD_TOKEN: &str = "qwen3 8B";

/// Section body marker for a failed accelerator initialization.
const ACCEL_FAILURE_MARKER: &str = "failed to initialize CUDA";

struct Patterns {
    node: Regex,
    gpu_count: Regex,
    gpu_type: Regex,
    heading: Regex,
    trailing: Regex,
    row: Regex,
}

impl Patterns {
    fn new() -> Result<Self> {
        Ok(Self {
            node: Regex::new(r"\*\*Node:\*\*\s*(\w+)")?,
            gpu_count: Regex::new(r"\*\*GPUs per Node:\*\*\s*(\d+)")?,
            gpu_type: Regex::new(r"\d+,\s*(NVIDIA\s+[A-Za-z0-9]+)")?,
            heading: Regex::new(r"(?m)^##\s*Test\s+\d+:\s*(.+?)\s*$")?,
            // Headings that end the test-results area of a report.
            trailing: Regex::new(
                r"(?im)^##\s*(?:summary|observations|key findings|conclusion)\b",
            )?,
            // A `pp<N>`/`tg<N>` cell followed by the throughput column; a
            // `± stddev` suffix is tolerated by matching only the leading
            // number.
            row: Regex::new(r"\|\s*(pp|tg)(\d+)\s*\|\s*(\d+(?:\.\d+)?)")?,
        })
    }
}

struct Section<'a> {
    ordinal: usize,
    title: &'a str,
    body: &'a str,
}

/// Parses one report file's text into a [`BenchReport`].
pub fn parse_report(file: &str, content: &str) -> Result<BenchReport> {
    let patterns = Patterns::new()?;

    let node = patterns
        .node
        .captures(content)
        .map(|c| c[1].to_owned());
    let gpu_count = patterns
        .gpu_count
        .captures(content)
        .and_then(|c| c[1].parse::<u32>().ok());
    let gpu_type = patterns
        .gpu_type
        .captures(content)
        .map(|c| c[1].to_owned());

    let mut results = Vec::new();
    for section in split_sections(&patterns, content) {
        let cue = SectionCue::new(section.title, section.body.contains(ACCEL_FAILURE_MARKER));
        let kind = ConfigKind::classify(&cue);
        let samples = extract_measurements(&patterns, section.body);
        match ConfigResult::from_measurements(kind, section.ordinal, &samples) {
            Some(result) => results.push(result),
            None => debug!("{file}: no throughput rows in section '{}'", section.title),
        }
    }

    Ok(BenchReport {
        file: file.to_owned(),
        node,
        gpu_type,
        gpu_count,
        results,
    })
}

/// Splits the text at `## Test <n>: <title>` headings. Each section runs to
/// the next test heading, to a trailing summary-style heading, or to the end
/// of the file.
fn split_sections<'a>(patterns: &Patterns, content: &'a str) -> Vec<Section<'a>> {
    let headings: Vec<_> = patterns
        .heading
        .captures_iter(content)
        .map(|c| {
            let whole = c.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
            let title = c.get(1).map(|m| m.as_str()).unwrap_or("");
            (whole.0, whole.1, title)
        })
        .collect();
    let trailing: Vec<usize> = patterns
        .trailing
        .find_iter(content)
        .map(|m| m.start())
        .collect();

    headings
        .iter()
        .enumerate()
        .map(|(ordinal, &(_, body_start, title))| {
            let mut stop = headings
                .get(ordinal + 1)
                .map(|h| h.0)
                .unwrap_or(content.len());
            if let Some(&cut) = trailing.iter().find(|&&t| t >= body_start && t < stop) {
                stop = cut;
            }
            Section {
                ordinal,
                title,
                body: &content[body_start..stop],
            }
        })
        .collect()
}

/// Extracts throughput observations from the result-table rows of one
/// section. A row counts only when it names the workload.
fn extract_measurements(patterns: &Patterns, body: &str) -> Vec<RawMeasurement> {
    body.lines()
        .filter(|line| line.trim_start().starts_with('|') && line.contains(WORKLOAD_TOKEN))
        .filter_map(|line| {
            let caps = patterns.row.captures(line)?;
            let kind = match &caps[1] {
                "pp" => MetricKind::Prompt,
                _ => MetricKind::Generation,
            };
            let tokens_per_sec = caps[3].parse::<f64>().ok()?;
            Some(RawMeasurement {
                kind,
                tokens_per_sec,
            })
        })
        .collect()
}
