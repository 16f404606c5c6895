//! Renders the fixed comparison chart set from summary rows.
//!
//! Input is either the built-in sample dataset or the comparison table
//! re-read from a generated summary file. Purely presentational.

use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use itertools::Itertools;
use plotters::prelude::*;
use tracing::info;

const CHART_SIZE: (u32, u32) = (1024, 640);
const PROMPT_COLOR: RGBColor = RGBColor(0x2E, 0x86, 0xAB);
const GEN_COLOR: RGBColor = RGBColor(0xA2, 0x3B, 0x72);
const BAR_COLORS: [RGBColor; 4] = [
    RGBColor(0x2E, 0x86, 0xAB),
    RGBColor(0xA2, 0x3B, 0x72),
    RGBColor(0xF1, 0x8F, 0x01),
    RGBColor(0xC7, 0x3E, 0x1D),
];

/// One row of the comparison table.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub node: String,
    pub gpu: String,
    pub config: String,
    pub prompt_tps: f64,
    pub gen_tps: f64,
}

impl SummaryRow {
    fn new(node: &str, gpu: &str, config: &str, prompt_tps: f64, gen_tps: f64) -> Self {
        Self {
            node: node.to_owned(),
            gpu: gpu.to_owned(),
            config: config.to_owned(),
            prompt_tps,
            gen_tps,
        }
    }

    pub fn is_cpu_only(&self) -> bool {
        self.config == "CPU-Only" || self.gpu == "CPU"
    }

    fn is_single_gpu(&self) -> bool {
        matches!(self.config.as_str(), "Single GPU" | "GPU Full")
    }

    fn is_multi_gpu(&self) -> bool {
        self.config.contains("Dual GPU") || self.config.contains("Quad GPU")
    }

    fn label(&self) -> String {
        format!("{} ({})", self.config, self.node)
    }
}

/// Measured values from the orcaga cluster runs, so `plot` works standalone.
pub fn sample_rows() -> Vec<SummaryRow> {
    vec![
        SummaryRow::new("orcaga02", "CPU", "CPU-Only", 7.12, 15.84),
        SummaryRow::new("orcaga02", "NVIDIA L40S", "GPU Partial", 9.76, 19.67),
        SummaryRow::new("orcaga02", "NVIDIA L40S", "GPU Full", 7698.65, 104.61),
        SummaryRow::new("orcaga01", "NVIDIA L40S", "Single GPU", 7907.81, 104.18),
        SummaryRow::new("orcaga01", "NVIDIA L40S", "Dual GPU", 7820.44, 103.80),
        SummaryRow::new("orcaga01", "NVIDIA L40S", "Quad GPU (Balanced)", 7758.68, 104.46),
        SummaryRow::new("orcaga01", "NVIDIA L40S", "Quad GPU (Custom)", 7684.82, 104.48),
        SummaryRow::new("orcaga10", "NVIDIA A30", "GPU Full", 2423.23, 75.60),
    ]
}

/// Re-reads comparison-table rows from a generated summary file. Header,
/// separator, and speedup rows fail the numeric parse and are skipped.
pub fn parse_summary(content: &str) -> Vec<SummaryRow> {
    content
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if !trimmed.starts_with('|') {
                return None;
            }
            let cells = trimmed.split('|').map(str::trim).collect::<Vec<_>>();
            // "| a | b |" splits into ["", a, b, ""].
            if cells.len() < 7 {
                return None;
            }
            let prompt_tps = cells[4].parse::<f64>().ok()?;
            let gen_tps = cells[5].parse::<f64>().ok()?;
            Some(SummaryRow::new(cells[1], cells[2], cells[3], prompt_tps, gen_tps))
        })
        .collect()
}

/// Renders every applicable chart into `out_dir` and returns the written
/// paths. Charts whose inputs are missing (no baseline, one GPU type) are
/// skipped with a notice.
pub fn render_all(rows: &[SummaryRow], out_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir).context(format!("create {}", out_dir.display()))?;
    let mut written = Vec::new();

    written.push(throughput_chart(rows, &out_dir.join("1_throughput_comparison.svg"))?);
    match speedup_chart(rows, &out_dir.join("2_speedup_analysis.svg"))? {
        Some(path) => written.push(path),
        None => info!("No CPU baseline, skipping speedup chart"),
    }
    match scaling_chart(rows, &out_dir.join("3_multi_gpu_scaling.svg"))? {
        Some(path) => written.push(path),
        None => info!("No multi-GPU configurations, skipping scaling chart"),
    }
    match hardware_chart(rows, &out_dir.join("4_hardware_comparison.svg"))? {
        Some(path) => written.push(path),
        None => info!("Fewer than two GPU types, skipping hardware chart"),
    }
    Ok(written)
}

/// Prompt and generation throughput for every configuration, log scale.
fn throughput_chart(rows: &[SummaryRow], path: &Path) -> Result<PathBuf> {
    let labels = rows.iter().map(SummaryRow::label).collect::<Vec<_>>();
    let series = [
        ("Prompt (pp)", rows.iter().map(|r| r.prompt_tps).collect::<Vec<_>>(), PROMPT_COLOR),
        ("Generation (tg)", rows.iter().map(|r| r.gen_tps).collect::<Vec<_>>(), GEN_COLOR),
    ];
    grouped_log_bars(
        path,
        "CPU vs GPU Inference Throughput",
        "Tokens/Second",
        &labels,
        &series,
    )?;
    Ok(path.to_path_buf())
}

/// Speedup over the CPU baseline for every accelerator configuration.
fn speedup_chart(rows: &[SummaryRow], path: &Path) -> Result<Option<PathBuf>> {
    let Some(base) = rows.iter().find(|r| r.is_cpu_only()) else {
        return Ok(None);
    };
    if base.prompt_tps <= 0.0 && base.gen_tps <= 0.0 {
        return Ok(None);
    }

    let gpu_rows = rows.iter().filter(|r| !r.is_cpu_only()).collect::<Vec<_>>();
    if gpu_rows.is_empty() {
        return Ok(None);
    }
    let labels = gpu_rows.iter().map(|r| r.label()).collect::<Vec<_>>();
    let ratio = |value: f64, base_value: f64| {
        if base_value > 0.0 { value / base_value } else { 0.0 }
    };
    let series = [
        (
            "Prompt speedup",
            gpu_rows.iter().map(|r| ratio(r.prompt_tps, base.prompt_tps)).collect::<Vec<_>>(),
            PROMPT_COLOR,
        ),
        (
            "Generation speedup",
            gpu_rows.iter().map(|r| ratio(r.gen_tps, base.gen_tps)).collect::<Vec<_>>(),
            GEN_COLOR,
        ),
    ];
    grouped_log_bars(
        path,
        "GPU Speedup over CPU-Only Baseline",
        "Speedup (x)",
        &labels,
        &series,
    )?;
    Ok(Some(path.to_path_buf()))
}

/// Prompt throughput of the scaling classes with a single-GPU reference line.
fn scaling_chart(rows: &[SummaryRow], path: &Path) -> Result<Option<PathBuf>> {
    let scaling = rows
        .iter()
        .filter(|r| r.is_single_gpu() || r.is_multi_gpu())
        .collect::<Vec<_>>();
    if !scaling.iter().any(|r| r.is_multi_gpu()) {
        return Ok(None);
    }
    let labels = scaling.iter().map(|r| r.config.clone()).collect::<Vec<_>>();
    let values = scaling.iter().map(|r| r.prompt_tps).collect::<Vec<_>>();
    let reference = scaling
        .iter()
        .find(|r| r.is_single_gpu())
        .map(|r| r.prompt_tps);
    linear_bars(
        path,
        "Multi-GPU Scaling (Prompt Processing)",
        "Tokens/Second",
        &labels,
        &values,
        reference,
    )?;
    Ok(Some(path.to_path_buf()))
}

/// Mean prompt throughput per GPU type, when more than one type is present.
fn hardware_chart(rows: &[SummaryRow], path: &Path) -> Result<Option<PathBuf>> {
    let gpu_rows = rows.iter().filter(|r| !r.is_cpu_only()).collect::<Vec<_>>();
    let types = gpu_rows.iter().map(|r| r.gpu.as_str()).unique().collect::<Vec<_>>();
    if types.len() < 2 {
        return Ok(None);
    }
    let values = types
        .iter()
        .map(|t| {
            let matching = gpu_rows
                .iter()
                .filter(|r| r.gpu == *t)
                .map(|r| r.prompt_tps)
                .collect::<Vec<_>>();
            matching.iter().sum::<f64>() / matching.len() as f64
        })
        .collect::<Vec<_>>();
    let labels = types.iter().map(|t| t.to_string()).collect::<Vec<_>>();
    linear_bars(
        path,
        "Hardware Comparison (Prompt Processing)",
        "Tokens/Second",
        &labels,
        &values,
        None,
    )?;
    Ok(Some(path.to_path_buf()))
}

fn grouped_log_bars(
    path: &Path,
    title: &str,
    y_desc: &str,
    labels: &[String],
    series: &[(&str, Vec<f64>, RGBColor)],
) -> Result<()> {
    let positive = series
        .iter()
        .flat_map(|(_, values, _)| values.iter().copied())
        .filter(|v| *v > 0.0)
        .collect::<Vec<_>>();
    let y_max = positive.iter().copied().fold(1.0f64, f64::max) * 2.0;
    let y_min = positive
        .iter()
        .copied()
        .fold(f64::MAX, f64::min)
        .max(1e-3)
        .min(y_max / 10.0)
        / 2.0;
    let n = labels.len();

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..n as f64, (y_min..y_max).log_scale())?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| label_at(labels, *x))
        .y_desc(y_desc)
        .draw()?;

    let bar_width = 0.8 / series.len() as f64;
    for (idx, (name, values, color)) in series.iter().enumerate() {
        let color = *color;
        chart
            .draw_series(values.iter().enumerate().filter(|(_, v)| **v > 0.0).map(
                |(group, value)| {
                    let x0 = group as f64 + 0.1 + idx as f64 * bar_width;
                    Rectangle::new([(x0, y_min), (x0 + bar_width * 0.9, *value)], color.filled())
                },
            ))?
            .label(*name)
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
            });
    }
    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;
    root.present()?;
    Ok(())
}

fn linear_bars(
    path: &Path,
    title: &str,
    y_desc: &str,
    labels: &[String],
    values: &[f64],
    reference: Option<f64>,
) -> Result<()> {
    let y_max = values.iter().copied().fold(1.0f64, f64::max) * 1.2;
    let n = labels.len();

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..n as f64, 0f64..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| label_at(labels, *x))
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(values.iter().enumerate().map(|(group, value)| {
        let color = BAR_COLORS[group % BAR_COLORS.len()];
        Rectangle::new(
            [(group as f64 + 0.1, 0.0), (group as f64 + 0.9, *value)],
            color.filled(),
        )
    }))?;

    if let Some(reference) = reference {
        chart
            .draw_series(LineSeries::new(
                vec![(0.0, reference), (n as f64, reference)],
                RED.stroke_width(2),
            ))?
            .label("Single-GPU reference")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));
        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .draw()?;
    }
    root.present()?;
    Ok(())
}

fn label_at(labels: &[String], x: f64) -> String {
    if x < 0.0 {
        return String::new();
    }
    labels.get(x as usize).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY_SNIPPET: &str = "\
| Node      | GPU Type     | Config              | Prompt (pp) t/s | Generation (tg) t/s |
|-----------|--------------|---------------------|-----------------|---------------------|
| orcaga02  | CPU          | CPU-Only            |            7.07 |               15.80 |
| orcaga02  | NVIDIA L40S  | GPU Full            |         7698.65 |              104.61 |

| Node      | GPU Type     | Config              | Prompt Speedup | Generation Speedup |
|-----------|--------------|---------------------|----------------|--------------------|
| orcaga02  | NVIDIA L40S  | GPU Full            |       1088.92x |              6.62x |
";

    #[test]
    fn parses_only_comparison_rows() {
        let rows = parse_summary(SUMMARY_SNIPPET);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_cpu_only());
        assert_eq!(rows[1].config, "GPU Full");
        assert!((rows[1].prompt_tps - 7698.65).abs() < 1e-9);
        assert!((rows[0].gen_tps - 15.80).abs() < 1e-9);
    }

    #[test]
    fn sample_rows_cover_every_chart() {
        let rows = sample_rows();
        assert!(rows.iter().any(|r| r.is_cpu_only()));
        assert!(rows.iter().any(|r| r.is_multi_gpu()));
        assert!(rows.iter().map(|r| r.gpu.as_str()).unique().count() >= 3);
    }

    #[test]
    fn renders_full_chart_set() {
        let dir = tempfile::tempdir().unwrap();
        let written = render_all(&sample_rows(), dir.path()).unwrap();
        assert_eq!(written.len(), 4);
        for path in written {
            assert!(path.exists());
            assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
    }

    #[test]
    fn charts_degrade_without_baseline_or_second_gpu() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![SummaryRow::new(
            "orcaga02",
            "NVIDIA L40S",
            "GPU Full",
            7698.65,
            104.61,
        )];
        let written = render_all(&rows, dir.path()).unwrap();
        // Only the throughput chart applies.
        assert_eq!(written.len(), 1);
    }
}
