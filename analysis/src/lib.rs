//! Cross-report aggregation and the combined summary artifact.
//!
//! Every section is a pure function of the parsed report sequence, written
//! through any `io::Write` sink so the caller can tee it to the console and
//! a file at once.

use std::io::Write;

use common::{
    report::{BenchReport, ConfigResult},
    util::mean,
};
use eyre::Result;
use itertools::Itertools;
use tracing::debug;

const RULE: &str = "======================================================================";

/// One configuration result joined with its owning report, in (report order,
/// ordinal order).
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub report: &'a BenchReport,
    pub result: &'a ConfigResult,
}

impl Entry<'_> {
    pub fn node(&self) -> &str {
        self.report.node_label()
    }

    pub fn gpu(&self) -> &str {
        self.report.gpu_label(self.result)
    }
}

pub fn flatten(reports: &[BenchReport]) -> Vec<Entry<'_>> {
    reports
        .iter()
        .flat_map(|report| report.results.iter().map(move |result| Entry { report, result }))
        .collect()
}

/// The first accelerator-free result in iteration order is the CPU baseline.
pub fn baseline<'a>(entries: &[Entry<'a>]) -> Option<Entry<'a>> {
    entries.iter().copied().find(|e| e.result.kind.is_cpu_only())
}

/// Speedup relative to a baseline value, undefined for a zero baseline.
pub fn speedup(value: f64, baseline: f64) -> Option<f64> {
    (baseline > 0.0).then(|| value / baseline)
}

fn heading(out: &mut dyn Write, title: &str) -> Result<()> {
    writeln!(out, "\n{RULE}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{RULE}")?;
    Ok(())
}

/// Writes all summary sections for the report set.
pub fn write_summary(out: &mut dyn Write, reports: &[BenchReport]) -> Result<()> {
    let entries = flatten(reports);
    debug!("Summarizing {} configurations from {} reports", entries.len(), reports.len());
    write_gpu_details(out, reports)?;
    write_comparison_table(out, &entries)?;
    write_speedups(out, &entries)?;
    write_key_findings(out, &entries)?;
    Ok(())
}

fn write_gpu_details(out: &mut dyn Write, reports: &[BenchReport]) -> Result<()> {
    let sections: [(&str, fn(u32) -> bool); 2] = [
        ("SINGLE GPU CONFIGURATION ANALYSIS", |count| count == 1),
        ("MULTI-GPU CONFIGURATION ANALYSIS", |count| count > 1),
    ];
    for (title, matches) in sections {
        let selected = reports
            .iter()
            .filter(|r| r.gpu_count.is_some_and(matches))
            .collect::<Vec<_>>();
        if selected.is_empty() {
            continue;
        }
        heading(out, title)?;
        for report in selected {
            writeln!(out, "\nNode: {}", report.node_label())?;
            writeln!(
                out,
                "GPU: {} x {}",
                report.gpu_type.as_deref().unwrap_or("Unknown"),
                report.gpu_count.unwrap_or(0)
            )?;
            writeln!(out, "File: {}", report.file)?;
            for result in &report.results {
                writeln!(
                    out,
                    "  {:19} pp {:10.2} t/s | tg {:8.2} t/s",
                    result.kind.label(),
                    result.prompt_tps,
                    result.gen_tps
                )?;
            }
        }
    }
    Ok(())
}

fn write_comparison_table(out: &mut dyn Write, entries: &[Entry<'_>]) -> Result<()> {
    heading(out, "COMPREHENSIVE COMPARISON TABLE")?;
    writeln!(out)?;
    writeln!(
        out,
        "| Node      | GPU Type     | Config              | Prompt (pp) t/s | Generation (tg) t/s |"
    )?;
    writeln!(
        out,
        "|-----------|--------------|---------------------|-----------------|---------------------|"
    )?;
    for entry in entries {
        writeln!(
            out,
            "| {:9} | {:12} | {:19} | {:15.2} | {:19.2} |",
            entry.node(),
            entry.gpu(),
            entry.result.kind.label(),
            entry.result.prompt_tps,
            entry.result.gen_tps
        )?;
    }
    Ok(())
}

fn write_speedups(out: &mut dyn Write, entries: &[Entry<'_>]) -> Result<()> {
    heading(out, "SPEEDUP ANALYSIS")?;

    let Some(base) = baseline(entries) else {
        writeln!(out, "\nNo CPU baseline found for speedup calculation")?;
        return Ok(());
    };

    writeln!(out, "\nCPU Baseline ({}):", base.node())?;
    writeln!(out, "  Prompt Processing: {:.2} t/s", base.result.prompt_tps)?;
    writeln!(out, "  Text Generation:   {:.2} t/s", base.result.gen_tps)?;
    writeln!(out, "\nGPU Speedups:\n")?;
    writeln!(
        out,
        "| Node      | GPU Type     | Config              | Prompt Speedup | Generation Speedup |"
    )?;
    writeln!(
        out,
        "|-----------|--------------|---------------------|----------------|--------------------|"
    )?;

    let cell = |value: f64, base_value: f64| match speedup(value, base_value) {
        Some(s) => format!("{s:.2}x"),
        None => "N/A".to_owned(),
    };
    for entry in entries.iter().filter(|e| !e.result.kind.is_cpu_only()) {
        writeln!(
            out,
            "| {:9} | {:12} | {:19} | {:>14} | {:>18} |",
            entry.node(),
            entry.gpu(),
            entry.result.kind.label(),
            cell(entry.result.prompt_tps, base.result.prompt_tps),
            cell(entry.result.gen_tps, base.result.gen_tps),
        )?;
    }
    Ok(())
}

fn write_key_findings(out: &mut dyn Write, entries: &[Entry<'_>]) -> Result<()> {
    heading(out, "KEY FINDINGS")?;

    let gpu_entries = entries
        .iter()
        .filter(|e| !e.result.kind.is_cpu_only())
        .copied()
        .collect::<Vec<_>>();
    if gpu_entries.is_empty() {
        writeln!(out, "\nNo GPU results found")?;
        return Ok(());
    }

    // Strictly-greater comparisons keep the first occurrence on ties.
    let best_by = |metric: fn(&Entry<'_>) -> f64| {
        gpu_entries
            .iter()
            .fold(None::<&Entry<'_>>, |best, e| match best {
                Some(b) if metric(e) <= metric(b) => Some(b),
                _ => Some(e),
            })
    };
    if let Some(best) = best_by(|e| e.result.prompt_tps) {
        writeln!(out, "\n1. Best Prompt Processing Performance:")?;
        writeln!(out, "   {} - {} ({})", best.node(), best.gpu(), best.result.kind.label())?;
        writeln!(out, "   {:.2} t/s", best.result.prompt_tps)?;
    }
    if let Some(best) = best_by(|e| e.result.gen_tps) {
        writeln!(out, "\n2. Best Text Generation Performance:")?;
        writeln!(out, "   {} - {} ({})", best.node(), best.gpu(), best.result.kind.label())?;
        writeln!(out, "   {:.2} t/s", best.result.gen_tps)?;
    }

    write_scaling_comparison(out, &gpu_entries)?;
    write_hardware_comparison(out, &gpu_entries)?;
    Ok(())
}

fn write_scaling_comparison(out: &mut dyn Write, gpu_entries: &[Entry<'_>]) -> Result<()> {
    let class_mean = |is_in: fn(&Entry<'_>) -> bool| {
        let values = gpu_entries
            .iter()
            .filter(|e| is_in(e))
            .map(|e| e.result.prompt_tps)
            .collect::<Vec<_>>();
        (!values.is_empty()).then(|| mean(&values))
    };
    let single_avg = class_mean(|e| e.result.kind.is_single_gpu_class());
    let multi_avg = class_mean(|e| e.result.kind.is_multi_gpu_class());
    let (Some(single_avg), Some(multi_avg)) = (single_avg, multi_avg) else {
        return Ok(());
    };

    writeln!(out, "\n3. Multi-GPU Scaling:")?;
    if multi_avg < single_avg {
        writeln!(out, "   Multi-GPU shows NEGATIVE scaling")?;
        writeln!(out, "   Single GPU avg: {single_avg:.2} t/s")?;
        writeln!(out, "   Multi GPU avg:  {multi_avg:.2} t/s")?;
        writeln!(
            out,
            "   Performance loss: {:.1}%",
            (single_avg - multi_avg) / single_avg * 100.0
        )?;
    } else {
        writeln!(out, "   Multi-GPU shows positive scaling")?;
        writeln!(out, "   Single GPU avg: {single_avg:.2} t/s")?;
        writeln!(out, "   Multi GPU avg:  {multi_avg:.2} t/s")?;
        writeln!(
            out,
            "   Performance gain: {:.1}%",
            (multi_avg - single_avg) / single_avg * 100.0
        )?;
    }
    Ok(())
}

fn write_hardware_comparison(out: &mut dyn Write, gpu_entries: &[Entry<'_>]) -> Result<()> {
    let types = gpu_entries
        .iter()
        .filter_map(|e| e.report.gpu_type.as_deref())
        .unique()
        .collect::<Vec<_>>();
    if types.len() < 2 {
        return Ok(());
    }

    writeln!(out, "\n4. Hardware Comparison:")?;
    for gpu_type in types {
        let values = gpu_entries
            .iter()
            .filter(|e| e.report.gpu_type.as_deref() == Some(gpu_type))
            .map(|e| e.result.prompt_tps)
            .collect::<Vec<_>>();
        writeln!(out, "   {}: {:.2} t/s (avg)", gpu_type, mean(&values))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use common::report::{ConfigKind, ConfigResult};

    use super::*;

    fn report(
        file: &str,
        node: &str,
        gpu_type: Option<&str>,
        gpu_count: Option<u32>,
        results: Vec<ConfigResult>,
    ) -> BenchReport {
        BenchReport {
            file: file.to_owned(),
            node: Some(node.to_owned()),
            gpu_type: gpu_type.map(str::to_owned),
            gpu_count,
            results,
        }
    }

    fn result(kind: ConfigKind, ordinal: usize, pp: f64, tg: f64) -> ConfigResult {
        ConfigResult {
            kind,
            ordinal,
            prompt_tps: pp,
            gen_tps: tg,
        }
    }

    fn render(reports: &[BenchReport]) -> String {
        let mut buf = Vec::new();
        write_summary(&mut buf, reports).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn end_to_end_speedup_scenario() {
        let reports = vec![report(
            "benchmark_results.md",
            "orcaga02",
            Some("NVIDIA L40S"),
            Some(1),
            vec![
                result(ConfigKind::CpuOnly, 0, 7.07, 15.80),
                result(ConfigKind::GpuFull, 1, 7698.65, 104.61),
            ],
        )];
        let text = render(&reports);

        let table_rows = text
            .lines()
            .filter(|l| l.starts_with("| orcaga02"))
            .count();
        // Two in the comparison table, one in the speedup table.
        assert_eq!(table_rows, 3);
        // 7698.65 / 7.07 ~= 1089, 104.61 / 15.80 ~= 6.62
        assert!(text.contains("1088.92x"));
        assert!(text.contains("6.62x"));
    }

    #[test]
    fn zero_baseline_reports_na() {
        let reports = vec![report(
            "r.md",
            "node1",
            Some("NVIDIA A30"),
            Some(1),
            vec![
                result(ConfigKind::CpuOnly, 0, 0.0, 15.0),
                result(ConfigKind::GpuFull, 1, 100.0, 30.0),
            ],
        )];
        let text = render(&reports);
        assert!(text.contains("N/A"));
        assert!(text.contains("2.00x"));
        assert_eq!(speedup(100.0, 0.0), None);
    }

    #[test]
    fn baseline_is_first_in_file_iteration_order() {
        // The alphabetically earlier report wins even though the later one
        // lists its CPU section at a smaller ordinal.
        let reports = vec![
            report(
                "benchmark_results_a.md",
                "alpha",
                None,
                Some(1),
                vec![
                    result(ConfigKind::GpuFull, 0, 10.0, 10.0),
                    result(ConfigKind::CpuOnly, 1, 2.0, 4.0),
                ],
            ),
            report(
                "benchmark_results_b.md",
                "beta",
                None,
                Some(1),
                vec![result(ConfigKind::CpuOnly, 0, 9.0, 9.0)],
            ),
        ];
        let entries = flatten(&reports);
        let base = baseline(&entries).unwrap();
        assert_eq!(base.node(), "alpha");
        assert_eq!(base.result.prompt_tps, 2.0);
    }

    #[test]
    fn missing_baseline_is_a_notice_not_an_error() {
        let reports = vec![report(
            "r.md",
            "node1",
            Some("NVIDIA L40S"),
            Some(1),
            vec![result(ConfigKind::GpuFull, 0, 100.0, 10.0)],
        )];
        let text = render(&reports);
        assert!(text.contains("No CPU baseline found"));
    }

    #[test]
    fn scaling_comparison_reports_loss() {
        let reports = vec![report(
            "r.md",
            "orcaga01",
            Some("NVIDIA L40S"),
            Some(4),
            vec![
                result(ConfigKind::SingleGpu, 0, 7907.81, 104.18),
                result(ConfigKind::DualGpu, 1, 7820.44, 103.80),
                result(ConfigKind::QuadGpuBalanced, 2, 7758.68, 104.46),
                result(ConfigKind::QuadGpuCustom, 3, 7684.82, 104.48),
            ],
        )];
        let text = render(&reports);
        assert!(text.contains("NEGATIVE scaling"));
        // multi avg = (7820.44 + 7758.68 + 7684.82) / 3 = 7754.65
        assert!(text.contains("Multi GPU avg:  7754.65 t/s"));
        assert!(text.contains("Performance loss: 1.9%"));
    }

    #[test]
    fn hardware_comparison_lists_per_type_means() {
        let reports = vec![
            report(
                "benchmark_results_a30.md",
                "orcaga10",
                Some("NVIDIA A30"),
                Some(1),
                vec![result(ConfigKind::GpuFull, 0, 2423.23, 75.60)],
            ),
            report(
                "benchmark_results_l40s.md",
                "orcaga02",
                Some("NVIDIA L40S"),
                Some(1),
                vec![result(ConfigKind::GpuFull, 0, 7907.81, 104.18)],
            ),
        ];
        let text = render(&reports);
        assert!(text.contains("Hardware Comparison"));
        assert!(text.contains("NVIDIA A30: 2423.23 t/s (avg)"));
        assert!(text.contains("NVIDIA L40S: 7907.81 t/s (avg)"));
    }

    #[test]
    fn best_performer_ties_keep_first_occurrence() {
        let reports = vec![report(
            "r.md",
            "node1",
            Some("NVIDIA A30"),
            Some(1),
            vec![
                result(ConfigKind::SingleGpu, 0, 100.0, 50.0),
                result(ConfigKind::DualGpu, 1, 100.0, 50.0),
            ],
        )];
        let text = render(&reports);
        let findings = text.split("KEY FINDINGS").nth(1).unwrap();
        assert!(findings.contains("(Single GPU)"));
        assert!(!findings.contains("(Dual GPU)\n   100.00 t/s"));
    }
}
