use serde::{Deserialize, Serialize};

use crate::util::mean;

/// The two throughput test kinds llama-bench reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// `pp<N>` rows, prompt processing.
    Prompt,
    /// `tg<N>` rows, text generation.
    Generation,
}

/// One extracted throughput observation before averaging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurement {
    pub kind: MetricKind,
    pub tokens_per_sec: f64,
}

/// Classification cue for one `## Test` section.
#[derive(Debug, Clone)]
pub struct SectionCue {
    title: String,
    accel_init_failed: bool,
}

impl SectionCue {
    pub fn new(title: &str, accel_init_failed: bool) -> Self {
        Self {
            title: title.to_lowercase(),
            accel_init_failed,
        }
    }
}

/// The closed set of configuration labels a section heading can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigKind {
    CpuOnly,
    GpuPartial,
    GpuFull,
    SingleGpu,
    DualGpu,
    QuadGpuBalanced,
    QuadGpuCustom,
    QuadGpu,
    Unknown,
}

/// Ordered classification rules, first match wins. The fallthrough to
/// [`ConfigKind::Unknown`] keeps classification total.
const RULES: &[(fn(&SectionCue) -> bool, ConfigKind)] = &[
    (
        |c| c.accel_init_failed || c.title.contains("cpu-only") || c.title.contains("cpu only"),
        ConfigKind::CpuOnly,
    ),
    (|c| c.title.contains("partial"), ConfigKind::GpuPartial),
    (|c| c.title.contains("full"), ConfigKind::GpuFull),
    (|c| c.title.contains("single gpu"), ConfigKind::SingleGpu),
    (|c| c.title.contains("dual gpu"), ConfigKind::DualGpu),
    (
        |c| c.title.contains("quad gpu") && c.title.contains("balanced"),
        ConfigKind::QuadGpuBalanced,
    ),
    (
        |c| c.title.contains("quad gpu") && c.title.contains("custom"),
        ConfigKind::QuadGpuCustom,
    ),
    (|c| c.title.contains("quad gpu"), ConfigKind::QuadGpu),
];

impl ConfigKind {
    pub fn classify(cue: &SectionCue) -> Self {
        RULES
            .iter()
            .find(|(matches, _)| matches(cue))
            .map(|(_, kind)| *kind)
            .unwrap_or(ConfigKind::Unknown)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfigKind::CpuOnly => "CPU-Only",
            ConfigKind::GpuPartial => "GPU Partial",
            ConfigKind::GpuFull => "GPU Full",
            ConfigKind::SingleGpu => "Single GPU",
            ConfigKind::DualGpu => "Dual GPU",
            ConfigKind::QuadGpuBalanced => "Quad GPU (Balanced)",
            ConfigKind::QuadGpuCustom => "Quad GPU (Custom)",
            ConfigKind::QuadGpu => "Quad GPU",
            ConfigKind::Unknown => "Unknown",
        }
    }

    /// Accelerator-free configurations serve as the speedup baseline.
    pub fn is_cpu_only(&self) -> bool {
        matches!(self, ConfigKind::CpuOnly)
    }

    /// The single-accelerator class for the scaling comparison.
    pub fn is_single_gpu_class(&self) -> bool {
        matches!(self, ConfigKind::SingleGpu | ConfigKind::GpuFull)
    }

    /// The multi-accelerator class for the scaling comparison.
    pub fn is_multi_gpu_class(&self) -> bool {
        matches!(
            self,
            ConfigKind::DualGpu
                | ConfigKind::QuadGpu
                | ConfigKind::QuadGpuBalanced
                | ConfigKind::QuadGpuCustom
        )
    }
}

/// One named test configuration with its averaged throughput values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResult {
    pub kind: ConfigKind,
    /// Position of the section in the source file, for stable display order.
    pub ordinal: usize,
    /// Average prompt-processing throughput in tokens/s, 0 when no rows matched.
    pub prompt_tps: f64,
    /// Average generation throughput in tokens/s, 0 when no rows matched.
    pub gen_tps: f64,
}

impl ConfigResult {
    /// Averages the section's measurements per kind. A section with no
    /// measurements of either kind contributes nothing.
    pub fn from_measurements(
        kind: ConfigKind,
        ordinal: usize,
        samples: &[RawMeasurement],
    ) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let values_of = |metric: MetricKind| {
            samples
                .iter()
                .filter(|s| s.kind == metric)
                .map(|s| s.tokens_per_sec)
                .collect::<Vec<_>>()
        };
        Some(Self {
            kind,
            ordinal,
            prompt_tps: mean(&values_of(MetricKind::Prompt)),
            gen_tps: mean(&values_of(MetricKind::Generation)),
        })
    }
}

/// One parsed benchmark report file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchReport {
    pub file: String,
    pub node: Option<String>,
    pub gpu_type: Option<String>,
    pub gpu_count: Option<u32>,
    pub results: Vec<ConfigResult>,
}

impl BenchReport {
    pub fn node_label(&self) -> &str {
        self.node.as_deref().unwrap_or("Unknown")
    }

    /// Accelerator column value for one of this report's results.
    pub fn gpu_label(&self, result: &ConfigResult) -> &str {
        if result.kind.is_cpu_only() {
            "CPU"
        } else {
            self.gpu_type.as_deref().unwrap_or("Unknown")
        }
    }
}
