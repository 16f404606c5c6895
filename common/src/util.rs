use eyre::Result;
use regex::Regex;

/// Arithmetic mean, defined as 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Translates a simple filename glob (`*` wildcards only) into an anchored
/// regex for directory filtering.
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let escaped = regex::escape(pattern).replace(r"\*", ".*");
    Ok(Regex::new(&format!("^{escaped}$"))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_matches_sum() {
        let values = [7.07, 7.12, 6.98, 7.31];
        let avg = mean(&values);
        assert!((avg * values.len() as f64 - values.iter().sum::<f64>()).abs() < 1e-9);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn glob_matches_report_names() {
        let re = glob_to_regex("benchmark_results*.md").unwrap();
        assert!(re.is_match("benchmark_results.md"));
        assert!(re.is_match("benchmark_results_orcaga02_1gpu.md"));
        assert!(!re.is_match("benchmark_results.md.bak"));
        assert!(!re.is_match("notes.md"));
    }
}
