//! Deterministic baseline risk scoring
//!
//! Pure functions of finding fields. The final blend depends on the
//! model's priority rank, so it lives here next to the base inputs but
//! is applied by the reconciler after the model call.

use crate::model::{Finding, Severity};

/// Highest possible priority adjustment is (10 - 1) * 2 = 18
const MIN_PRIORITY_RANK: i32 = 1;
const MAX_PRIORITY_RANK: i32 = 10;

/// Base risk score for a severity level
pub fn severity_base_score(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 95.0,
        Severity::High => 75.0,
        Severity::Medium => 50.0,
        Severity::Low => 25.0,
        Severity::Info => 10.0,
    }
}

/// Exploitability multiplier from contextual signals, capped at 1.5
pub fn exploitability_factor(finding: &Finding) -> f64 {
    let mut factor: f64 = 1.0;

    // CVE presence increases exploitability
    if finding.cve_id.is_some() {
        factor += 0.2;
    }

    // Known vulnerable packages are more exploitable
    if finding.package_name.is_some() && finding.package_version.is_some() {
        factor += 0.1;
    }

    // Code-level findings with file paths are more actionable
    if finding.file_path.is_some() {
        factor += 0.05;
    }

    factor.min(1.5)
}

/// Clamp a model-supplied priority rank into its valid 1-10 range
pub fn clamp_priority_rank(rank: i32) -> i32 {
    rank.clamp(MIN_PRIORITY_RANK, MAX_PRIORITY_RANK)
}

/// Blend the deterministic baseline with the model's priority rank.
/// `adjustment = (10 - rank) * 2`, result clamped to [0, 100].
pub fn final_risk_score(base: f64, factor: f64, priority_rank: i32) -> i32 {
    let rank = clamp_priority_rank(priority_rank);
    let adjustment = (MAX_PRIORITY_RANK - rank) * 2;
    let raw = (base * factor).round() as i32 + adjustment;
    raw.clamp(0, 100)
}
