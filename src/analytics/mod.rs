//! Aggregate analytics over classified changes
//!
//! Everything here is a pure function of its input; nothing is cached.

pub mod grouping;
pub mod trends;

pub use grouping::{group_key, group_related_changes, OPERATING_SYSTEM_GROUP};
pub use trends::{analyze_trends, change_patterns, ChangePatterns, TrendSummary};

use crate::diff::validate_field_path;
use crate::{ChangeKind, ClassifiedChange, Severity};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Path fragments of fields that change on nearly every snapshot
pub const NOISY_PATTERNS: &[&str] = &[
    "timestamp",
    "uptime",
    "memory.used",
    "arp_macs",
    "performance",
    "metrics",
];

/// Deletions under paths containing this marker are not anomalous
pub const TEMPORARY_MARKER: &str = "temporary";

/// Number of root paths reported in [`AnalyticsSummary`]
pub const SUMMARY_TOP_PATHS: usize = 10;

/// Percentage of `count` in `total`, 0 for an empty total
pub(crate) fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// A root path and how many changes fell under it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathFrequency {
    pub path: String,
    pub count: usize,
}

/// Metrics over one change set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_changes: usize,
    pub category_distribution: BTreeMap<String, usize>,
    pub severity_distribution: BTreeMap<Severity, usize>,
    pub type_distribution: BTreeMap<ChangeKind, usize>,
    pub noisiness: f64,
    pub health_score: f64,
    pub anomaly_count: usize,
    pub anomalies: Vec<ClassifiedChange>,
    pub top_changed_paths: Vec<PathFrequency>,
}

/// Percentage of noisy changes.
///
/// A change counts once for a noisy path and once more for low severity,
/// so the result can exceed 100.
pub fn noisiness(changes: &[ClassifiedChange]) -> f64 {
    if changes.is_empty() {
        return 0.0;
    }

    let mut noisy = 0usize;
    for change in changes {
        let path = change.field_path().to_lowercase();
        if NOISY_PATTERNS.iter().any(|p| path.contains(p)) {
            noisy += 1;
        }
        if change.severity == Severity::Low {
            noisy += 1;
        }
    }

    ratio(noisy, changes.len())
}

/// 100 minus a per-change penalty by severity, floored at 0
pub fn health_score(changes: &[ClassifiedChange]) -> f64 {
    let penalty: f64 = changes.iter().map(|c| c.severity.health_penalty()).sum();
    (100.0 - penalty).max(0.0)
}

fn is_anomalous(change: &ClassifiedChange) -> bool {
    if change.severity == Severity::Critical {
        return true;
    }

    match change.kind() {
        ChangeKind::Delete => !change.field_path().contains(TEMPORARY_MARKER),
        ChangeKind::Update => group_key(&change.change.path) == OPERATING_SYSTEM_GROUP,
        ChangeKind::Create => false,
    }
}

/// Critical changes, non-temporary deletions and OS updates
pub fn detect_anomalies(changes: &[ClassifiedChange]) -> Vec<&ClassifiedChange> {
    changes.iter().filter(|c| is_anomalous(c)).collect()
}

/// Change counts per root path, most changed first.
///
/// `limit == 0` returns every path. Equal counts are ordered by path.
pub fn top_changed_paths(changes: &[ClassifiedChange], limit: usize) -> Vec<PathFrequency> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for change in changes {
        *counts.entry(change.change.root_segment()).or_insert(0) += 1;
    }

    let mut frequencies: Vec<PathFrequency> = counts
        .into_iter()
        .map(|(path, count)| PathFrequency { path, count })
        .collect();
    // stable sort keeps the path order from the BTreeMap among equal counts
    frequencies.sort_by(|a, b| b.count.cmp(&a.count));

    if limit > 0 {
        frequencies.truncate(limit);
    }
    frequencies
}

/// Full metrics for a change set
pub fn summarize(changes: &[ClassifiedChange]) -> AnalyticsSummary {
    let (category_distribution, severity_distribution, type_distribution) =
        trends::distributions(changes);
    let anomalies: Vec<ClassifiedChange> = detect_anomalies(changes).into_iter().cloned().collect();

    AnalyticsSummary {
        total_changes: changes.len(),
        category_distribution,
        severity_distribution,
        type_distribution,
        noisiness: noisiness(changes),
        health_score: health_score(changes),
        anomaly_count: anomalies.len(),
        anomalies,
        top_changed_paths: top_changed_paths(changes, SUMMARY_TOP_PATHS),
    }
}

/// Changes whose category is listed; an empty list keeps everything
pub fn filter_by_category<'a, S: AsRef<str>>(
    changes: &'a [ClassifiedChange],
    categories: &[S],
) -> Vec<&'a ClassifiedChange> {
    if categories.is_empty() {
        return changes.iter().collect();
    }
    changes
        .iter()
        .filter(|c| categories.iter().any(|cat| cat.as_ref() == c.category))
        .collect()
}

/// Changes whose severity is listed; an empty list keeps everything
pub fn filter_by_severity<'a>(
    changes: &'a [ClassifiedChange],
    severities: &[Severity],
) -> Vec<&'a ClassifiedChange> {
    if severities.is_empty() {
        return changes.iter().collect();
    }
    changes
        .iter()
        .filter(|c| severities.contains(&c.severity))
        .collect()
}

/// One-line summary for logs, e.g.
/// `Total: 3 changes | Categories: os: 2, network: 1 | Severities: high: 1, low: 2`
pub fn format_summary(changes: &[ClassifiedChange]) -> String {
    if changes.is_empty() {
        return "No differences found".to_string();
    }

    let (categories, severities, _) = trends::distributions(changes);

    let categories = categories
        .iter()
        .map(|(category, count)| format!("{}: {}", category, count))
        .collect::<Vec<_>>()
        .join(", ");
    let severities = Severity::BY_PRIORITY
        .iter()
        .filter_map(|s| severities.get(s).map(|count| format!("{}: {}", s, count)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Total: {} changes | Categories: {} | Severities: {}",
        changes.len(),
        categories,
        severities
    )
}

/// Problems in a change set: duplicate paths, malformed paths, empty categories
pub fn validate_consistency(changes: &[ClassifiedChange]) -> Vec<String> {
    let mut issues = Vec::new();

    let mut seen = HashSet::new();
    for change in changes {
        if !seen.insert(change.field_path()) {
            issues.push(format!("Duplicate field path: {}", change.field_path()));
        }
    }

    for change in changes {
        if let Err(e) = validate_field_path(change.field_path()) {
            issues.push(format!("Invalid field path {}: {}", change.field_path(), e));
        }
    }

    for change in changes {
        if change.category.trim().is_empty() {
            issues.push(format!("Missing category for field path: {}", change.field_path()));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Change, PathSegment};
    use serde_json::json;

    fn change(path: &str, kind: ChangeKind, severity: Severity) -> ClassifiedChange {
        ClassifiedChange {
            change: Change::new(
                path.split('.').map(|s| PathSegment::Field(s.to_string())).collect(),
                kind,
                Some(json!(1)),
                Some(json!(2)),
            ),
            category: "system".to_string(),
            severity,
            significant: true,
        }
    }

    #[test]
    fn test_health_score_bounds() {
        assert_eq!(health_score(&[]), 100.0);

        let critical: Vec<_> = (0..11)
            .map(|i| change(&format!("c{}", i), ChangeKind::Update, Severity::Critical))
            .collect();
        assert_eq!(health_score(&critical), 0.0);

        let mixed = vec![
            change("a", ChangeKind::Update, Severity::High),
            change("b", ChangeKind::Update, Severity::Medium),
            change("c", ChangeKind::Update, Severity::Low),
        ];
        assert_eq!(health_score(&mixed), 92.0);
    }

    #[test]
    fn test_noisiness_double_counts() {
        assert_eq!(noisiness(&[]), 0.0);

        let changes = vec![change("metrics.timestamp", ChangeKind::Update, Severity::Low)];
        assert_eq!(noisiness(&changes), 200.0);

        let changes = vec![
            change("system_uptime", ChangeKind::Update, Severity::Medium),
            change("os.version", ChangeKind::Update, Severity::High),
        ];
        assert_eq!(noisiness(&changes), 50.0);
    }

    #[test]
    fn test_detect_anomalies() {
        let changes = vec![
            change("a.b", ChangeKind::Create, Severity::Critical),
            change("disk.sda", ChangeKind::Delete, Severity::Medium),
            change("cache.temporary.file", ChangeKind::Delete, Severity::Low),
            change("os.release", ChangeKind::Update, Severity::Medium),
            change("facts.distro.version", ChangeKind::Update, Severity::High),
            change("name", ChangeKind::Update, Severity::Medium),
            change("os.extra", ChangeKind::Create, Severity::Low),
        ];
        let anomalies: Vec<&str> = detect_anomalies(&changes)
            .iter()
            .map(|c| c.field_path())
            .collect();
        assert_eq!(
            anomalies,
            vec!["a.b", "disk.sda", "os.release", "facts.distro.version"]
        );
    }

    #[test]
    fn test_top_changed_paths() {
        let changes = vec![
            change("os.version", ChangeKind::Update, Severity::High),
            change("os.release", ChangeKind::Update, Severity::High),
            change("network.ip", ChangeKind::Update, Severity::Low),
            change("features.a", ChangeKind::Update, Severity::Low),
            change("features.b", ChangeKind::Update, Severity::Low),
            change("features.c", ChangeKind::Update, Severity::Low),
        ];

        let top = top_changed_paths(&changes, 0);
        assert_eq!(
            top,
            vec![
                PathFrequency { path: "features".into(), count: 3 },
                PathFrequency { path: "os".into(), count: 2 },
                PathFrequency { path: "network".into(), count: 1 },
            ]
        );
        assert_eq!(top_changed_paths(&changes, 1).len(), 1);
    }

    #[test]
    fn test_filters() {
        let mut network = change("networking.fqdn", ChangeKind::Update, Severity::High);
        network.category = "network".to_string();
        let changes = vec![
            network,
            change("a", ChangeKind::Update, Severity::Low),
        ];

        assert_eq!(filter_by_category(&changes, &["network"]).len(), 1);
        assert_eq!(filter_by_category::<&str>(&changes, &[]).len(), 2);
        assert_eq!(filter_by_severity(&changes, &[Severity::Low]).len(), 1);
        assert_eq!(filter_by_severity(&changes, &[]).len(), 2);
    }

    #[test]
    fn test_format_summary() {
        assert_eq!(format_summary(&[]), "No differences found");

        let mut os = change("os.version", ChangeKind::Update, Severity::High);
        os.category = "os".to_string();
        let changes = vec![os, change("x", ChangeKind::Create, Severity::Low)];
        assert_eq!(
            format_summary(&changes),
            "Total: 2 changes | Categories: os: 1, system: 1 | Severities: high: 1, low: 1"
        );
    }

    #[test]
    fn test_validate_consistency() {
        let mut blank = change("b", ChangeKind::Update, Severity::Low);
        blank.category = String::new();
        let changes = vec![
            change("a", ChangeKind::Update, Severity::Low),
            change("a", ChangeKind::Update, Severity::Low),
            blank,
        ];
        let issues = validate_consistency(&changes);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("Duplicate field path: a"));
        assert!(issues[1].contains("Missing category"));
    }

    #[test]
    fn test_summarize() {
        let changes = vec![
            change("os.version", ChangeKind::Update, Severity::High),
            change("metrics.timestamp", ChangeKind::Update, Severity::Low),
        ];
        let summary = summarize(&changes);
        assert_eq!(summary.total_changes, 2);
        assert_eq!(summary.health_score, 94.0);
        assert_eq!(summary.anomaly_count, 1);
        assert_eq!(summary.anomalies[0].field_path(), "os.version");
        assert_eq!(summary.noisiness, 100.0);
        assert_eq!(summary.top_changed_paths.len(), 2);
        assert_eq!(summary.severity_distribution[&Severity::High], 1);
    }
}
