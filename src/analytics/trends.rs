//! Distribution and pattern analysis

use super::ratio;
use crate::{ChangeKind, ClassifiedChange, Severity};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Recurring change shapes within a change set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangePatterns {
    pub critical_changes: usize,
    /// Paths mentioning `configuration` or `features`
    pub configuration_changes: usize,
    pub critical_ratio: f64,
    pub configuration_ratio: f64,
}

/// Distributions over a change set and their modes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSummary {
    pub total_changes: usize,
    pub category_distribution: BTreeMap<String, usize>,
    pub severity_distribution: BTreeMap<Severity, usize>,
    pub type_distribution: BTreeMap<ChangeKind, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_changed_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_type: Option<ChangeKind>,
    pub change_patterns: ChangePatterns,
}

pub(crate) fn distributions(
    changes: &[ClassifiedChange],
) -> (
    BTreeMap<String, usize>,
    BTreeMap<Severity, usize>,
    BTreeMap<ChangeKind, usize>,
) {
    let mut categories = BTreeMap::new();
    let mut severities = BTreeMap::new();
    let mut kinds = BTreeMap::new();
    for change in changes {
        *categories.entry(change.category.clone()).or_insert(0) += 1;
        *severities.entry(change.severity).or_insert(0) += 1;
        *kinds.entry(change.kind()).or_insert(0) += 1;
    }
    (categories, severities, kinds)
}

/// Key with the highest count; ties go to the key yielded first
fn mode<K>(candidates: impl IntoIterator<Item = (K, usize)>) -> Option<K> {
    let mut best: Option<(K, usize)> = None;
    for (key, count) in candidates {
        if count == 0 {
            continue;
        }
        if best.as_ref().map_or(true, |(_, max)| count > *max) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key)
}

pub fn change_patterns(changes: &[ClassifiedChange]) -> ChangePatterns {
    let critical_changes = changes
        .iter()
        .filter(|c| c.severity == Severity::Critical)
        .count();
    let configuration_changes = changes
        .iter()
        .filter(|c| {
            let path = c.field_path();
            path.contains("configuration") || path.contains("features")
        })
        .count();

    ChangePatterns {
        critical_changes,
        configuration_changes,
        critical_ratio: ratio(critical_changes, changes.len()),
        configuration_ratio: ratio(configuration_changes, changes.len()),
    }
}

/// Category, severity and change-kind distributions with their modes.
///
/// Mode ties resolve to the alphabetically first category, the more severe
/// level, and create → update → delete.
pub fn analyze_trends(changes: &[ClassifiedChange]) -> TrendSummary {
    let (category_distribution, severity_distribution, type_distribution) = distributions(changes);

    let most_changed_category = mode(
        category_distribution
            .iter()
            .map(|(category, count)| (category.clone(), *count)),
    );
    let dominant_severity = mode(
        Severity::BY_PRIORITY
            .iter()
            .map(|s| (*s, severity_distribution.get(s).copied().unwrap_or(0))),
    );
    let dominant_type = mode(
        ChangeKind::ALL
            .iter()
            .map(|k| (*k, type_distribution.get(k).copied().unwrap_or(0))),
    );

    let summary = TrendSummary {
        total_changes: changes.len(),
        category_distribution,
        severity_distribution,
        type_distribution,
        most_changed_category,
        dominant_severity,
        dominant_type,
        change_patterns: change_patterns(changes),
    };

    debug!(
        total_changes = summary.total_changes,
        most_changed_category = ?summary.most_changed_category,
        dominant_severity = ?summary.dominant_severity,
        "trend analysis completed"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Change, PathSegment};
    use serde_json::json;

    fn change(path: &str, kind: ChangeKind, category: &str, severity: Severity) -> ClassifiedChange {
        ClassifiedChange {
            change: Change::new(
                path.split('.').map(|s| PathSegment::Field(s.to_string())).collect(),
                kind,
                Some(json!(1)),
                Some(json!(2)),
            ),
            category: category.to_string(),
            severity,
            significant: true,
        }
    }

    #[test]
    fn test_empty_input() {
        let trends = analyze_trends(&[]);
        assert_eq!(trends.total_changes, 0);
        assert!(trends.most_changed_category.is_none());
        assert!(trends.dominant_severity.is_none());
        assert!(trends.dominant_type.is_none());
        assert_eq!(trends.change_patterns.critical_ratio, 0.0);
        assert_eq!(trends.change_patterns.configuration_ratio, 0.0);
    }

    #[test]
    fn test_distributions_and_modes() {
        let changes = vec![
            change("os.version", ChangeKind::Update, "os", Severity::High),
            change("kernel", ChangeKind::Update, "os", Severity::High),
            change("features.ssh", ChangeKind::Create, "features", Severity::Medium),
            change("processors", ChangeKind::Delete, "hardware", Severity::Critical),
        ];
        let trends = analyze_trends(&changes);

        assert_eq!(trends.total_changes, 4);
        assert_eq!(trends.category_distribution["os"], 2);
        assert_eq!(trends.severity_distribution[&Severity::High], 2);
        assert_eq!(trends.type_distribution[&ChangeKind::Update], 2);
        assert_eq!(trends.most_changed_category.as_deref(), Some("os"));
        assert_eq!(trends.dominant_severity, Some(Severity::High));
        assert_eq!(trends.dominant_type, Some(ChangeKind::Update));

        assert_eq!(trends.change_patterns.critical_changes, 1);
        assert_eq!(trends.change_patterns.configuration_changes, 1);
        assert_eq!(trends.change_patterns.critical_ratio, 25.0);
    }

    #[test]
    fn test_mode_ties() {
        let changes = vec![
            change("b", ChangeKind::Delete, "network", Severity::Low),
            change("a", ChangeKind::Create, "hardware", Severity::Critical),
        ];
        let trends = analyze_trends(&changes);
        assert_eq!(trends.most_changed_category.as_deref(), Some("hardware"));
        assert_eq!(trends.dominant_severity, Some(Severity::Critical));
        assert_eq!(trends.dominant_type, Some(ChangeKind::Create));
    }
}
