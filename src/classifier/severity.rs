//! Severity determination

use super::numeric::is_significant_numeric_change;
use super::Classifier;
use crate::analytics::ratio;
use crate::config::SeverityCondition;
use crate::{ChangeKind, Severity};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

impl<'a> Classifier<'a> {
    /// Severity of a change.
    ///
    /// Levels are checked critical → high → medium → low against the patterns
    /// registered for `kind`; the first match wins. With no match, a numeric
    /// change beyond 20% is medium, anything else gets the default level.
    pub fn determine_severity(
        &self,
        field_path: &str,
        kind: ChangeKind,
        from: Option<&Value>,
        to: Option<&Value>,
    ) -> Severity {
        let path_lower = field_path.to_lowercase();

        for matcher in self.rules.severity_matchers() {
            if matcher.matches(kind, &path_lower) {
                debug!(
                    field_path,
                    change_type = %kind,
                    severity = %matcher.level,
                    "severity determined by pattern match"
                );
                return matcher.level;
            }
        }

        if is_significant_numeric_change(from, to) {
            debug!(
                field_path,
                change_type = %kind,
                severity = %Severity::Medium,
                "severity determined by numeric change"
            );
            return Severity::Medium;
        }

        let default = self.rules.default_severity();
        debug!(
            field_path,
            change_type = %kind,
            severity = %default,
            "severity assigned default level"
        );
        default
    }

    /// Description of a level; unknown names get the default description
    pub fn severity_description(&self, level: &str) -> &'a str {
        let severity = &self.rules.rules().severity;
        match level.parse::<Severity>() {
            Ok(level) => &severity.level(level).description,
            Err(_) => &severity.default.description,
        }
    }

    /// Every level with its description, most severe first
    pub fn all_severity_levels(&self) -> Vec<(Severity, String)> {
        let severity = &self.rules.rules().severity;
        Severity::BY_PRIORITY
            .iter()
            .map(|level| (*level, severity.level(*level).description.clone()))
            .collect()
    }

    /// Raw conditions declared for a level
    pub fn severity_conditions(&self, level: Severity) -> &'a [SeverityCondition] {
        &self.rules.rules().severity.level(level).conditions
    }
}

/// Distribution of severities over a set of changes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityBreakdown {
    pub distribution: BTreeMap<Severity, usize>,
    pub percentages: BTreeMap<Severity, f64>,
    /// Most frequent level; ties go to the more severe one
    pub most_common: Option<Severity>,
    pub total_changes: usize,
}

pub fn severity_breakdown(severities: &[Severity]) -> SeverityBreakdown {
    let total = severities.len();

    let mut distribution = BTreeMap::new();
    for severity in severities {
        *distribution.entry(*severity).or_insert(0) += 1;
    }

    let percentages = distribution
        .iter()
        .map(|(severity, count)| (*severity, ratio(*count, total)))
        .collect();

    let mut most_common = None;
    let mut max_count = 0;
    for level in Severity::BY_PRIORITY {
        let count = distribution.get(&level).copied().unwrap_or(0);
        if count > max_count {
            max_count = count;
            most_common = Some(level);
        }
    }

    SeverityBreakdown {
        distribution,
        percentages,
        most_common,
        total_changes: total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleSet;
    use crate::rules::CompiledRules;
    use serde_json::json;

    fn builtin() -> CompiledRules {
        CompiledRules::compile(&RuleSet::builtin().unwrap()).unwrap()
    }

    fn custom(doc: &str) -> CompiledRules {
        let doc = format!(
            "{}\nlimits:\n  max_diff_depth: 10\n  max_diffs_per_run: 100\n  max_field_path_length: 200\ntrends:\n  window_hours: 1\n  min_occurrences: 1\n",
            doc
        );
        CompiledRules::compile(&RuleSet::from_yaml(&doc).unwrap()).unwrap()
    }

    #[test]
    fn test_pattern_levels() {
        let rules = builtin();
        let classifier = Classifier::new(&rules);

        assert_eq!(
            classifier.determine_severity("facts.processors", ChangeKind::Delete, None, None),
            Severity::Critical
        );
        assert_eq!(
            classifier.determine_severity(
                "facts.distro.version",
                ChangeKind::Update,
                Some(&json!("9.3")),
                Some(&json!("9.4"))
            ),
            Severity::High
        );
        assert_eq!(
            classifier.determine_severity(
                "facts.features.docker.enabled",
                ChangeKind::Update,
                Some(&json!(false)),
                Some(&json!(true))
            ),
            Severity::Medium
        );
        assert_eq!(
            classifier.determine_severity(
                "facts.memory.system.used_bytes",
                ChangeKind::Update,
                Some(&json!(1000)),
                Some(&json!(1010))
            ),
            Severity::Low
        );
    }

    #[test]
    fn test_patterns_only_apply_to_their_kind() {
        let rules = builtin();
        let classifier = Classifier::new(&rules);

        // facts.processors is only critical on delete
        assert_eq!(
            classifier.determine_severity(
                "facts.processors.count",
                ChangeKind::Update,
                Some(&json!("x")),
                Some(&json!("y"))
            ),
            Severity::Medium
        );
        assert_eq!(
            classifier.determine_severity("FACTS.PROCESSORS", ChangeKind::Delete, None, None),
            Severity::Critical
        );
    }

    #[test]
    fn test_critical_beats_high() {
        let rules = custom(
            "severity:\n  critical:\n    conditions:\n      - change_type: update\n        patterns: ['kernel']\n  high:\n    conditions:\n      - change_type: update\n        patterns: ['kernel']\n  default:\n    level: low\n",
        );
        let classifier = Classifier::new(&rules);
        assert_eq!(
            classifier.determine_severity("kernel.version", ChangeKind::Update, None, None),
            Severity::Critical
        );
    }

    #[test]
    fn test_numeric_fallback() {
        let rules = custom("severity:\n  default:\n    level: low\n");
        let classifier = Classifier::new(&rules);

        assert_eq!(
            classifier.determine_severity(
                "stats.count",
                ChangeKind::Update,
                Some(&json!(100)),
                Some(&json!(125))
            ),
            Severity::Medium
        );
        assert_eq!(
            classifier.determine_severity(
                "stats.count",
                ChangeKind::Update,
                Some(&json!(100)),
                Some(&json!(110))
            ),
            Severity::Low
        );
        assert_eq!(
            classifier.determine_severity(
                "stats.count",
                ChangeKind::Update,
                Some(&json!("0")),
                Some(&json!("3"))
            ),
            Severity::Medium
        );
    }

    #[test]
    fn test_unmatched_gets_default() {
        let rules = builtin();
        let classifier = Classifier::new(&rules);
        assert_eq!(
            classifier.determine_severity(
                "whatever.field",
                ChangeKind::Update,
                Some(&json!("a")),
                Some(&json!("b"))
            ),
            Severity::Medium
        );
    }

    #[test]
    fn test_descriptions() {
        let rules = builtin();
        let classifier = Classifier::new(&rules);

        assert_eq!(
            classifier.severity_description("CRITICAL"),
            "Critical changes requiring immediate attention"
        );
        assert_eq!(
            classifier.severity_description("unknown"),
            "Default severity for unclassified changes"
        );

        let levels = classifier.all_severity_levels();
        assert_eq!(levels.len(), 4);
        assert_eq!(levels[0].0, Severity::Critical);

        let conditions = classifier.severity_conditions(Severity::High);
        assert_eq!(conditions.len(), 3);
        assert_eq!(conditions[0].change_type, "update");
    }

    #[test]
    fn test_breakdown() {
        let breakdown = severity_breakdown(&[
            Severity::Low,
            Severity::High,
            Severity::Low,
            Severity::High,
            Severity::Medium,
        ]);
        assert_eq!(breakdown.total_changes, 5);
        assert_eq!(breakdown.distribution[&Severity::Low], 2);
        assert_eq!(breakdown.percentages[&Severity::Medium], 20.0);
        // tie between high and low
        assert_eq!(breakdown.most_common, Some(Severity::High));

        let empty = severity_breakdown(&[]);
        assert_eq!(empty.most_common, None);
        assert!(empty.percentages.is_empty());
    }
}
