//! Change classification
//!
//! Three independent stages driven entirely by [`CompiledRules`]:
//! category (functional area), severity (urgency) and significance
//! (whether an operator should see it at all).

pub mod category;
pub mod numeric;
pub mod severity;
pub mod significance;

pub use severity::SeverityBreakdown;
pub use significance::{SignificanceBreakdown, SignificanceReason};

use crate::rules::CompiledRules;
use crate::{Change, ClassifiedChange};

/// Classifies changes against one compiled rule set
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    rules: &'a CompiledRules,
}

impl<'a> Classifier<'a> {
    pub fn new(rules: &'a CompiledRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'a CompiledRules {
        self.rules
    }

    /// Attach category, severity and significance to a change
    pub fn classify(&self, change: Change) -> ClassifiedChange {
        let path = change.field_path.as_str();
        let from = change.previous_value.as_ref();
        let to = change.new_value.as_ref();

        let category = self.categorize(path);
        let severity = self.determine_severity(path, change.kind, from, to);
        let significant = self.is_significant(path, change.kind, category, severity, from, to);

        ClassifiedChange {
            category: category.to_string(),
            severity,
            significant,
            change,
        }
    }

    pub fn classify_all(&self, changes: Vec<Change>) -> Vec<ClassifiedChange> {
        changes.into_iter().map(|c| self.classify(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleSet;
    use crate::{ChangeKind, PathSegment, Severity};
    use serde_json::json;

    fn field_path(path: &str) -> Vec<PathSegment> {
        path.split('.').map(|s| PathSegment::Field(s.to_string())).collect()
    }

    #[test]
    fn test_classify_os_version_update() {
        let rules = CompiledRules::compile(&RuleSet::builtin().unwrap()).unwrap();
        let classifier = Classifier::new(&rules);

        let change = Change::new(
            field_path("os.version"),
            ChangeKind::Update,
            Some(json!("20.04")),
            Some(json!("22.04")),
        );
        let classified = classifier.classify(change);

        assert_eq!(classified.category, "os");
        assert_eq!(classified.severity, Severity::High);
        assert!(classified.significant);
        assert_eq!(classified.field_path(), "os.version");
    }

    #[test]
    fn test_classify_metrics_timestamp() {
        let rules = CompiledRules::compile(&RuleSet::builtin().unwrap()).unwrap();
        let classifier = Classifier::new(&rules);

        let change = Change::new(
            field_path("metrics.timestamp"),
            ChangeKind::Update,
            Some(json!("t1")),
            Some(json!("t2")),
        );
        let classified = classifier.classify(change);

        assert_eq!(classified.category, "system");
        assert!(!classified.significant);
    }

    #[test]
    fn test_classify_all_keeps_order() {
        let rules = CompiledRules::compile(&RuleSet::builtin().unwrap()).unwrap();
        let classifier = Classifier::new(&rules);

        let changes = vec![
            Change::new(field_path("b"), ChangeKind::Create, None, Some(json!(1))),
            Change::new(field_path("a"), ChangeKind::Delete, Some(json!(1)), None),
        ];
        let classified = classifier.classify_all(changes);
        assert_eq!(classified[0].field_path(), "b");
        assert_eq!(classified[1].field_path(), "a");
        assert!(classified.iter().all(|c| !c.category.is_empty()));
    }
}
