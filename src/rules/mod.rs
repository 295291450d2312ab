//! Compiled rule set
//!
//! Every textual pattern in a [`RuleSet`] is compiled once into a [`Regex`]
//! and indexed by category, severity level × change kind, or significance
//! bucket. Matching afterwards only runs the prebuilt matchers.
//!
//! Significance patterns may be meta-patterns:
//! - `severity:(high|critical)` matches the change's severity
//! - `category:(hardware|network)` matches the change's category
//! - `change_type:delete` matches the change kind
//! - anything else is a regex over the field path

use crate::config::RuleSet;
use crate::error::PatternError;
use crate::{ChangeKind, Severity};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

/// Processing bounds in usable form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_diff_depth: usize,
    pub max_changes_per_run: usize,
    pub max_field_path_length: usize,
}

/// A category and its path matchers
#[derive(Debug, Clone)]
pub struct CompiledCategory {
    pub name: String,
    pub patterns: Vec<Regex>,
}

impl CompiledCategory {
    pub fn matches(&self, path_lower: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(path_lower))
    }
}

/// Path matchers for one severity level, keyed by change kind
#[derive(Debug, Clone)]
pub struct SeverityMatcher {
    pub level: Severity,
    by_kind: HashMap<ChangeKind, Vec<Regex>>,
}

impl SeverityMatcher {
    pub fn patterns(&self, kind: ChangeKind) -> &[Regex] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn matches(&self, kind: ChangeKind, path_lower: &str) -> bool {
        self.patterns(kind).iter().any(|p| p.is_match(path_lower))
    }
}

/// A compiled always/never significance pattern
#[derive(Debug, Clone)]
pub enum MetaPattern {
    /// `severity:(a|b)`
    Severity(Vec<String>),
    /// `category:(a|b)`
    Category(Vec<String>),
    /// `change_type:(a|b)`
    ChangeKind(Vec<String>),
    /// Regex over the field path
    Path(Regex),
}

impl MetaPattern {
    /// Compile one significance pattern. `bucket` names the list it came from.
    pub fn parse(raw: &str, bucket: &str) -> Result<Self, PatternError> {
        let lower = raw.trim().to_lowercase();

        if let Some(rest) = lower.strip_prefix("severity:") {
            return Ok(MetaPattern::Severity(alternatives(rest)));
        }
        if let Some(rest) = lower.strip_prefix("category:") {
            return Ok(MetaPattern::Category(alternatives(rest)));
        }
        if let Some(rest) = lower.strip_prefix("change_type:") {
            return Ok(MetaPattern::ChangeKind(alternatives(rest)));
        }

        compile_pattern(raw, || format!("{} significance", bucket)).map(MetaPattern::Path)
    }

    pub fn matches(
        &self,
        path_lower: &str,
        kind: ChangeKind,
        category: &str,
        severity: Severity,
    ) -> bool {
        match self {
            MetaPattern::Severity(alts) => one_of(alts, severity.as_str()),
            MetaPattern::Category(alts) => one_of(alts, category),
            MetaPattern::ChangeKind(alts) => one_of(alts, kind.as_str()),
            MetaPattern::Path(regex) => regex.is_match(path_lower),
        }
    }
}

/// `(a|b|c)` → `["a", "b", "c"]`; a bare value is a single alternative
fn alternatives(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split('|')
        .map(|alt| alt.trim().to_string())
        .filter(|alt| !alt.is_empty())
        .collect()
}

fn one_of(alternatives: &[String], value: &str) -> bool {
    alternatives.iter().any(|alt| alt.eq_ignore_ascii_case(value))
}

/// A frequently changing field family
#[derive(Debug, Clone)]
pub struct CompiledTimeFilter {
    pub pattern: Regex,
    pub window_seconds: u64,
}

/// A numeric noise threshold for matching paths
#[derive(Debug, Clone)]
pub struct CompiledValueFilter {
    pub pattern: Regex,
    pub threshold_percent: f64,
}

/// A rule set with all patterns compiled
///
/// Immutable once built. Reloading produces a new value.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    rules: RuleSet,
    categories: Vec<CompiledCategory>,
    severity: Vec<SeverityMatcher>,
    always_significant: Vec<MetaPattern>,
    never_significant: Vec<MetaPattern>,
    time_filters: Vec<CompiledTimeFilter>,
    value_filters: Vec<CompiledValueFilter>,
    default_severity: Severity,
    limits: Limits,
}

/// Compile a single pattern, case-insensitively
fn compile_pattern(
    pattern: &str,
    scope: impl FnOnce() -> String,
) -> Result<Regex, PatternError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| PatternError::InvalidRegex {
            scope: scope(),
            pattern: pattern.to_string(),
            source,
        })
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

impl CompiledRules {
    /// Compile every pattern of `rules`. Any bad pattern fails the whole set.
    pub fn compile(rules: &RuleSet) -> Result<Self, PatternError> {
        let mut categories = Vec::with_capacity(rules.categorization.categories.len());
        for (name, rule) in &rules.categorization.categories {
            let patterns = rule
                .patterns
                .iter()
                .map(|p| compile_pattern(p, || format!("category '{}'", name)))
                .collect::<Result<Vec<_>, _>>()?;
            categories.push(CompiledCategory {
                name: name.clone(),
                patterns,
            });
        }

        let mut severity = Vec::with_capacity(Severity::BY_PRIORITY.len());
        for level in Severity::BY_PRIORITY {
            let mut by_kind: HashMap<ChangeKind, Vec<Regex>> = HashMap::new();
            for condition in &rules.severity.level(level).conditions {
                let kind: ChangeKind =
                    condition
                        .change_type
                        .parse()
                        .map_err(|_| PatternError::UnknownChangeKind {
                            level: level.to_string(),
                            change_type: condition.change_type.clone(),
                        })?;
                for pattern in &condition.patterns {
                    let regex = compile_pattern(pattern, || {
                        format!("severity '{}' {}", level, kind)
                    })?;
                    by_kind.entry(kind).or_default().push(regex);
                }
            }
            severity.push(SeverityMatcher { level, by_kind });
        }

        let always_significant = rules
            .significance
            .always_significant
            .iter()
            .map(|p| MetaPattern::parse(p, "always"))
            .collect::<Result<Vec<_>, _>>()?;
        let never_significant = rules
            .significance
            .never_significant
            .iter()
            .map(|p| MetaPattern::parse(p, "never"))
            .collect::<Result<Vec<_>, _>>()?;

        let time_filters = rules
            .significance
            .time_filters
            .ignore_frequent
            .iter()
            .map(|f| {
                Ok(CompiledTimeFilter {
                    pattern: compile_pattern(&f.pattern, || "time filter".to_string())?,
                    window_seconds: f.window_seconds,
                })
            })
            .collect::<Result<Vec<_>, PatternError>>()?;
        let value_filters = rules
            .significance
            .value_filters
            .ignore_minor
            .iter()
            .map(|f| {
                Ok(CompiledValueFilter {
                    pattern: compile_pattern(&f.pattern, || "value filter".to_string())?,
                    threshold_percent: f.threshold_percent,
                })
            })
            .collect::<Result<Vec<_>, PatternError>>()?;

        Ok(Self {
            rules: rules.clone(),
            categories,
            severity,
            always_significant,
            never_significant,
            time_filters,
            value_filters,
            default_severity: rules.default_severity(),
            limits: Limits {
                max_diff_depth: to_usize(rules.limits.max_diff_depth),
                max_changes_per_run: to_usize(rules.limits.max_diffs_per_run),
                max_field_path_length: to_usize(rules.limits.max_field_path_length),
            },
        })
    }

    /// The rule document these matchers were compiled from
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Categories in declaration order
    pub fn categories(&self) -> &[CompiledCategory] {
        &self.categories
    }

    /// Severity matchers in priority order (critical first)
    pub fn severity_matchers(&self) -> &[SeverityMatcher] {
        &self.severity
    }

    pub fn always_significant(&self) -> &[MetaPattern] {
        &self.always_significant
    }

    pub fn never_significant(&self) -> &[MetaPattern] {
        &self.never_significant
    }

    pub fn time_filters(&self) -> &[CompiledTimeFilter] {
        &self.time_filters
    }

    pub fn value_filters(&self) -> &[CompiledValueFilter] {
        &self.value_filters
    }

    pub fn default_category(&self) -> &str {
        &self.rules.categorization.default.name
    }

    pub fn default_severity(&self) -> Severity {
        self.default_severity
    }

    pub fn default_significance(&self) -> bool {
        self.rules.significance.default.significant
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Total number of compiled matchers
    pub fn pattern_count(&self) -> usize {
        let categories: usize = self.categories.iter().map(|c| c.patterns.len()).sum();
        let severity: usize = self
            .severity
            .iter()
            .flat_map(|m| m.by_kind.values())
            .map(Vec::len)
            .sum();
        categories
            + severity
            + self.always_significant.len()
            + self.never_significant.len()
            + self.time_filters.len()
            + self.value_filters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules_from(extra: &str) -> RuleSet {
        let doc = format!(
            "{}\nlimits:\n  max_diff_depth: 5\n  max_diffs_per_run: 10\n  max_field_path_length: 80\ntrends:\n  window_hours: 1\n  min_occurrences: 1\n",
            extra
        );
        RuleSet::from_yaml(&doc).unwrap()
    }

    #[test]
    fn test_compile_builtin() {
        let compiled = CompiledRules::compile(&RuleSet::builtin().unwrap()).unwrap();
        assert_eq!(compiled.categories().len(), 7);
        assert_eq!(compiled.categories()[0].name, "modules");
        assert_eq!(compiled.severity_matchers()[0].level, Severity::Critical);
        assert_eq!(compiled.severity_matchers()[3].level, Severity::Low);
        assert_eq!(compiled.limits().max_diff_depth, 10);
        assert!(compiled.pattern_count() > 40);
    }

    #[test]
    fn test_invalid_category_pattern_names_category() {
        let rules = rules_from("categorization:\n  broken:\n    patterns: ['facts\\.(unclosed']\n");
        let err = CompiledRules::compile(&rules).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("category 'broken'"), "{}", msg);
        assert!(msg.contains("facts\\.(unclosed"), "{}", msg);
    }

    #[test]
    fn test_invalid_severity_pattern_names_level_and_kind() {
        let rules = rules_from(
            "severity:\n  high:\n    conditions:\n      - change_type: update\n        patterns: ['[z-a]']\n",
        );
        let msg = CompiledRules::compile(&rules).unwrap_err().to_string();
        assert!(msg.contains("severity 'high' update"), "{}", msg);
    }

    #[test]
    fn test_unknown_change_type_rejected() {
        let rules = rules_from(
            "severity:\n  low:\n    conditions:\n      - change_type: rename\n        patterns: ['x']\n",
        );
        assert!(matches!(
            CompiledRules::compile(&rules),
            Err(PatternError::UnknownChangeKind { .. })
        ));
    }

    #[test]
    fn test_conditions_for_same_kind_accumulate() {
        let rules = rules_from(
            "severity:\n  medium:\n    conditions:\n      - change_type: update\n        patterns: ['alpha']\n      - change_type: Update\n        patterns: ['beta']\n",
        );
        let compiled = CompiledRules::compile(&rules).unwrap();
        let medium = &compiled.severity_matchers()[2];
        assert_eq!(medium.level, Severity::Medium);
        assert!(medium.matches(ChangeKind::Update, "x.alpha"));
        assert!(medium.matches(ChangeKind::Update, "x.beta"));
        assert!(!medium.matches(ChangeKind::Create, "x.beta"));
    }

    #[test]
    fn test_meta_pattern_alternation() {
        let pattern = MetaPattern::parse("severity:(High|critical)", "always").unwrap();
        assert!(pattern.matches("a", ChangeKind::Update, "os", Severity::High));
        assert!(pattern.matches("a", ChangeKind::Update, "os", Severity::Critical));
        assert!(!pattern.matches("a", ChangeKind::Update, "os", Severity::Medium));

        let pattern = MetaPattern::parse("category:(hardware|network)", "always").unwrap();
        assert!(pattern.matches("a", ChangeKind::Create, "network", Severity::Low));
        assert!(!pattern.matches("a", ChangeKind::Create, "networking", Severity::Low));

        let pattern = MetaPattern::parse("change_type:delete", "always").unwrap();
        assert!(pattern.matches("a", ChangeKind::Delete, "os", Severity::Low));
        assert!(!pattern.matches("a", ChangeKind::Update, "os", Severity::Low));
    }

    #[test]
    fn test_meta_pattern_path_regex() {
        let pattern = MetaPattern::parse("Metrics\\.timestamp", "never").unwrap();
        assert!(matches!(pattern, MetaPattern::Path(_)));
        assert!(pattern.matches("metrics.timestamp", ChangeKind::Update, "system", Severity::Low));
        assert!(!pattern.matches("metrics.value", ChangeKind::Update, "system", Severity::Low));
    }

    #[test]
    fn test_bad_significance_pattern_fails_compile() {
        let rules = rules_from("significance:\n  never_significant: ['(']\n");
        let msg = CompiledRules::compile(&rules).unwrap_err().to_string();
        assert!(msg.contains("never significance"), "{}", msg);
    }

    #[test]
    fn test_compile_is_repeatable() {
        let rules = RuleSet::builtin().unwrap();
        let first = CompiledRules::compile(&rules).unwrap();
        let second = CompiledRules::compile(&rules).unwrap();
        assert_eq!(first.pattern_count(), second.pattern_count());
        assert_eq!(first.limits(), second.limits());
        for (a, b) in first.categories().iter().zip(second.categories()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.patterns.len(), b.patterns.len());
        }
    }
}
