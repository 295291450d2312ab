//! Significance filtering

use super::numeric::is_below_threshold;
use super::Classifier;
use crate::analytics::ratio;
use crate::{ChangeKind, ClassifiedChange, Severity};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Which rule decided a change's significance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceReason {
    AlwaysSignificant,
    NeverSignificant,
    TimeFiltered,
    ValueFiltered,
    Default,
}

impl SignificanceReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignificanceReason::AlwaysSignificant => "always_significant",
            SignificanceReason::NeverSignificant => "never_significant",
            SignificanceReason::TimeFiltered => "time_filtered",
            SignificanceReason::ValueFiltered => "value_filtered",
            SignificanceReason::Default => "default",
        }
    }
}

impl std::fmt::Display for SignificanceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'a> Classifier<'a> {
    /// Whether a change is worth surfacing
    pub fn is_significant(
        &self,
        field_path: &str,
        kind: ChangeKind,
        category: &str,
        severity: Severity,
        from: Option<&Value>,
        to: Option<&Value>,
    ) -> bool {
        let reason = self.significance_reason(field_path, kind, category, severity, from, to);
        let significant = match reason {
            SignificanceReason::AlwaysSignificant => true,
            SignificanceReason::Default => self.rules.default_significance(),
            _ => false,
        };
        debug!(field_path, reason = %reason, significant, "significance decided");
        significant
    }

    /// The first rule that decides significance, in order:
    /// always-significant, never-significant, time filter, value filter, default.
    pub fn significance_reason(
        &self,
        field_path: &str,
        kind: ChangeKind,
        category: &str,
        severity: Severity,
        from: Option<&Value>,
        to: Option<&Value>,
    ) -> SignificanceReason {
        let path_lower = field_path.to_lowercase();

        if self
            .rules
            .always_significant()
            .iter()
            .any(|p| p.matches(&path_lower, kind, category, severity))
        {
            return SignificanceReason::AlwaysSignificant;
        }

        if self
            .rules
            .never_significant()
            .iter()
            .any(|p| p.matches(&path_lower, kind, category, severity))
        {
            return SignificanceReason::NeverSignificant;
        }

        if self
            .rules
            .time_filters()
            .iter()
            .any(|f| f.pattern.is_match(&path_lower))
        {
            return SignificanceReason::TimeFiltered;
        }

        // the first filter whose pattern matches decides
        if let Some(filter) = self
            .rules
            .value_filters()
            .iter()
            .find(|f| f.pattern.is_match(&path_lower))
        {
            if is_below_threshold(from, to, filter.threshold_percent) {
                return SignificanceReason::ValueFiltered;
            }
        }

        SignificanceReason::Default
    }

    /// Count which rule decided each change
    pub fn significance_breakdown(&self, changes: &[ClassifiedChange]) -> SignificanceBreakdown {
        let mut counts = SignificanceCounts {
            total: changes.len(),
            ..Default::default()
        };

        for change in changes {
            let reason = self.significance_reason(
                change.field_path(),
                change.kind(),
                &change.category,
                change.severity,
                change.change.previous_value.as_ref(),
                change.change.new_value.as_ref(),
            );
            match reason {
                SignificanceReason::AlwaysSignificant => {
                    counts.always_significant += 1;
                    counts.significant += 1;
                }
                SignificanceReason::NeverSignificant => counts.never_significant += 1,
                SignificanceReason::TimeFiltered => counts.time_filtered += 1,
                SignificanceReason::ValueFiltered => counts.value_filtered += 1,
                SignificanceReason::Default => {
                    if self.rules.default_significance() {
                        counts.default_significant += 1;
                        counts.significant += 1;
                    }
                }
            }
        }

        let filtered = counts.never_significant + counts.time_filtered + counts.value_filtered;
        SignificanceBreakdown {
            noise_reduction: ratio(filtered, counts.total),
            significance_rate: ratio(counts.significant, counts.total),
            counts,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignificanceCounts {
    pub total: usize,
    pub significant: usize,
    pub always_significant: usize,
    pub never_significant: usize,
    pub time_filtered: usize,
    pub value_filtered: usize,
    pub default_significant: usize,
}

/// How significance decisions were distributed over a change set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignificanceBreakdown {
    pub counts: SignificanceCounts,
    /// Percentage of changes suppressed by never/time/value rules
    pub noise_reduction: f64,
    pub significance_rate: f64,
}
