//! Diff engine facade
//!
//! Owns the active compiled rule set and runs diff → classify → analyze per
//! request. The rule set sits behind a single `Arc` swapped under a write
//! lock; requests clone the `Arc` and never hold the lock while working.

pub mod watch;

pub use watch::RulesWatcher;

use crate::analytics::{self, AnalyticsSummary, TrendSummary};
use crate::classifier::Classifier;
use crate::config::{self, rules_digest, RuleSet, RuleSource, SignificanceConfig};
use crate::diff::DiffComputer;
use crate::error::{DiffError, Result};
use crate::rules::{CompiledRules, Limits};
use crate::{ClassifiedChange, Severity};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// A compiled rule set with its provenance
#[derive(Debug)]
pub struct ActiveRules {
    pub compiled: CompiledRules,
    pub source: RuleSource,
    pub digest: String,
    pub loaded_at: DateTime<Utc>,
}

impl ActiveRules {
    fn new(rules: &RuleSet, source: RuleSource, digest: String) -> Result<Self> {
        Ok(Self {
            compiled: CompiledRules::compile(rules)?,
            source,
            digest,
            loaded_at: Utc::now(),
        })
    }

    fn load(path: Option<&Path>) -> Result<Self> {
        let loaded = config::load(path)?;
        Self::new(&loaded.rules, loaded.source, loaded.digest)
    }

    fn inline(rules: RuleSet) -> Result<Self> {
        let digest = rules_digest(&rules.to_yaml()?);
        Self::new(&rules, RuleSource::Inline, digest)
    }
}

/// Opaque identifiers of the entity and the two snapshots being compared
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSubject {
    pub entity_id: String,
    pub previous_id: String,
    pub current_id: String,
}

impl DiffSubject {
    pub fn new(
        entity_id: impl Into<String>,
        previous_id: impl Into<String>,
        current_id: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            previous_id: previous_id.into(),
            current_id: current_id.into(),
        }
    }
}

/// Result of one diff request
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub subject: DiffSubject,
    pub computed_at: DateTime<Utc>,
    /// Digest of the rule document the changes were classified with
    pub rules_digest: String,
    pub changes: Vec<ClassifiedChange>,
}

impl DiffReport {
    /// Only the changes worth surfacing
    pub fn significant(&self) -> Vec<&ClassifiedChange> {
        self.changes.iter().filter(|c| c.significant).collect()
    }

    pub fn significant_count(&self) -> usize {
        self.changes.iter().filter(|c| c.significant).count()
    }
}

/// Analytics over a change set
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub summary: AnalyticsSummary,
    /// Present when trend analysis is enabled in the rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<TrendSummary>,
    pub groups: BTreeMap<String, Vec<ClassifiedChange>>,
}

/// Snapshot of the active configuration for ops tooling
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub max_diff_depth: usize,
    pub max_diffs_per_run: usize,
    pub max_field_path_length: usize,
    pub config_load_time: DateTime<Utc>,
    pub rules_source: RuleSource,
    pub rules_digest: String,
    pub pattern_count: usize,
    pub all_categories: IndexMap<String, String>,
    pub all_severity_levels: IndexMap<Severity, String>,
    pub significance_filters: SignificanceConfig,
}

pub struct DiffEngine {
    active: RwLock<Arc<ActiveRules>>,
}

impl DiffEngine {
    /// Build an engine from a rules file, or the built-in rules when the
    /// path is absent or does not exist
    pub fn new(rules_path: Option<&Path>) -> Result<Self> {
        let active = ActiveRules::load(rules_path)?;
        info!(
            source = %active.source,
            patterns = active.compiled.pattern_count(),
            "diff engine initialized"
        );
        Ok(Self::from_active(active))
    }

    /// Build an engine from an in-memory rule set
    pub fn with_rules(rules: RuleSet) -> Result<Self> {
        rules.validate()?;
        Ok(Self::from_active(ActiveRules::inline(rules)?))
    }

    fn from_active(active: ActiveRules) -> Self {
        Self {
            active: RwLock::new(Arc::new(active)),
        }
    }

    /// The rule set in effect right now. Later reloads do not affect it.
    pub fn active(&self) -> Arc<ActiveRules> {
        let guard = self.active.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn publish(&self, active: ActiveRules) {
        let mut guard = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(active);
    }

    /// Reload rules from `rules_path`. On error the active rules are untouched.
    pub fn reload(&self, rules_path: Option<&Path>) -> Result<()> {
        let active = ActiveRules::load(rules_path)?;
        info!(
            source = %active.source,
            digest = %active.digest,
            load_time = %active.loaded_at,
            "configuration reloaded"
        );
        self.publish(active);
        Ok(())
    }

    /// Replace the active rules with an in-memory rule set
    pub fn replace_rules(&self, rules: RuleSet) -> Result<()> {
        rules.validate()?;
        let active = ActiveRules::inline(rules)?;
        info!(digest = %active.digest, "configuration replaced");
        self.publish(active);
        Ok(())
    }

    pub fn rule_set(&self) -> RuleSet {
        self.active().compiled.rules().clone()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.active().loaded_at
    }

    pub fn limits(&self) -> Limits {
        self.active().compiled.limits()
    }

    pub fn stats(&self) -> EngineStats {
        let active = self.active();
        let classifier = Classifier::new(&active.compiled);
        let limits = active.compiled.limits();

        EngineStats {
            max_diff_depth: limits.max_diff_depth,
            max_diffs_per_run: limits.max_changes_per_run,
            max_field_path_length: limits.max_field_path_length,
            config_load_time: active.loaded_at,
            rules_source: active.source.clone(),
            rules_digest: active.digest.clone(),
            pattern_count: active.compiled.pattern_count(),
            all_categories: classifier.all_categories(),
            all_severity_levels: classifier.all_severity_levels().into_iter().collect(),
            significance_filters: active.compiled.rules().significance.clone(),
        }
    }

    /// Diff two raw JSON snapshots and classify every change.
    ///
    /// A payload that does not parse fails the call and names its side.
    pub fn compute_diff(
        &self,
        subject: DiffSubject,
        previous: &[u8],
        current: &[u8],
    ) -> std::result::Result<DiffReport, DiffError> {
        let previous = crate::diff::parse_payload(crate::Side::Previous, previous)?;
        let current = crate::diff::parse_payload(crate::Side::Current, current)?;
        Ok(self.compute_diff_trees(subject, &previous, &current))
    }

    /// Diff two parsed snapshots and classify every change
    pub fn compute_diff_trees(&self, subject: DiffSubject, previous: &Value, current: &Value) -> DiffReport {
        let active = self.active();
        debug!(
            entity_id = %subject.entity_id,
            previous_id = %subject.previous_id,
            current_id = %subject.current_id,
            "starting inventory diff computation"
        );

        let raw = DiffComputer::new(active.compiled.limits()).diff(previous, current);
        let changes = Classifier::new(&active.compiled).classify_all(raw);

        let report = DiffReport {
            run_id: Uuid::new_v4(),
            subject,
            computed_at: Utc::now(),
            rules_digest: active.digest.clone(),
            changes,
        };

        info!(
            run_id = %report.run_id,
            entity_id = %report.subject.entity_id,
            previous_id = %report.subject.previous_id,
            current_id = %report.subject.current_id,
            processed_diffs = report.changes.len(),
            significant_diffs = report.significant_count(),
            "inventory diff computation completed"
        );
        report
    }

    /// Analytics over a classified change set
    pub fn analyze(&self, changes: &[ClassifiedChange]) -> AnalyticsReport {
        let trends_enabled = self.active().compiled.rules().trends.enabled;

        AnalyticsReport {
            summary: analytics::summarize(changes),
            trends: trends_enabled.then(|| analytics::analyze_trends(changes)),
            groups: analytics::group_related_changes(changes),
        }
    }
}
