//! Rule document definitions and loading
//!
//! A rule document is a YAML file with the sections `categorization`,
//! `severity`, `significance`, `limits`, `trends` and `notifications`.
//! When no document is present the embedded default rule set is used.

pub mod settings;

use crate::error::ConfigError;
use crate::Severity;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Embedded default rule document
pub const DEFAULT_RULES_YAML: &str = include_str!("default_rules.yaml");

/// Complete rule document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub categorization: CategorizationConfig,
    #[serde(default)]
    pub severity: SeverityConfig,
    #[serde(default)]
    pub significance: SignificanceConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub trends: TrendsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Category name → patterns, in declaration order, plus the fallback
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategorizationConfig {
    #[serde(default)]
    pub default: DefaultCategory,
    #[serde(flatten)]
    pub categories: IndexMap<String, CategoryRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRule {
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultCategory {
    #[serde(default = "default_category_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Default for DefaultCategory {
    fn default() -> Self {
        Self {
            name: default_category_name(),
            description: String::new(),
        }
    }
}

fn default_category_name() -> String {
    "system".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeverityConfig {
    #[serde(default)]
    pub critical: SeverityLevel,
    #[serde(default)]
    pub high: SeverityLevel,
    #[serde(default)]
    pub medium: SeverityLevel,
    #[serde(default)]
    pub low: SeverityLevel,
    #[serde(default)]
    pub default: DefaultSeverity,
}

impl SeverityConfig {
    pub fn level(&self, severity: Severity) -> &SeverityLevel {
        match severity {
            Severity::Critical => &self.critical,
            Severity::High => &self.high,
            Severity::Medium => &self.medium,
            Severity::Low => &self.low,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeverityLevel {
    #[serde(default)]
    pub conditions: Vec<SeverityCondition>,
    #[serde(default)]
    pub description: String,
}

/// Patterns that raise a change of `change_type` to the enclosing level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityCondition {
    pub change_type: String,
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultSeverity {
    #[serde(default = "default_severity_level")]
    pub level: String,
    #[serde(default)]
    pub description: String,
}

impl Default for DefaultSeverity {
    fn default() -> Self {
        Self {
            level: default_severity_level(),
            description: String::new(),
        }
    }
}

fn default_severity_level() -> String {
    "medium".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignificanceConfig {
    /// Meta-patterns (`severity:`, `category:`, `change_type:`) or path regexes
    #[serde(default)]
    pub always_significant: Vec<String>,
    #[serde(default)]
    pub never_significant: Vec<String>,
    #[serde(default)]
    pub time_filters: TimeFiltersConfig,
    #[serde(default)]
    pub value_filters: ValueFiltersConfig,
    #[serde(default)]
    pub default: DefaultSignificance,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeFiltersConfig {
    #[serde(default)]
    pub ignore_frequent: Vec<TimeFilter>,
}

/// A field family known to change on every snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeFilter {
    pub pattern: String,
    #[serde(default)]
    pub window_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueFiltersConfig {
    #[serde(default)]
    pub ignore_minor: Vec<ValueFilter>,
}

/// Numeric changes under `threshold_percent` on matching paths are noise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueFilter {
    pub pattern: String,
    pub threshold_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultSignificance {
    #[serde(default = "default_significant")]
    pub significant: bool,
    #[serde(default)]
    pub description: String,
}

impl Default for DefaultSignificance {
    fn default() -> Self {
        Self {
            significant: default_significant(),
            description: String::new(),
        }
    }
}

fn default_significant() -> bool {
    true
}

/// Processing bounds. Signed so that non-positive values reach validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default)]
    pub max_diff_depth: i64,
    #[serde(default)]
    pub max_diffs_per_run: i64,
    #[serde(default)]
    pub max_field_path_length: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub window_hours: i64,
    #[serde(default)]
    pub min_occurrences: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub grouping: GroupingConfig,
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub time_window_minutes: i64,
    #[serde(default)]
    pub max_group_size: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub max_notifications_per_hour: i64,
    #[serde(default)]
    pub max_critical_per_hour: i64,
}

impl RuleSet {
    /// Parse and validate a rule document
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let rules: RuleSet = serde_yaml::from_str(text)?;
        rules.validate()?;
        Ok(rules)
    }

    /// The embedded default rule set
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml(DEFAULT_RULES_YAML)
    }

    /// Check limits and fallbacks
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_diff_depth", self.limits.max_diff_depth),
            ("max_diffs_per_run", self.limits.max_diffs_per_run),
            ("max_field_path_length", self.limits.max_field_path_length),
            ("trends window_hours", self.trends.window_hours),
            ("trends min_occurrences", self.trends.min_occurrences),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be positive (got {})",
                    name, value
                )));
            }
        }

        if let Some(name) = self
            .categorization
            .categories
            .keys()
            .find(|name| name.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "category name must not be empty (got {:?})",
                name
            )));
        }

        if self.categorization.default.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "categorization default name must not be empty".to_string(),
            ));
        }

        if let Err(e) = self.severity.default.level.parse::<Severity>() {
            return Err(ConfigError::Invalid(format!("severity default level: {}", e)));
        }

        Ok(())
    }

    /// Default severity as a typed level. Falls back to medium for
    /// documents that skipped validation.
    pub fn default_severity(&self) -> Severity {
        self.severity.default.level.parse().unwrap_or(Severity::Medium)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Where the active rule document came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum RuleSource {
    /// Embedded defaults
    Builtin,
    /// A rules file on disk
    File(PathBuf),
    /// Supplied programmatically
    Inline,
}

impl std::fmt::Display for RuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSource::Builtin => write!(f, "built-in defaults"),
            RuleSource::File(path) => write!(f, "{}", path.display()),
            RuleSource::Inline => write!(f, "inline"),
        }
    }
}

/// A validated rule set with its provenance
#[derive(Debug, Clone)]
pub struct LoadedRules {
    pub rules: RuleSet,
    pub source: RuleSource,
    /// SHA-256 of the document text
    pub digest: String,
}

/// Hex SHA-256 of a rule document
pub fn rules_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Load a rule document.
///
/// An absent path, an empty path, or a path that does not exist yields the
/// built-in defaults. A file that exists but cannot be read, parsed or
/// validated is an error.
pub fn load(path: Option<&Path>) -> Result<LoadedRules, ConfigError> {
    let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
        debug!("no rules path configured, using built-in defaults");
        return load_builtin();
    };

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "rules file not found, using built-in defaults");
            return load_builtin();
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let rules = RuleSet::from_yaml(&text)?;
    info!(
        path = %path.display(),
        categories = rules.categorization.categories.len(),
        "loaded rules file"
    );

    Ok(LoadedRules {
        rules,
        source: RuleSource::File(path.to_path_buf()),
        digest: rules_digest(&text),
    })
}

fn load_builtin() -> Result<LoadedRules, ConfigError> {
    Ok(LoadedRules {
        rules: RuleSet::builtin()?,
        source: RuleSource::Builtin,
        digest: rules_digest(DEFAULT_RULES_YAML),
    })
}
