//! Inventory Differ Library
//!
//! Structural diff and rule-driven classification of inventory snapshots.

pub mod analytics;
pub mod classifier;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod rules;
pub mod web;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use engine::{DiffEngine, DiffReport, DiffSubject};
pub use error::{ConfigError, DiffError, EngineError, FieldPathError, PatternError, Side};

/// Rendered path of a change located at the tree root
pub const ROOT_PATH: &str = "root";

/// Kind of structural change between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present only in the current snapshot
    Create,
    /// Present in both with a different value
    Update,
    /// Present only in the previous snapshot
    Delete,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Create, ChangeKind::Update, ChangeKind::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(ChangeKind::Create),
            "update" => Ok(ChangeKind::Update),
            "delete" => Ok(ChangeKind::Delete),
            other => Err(format!("unknown change kind '{}'", other)),
        }
    }
}

/// Urgency of a change
///
/// Ordered so that `Critical` is the greatest value; use
/// [`Severity::BY_PRIORITY`] when evaluating most-severe-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Evaluation order for severity rules
    pub const BY_PRIORITY: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Health score deduction for one change of this severity
    pub fn health_penalty(&self) -> f64 {
        match self {
            Severity::Critical => 10.0,
            Severity::High => 5.0,
            Severity::Medium => 2.0,
            Severity::Low => 1.0,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// One step of a path into an inventory tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object key
    Field(String),
    /// Array position
    Index(usize),
}

impl PathSegment {
    pub fn as_field(&self) -> Option<&str> {
        match self {
            PathSegment::Field(name) => Some(name),
            PathSegment::Index(_) => None,
        }
    }
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Field(name) => f.write_str(name),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Join path segments as `a.b[2].c`, or [`ROOT_PATH`] for the empty path
pub fn render_path(segments: &[PathSegment]) -> String {
    if segments.is_empty() {
        return ROOT_PATH.to_string();
    }

    let mut out = String::new();
    for segment in segments {
        match segment {
            PathSegment::Field(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            PathSegment::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// A single structural difference between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    /// Ordered path segments from the root
    pub path: Vec<PathSegment>,
    /// Rendered path (`a.b[2]`)
    pub field_path: String,
    /// Create, update or delete
    pub kind: ChangeKind,
    /// Value in the previous snapshot, absent for creates
    pub previous_value: Option<Value>,
    /// Value in the current snapshot, absent for deletes
    pub new_value: Option<Value>,
}

impl Change {
    pub fn new(
        path: Vec<PathSegment>,
        kind: ChangeKind,
        previous_value: Option<Value>,
        new_value: Option<Value>,
    ) -> Self {
        let field_path = render_path(&path);
        Self {
            path,
            field_path,
            kind,
            previous_value,
            new_value,
        }
    }

    /// Number of segments in the path (root is depth 0)
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// First path segment rendered on its own, or [`ROOT_PATH`]
    pub fn root_segment(&self) -> String {
        self.path
            .first()
            .map(|s| s.to_string())
            .unwrap_or_else(|| ROOT_PATH.to_string())
    }

    pub fn display_previous(&self) -> String {
        display_value(self.previous_value.as_ref())
    }

    pub fn display_new(&self) -> String {
        display_value(self.new_value.as_ref())
    }
}

/// Render a value for storage or display.
///
/// Strings are JSON-quoted, floats get two decimals, containers are compact JSON.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => Value::String(s.clone()).to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => {
            if n.is_f64() {
                format!("{:.2}", n.as_f64().unwrap_or_default())
            } else {
                n.to_string()
            }
        }
        Some(other) => other.to_string(),
    }
}

/// A change annotated with its classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedChange {
    #[serde(flatten)]
    pub change: Change,
    /// Functional area, never empty
    pub category: String,
    pub severity: Severity,
    /// Whether the change is worth surfacing to an operator
    pub significant: bool,
}

impl ClassifiedChange {
    pub fn field_path(&self) -> &str {
        &self.change.field_path
    }

    pub fn kind(&self) -> ChangeKind {
        self.change.kind
    }
}
