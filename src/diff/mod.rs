//! Structural diff of inventory trees
//!
//! Walks two parsed JSON trees and yields a flat list of [`Change`]s.
//! Objects are compared key by key, arrays position by position. A value
//! that appears or disappears is reported once at its own path, with the
//! whole subtree as its value. JSON `null` is treated as absent.
//!
//! Output is bounded by the rule set's limits: changes deeper than
//! `max_diff_depth` or with paths longer than `max_field_path_length` are
//! dropped, and the walk stops after `max_changes_per_run` changes.

pub mod path;

pub use path::{sanitize_field_path, validate_field_path, FIELD_PATH_LIMIT};

use crate::error::{DiffError, Side};
use crate::rules::Limits;
use crate::{render_path, Change, ChangeKind, PathSegment};
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Parse one side of a diff request
pub fn parse_payload(side: Side, bytes: &[u8]) -> Result<Value, DiffError> {
    serde_json::from_slice(bytes).map_err(|source| DiffError::InvalidPayload { side, source })
}

/// Computes bounded structural diffs
#[derive(Debug, Clone, Copy)]
pub struct DiffComputer {
    limits: Limits,
}

impl DiffComputer {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Diff two raw JSON payloads. Nothing is diffed unless both parse.
    pub fn diff_payloads(&self, previous: &[u8], current: &[u8]) -> Result<Vec<Change>, DiffError> {
        let previous = parse_payload(Side::Previous, previous)?;
        let current = parse_payload(Side::Current, current)?;
        Ok(self.diff(&previous, &current))
    }

    /// Diff two parsed trees. Change order follows the tree walk.
    pub fn diff(&self, previous: &Value, current: &Value) -> Vec<Change> {
        let mut walker = Walker {
            limits: self.limits,
            path: Vec::new(),
            changes: Vec::new(),
            truncated: false,
        };
        walker.walk(present(previous), present(current));

        debug!(
            changes = walker.changes.len(),
            truncated = walker.truncated,
            "structural diff computed"
        );
        walker.changes
    }
}

fn present(value: &Value) -> Option<&Value> {
    match value {
        Value::Null => None,
        other => Some(other),
    }
}

struct Walker {
    limits: Limits,
    path: Vec<PathSegment>,
    changes: Vec<Change>,
    truncated: bool,
}

impl Walker {
    fn walk(&mut self, previous: Option<&Value>, current: Option<&Value>) {
        if self.truncated {
            return;
        }

        match (previous, current) {
            (None, None) => {}
            (None, Some(current)) => self.emit(ChangeKind::Create, None, Some(current)),
            (Some(previous), None) => self.emit(ChangeKind::Delete, Some(previous), None),
            (Some(Value::Object(prev)), Some(Value::Object(curr))) => {
                if !self.can_descend() {
                    return;
                }
                for (key, prev_value) in prev {
                    self.path.push(PathSegment::Field(key.clone()));
                    self.walk(present(prev_value), curr.get(key).and_then(present));
                    self.path.pop();
                }
                for (key, curr_value) in curr {
                    if prev.contains_key(key) {
                        continue;
                    }
                    self.path.push(PathSegment::Field(key.clone()));
                    self.walk(None, present(curr_value));
                    self.path.pop();
                }
            }
            (Some(Value::Array(prev)), Some(Value::Array(curr))) => {
                if !self.can_descend() {
                    return;
                }
                for i in 0..prev.len().max(curr.len()) {
                    self.path.push(PathSegment::Index(i));
                    self.walk(
                        prev.get(i).and_then(present),
                        curr.get(i).and_then(present),
                    );
                    self.path.pop();
                }
            }
            (Some(previous), Some(current)) => {
                if previous != current {
                    self.emit(ChangeKind::Update, Some(previous), Some(current));
                }
            }
        }
    }

    /// Children sit one level deeper; past the limit none of them can be emitted
    fn can_descend(&self) -> bool {
        if self.path.len() + 1 > self.limits.max_diff_depth {
            trace!(
                field_path = %render_path(&self.path),
                max_depth = self.limits.max_diff_depth,
                "not descending past max depth"
            );
            return false;
        }
        true
    }

    fn emit(&mut self, kind: ChangeKind, previous: Option<&Value>, current: Option<&Value>) {
        let depth = self.path.len();
        if depth > self.limits.max_diff_depth {
            debug!(
                depth,
                max_depth = self.limits.max_diff_depth,
                "skipping change exceeding max depth"
            );
            return;
        }

        let field_path = render_path(&self.path);
        if field_path.len() > self.limits.max_field_path_length {
            debug!(
                field_path = %sanitize_field_path(&field_path),
                length = field_path.len(),
                max_length = self.limits.max_field_path_length,
                "skipping field path exceeding length limit"
            );
            return;
        }

        if self.changes.len() >= self.limits.max_changes_per_run {
            warn!(
                max_diffs = self.limits.max_changes_per_run,
                "reached maximum diffs per run limit"
            );
            self.truncated = true;
            return;
        }

        self.changes.push(Change {
            path: self.path.clone(),
            field_path,
            kind,
            previous_value: previous.cloned(),
            new_value: current.cloned(),
        });
    }
}

/// Whether every object key of `a` also exists in `b`, recursing through
/// values that are objects on both sides
pub fn compare_structures(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => a.iter().all(|(key, a_value)| match b.get(key) {
            None => {
                debug!(missing_key = %key, "structure mismatch: key missing in second structure");
                false
            }
            Some(b_value) => compare_structures(a_value, b_value),
        }),
        _ => true,
    }
}

/// [`compare_structures`] over raw payloads
pub fn compare_payload_structures(a: &[u8], b: &[u8]) -> Result<bool, DiffError> {
    let a = parse_payload(Side::Previous, a)?;
    let b = parse_payload(Side::Current, b)?;
    Ok(compare_structures(&a, &b))
}
