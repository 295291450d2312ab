//! Hot reload of the rules file

use super::DiffEngine;
use crate::error::Result;
use notify::event::{CreateKind, ModifyKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Keeps the filesystem watcher alive; dropping it stops reloading
pub struct RulesWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl RulesWatcher {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiffEngine {
    /// Reload the engine whenever `rules_path` is written.
    ///
    /// The parent directory is watched so editors that replace the file
    /// are picked up. A document that fails to load is logged and the
    /// previous rules stay active.
    pub fn watch(self: &Arc<Self>, rules_path: impl Into<PathBuf>) -> Result<RulesWatcher> {
        let path: PathBuf = rules_path.into();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let engine = Arc::clone(self);
        let target = path.clone();
        let mut watcher = notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
            match res {
                Ok(event) => handle_event(&engine, &event, &target),
                Err(e) => warn!(error = %e, "rules watcher error"),
            }
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        info!(path = %path.display(), "watching rules file for changes");
        Ok(RulesWatcher {
            path,
            _watcher: watcher,
        })
    }
}

fn is_reload_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(CreateKind::File)
            | EventKind::Create(CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
    )
}

fn handle_event(engine: &DiffEngine, event: &Event, target: &Path) {
    if !is_reload_event(&event.kind) {
        return;
    }

    let touches_target = event
        .paths
        .iter()
        .any(|p| p.file_name().is_some() && p.file_name() == target.file_name());
    if !touches_target {
        return;
    }

    match engine.reload(Some(target)) {
        Ok(()) => info!(path = %target.display(), "hot-reloaded rules"),
        Err(e) => warn!(
            path = %target.display(),
            error = %e,
            "failed to reload rules, keeping previous version"
        ),
    }
}
