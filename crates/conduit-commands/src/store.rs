//! Persistent registry of custom command specs.
//!
//! The registry is a JSON array of [`CommandSpec`] rewritten in full after
//! every mutation. Memory is authoritative: a failed write is logged and the
//! in-memory registry keeps the new state.
//!
//! Reconciliation across reconnects:
//! 1. [`CommandStore::reconcile_begin`] on connection open snapshots the
//!    registry and marks a reconcile pending
//! 2. the first `register_command` afterwards calls
//!    [`CommandStore::reconcile_confirm`], which empties the registry so the
//!    controller's replay defines it from scratch
//! 3. replayed specs identical to the snapshot are stored without touching
//!    the host; new or changed ones get a restart placeholder

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use conduit_core::CommandSpec;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::compiler;
use crate::errors::StoreError;
use crate::registrar::CommandRegistrar;

/// Default registry file name.
pub const DEFAULT_FILE_NAME: &str = "custom_commands.json";

/// What `register` did besides storing the spec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// New or changed; a placeholder was installed in the live host.
    Installed,
    /// Structurally identical to the compiled view; host untouched.
    Unchanged,
    /// New or changed, but no live host; compiled on next start.
    Deferred,
    /// New or changed, live host, but the spec only has subcommands so no
    /// bare placeholder is installed; compiled on next start.
    Skipped,
}

#[derive(Debug, Default)]
struct Inner {
    registry: BTreeMap<String, CommandSpec>,
    snapshot: HashMap<String, CommandSpec>,
    reconciling: bool,
}

/// Name → spec registry backed by a JSON file.
#[derive(Debug)]
pub struct CommandStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl CommandStore {
    /// Create an empty store for `path`. Call [`load`](Self::load) to read it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Registry file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the backup written when the registry file is unreadable.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".backup");
        PathBuf::from(name)
    }

    /// Read the registry file, replacing the in-memory registry.
    ///
    /// Never fails: a missing or empty file yields an empty registry; an
    /// unreadable or malformed one is copied to [`backup_path`](Self::backup_path)
    /// and reset. Invalid elements are skipped. Returns the number of specs
    /// loaded.
    pub fn load(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.registry.clear();

        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no command registry found, starting empty");
                self.persist(&inner.registry);
                return 0;
            }
            Err(e) => {
                self.reset_corrupt(&mut inner, &e.to_string());
                return 0;
            }
        };

        if content.trim().is_empty() {
            self.persist(&inner.registry);
            return 0;
        }

        let elements = match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(elements)) => elements,
            Ok(_) => {
                self.reset_corrupt(&mut inner, "registry is not a JSON array");
                return 0;
            }
            Err(e) => {
                self.reset_corrupt(&mut inner, &e.to_string());
                return 0;
            }
        };

        for (index, element) in elements.into_iter().enumerate() {
            let spec = match serde_json::from_value::<CommandSpec>(element) {
                Ok(spec) => spec,
                Err(e) => {
                    warn!(index, error = %e, "skipping malformed command spec");
                    continue;
                }
            };
            if let Err(e) = spec.validate() {
                warn!(index, name = %spec.name, error = %e, "skipping invalid command spec");
                continue;
            }
            let _ = inner.registry.insert(spec.name.clone(), spec);
        }

        let count = inner.registry.len();
        info!(path = %self.path.display(), count, "loaded custom commands");
        count
    }

    /// Rewrite the registry file from memory.
    pub fn save(&self) -> Result<(), StoreError> {
        let inner = self.inner.lock();
        self.write(&inner.registry)
    }

    /// Store a spec and, if it is new or changed, install a placeholder in
    /// the live host.
    pub fn register(
        &self,
        spec: CommandSpec,
        registrar: Option<&dyn CommandRegistrar>,
    ) -> Result<RegisterOutcome, StoreError> {
        spec.validate()?;

        let mut inner = self.inner.lock();
        let changed = inner.snapshot.get(&spec.name) != Some(&spec);
        let _ = inner.registry.insert(spec.name.clone(), spec.clone());
        self.persist(&inner.registry);

        if !changed {
            debug!(name = %spec.name, "command unchanged, skipping host registration");
            return Ok(RegisterOutcome::Unchanged);
        }

        match registrar {
            Some(host) if host.is_live() && !spec.installs_bare_literal() => {
                info!(name = %spec.name, "skipping bare placeholder, command only has subcommands");
                let _ = inner.snapshot.insert(spec.name.clone(), spec);
                Ok(RegisterOutcome::Skipped)
            }
            Some(host) if host.is_live() => {
                host.register(compiler::placeholder(&spec));
                info!(name = %spec.name, "registered command placeholder, restart required");
                let _ = inner.snapshot.insert(spec.name.clone(), spec);
                Ok(RegisterOutcome::Installed)
            }
            _ => {
                debug!(name = %spec.name, "host not live, command will compile on next start");
                Ok(RegisterOutcome::Deferred)
            }
        }
    }

    /// Remove a spec. Returns whether it existed. Persists either way.
    pub fn unregister(&self, name: &str) -> bool {
        let mut inner = self.inner.lock();
        let existed = inner.registry.remove(name).is_some();
        self.persist(&inner.registry);
        existed
    }

    /// Remove every spec and persist.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.registry.clear();
        self.persist(&inner.registry);
    }

    /// Snapshot the registry and mark a reconcile pending.
    pub fn reconcile_begin(&self) {
        let mut inner = self.inner.lock();
        inner.snapshot = inner
            .registry
            .iter()
            .map(|(name, spec)| (name.clone(), spec.clone()))
            .collect();
        inner.reconciling = true;
        debug!(snapshot = inner.snapshot.len(), "command reconcile started");
    }

    /// If a reconcile is pending, empty the registry and persist. Returns
    /// whether anything was done.
    pub fn reconcile_confirm(&self) -> bool {
        let mut inner = self.inner.lock();
        if !inner.reconciling {
            return false;
        }
        inner.registry.clear();
        inner.reconciling = false;
        self.persist(&inner.registry);
        debug!("command reconcile confirmed, registry reset for replay");
        true
    }

    /// Whether a reconcile is pending.
    pub fn is_reconciling(&self) -> bool {
        self.inner.lock().reconciling
    }

    /// Look up a spec by name.
    pub fn get(&self, name: &str) -> Option<CommandSpec> {
        self.inner.lock().registry.get(name).cloned()
    }

    /// All specs, ordered by name.
    pub fn specs(&self) -> Vec<CommandSpec> {
        self.inner.lock().registry.values().cloned().collect()
    }

    /// Number of stored specs.
    pub fn len(&self) -> usize {
        self.inner.lock().registry.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().registry.is_empty()
    }

    fn write(&self, registry: &BTreeMap<String, CommandSpec>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let specs: Vec<&CommandSpec> = registry.values().collect();
        let json = serde_json::to_string_pretty(&specs)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn persist(&self, registry: &BTreeMap<String, CommandSpec>) {
        if let Err(e) = self.write(registry) {
            error!(path = %self.path.display(), error = %e, "failed to save command registry");
        }
    }

    fn reset_corrupt(&self, inner: &mut Inner, reason: &str) {
        let backup = self.backup_path();
        error!(path = %self.path.display(), reason, "command registry unreadable, resetting");
        match std::fs::copy(&self.path, &backup) {
            Ok(_) => info!(backup = %backup.display(), "backed up command registry"),
            Err(e) => error!(backup = %backup.display(), error = %e, "failed to back up command registry"),
        }
        inner.registry.clear();
        self.persist(&inner.registry);
    }
}
