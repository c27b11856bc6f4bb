//! Environment overrides and the guards that apply them process-wide.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::warn;

/// Ordered NAME=VALUE overrides accumulated by a scenario.
///
/// Duplicates are kept in the order they were added; lookups and the
/// effective map resolve to the last value applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    entries: Vec<(String, String)>,
}

impl EnvOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn effective(&self) -> BTreeMap<String, String> {
        self.entries.iter().cloned().collect()
    }
}

/// Sets variables for the lifetime of the guard and restores the previous
/// values (or absence) on drop.
///
/// Mutating the process environment is only sound while no other thread
/// reads it; callers hold the in-process execution lock.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
}

impl EnvGuard {
    pub fn apply(vars: &BTreeMap<String, String>) -> Self {
        let mut previous = Vec::with_capacity(vars.len());
        for (name, value) in vars {
            previous.push((name.clone(), std::env::var_os(name)));
            std::env::set_var(name, value);
        }
        Self { previous }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in self.previous.drain(..).rev() {
            match value {
                Some(value) => std::env::set_var(&name, value),
                None => std::env::remove_var(&name),
            }
        }
    }
}

/// Switches the current directory and switches back on drop.
pub struct CwdGuard {
    previous: Option<PathBuf>,
}

impl CwdGuard {
    pub fn enter(dir: &Path) -> std::io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        Ok(Self {
            previous: Some(previous),
        })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(e) = std::env::set_current_dir(&previous) {
                warn!("Failed to restore working directory {}: {}", previous.display(), e);
            }
        }
    }
}
