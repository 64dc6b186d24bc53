//! Composition orchestrators: fixed build sequences producing whole documents.
//!
//! Each orchestrator declares parameters, then resources in dependency order,
//! and emits. Any failure aborts the run; no partial document is produced.

pub mod app_cluster;
pub mod network;

use crate::core::error::{StackError, StackResult};
use crate::core::naming::Tier;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Instance boot scripts, keyed by the tier they were written for.
///
/// Scripts are opaque text and are read in full before orchestration starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payloads {
    scripts: BTreeMap<Tier, String>,
}

impl Payloads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tier: Tier, script: &str) -> Self {
        self.scripts.insert(tier, script.to_string());
        self
    }

    /// Read one script per `(tier, path)` pair.
    pub fn read(sources: &[(Tier, &Path)]) -> StackResult<Self> {
        let mut payloads = Self::new();
        for (tier, path) in sources {
            let script = std::fs::read_to_string(path).map_err(|e| StackError::Payload {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            debug!(%tier, path = %path.display(), bytes = script.len(), "read boot script");
            payloads.scripts.insert(*tier, script);
        }
        Ok(payloads)
    }

    pub fn script(&self, tier: Tier) -> StackResult<&str> {
        self.scripts
            .get(&tier)
            .map(String::as_str)
            .ok_or_else(|| StackError::Config(format!("no boot script supplied for tier '{}'", tier)))
    }
}
