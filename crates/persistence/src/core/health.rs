//! Dependency health probing.
//!
//! A [`HealthProbe`] runs every registered [`HealthCheck`] and reports each
//! one as `"ok"` or `"failed"`. Checks are independent: a failing check never
//! prevents the others from running.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::connection::ConnectionManager;
use crate::core::store::ResourceStore;

/// Outcome of a single dependency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// The dependency answered.
    Ok,
    /// The dependency is unreachable or answered with an error.
    Failed,
}

/// Mapping from dependency name to status.
pub type HealthReport = BTreeMap<String, ProbeStatus>;

/// A named reachability check.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// The name reported in the health summary.
    fn name(&self) -> &str;

    /// Returns `Err` with a description when the dependency is not usable.
    async fn check(&self) -> Result<(), String>;
}

/// Aggregates several checks into one report.
#[derive(Default, Clone)]
pub struct HealthProbe {
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl HealthProbe {
    /// Creates a probe with no checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a check.
    pub fn with_check(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.checks.push(check);
        self
    }

    /// Runs every check and collects the results.
    pub async fn run(&self) -> HealthReport {
        let mut report = HealthReport::new();
        for check in &self.checks {
            let status = match check.check().await {
                Ok(()) => ProbeStatus::Ok,
                Err(reason) => {
                    warn!(dependency = %check.name(), reason = %reason, "Health check failed");
                    ProbeStatus::Failed
                }
            };
            report.insert(check.name().to_string(), status);
        }
        report
    }
}

/// Checks the record store through collection metadata.
///
/// Reports failure while the store handle is not yet established.
#[derive(Debug, Clone)]
pub struct StoreHealthCheck {
    manager: Arc<ConnectionManager>,
}

impl StoreHealthCheck {
    /// Creates a store check over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl HealthCheck for StoreHealthCheck {
    fn name(&self) -> &str {
        "store"
    }

    async fn check(&self) -> Result<(), String> {
        let handle = self.manager.handle().ok_or_else(|| {
            self.manager.last_error().map_or_else(
                || "store connection not established".to_string(),
                |e| e.to_string(),
            )
        })?;
        ResourceStore::new(handle)
            .info()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
