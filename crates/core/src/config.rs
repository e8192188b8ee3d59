use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default per-service period when none is given, or the given value is non-positive.
pub const DEFAULT_PERIOD_MS: u64 = 10;

/// Where a service should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// No preference; place on the least-loaded worker.
    Balanced,
    /// Pin to a specific worker index.
    Pinned(usize),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub period_ms: Option<u64>,
    #[serde(default = "default_preferred_worker")]
    pub preferred_worker: i64,
}

fn default_enabled() -> bool {
    true
}

fn default_preferred_worker() -> i64 {
    -1
}

impl ServiceConfig {
    /// Resolves `preferred_worker` into a [`Placement`]. Negative means balanced.
    pub fn placement(&self) -> Placement {
        if self.preferred_worker < 0 {
            Placement::Balanced
        } else {
            Placement::Pinned(self.preferred_worker as usize)
        }
    }

    pub fn period_ms(&self) -> u64 {
        match self.period_ms {
            Some(p) if p > 0 => p,
            _ => DEFAULT_PERIOD_MS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct RuntimeConfigRaw {
    #[serde(default)]
    max_workers: Option<i64>,
    #[serde(default)]
    services: Vec<ServiceConfig>,
}

/// A validated, clamped runtime configuration ready to feed the scheduler's constructor.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub max_workers: usize,
    pub services: Vec<ServiceConfig>,
}

impl RuntimeConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let parsed: RuntimeConfigRaw = serde_json::from_str(raw)?;
        Self::from_raw(parsed)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    fn from_raw(raw: RuntimeConfigRaw) -> Result<Self, ConfigError> {
        let hardware_threads = hardware_thread_count();
        let max_workers = match raw.max_workers {
            Some(n) if n > 0 => (n as usize).min(hardware_threads),
            _ => hardware_threads,
        };

        let mut seen = HashSet::with_capacity(raw.services.len());
        for (index, svc) in raw.services.iter().enumerate() {
            if svc.name.trim().is_empty() {
                return Err(ConfigError::EmptyServiceName { index });
            }
            if !seen.insert(svc.name.as_str()) {
                return Err(ConfigError::DuplicateServiceName(svc.name.clone()));
            }
        }

        Ok(Self {
            max_workers,
            services: raw.services,
        })
    }

    pub fn enabled_services(&self) -> impl Iterator<Item = &ServiceConfig> {
        self.services.iter().filter(|s| s.enabled)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_workers: hardware_thread_count(),
            services: Vec::new(),
        }
    }
}

fn hardware_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_max_workers_clamps_to_hardware_threads() {
        let cfg = RuntimeConfig::from_json(r#"{"max_workers": 0}"#).unwrap();
        assert_eq!(cfg.max_workers, hardware_thread_count());
    }

    #[test]
    fn oversized_max_workers_clamps_down() {
        let cfg = RuntimeConfig::from_json(r#"{"max_workers": 999999}"#).unwrap();
        assert_eq!(cfg.max_workers, hardware_thread_count());
    }

    #[test]
    fn missing_period_defaults() {
        let cfg = RuntimeConfig::from_json(
            r#"{"services": [{"name": "a"}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.services[0].period_ms(), DEFAULT_PERIOD_MS);
    }

    #[test]
    fn negative_preferred_worker_is_balanced() {
        let cfg = RuntimeConfig::from_json(
            r#"{"services": [{"name": "a", "preferred_worker": -1}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.services[0].placement(), Placement::Balanced);
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = RuntimeConfig::from_json(
            r#"{"services": [{"name": "a"}, {"name": "a"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateServiceName(_)));
    }

    #[test]
    fn empty_name_rejected() {
        let err = RuntimeConfig::from_json(r#"{"services": [{"name": "  "}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyServiceName { index: 0 }));
    }

    #[test]
    fn disabled_services_excluded_from_enabled_iter() {
        let cfg = RuntimeConfig::from_json(
            r#"{"services": [{"name": "a", "enabled": false}, {"name": "b"}]}"#,
        )
        .unwrap();
        let names: Vec<_> = cfg.enabled_services().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b"]);
    }
}
