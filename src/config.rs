//! Runtime configuration for the dashboard CLI.
//!
//! Resolved in layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. JSON config file, from `--config` or `THERAPY_DASHBOARD_CONFIG`
//!    ```json
//!    { "data_path": "snapshot.json", "seed": 7, "window_months": 3 }
//!    ```
//! 3. Environment variables (`THERAPY_DASHBOARD_DATA`,
//!    `THERAPY_DASHBOARD_SEED`, `THERAPY_DASHBOARD_WINDOW_MONTHS`)
//! 4. Command-line flags, applied by the caller
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::filter::DEFAULT_WINDOW_MONTHS;

const DEFAULT_SEED: u64 = 20_240_601;
const DEFAULT_REPORT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Snapshot file or CSV directory. `None` means generate synthetic data.
    pub data_path: Option<PathBuf>,
    /// Seed for the synthetic generator.
    pub seed: u64,
    /// Length of the default date window.
    pub window_months: u32,
    /// Rows per ranked section in the markdown report.
    pub report_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            seed: DEFAULT_SEED,
            window_months: DEFAULT_WINDOW_MONTHS,
            report_limit: DEFAULT_REPORT_LIMIT,
        }
    }
}

/// On-disk schema; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    data_path: Option<PathBuf>,
    seed: Option<u64>,
    window_months: Option<u32>,
    report_limit: Option<usize>,
}

impl FileConfig {
    fn apply_to(self, config: &mut DashboardConfig) {
        if let Some(path) = self.data_path {
            config.data_path = Some(path);
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(months) = self.window_months {
            config.window_months = months;
        }
        if let Some(limit) = self.report_limit {
            config.report_limit = limit;
        }
    }
}

impl DashboardConfig {
    pub fn load(explicit_path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        let file_path = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("THERAPY_DASHBOARD_CONFIG").map(PathBuf::from));

        if let Some(path) = file_path {
            Self::read_file(&path)?.apply_to(&mut config);
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read_file(path: &Path) -> anyhow::Result<FileConfig> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Unparseable numeric values are ignored with a warning.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("THERAPY_DASHBOARD_DATA") {
            if !val.is_empty() {
                self.data_path = Some(PathBuf::from(val));
            }
        }

        if let Some(val) = lookup("THERAPY_DASHBOARD_SEED") {
            match val.parse::<u64>() {
                Ok(seed) => self.seed = seed,
                Err(_) => tracing::warn!(value = %val, "ignoring THERAPY_DASHBOARD_SEED"),
            }
        }

        if let Some(val) = lookup("THERAPY_DASHBOARD_WINDOW_MONTHS") {
            match val.parse::<u32>() {
                Ok(months) => self.window_months = months,
                Err(_) => {
                    tracing::warn!(value = %val, "ignoring THERAPY_DASHBOARD_WINDOW_MONTHS")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_generate_six_month_window() {
        let config = DashboardConfig::default();
        assert_eq!(config.data_path, None);
        assert_eq!(config.window_months, 6);
        assert_eq!(config.report_limit, 10);
    }

    #[test]
    fn file_values_override_defaults() {
        let file: FileConfig =
            serde_json::from_str(r#"{ "seed": 7, "window_months": 3 }"#).unwrap();
        let mut config = DashboardConfig::default();
        file.apply_to(&mut config);
        assert_eq!(config.seed, 7);
        assert_eq!(config.window_months, 3);
        assert_eq!(config.report_limit, DEFAULT_REPORT_LIMIT);
    }

    #[test]
    fn env_overrides_file_and_ignores_garbage() {
        let mut config = DashboardConfig {
            seed: 7,
            ..DashboardConfig::default()
        };
        config.apply_env_overrides(env(&[
            ("THERAPY_DASHBOARD_DATA", "data/snapshot.json"),
            ("THERAPY_DASHBOARD_SEED", "not-a-number"),
            ("THERAPY_DASHBOARD_WINDOW_MONTHS", "12"),
        ]));
        assert_eq!(config.data_path, Some(PathBuf::from("data/snapshot.json")));
        assert_eq!(config.seed, 7);
        assert_eq!(config.window_months, 12);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = DashboardConfig::load(Some(Path::new("/nonexistent/dashboard.json"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
