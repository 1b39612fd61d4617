//! Runtime settings loader for the tour client.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/settings.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/tour/settings.yaml`
//!
//! Merge precedence is user over system. `TOUR_API_URL` overrides `api.base_url`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;
use tour_scorer::{FileStorage, MAX_WEIGHT, MIN_WEIGHT, ScorerConfig, WeightBounds};

use crate::api::{DEFAULT_API_URL, DEFAULT_ROUTER, DEFAULT_ROUTER_URL};

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/settings.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "tour/settings.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
const DEFAULT_DATA_HOME_RELATIVE_PATH: &str = ".data";
const API_URL_ENV: &str = "TOUR_API_URL";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

/// Merged system and user settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    /// Backend connection.
    #[serde(default)]
    pub api: ApiSettings,
    /// Scorer store.
    #[serde(default)]
    pub scorer: ScorerSettings,
}

/// `api:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSettings {
    /// Backend base url.
    pub base_url: Option<String>,
    /// Routing engine name.
    pub router: Option<String>,
    /// Routing engine base url.
    pub router_url: Option<String>,
    /// Snap tour paths to streets.
    pub snap_path: Option<bool>,
}

/// `scorer:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScorerSettings {
    /// Durable slot key.
    pub storage_key: Option<String>,
    /// Lower weight bound.
    pub min_weight: Option<f64>,
    /// Upper weight bound.
    pub max_weight: Option<f64>,
    /// Directory for slot files; defaults under `PRJ_DATA_HOME`.
    pub storage_dir: Option<PathBuf>,
}

impl RuntimeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            api: self.api.merge(overlay.api),
            scorer: self.scorer.merge(overlay.scorer),
        }
    }

    /// Backend base url: env, then settings, then the built-in default.
    #[must_use]
    pub fn api_base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| self.api.base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Routing engine name.
    #[must_use]
    pub fn router(&self) -> String {
        self.api
            .router
            .clone()
            .unwrap_or_else(|| DEFAULT_ROUTER.to_string())
    }

    /// Routing engine url.
    #[must_use]
    pub fn router_url(&self) -> String {
        self.api
            .router_url
            .clone()
            .unwrap_or_else(|| DEFAULT_ROUTER_URL.to_string())
    }

    /// Whether tours are snapped to streets.
    #[must_use]
    pub fn snap_path(&self) -> bool {
        self.api.snap_path.unwrap_or(true)
    }

    /// Scorer store configuration; invalid bounds fall back to the defaults.
    #[must_use]
    pub fn scorer_config(&self) -> ScorerConfig {
        let defaults = ScorerConfig::default();
        let min = self.scorer.min_weight.unwrap_or(MIN_WEIGHT);
        let max = self.scorer.max_weight.unwrap_or(MAX_WEIGHT);
        let bounds = WeightBounds::new(min, max).unwrap_or_else(|error| {
            tracing::warn!(error = %error, "invalid scorer weight bounds; using defaults");
            WeightBounds::default()
        });
        ScorerConfig {
            storage_key: self
                .scorer
                .storage_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .unwrap_or(defaults.storage_key),
            bounds,
        }
    }

    /// Durable storage for scorer snapshots.
    #[must_use]
    pub fn scorer_storage(&self) -> FileStorage {
        let root = project_root();
        let dir = match &self.scorer.storage_dir {
            Some(dir) => absolutize(&root, dir.clone()),
            None => resolve_data_home(&root).join("tour"),
        };
        FileStorage::new(dir)
    }
}

impl ApiSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            base_url: overlay.base_url.or(self.base_url),
            router: overlay.router.or(self.router),
            router_url: overlay.router_url.or(self.router_url),
            snap_path: overlay.snap_path.or(self.snap_path),
        }
    }
}

impl ScorerSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            storage_key: overlay.storage_key.or(self.storage_key),
            min_weight: overlay.min_weight.or(self.min_weight),
            max_weight: overlay.max_weight.or(self.max_weight),
            storage_dir: overlay.storage_dir.or(self.storage_dir),
        }
    }
}

/// Load merged runtime settings (user overrides system).
pub fn load_runtime_settings() -> RuntimeSettings {
    let (system_path, user_path) = runtime_settings_paths();
    load_runtime_settings_from_paths(&system_path, &user_path)
}

#[doc(hidden)]
pub fn runtime_settings_paths() -> (PathBuf, PathBuf) {
    let root = project_root();
    let system_path = root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let user_path = resolve_config_home(&root).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH);
    (system_path, user_path)
}

#[doc(hidden)]
pub fn load_runtime_settings_from_paths(system: &Path, user: &Path) -> RuntimeSettings {
    load_one(system).merge(load_one(user))
}

fn load_one(path: &Path) -> RuntimeSettings {
    if !path.exists() {
        return RuntimeSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to read settings file; ignoring"
            );
            return RuntimeSettings::default();
        }
    };
    if raw.trim().is_empty() {
        return RuntimeSettings::default();
    }
    match serde_yaml::from_str::<RuntimeSettings>(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to parse settings yaml; ignoring file"
            );
            RuntimeSettings::default()
        }
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn project_root() -> PathBuf {
    env_path("PRJ_ROOT")
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Set config-home override (used by CLI `--conf`).
///
/// The path can be absolute, or relative to `PRJ_ROOT`/cwd.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if CONFIG_HOME_OVERRIDE.set(path.clone()).is_err()
        && let Some(current) = CONFIG_HOME_OVERRIDE.get()
        && current != &path
    {
        tracing::warn!(
            current = %current.display(),
            ignored = %path.display(),
            "config home override already set; ignoring subsequent value"
        );
    }
}

fn resolve_config_home(project_root: &Path) -> PathBuf {
    if let Some(path) = CONFIG_HOME_OVERRIDE.get() {
        return absolutize(project_root, path.clone());
    }
    let configured = env_path("PRJ_CONFIG_HOME")
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_HOME_RELATIVE_PATH));
    absolutize(project_root, configured)
}

fn resolve_data_home(project_root: &Path) -> PathBuf {
    let configured = env_path("PRJ_DATA_HOME")
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_HOME_RELATIVE_PATH));
    absolutize(project_root, configured)
}

fn absolutize(project_root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}
