//! Hook configuration.
//!
//! [`HookOptions`] may be partially filled in; [`HookOptions::resolve`] fills
//! every unset field with its default, reading the environment where a default
//! comes from an environment variable. The result, [`ResolvedOptions`], is
//! immutable for the life of the hook. This is the only place the crate reads
//! the process environment.
//!
//! | field | default |
//! |---|---|
//! | `levels` | panic, fatal, error, warn |
//! | `env` | `$FAULTLINE_ENV`, else `"local"` |
//! | `app_version` | `$FAULTLINE_APP_VERSION`, else empty |
//! | `api_key` | `$FAULTLINE_API_KEY`, else empty |
//! | `enabled_envs` | `prod`, `staging`, `test` |
//! | `project_packages` | `main`, `src/*`, `crates/*` |
//!
//! Empty strings and empty lists count as unset. The API key is not checked
//! here; an empty key is passed on to the notifier as is.
//!
//! # Examples
//!
//! ```
//! use faultline::{HookOptions, Level};
//!
//! let options = HookOptions {
//!     env: Some("staging".to_string()),
//!     ..HookOptions::default()
//! }
//! .resolve_with(|_| None);
//!
//! assert_eq!(options.env(), "staging");
//! assert!(options.is_enabled_for(Level::Warn));
//! assert!(!options.is_enabled_for(Level::Info));
//! ```

use crate::{
    entry::Level,
    notifier::{DiagnosticLogger, NotifierConfig, PanicHandler},
};

/// Environment variable holding the release stage.
pub const ENV_VAR_ENV: &str = "FAULTLINE_ENV";
/// Environment variable holding the application version.
pub const ENV_VAR_APP_VERSION: &str = "FAULTLINE_APP_VERSION";
/// Environment variable holding the API key.
pub const ENV_VAR_API_KEY: &str = "FAULTLINE_API_KEY";

/// Release stage used when neither the options nor the environment name one.
pub const DEFAULT_ENV: &str = "local";
/// Levels reported by default.
pub const DEFAULT_LEVELS: [Level; 4] = [Level::Panic, Level::Fatal, Level::Error, Level::Warn];
/// Release stages in which reports are delivered by default.
pub const DEFAULT_ENABLED_ENVS: [&str; 3] = ["prod", "staging", "test"];
/// Patterns identifying application frames by default: the binary's `main`
/// and sources under the workspace's `src/` and `crates/` directories.
pub const DEFAULT_PROJECT_PACKAGES: [&str; 3] = ["main", "src/*", "crates/*"];

/// Possibly incomplete hook configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HookOptions {
    /// Levels the hook reports.
    pub levels: Vec<Level>,
    /// Release stage name.
    pub env: Option<String>,
    /// Application version.
    pub app_version: Option<String>,
    /// Notifier API key.
    pub api_key: Option<String>,
    /// Release stages in which delivery is enabled.
    pub enabled_envs: Vec<String>,
    /// Patterns identifying the application's own frames.
    pub project_packages: Vec<String>,
}

impl HookOptions {
    /// Resolves the options, reading unset values from the process
    /// environment.
    pub fn resolve(self) -> ResolvedOptions {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolves the options, reading unset values through `lookup`.
    ///
    /// `lookup` is only called for fields that are unset.
    pub fn resolve_with<F>(self, lookup: F) -> ResolvedOptions
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let levels = if self.levels.is_empty() {
            DEFAULT_LEVELS.to_vec()
        } else {
            self.levels
        };
        let env = non_empty(self.env)
            .or_else(|| from_env(ENV_VAR_ENV))
            .unwrap_or_else(|| DEFAULT_ENV.to_string());
        let app_version = non_empty(self.app_version)
            .or_else(|| from_env(ENV_VAR_APP_VERSION))
            .unwrap_or_default();
        let api_key = non_empty(self.api_key)
            .or_else(|| from_env(ENV_VAR_API_KEY))
            .unwrap_or_default();
        let enabled_envs = or_defaults(self.enabled_envs, &DEFAULT_ENABLED_ENVS);
        let project_packages = or_defaults(self.project_packages, &DEFAULT_PROJECT_PACKAGES);

        ResolvedOptions {
            levels,
            env,
            app_version,
            api_key,
            enabled_envs,
            project_packages,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn or_defaults(values: Vec<String>, defaults: &[&str]) -> Vec<String> {
    if values.is_empty() {
        defaults.iter().map(|value| value.to_string()).collect()
    } else {
        values
    }
}

/// Fully populated hook configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedOptions {
    levels: Vec<Level>,
    env: String,
    app_version: String,
    api_key: String,
    enabled_envs: Vec<String>,
    project_packages: Vec<String>,
}

impl ResolvedOptions {
    /// Levels the hook reports.
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Returns true if entries at `level` are reported.
    pub fn is_enabled_for(&self, level: Level) -> bool {
        self.levels.contains(&level)
    }

    /// Release stage name.
    pub fn env(&self) -> &str {
        &self.env
    }

    /// Application version, possibly empty.
    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    /// Notifier API key, possibly empty.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Release stages in which delivery is enabled.
    pub fn enabled_envs(&self) -> &[String] {
        &self.enabled_envs
    }

    /// Patterns identifying the application's own frames.
    pub fn project_packages(&self) -> &[String] {
        &self.project_packages
    }

    /// Builds the notifier construction record: a no-op panic handler, so the
    /// notifier does not install panic recovery of its own, and an error-level
    /// diagnostic logger.
    pub fn notifier_config(&self) -> NotifierConfig {
        NotifierConfig {
            api_key: self.api_key.clone(),
            release_stage: self.env.clone(),
            project_packages: self.project_packages.clone(),
            app_version: self.app_version.clone(),
            notify_release_stages: self.enabled_envs.clone(),
            panic_handler: PanicHandler::noop(),
            logger: DiagnosticLogger::DEFAULT,
        }
    }
}

impl From<HookOptions> for ResolvedOptions {
    fn from(options: HookOptions) -> Self {
        options.resolve()
    }
}
