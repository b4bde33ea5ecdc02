//! Recovery engine configuration.
//!
//! Every threshold the engine applies is a named, injectable value here.
//! Configuration can be loaded from:
//! - TOML files (`[recovery]` table, path from `REANCHOR_CONFIG`)
//! - Environment variables (`REANCHOR_*` prefixed)
//!
//! # Example
//!
//! ```rust,no_run
//! use reanchor_core::config::RecoveryConfig;
//!
//! // Load from REANCHOR_CONFIG or fall back to env vars
//! let config = RecoveryConfig::load().expect("Failed to load config");
//!
//! // Or tune a single band in code
//! let strict = RecoveryConfig::default().with_annotation_success(0.9);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

use crate::defaults;

/// Environment variable naming a TOML config file.
pub const CONFIG_PATH_ENV: &str = "REANCHOR_CONFIG";

/// `${VAR}` placeholders in config files.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid placeholder pattern"));

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid exact match policy: {0}")]
    InvalidPolicy(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn check_unit(name: &str, value: f32) -> ConfigResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

// =============================================================================
// THRESHOLD GROUPS
// =============================================================================

/// Acceptance floors and classification bands for annotation recovery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationThresholds {
    /// Minimum similarity for the context and chunk-bounded tiers
    pub tier_acceptance: f32,
    /// Multiplier applied to trigram fallback scores
    pub trigram_penalty: f32,
    /// Auto-accept at or above this confidence
    pub success: f32,
    /// Review at or above this confidence
    pub review: f32,
}

impl Default for AnnotationThresholds {
    fn default() -> Self {
        Self {
            tier_acceptance: defaults::TIER_ACCEPTANCE,
            trigram_penalty: defaults::TRIGRAM_PENALTY,
            success: defaults::ANNOTATION_SUCCESS,
            review: defaults::ANNOTATION_REVIEW,
        }
    }
}

impl AnnotationThresholds {
    /// Floor for penalized trigram fallback confidence.
    pub fn trigram_floor(&self) -> f32 {
        self.tier_acceptance * self.trigram_penalty
    }

    pub fn validate(&self) -> ConfigResult<()> {
        check_unit("annotation.tier_acceptance", self.tier_acceptance)?;
        check_unit("annotation.trigram_penalty", self.trigram_penalty)?;
        check_unit("annotation.success", self.success)?;
        check_unit("annotation.review", self.review)?;
        if self.review > self.success {
            return Err(ConfigError::Validation(format!(
                "annotation.review ({}) must not exceed annotation.success ({})",
                self.review, self.success
            )));
        }
        Ok(())
    }
}

/// Acceptance floor and classification bands for connection remapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionThresholds {
    /// Minimum cosine similarity for an embedding candidate
    pub embedding_floor: f32,
    /// Update ids silently at or above this combined similarity
    pub success: f32,
    /// Update ids and flag for review at or above this combined similarity
    pub review: f32,
}

impl Default for ConnectionThresholds {
    fn default() -> Self {
        Self {
            embedding_floor: defaults::EMBEDDING_FLOOR,
            success: defaults::CONNECTION_SUCCESS,
            review: defaults::CONNECTION_REVIEW,
        }
    }
}

impl ConnectionThresholds {
    pub fn validate(&self) -> ConfigResult<()> {
        check_unit("connection.embedding_floor", self.embedding_floor)?;
        check_unit("connection.success", self.success)?;
        check_unit("connection.review", self.review)?;
        if self.review > self.success {
            return Err(ConfigError::Validation(format!(
                "connection.review ({}) must not exceed connection.success ({})",
                self.review, self.success
            )));
        }
        Ok(())
    }
}

/// Sliding window scan parameters shared by the fuzzy tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Fraction of the needle length explored as window length variation
    pub length_tolerance: f32,
    /// Cap on the window length variation in characters
    pub max_length_delta: usize,
    /// Cap on the coarse scan step in characters
    pub max_step: usize,
    /// Needle length divisor giving the coarse step
    pub step_divisor: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            length_tolerance: defaults::SCAN_LENGTH_TOLERANCE,
            max_length_delta: defaults::SCAN_MAX_LENGTH_DELTA,
            max_step: defaults::SCAN_MAX_STEP,
            step_divisor: defaults::SCAN_STEP_DIVISOR,
        }
    }
}

impl ScanConfig {
    /// Coarse scan step for a needle of `needle_len` characters.
    pub fn step_for(&self, needle_len: usize) -> usize {
        (needle_len / self.step_divisor.max(1)).clamp(1, self.max_step.max(1))
    }

    /// Window length variation explored around `needle_len`.
    pub fn length_delta(&self, needle_len: usize) -> usize {
        let delta = (needle_len as f32 * self.length_tolerance).round() as usize;
        delta.min(self.max_length_delta)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(0.0..1.0).contains(&self.length_tolerance) {
            return Err(ConfigError::Validation(format!(
                "scan.length_tolerance must be within [0, 1), got {}",
                self.length_tolerance
            )));
        }
        if self.step_divisor == 0 || self.max_step == 0 {
            return Err(ConfigError::Validation(
                "scan.step_divisor and scan.max_step must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// How the exact tier picks among repeated occurrences of the same text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExactMatchPolicy {
    /// First occurrence in the document
    #[default]
    Leftmost,
    /// Occurrence whose surroundings best match the captured context
    PreferContext,
}

impl FromStr for ExactMatchPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "leftmost" => Ok(Self::Leftmost),
            "prefer_context" | "prefer-context" => Ok(Self::PreferContext),
            _ => Err(ConfigError::InvalidPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for ExactMatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leftmost => write!(f, "leftmost"),
            Self::PreferContext => write!(f, "prefer_context"),
        }
    }
}

// =============================================================================
// RECOVERY CONFIG
// =============================================================================

/// Complete recovery engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub exact_policy: ExactMatchPolicy,
    /// Fold quotes, dashes and soft hyphens before trigram scoring
    pub fold_typography: bool,
    /// Characters of context captured around a recovered span
    pub context_window: usize,
    pub annotation: AnnotationThresholds,
    pub connection: ConnectionThresholds,
    pub scan: ScanConfig,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            annotation: AnnotationThresholds::default(),
            connection: ConnectionThresholds::default(),
            scan: ScanConfig::default(),
            exact_policy: ExactMatchPolicy::default(),
            fold_typography: true,
            context_window: defaults::CONTEXT_WINDOW,
        }
    }
}

impl RecoveryConfig {
    /// Load from the file named by `REANCHOR_CONFIG`, falling back to env vars.
    pub fn load() -> ConfigResult<Self> {
        match env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from) {
            Some(path) if path.exists() => {
                info!("Loading recovery config from: {}", path.display());
                Self::from_file(&path)
            }
            Some(path) => {
                debug!(
                    "Config file not found at {}, using environment variables",
                    path.display()
                );
                Self::from_env()
            }
            None => Self::from_env(),
        }
    }

    /// Load configuration from a TOML file with a `[recovery]` table.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let content = substitute_env_vars(&content, |name| env::var(name).ok());
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        #[derive(Deserialize)]
        struct TomlRoot {
            #[serde(default)]
            recovery: RecoveryConfig,
        }

        let root: TomlRoot = toml::from_str(content)?;
        root.recovery.validate()?;
        Ok(root.recovery)
    }

    /// Load configuration from `REANCHOR_*` environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Unset or unparsable numeric values keep their defaults; an unknown
    /// exact match policy is an error.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
            lookup(name).and_then(|v| v.trim().parse().ok())
        }

        let mut config = Self::default();
        let a = &mut config.annotation;
        if let Some(v) = parse(&lookup, "REANCHOR_TIER_ACCEPTANCE") {
            a.tier_acceptance = v;
        }
        if let Some(v) = parse(&lookup, "REANCHOR_TRIGRAM_PENALTY") {
            a.trigram_penalty = v;
        }
        if let Some(v) = parse(&lookup, "REANCHOR_ANNOTATION_SUCCESS") {
            a.success = v;
        }
        if let Some(v) = parse(&lookup, "REANCHOR_ANNOTATION_REVIEW") {
            a.review = v;
        }

        let c = &mut config.connection;
        if let Some(v) = parse(&lookup, "REANCHOR_EMBEDDING_FLOOR") {
            c.embedding_floor = v;
        }
        if let Some(v) = parse(&lookup, "REANCHOR_CONNECTION_SUCCESS") {
            c.success = v;
        }
        if let Some(v) = parse(&lookup, "REANCHOR_CONNECTION_REVIEW") {
            c.review = v;
        }

        if let Some(policy) = lookup("REANCHOR_EXACT_POLICY") {
            config.exact_policy = policy.trim().parse()?;
        }
        if let Some(fold) = lookup("REANCHOR_FOLD_TYPOGRAPHY") {
            config.fold_typography = fold != "false" && fold != "0";
        }
        if let Some(v) = parse(&lookup, "REANCHOR_CONTEXT_WINDOW") {
            config.context_window = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate every threshold group.
    pub fn validate(&self) -> ConfigResult<()> {
        self.annotation.validate()?;
        self.connection.validate()?;
        self.scan.validate()?;
        Ok(())
    }

    pub fn with_annotation_thresholds(mut self, thresholds: AnnotationThresholds) -> Self {
        self.annotation = thresholds;
        self
    }

    pub fn with_connection_thresholds(mut self, thresholds: ConnectionThresholds) -> Self {
        self.connection = thresholds;
        self
    }

    pub fn with_annotation_success(mut self, success: f32) -> Self {
        self.annotation.success = success;
        self
    }

    pub fn with_exact_policy(mut self, policy: ExactMatchPolicy) -> Self {
        self.exact_policy = policy;
        self
    }

    pub fn with_fold_typography(mut self, fold: bool) -> Self {
        self.fold_typography = fold;
        self
    }

    pub fn with_context_window(mut self, window: usize) -> Self {
        self.context_window = window;
        self
    }
}

/// Replace `${VAR}` placeholders; unknown variables are left as written.
fn substitute_env_vars<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_VAR_PATTERN.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        lookup(var_name).unwrap_or_else(|| format!("${{{}}}", var_name))
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_is_valid() {
        let config = RecoveryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.exact_policy, ExactMatchPolicy::Leftmost);
        assert!(config.fold_typography);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = RecoveryConfig::from_lookup(lookup_from(&[
            ("REANCHOR_ANNOTATION_SUCCESS", "0.9"),
            ("REANCHOR_CONNECTION_REVIEW", "0.8"),
            ("REANCHOR_EXACT_POLICY", "prefer_context"),
            ("REANCHOR_FOLD_TYPOGRAPHY", "false"),
        ]))
        .unwrap();

        assert_eq!(config.annotation.success, 0.9);
        assert_eq!(config.connection.review, 0.8);
        assert_eq!(config.exact_policy, ExactMatchPolicy::PreferContext);
        assert!(!config.fold_typography);
        assert_eq!(config.annotation.review, defaults::ANNOTATION_REVIEW);
    }

    #[test]
    fn test_from_lookup_ignores_garbage_numbers() {
        let config =
            RecoveryConfig::from_lookup(lookup_from(&[("REANCHOR_TIER_ACCEPTANCE", "lots")]))
                .unwrap();
        assert_eq!(config.annotation.tier_acceptance, defaults::TIER_ACCEPTANCE);
    }

    #[test]
    fn test_from_lookup_rejects_unknown_policy() {
        let result = RecoveryConfig::from_lookup(lookup_from(&[("REANCHOR_EXACT_POLICY", "rightmost")]));
        assert!(matches!(result, Err(ConfigError::InvalidPolicy(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_bands() {
        let config = RecoveryConfig::default().with_annotation_success(0.5);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let config = RecoveryConfig::default().with_connection_thresholds(ConnectionThresholds {
            embedding_floor: 0.75,
            success: 0.8,
            review: 0.9,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = RecoveryConfig::default().with_annotation_thresholds(AnnotationThresholds {
            trigram_penalty: 1.5,
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_partial_table() {
        let toml_str = r#"
            [recovery]
            exact_policy = "prefer_context"

            [recovery.connection]
            success = 0.97
        "#;
        let config = RecoveryConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.exact_policy, ExactMatchPolicy::PreferContext);
        assert_eq!(config.connection.success, 0.97);
        assert_eq!(config.connection.review, defaults::CONNECTION_REVIEW);
        assert_eq!(config.annotation, AnnotationThresholds::default());
    }

    #[test]
    fn test_from_toml_empty_is_default() {
        let config = RecoveryConfig::from_toml_str("").unwrap();
        assert_eq!(config, RecoveryConfig::default());
    }

    #[test]
    fn test_from_toml_invalid_values() {
        let toml_str = r#"
            [recovery.annotation]
            review = 0.95
        "#;
        assert!(RecoveryConfig::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn test_scan_steps() {
        let scan = ScanConfig::default();
        assert_eq!(scan.step_for(5), 1);
        assert_eq!(scan.step_for(52), 2);
        assert_eq!(scan.step_for(10_000), 10);
        assert_eq!(scan.length_delta(52), 5);
        assert_eq!(scan.length_delta(2_000), 32);
    }

    #[test]
    fn test_env_var_substitution() {
        let content = "success = ${REANCHOR_TEST_SUCCESS}\nreview = ${MISSING_VAR_12345}";
        let result = substitute_env_vars(content, lookup_from(&[("REANCHOR_TEST_SUCCESS", "0.9")]));
        assert_eq!(result, "success = 0.9\nreview = ${MISSING_VAR_12345}");
    }

    #[test]
    fn test_exact_policy_roundtrip() {
        for policy in [ExactMatchPolicy::Leftmost, ExactMatchPolicy::PreferContext] {
            assert_eq!(policy.to_string().parse::<ExactMatchPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_serialize_recovery_config() {
        #[derive(Serialize)]
        struct Root<'a> {
            recovery: &'a RecoveryConfig,
        }
        let config = RecoveryConfig::default();
        let serialized = toml::to_string(&Root { recovery: &config }).unwrap();
        assert!(serialized.contains("[recovery.annotation]"));
        let back = RecoveryConfig::from_toml_str(&serialized).unwrap();
        assert_eq!(back, config);
    }
}
