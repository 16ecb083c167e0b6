//! Configuration loader, typed sections and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_RANKING__ALPHA`). Provides helpers
//! to expand `~` and `${VAR}` and to resolve relative paths against a known
//! base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Load with an explicit config directory and environment name.
    pub fn load_from(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))
    }

    fn validate(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        settings.ranking.validate()?;
        if settings.embedding.dimension == 0 {
            return Err(Error::config("embedding.dimension must be positive").into());
        }
        Ok(())
    }
}

/// All typed configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub dataset_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { dataset_path: "data/icd10.json".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dimension: 384 }
    }
}

/// Tunable constants of the ranking pipeline.
///
/// The defaults are reasonable starting points, not calibrated truth; validate
/// them against labeled data before relying on absolute confidence values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Weight of semantic similarity in the fused confidence; `1 - alpha` goes to agreement.
    pub alpha: f64,
    pub category_weight: f64,
    pub chapter_weight: f64,
    /// Inclusive lower bound on confidence.
    pub min_confidence: f64,
    pub top_k: usize,
    /// Upper bound on neighbours requested from the index.
    pub max_candidates: usize,
    pub enable_fusion: bool,
    pub fusion_bonus: f64,
    pub fusion_penalty: f64,
    /// Cap applied separately to the total bonus and the total penalty.
    pub fusion_cap: f64,
    pub chapter_hint_bonus: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            category_weight: 1.0,
            chapter_weight: 0.4,
            min_confidence: 0.5,
            top_k: 5,
            max_candidates: 50,
            enable_fusion: true,
            fusion_bonus: 0.05,
            fusion_penalty: 0.05,
            fusion_cap: 0.15,
            chapter_hint_bonus: 0.0,
        }
    }
}

fn check_unit(name: &str, v: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&v) {
        return Err(Error::config(format!("{} must be within [0, 1], got {}", name, v)));
    }
    Ok(())
}

fn check_magnitude(name: &str, v: f64) -> Result<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(Error::config(format!("{} must be finite and non-negative, got {}", name, v)));
    }
    Ok(())
}

impl RankingConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit("alpha", self.alpha)?;
        check_unit("min_confidence", self.min_confidence)?;
        check_unit("chapter_hint_bonus", self.chapter_hint_bonus)?;
        if !(self.chapter_weight > 0.0 && self.category_weight > self.chapter_weight && self.category_weight.is_finite()) {
            return Err(Error::config(format!(
                "weights must satisfy category_weight > chapter_weight > 0, got {} and {}",
                self.category_weight, self.chapter_weight
            )));
        }
        if self.top_k == 0 {
            return Err(Error::config("top_k must be positive"));
        }
        if self.max_candidates == 0 {
            return Err(Error::config("max_candidates must be positive"));
        }
        check_magnitude("fusion_bonus", self.fusion_bonus)?;
        check_magnitude("fusion_penalty", self.fusion_penalty)?;
        check_magnitude("fusion_cap", self.fusion_cap)?;
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
