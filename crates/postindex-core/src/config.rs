use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::FieldKind;

/// Smallest writer heap tantivy accepts for a single indexing thread.
pub const MIN_WRITER_HEAP_BYTES: usize = 15_000_000;

/// Attributes indexed when the operator has not selected any field.
pub const DEFAULT_FIELDS: [&str; 4] = ["post_content", "post_title", "post_type", "post_author"];

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, env_name };
        config.validate_for_env()?;
        Ok(config)
    }

    /// Builds a config from an explicit provider stack (tests, embedding).
    pub fn from_figment(figment: Figment, env_name: &str) -> anyhow::Result<Self> {
        let config = Self { figment, env_name: env_name.to_string() };
        config.validate_for_env()?;
        Ok(config)
    }

    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        Self::from_figment(Figment::from(Toml::string(toml)), "test")
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed, validated settings. Missing sections take their defaults.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    fn validate_for_env(&self) -> anyhow::Result<()> {
        match self.env_name.as_str() {
            "prod" | "production" => {
                let dir: Option<String> = self.figment.extract_inner("index.dir").ok();
                if dir.is_none() {
                    return Err(anyhow::anyhow!("Prod config must set index.dir to a persistent location"));
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub index: IndexSettings,
    pub fields: FieldSettings,
    pub store: StoreSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.index.validate()?;
        self.fields.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Index root directory; `None` keeps the index in memory.
    pub dir: Option<String>,
    pub writer_heap_bytes: usize,
    pub bulk_size: usize,
    pub sample_limit: usize,
    pub meta_cache_ttl_secs: u64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            dir: None,
            writer_heap_bytes: 50_000_000,
            bulk_size: 500,
            sample_limit: 1000,
            meta_cache_ttl_secs: 60 * 60 * 24,
        }
    }
}

impl IndexSettings {
    pub fn meta_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.meta_cache_ttl_secs)
    }

    pub fn resolved_dir(&self, base: &Path) -> Option<PathBuf> {
        self.dir.as_deref().map(|d| resolve_with_base(base, d))
    }

    fn validate(&self) -> Result<()> {
        if self.bulk_size == 0 {
            return Err(Error::InvalidConfig("index.bulk_size must be positive".into()));
        }
        if self.sample_limit == 0 {
            return Err(Error::InvalidConfig("index.sample_limit must be positive".into()));
        }
        if self.writer_heap_bytes < MIN_WRITER_HEAP_BYTES {
            return Err(Error::InvalidConfig(format!(
                "index.writer_heap_bytes must be at least {MIN_WRITER_HEAP_BYTES}"
            )));
        }
        Ok(())
    }
}

/// Operator selection of indexed fields and their kind flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    pub fields: Vec<String>,
    pub numeric: Vec<String>,
    pub not_analyzed: Vec<String>,
    pub date: Vec<String>,
    /// Restricts indexing to these content types when set.
    pub types: Option<Vec<String>>,
}

impl FieldSettings {
    pub fn with_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { fields: fields.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    #[must_use]
    pub fn numeric<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn not_analyzed<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_analyzed.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn date<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date.extend(names.into_iter().map(Into::into));
        self
    }

    /// Selected field names, falling back to [`DEFAULT_FIELDS`].
    pub fn selected(&self) -> Vec<String> {
        if self.fields.is_empty() {
            DEFAULT_FIELDS.iter().map(ToString::to_string).collect()
        } else {
            self.fields.clone()
        }
    }

    pub fn kind_of(&self, name: &str) -> FieldKind {
        let flagged = |list: &[String]| list.iter().any(|n| n == name);
        if flagged(&self.numeric) {
            FieldKind::Numeric
        } else if flagged(&self.date) {
            FieldKind::Date
        } else if flagged(&self.not_analyzed) {
            FieldKind::NotAnalyzed
        } else {
            FieldKind::Default
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(name) = self.numeric.iter().find(|n| self.not_analyzed.contains(n)) {
            return Err(Error::InvalidConfig(format!(
                "field '{name}' is flagged both numeric and not_analyzed"
            )));
        }
        if !self.fields.is_empty() {
            let flagged = self.numeric.iter().chain(&self.not_analyzed).chain(&self.date);
            if let Some(name) = flagged.into_iter().find(|n| !self.fields.contains(n)) {
                return Err(Error::InvalidConfig(format!(
                    "field '{name}' is flagged but not selected for indexing"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub data_dir: Option<String>,
    pub excluded_types: Vec<String>,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_sections() {
        let config = Config::from_toml_str("").expect("config");
        let settings = config.settings().expect("settings");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.index.meta_cache_ttl(), Duration::from_secs(86_400));
        assert_eq!(settings.fields.selected(), DEFAULT_FIELDS.to_vec());
    }

    #[test]
    fn field_flags_are_read_from_toml() {
        let config = Config::from_toml_str(
            r#"
            [fields]
            fields = ["field3", "some_field", "post_date"]
            numeric = ["field3"]
            not_analyzed = ["some_field"]
            "#,
        )
        .expect("config");
        let fields = config.settings().expect("settings").fields;
        assert_eq!(fields.kind_of("field3"), FieldKind::Numeric);
        assert_eq!(fields.kind_of("some_field"), FieldKind::NotAnalyzed);
        assert_eq!(fields.kind_of("post_date"), FieldKind::Default);
    }

    #[test]
    fn conflicting_flags_are_rejected() {
        let fields = FieldSettings::with_fields(["a"]).numeric(["a"]).not_analyzed(["a"]);
        assert!(matches!(fields.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn flag_on_unselected_field_is_rejected() {
        let fields = FieldSettings::with_fields(["a"]).numeric(["b"]);
        assert!(fields.validate().is_err());
    }

    #[test]
    fn tiny_writer_heap_is_rejected() {
        let settings = Settings {
            index: IndexSettings { writer_heap_bytes: 1_000, ..IndexSettings::default() },
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn prod_requires_index_dir() {
        let figment = Figment::from(Toml::string(""));
        assert!(Config::from_figment(figment, "prod").is_err());
        let figment = Figment::from(Toml::string("[index]\ndir = \"/var/lib/postindex\""));
        assert!(Config::from_figment(figment, "prod").is_ok());
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/srv/app");
        assert_eq!(resolve_with_base(base, "idx"), PathBuf::from("/srv/app/idx"));
        assert_eq!(resolve_with_base(base, "/abs/idx"), PathBuf::from("/abs/idx"));
    }
}
