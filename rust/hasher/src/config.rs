use std::fmt;
use std::num::NonZeroU32;
use std::path::Path;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use hashvec_error::{ErrorCodes, HashvecError, HashvecValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

pub const DEFAULT_N_FEATURES: u64 = 1 << 20;
pub const MAX_N_FEATURES: u64 = (1 << 31) - 1;

const DEFAULT_CONFIG_PATH: &str = "./hashvec_config.yaml";
const ENV_PREFIX: &str = "HASHVEC_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid number of features ({0}), expected a value in [1, 2^31)")]
    NFeaturesOutOfRange(u64),
    #[error(transparent)]
    Validation(#[from] HashvecValidationError),
    #[error("Error loading config: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("Sample has shape `{found}` but the hasher expects `{expected}`")]
    InputShapeMismatch {
        expected: InputShape,
        found: InputShape,
    },
    #[error("Configured value dtype `{configured}` does not match requested `{requested}`")]
    DtypeMismatch {
        configured: ValueDtype,
        requested: ValueDtype,
    },
}

impl HashvecError for ConfigError {
    fn code(&self) -> ErrorCodes {
        match self {
            ConfigError::Validation(err) => err.code(),
            _ => ErrorCodes::InvalidArgument,
        }
    }
}

/// Which of the three accepted sample shapes a hasher consumes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputShape {
    /// Name to value mappings.
    #[default]
    #[serde(alias = "dict")]
    Mapping,
    /// Sequences of `(name, value)` pairs.
    #[serde(alias = "pair")]
    Pairs,
    /// Sequences of bare names with an implicit value of 1.
    #[serde(alias = "string")]
    Names,
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputShape::Mapping => f.write_str("mapping"),
            InputShape::Pairs => f.write_str("pairs"),
            InputShape::Names => f.write_str("names"),
        }
    }
}

/// Element type of the assembled matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueDtype {
    Float32,
    #[default]
    Float64,
    Int32,
    Int64,
}

impl fmt::Display for ValueDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueDtype::Float32 => f.write_str("float32"),
            ValueDtype::Float64 => f.write_str("float64"),
            ValueDtype::Int32 => f.write_str("int32"),
            ValueDtype::Int64 => f.write_str("int64"),
        }
    }
}

/// When the feature name to column mapping is recorded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingPersistence {
    /// Never record.
    #[default]
    Off,
    /// Record during `fit`/`fit_transform` only. Each fit replaces the mapping.
    Fit,
    /// Record during fits and every later `transform`, growing the mapping.
    Always,
}

impl MappingPersistence {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, MappingPersistence::Off)
    }
}

fn default_n_features() -> u64 {
    DEFAULT_N_FEATURES
}

fn default_alternate_sign() -> bool {
    true
}

/// Immutable configuration of a [`crate::FeatureHasher`].
///
/// To change a setting build a new hasher from a new config; the hasher never
/// mutates its configuration after construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct HasherConfig {
    /// Number of output columns. Small values collide often.
    #[validate(range(min = 1, max = 2147483647))]
    #[serde(default = "default_n_features")]
    pub n_features: u64,
    #[serde(default)]
    pub input_shape: InputShape,
    #[serde(default)]
    pub value_dtype: ValueDtype,
    /// Flip the sign of a contribution when its hash is negative, so that
    /// collisions tend to cancel instead of pile up.
    #[serde(default = "default_alternate_sign")]
    pub alternate_sign: bool,
    /// Deprecated: take the absolute value of every stored entry.
    #[serde(default)]
    pub non_negative: bool,
    #[serde(default)]
    pub mapping_persistence: MappingPersistence,
    /// Hash a textual value `v` of feature `f` as the feature `f=v` with value 1
    /// instead of rejecting it.
    #[serde(default)]
    pub expand_string_values: bool,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            n_features: default_n_features(),
            input_shape: InputShape::default(),
            value_dtype: ValueDtype::default(),
            alternate_sign: default_alternate_sign(),
            non_negative: false,
            mapping_persistence: MappingPersistence::default(),
            expand_string_values: false,
        }
    }
}

impl HasherConfig {
    /// Checks every field and returns the validated column count.
    pub fn validate_config(&self) -> Result<NonZeroU32, ConfigError> {
        self.validate().map_err(HashvecValidationError::from)?;
        u32::try_from(self.n_features)
            .ok()
            .and_then(NonZeroU32::new)
            .filter(|n| u64::from(n.get()) <= MAX_N_FEATURES)
            .ok_or(ConfigError::NFeaturesOutOfRange(self.n_features))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Loads defaults, then the YAML file at `path` if it exists, then
    /// `HASHVEC_`-prefixed environment variables, and validates the result.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut f = Figment::from(Serialized::defaults(HasherConfig::default()));
        if path.exists() {
            f = f.merge(Yaml::file(path));
        }
        // Figment splits nested keys on `.`, so double underscores in
        // variable names stand in for nesting.
        f = f.merge(Env::prefixed(ENV_PREFIX).map(|k| k.as_str().replace("__", ".").into()));
        let config: HasherConfig = f.extract().map_err(Box::new)?;
        config.validate_config()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config_is_valid() {
        let config = HasherConfig::default();
        assert_eq!(config.n_features, 1 << 20);
        assert_eq!(config.input_shape, InputShape::Mapping);
        assert_eq!(config.value_dtype, ValueDtype::Float64);
        assert!(config.alternate_sign);
        assert!(!config.non_negative);
        assert_eq!(config.mapping_persistence, MappingPersistence::Off);
        assert_eq!(config.validate_config().unwrap().get(), 1 << 20);
    }

    #[test]
    fn test_n_features_bounds() {
        for bad in [0, MAX_N_FEATURES + 1, u64::MAX] {
            let config = HasherConfig {
                n_features: bad,
                ..Default::default()
            };
            let err = config.validate_config().unwrap_err();
            assert_eq!(err.code(), ErrorCodes::InvalidArgument);
        }
        for good in [1, 5, MAX_N_FEATURES] {
            let config = HasherConfig {
                n_features: good,
                ..Default::default()
            };
            assert_eq!(u64::from(config.validate_config().unwrap().get()), good);
        }
    }

    #[test]
    fn test_deserialize_accepts_legacy_names() {
        let config: HasherConfig = serde_json::from_str(
            r#"{"n_features": 16, "input_shape": "string", "mapping_persistence": "always"}"#,
        )
        .unwrap();
        assert_eq!(config.input_shape, InputShape::Names);
        assert_eq!(config.mapping_persistence, MappingPersistence::Always);
        assert!(config.alternate_sign);

        let pair: InputShape = serde_json::from_str(r#""pair""#).unwrap();
        assert_eq!(pair, InputShape::Pairs);
    }

    #[test]
    fn test_deserialize_rejects_unknown_values() {
        assert!(serde_json::from_str::<HasherConfig>(r#"{"input_shape": "gobbledygook"}"#).is_err());
        assert!(
            serde_json::from_str::<HasherConfig>(r#"{"mapping_persistence": "naruto"}"#).is_err()
        );
        assert!(serde_json::from_str::<HasherConfig>(r#"{"n_features": "ham"}"#).is_err());
        assert!(serde_json::from_str::<HasherConfig>(r#"{"n_features": 2.5}"#).is_err());
        assert!(serde_json::from_str::<HasherConfig>(r#"{"n_features": -1}"#).is_err());
        assert!(serde_json::from_str::<HasherConfig>(r#"{"bogus": 1}"#).is_err());
    }

    #[test]
    fn test_load_from_yaml_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "hashvec.yaml",
                "n_features: 16\ninput_shape: pairs\nalternate_sign: false\n",
            )?;
            jail.set_env("HASHVEC_MAPPING_PERSISTENCE", "fit");
            let config = HasherConfig::load_from_path("hashvec.yaml").expect("config should load");
            assert_eq!(config.n_features, 16);
            assert_eq!(config.input_shape, InputShape::Pairs);
            assert!(!config.alternate_sign);
            assert_eq!(config.mapping_persistence, MappingPersistence::Fit);
            assert_eq!(config.value_dtype, ValueDtype::Float64);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file("hashvec.yaml", "n_features: 16")?;
            jail.set_env("HASHVEC_N_FEATURES", 32);
            let config = HasherConfig::load_from_path("hashvec.yaml").expect("config should load");
            assert_eq!(config.n_features, 32);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_out_of_range_n_features() {
        Jail::expect_with(|jail| {
            jail.create_file("hashvec.yaml", "n_features: 0")?;
            let err = HasherConfig::load_from_path("hashvec.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_malformed_values() {
        Jail::expect_with(|jail| {
            jail.create_file("hashvec.yaml", "input_shape: gobbledygook")?;
            let err = HasherConfig::load_from_path("hashvec.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::Load(_)));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = HasherConfig::load_from_path("missing.yaml").expect("config should load");
            assert_eq!(config, HasherConfig::default());
            Ok(())
        });
    }
}
