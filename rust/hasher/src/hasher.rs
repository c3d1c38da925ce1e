use std::marker::PhantomData;
use std::num::NonZeroU32;

use hashvec_error::{ErrorCodes, HashvecError};
use sprs::CsMat;
use thiserror::Error;

use crate::accumulator::{AccumulateError, SampleAccumulator};
use crate::assembler::{AssembleError, CsrAssembler, CsrTriples, HashValue};
use crate::config::{ConfigError, HasherConfig, MappingPersistence};
use crate::hash::{FeatureHashFunction, Murmur3Hasher};
use crate::mapping::{FeatureMap, MappingError};
use crate::types::{FeatureValue, RawSample};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid feature: {0}")]
    Accumulate(#[from] AccumulateError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

impl HashvecError for TransformError {
    fn code(&self) -> ErrorCodes {
        match self {
            TransformError::Config(err) => err.code(),
            TransformError::Accumulate(err) => err.code(),
            TransformError::Assemble(err) => err.code(),
        }
    }
}

/// Turns streams of samples into `n_samples x n_features` CSR matrices with
/// the hashing trick.
///
/// The element type `T` is the configured value dtype. A hasher only holds
/// state when mapping persistence is enabled; it is meant to be used from one
/// thread at a time, so hash independent partitions with independent hashers
/// and stack the results.
///
/// # Examples
///
/// ```
/// use hashvec::{FeatureHasher, HasherConfig, RawSample};
///
/// let mut hasher = FeatureHasher::<f64>::new(HasherConfig {
///     n_features: 10,
///     ..Default::default()
/// })
/// .unwrap();
/// let matrix = hasher
///     .transform([
///         RawSample::mapping([("dog", 1), ("cat", 2), ("elephant", 4)]),
///         RawSample::mapping([("dog", 2), ("run", 5)]),
///     ])
///     .unwrap();
/// assert_eq!(matrix.get(0, 9), Some(&2.0));
/// assert_eq!(matrix.get(1, 4), Some(&-5.0));
/// ```
#[derive(Debug)]
pub struct FeatureHasher<T: HashValue = f64, H: FeatureHashFunction = Murmur3Hasher> {
    config: HasherConfig,
    n_features: NonZeroU32,
    hasher: H,
    feature_map: Option<FeatureMap>,
    _value: PhantomData<T>,
}

impl<T: HashValue> FeatureHasher<T, Murmur3Hasher> {
    pub fn new(config: HasherConfig) -> Result<Self, ConfigError> {
        Self::with_hasher(config, Murmur3Hasher::default())
    }
}

impl<T, H> FeatureHasher<T, H>
where
    T: HashValue,
    H: FeatureHashFunction + Clone,
{
    /// Validates `config` and builds a hasher using `hasher` for feature names.
    pub fn with_hasher(config: HasherConfig, hasher: H) -> Result<Self, ConfigError> {
        let n_features = config.validate_config()?;
        if config.value_dtype != T::DTYPE {
            return Err(ConfigError::DtypeMismatch {
                configured: config.value_dtype,
                requested: T::DTYPE,
            });
        }
        if config.non_negative {
            tracing::warn!(
                "the non_negative option is deprecated and will be removed; \
                 take the absolute value of the output instead"
            );
        }
        Ok(Self {
            config,
            n_features,
            hasher,
            feature_map: None,
            _value: PhantomData,
        })
    }

    pub fn config(&self) -> &HasherConfig {
        &self.config
    }

    pub fn n_features(&self) -> u32 {
        self.n_features.get()
    }

    /// Records the feature mapping of `raw` when persistence is enabled and
    /// does nothing otherwise. The input is not consumed when nothing is recorded.
    pub fn fit<I>(&mut self, raw: I) -> Result<(), TransformError>
    where
        I: IntoIterator<Item = RawSample>,
    {
        self.config.validate_config()?;
        if self.config.mapping_persistence.is_enabled() {
            self.fit_transform(raw)?;
        }
        Ok(())
    }

    /// Hashes `raw` and, when persistence is enabled, replaces the recorded
    /// mapping with the names seen in `raw`.
    pub fn fit_transform<I>(&mut self, raw: I) -> Result<CsMat<T>, TransformError>
    where
        I: IntoIterator<Item = RawSample>,
    {
        self.config.validate_config()?;
        if !self.config.mapping_persistence.is_enabled() {
            return self.hash_samples(raw, None)?.into_csr().map_err(Into::into);
        }
        let mut feature_map = FeatureMap::new();
        let triples = self.hash_samples(raw, Some(&mut feature_map))?;
        tracing::debug!(names = feature_map.len(), "recorded feature mapping");
        self.feature_map = Some(feature_map);
        Ok(triples.into_csr()?)
    }

    /// Hashes `raw`. With `always` persistence, names seen here are added to
    /// the recorded mapping.
    pub fn transform<I>(&mut self, raw: I) -> Result<CsMat<T>, TransformError>
    where
        I: IntoIterator<Item = RawSample>,
    {
        Ok(self.transform_triples(raw)?.into_csr()?)
    }

    /// Like [`FeatureHasher::transform`], but returns the raw CSR arrays.
    pub fn transform_triples<I>(&mut self, raw: I) -> Result<CsrTriples<T>, TransformError>
    where
        I: IntoIterator<Item = RawSample>,
    {
        if self.config.mapping_persistence != MappingPersistence::Always {
            return self.hash_samples(raw, None);
        }
        let mut seen = FeatureMap::new();
        let triples = self.hash_samples(raw, Some(&mut seen))?;
        self.feature_map.get_or_insert_with(FeatureMap::new).merge(seen);
        Ok(triples)
    }

    /// For every column `0..n_features`, the distinct feature names recorded
    /// for it.
    pub fn feature_names(&self) -> Result<Vec<Vec<String>>, MappingError> {
        if !self.config.mapping_persistence.is_enabled() {
            return Err(MappingError::NotSaved);
        }
        self.feature_map
            .as_ref()
            .map(|feature_map| feature_map.feature_names(self.n_features.get()))
            .ok_or(MappingError::NotTransformed)
    }

    pub fn feature_map(&self) -> Option<&FeatureMap> {
        self.feature_map.as_ref()
    }

    fn hash_samples<I>(
        &self,
        raw: I,
        mut recorder: Option<&mut FeatureMap>,
    ) -> Result<CsrTriples<T>, TransformError>
    where
        I: IntoIterator<Item = RawSample>,
    {
        let expected = self.config.input_shape;
        let mut accumulator = SampleAccumulator::<T, H>::with_hasher(
            self.hasher.clone(),
            self.n_features,
            self.config.alternate_sign,
        )
        .expand_string_values(self.config.expand_string_values);
        let mut assembler =
            CsrAssembler::<T>::new(self.n_features).non_negative(self.config.non_negative);

        for sample in raw {
            let found = sample.shape();
            if found != expected {
                return Err(ConfigError::InputShapeMismatch { expected, found }.into());
            }
            let row = match sample {
                RawSample::Mapping(features) => {
                    accumulator.accumulate(features, recorder.as_deref_mut())?
                }
                RawSample::Pairs(features) => {
                    accumulator.accumulate(features, recorder.as_deref_mut())?
                }
                RawSample::Names(names) => accumulator.accumulate(
                    names.into_iter().map(|name| (name, FeatureValue::unit())),
                    recorder.as_deref_mut(),
                )?,
            };
            assembler.push_row(row);
        }

        let n_samples = assembler.n_rows();
        let triples = assembler.finish_triples()?;
        tracing::trace!(
            n_samples,
            n_features = self.n_features.get(),
            nnz = triples.nnz(),
            "hashed samples"
        );
        Ok(triples)
    }
}
