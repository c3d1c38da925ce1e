//! Feature hashing, also known as the hashing trick.
//!
//! A [`FeatureHasher`] turns streams of symbolic samples into fixed-width
//! sparse matrices without ever building a vocabulary. Each feature name is
//! hashed with the signed 32-bit MurmurHash3; the magnitude of the hash picks
//! the output column and, unless disabled, its sign flips the contribution so
//! that collisions tend to cancel. Repeated columns within a sample are summed
//! and the rows are assembled into a [`sprs::CsMat`] in CSR layout.
//!
//! The pieces are usable on their own:
//!
//! - [`hash`] derives a `(column, sign)` pair for a name.
//! - [`accumulator`] hashes one sample into a [`SparseRow`].
//! - [`mapping`] records which names landed in which column.
//! - [`assembler`] builds the CSR arrays from a stream of rows.
//!
//! # Examples
//!
//! ```
//! use hashvec::{FeatureHasher, HasherConfig, InputShape, MappingPersistence, RawSample};
//!
//! let mut hasher = FeatureHasher::<f64>::new(HasherConfig {
//!     n_features: 5,
//!     input_shape: InputShape::Names,
//!     mapping_persistence: MappingPersistence::Fit,
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let matrix = hasher
//!     .fit_transform(["a", "b", "z"].map(|name| RawSample::names([name])))
//!     .unwrap();
//! assert_eq!((matrix.rows(), matrix.cols()), (3, 5));
//!
//! // "a" and "z" collide in column 0.
//! let names = hasher.feature_names().unwrap();
//! assert_eq!(names[0], vec!["a".to_string(), "z".to_string()]);
//! ```

pub mod accumulator;
pub mod assembler;
pub mod config;
pub mod hash;
pub mod hasher;
pub mod mapping;
pub mod types;

pub use accumulator::{AccumulateError, SampleAccumulator, SparseRow};
pub use assembler::{assemble, AssembleError, CsrAssembler, CsrTriples, HashValue};
pub use config::{
    ConfigError, HasherConfig, InputShape, MappingPersistence, ValueDtype, DEFAULT_N_FEATURES,
    MAX_N_FEATURES,
};
pub use hash::{derive, derive_with, FeatureHashFunction, HashedFeature, Murmur3Hasher, Sign};
pub use hasher::{FeatureHasher, TransformError};
pub use mapping::{FeatureMap, MappingError};
pub use types::{FeatureName, FeatureValue, RawSample};

pub use sprs::CsMat;
