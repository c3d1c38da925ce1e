use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::num::NonZeroU32;

use hashvec_error::{ErrorCodes, HashvecError};
use thiserror::Error;

use crate::assembler::HashValue;
use crate::hash::{derive_with, FeatureHashFunction, Murmur3Hasher};
use crate::mapping::FeatureMap;
use crate::types::{FeatureName, FeatureValue};

#[derive(Debug, Error, PartialEq)]
pub enum AccumulateError {
    #[error("Feature `{feature}` has non-finite value {value}")]
    NonFiniteValue { feature: String, value: f64 },
    #[error("Feature `{feature}` has a value of unsupported kind `{kind}`, expected a number")]
    UnsupportedValueKind { feature: String, kind: &'static str },
}

impl HashvecError for AccumulateError {
    fn code(&self) -> ErrorCodes {
        match self {
            AccumulateError::NonFiniteValue { .. } => ErrorCodes::OutOfRange,
            AccumulateError::UnsupportedValueKind { .. } => ErrorCodes::InvalidType,
        }
    }
}

/// The contributions of one sample, one entry per distinct column.
///
/// Entries are in first-touched order; the assembler sorts them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseRow<T = f64> {
    entries: Vec<(u32, T)>,
}

impl<T: HashValue> SparseRow<T> {
    pub fn entries(&self) -> &[(u32, T)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(u32, T)> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The merged value for `column`, if the sample touched it.
    pub fn get(&self, column: u32) -> Option<T> {
        self.entries
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, value)| *value)
    }
}

/// Hashes the features of one sample at a time into a [`SparseRow`].
///
/// Each signed contribution is converted to `T` before it is merged, so integer
/// element types truncate every contribution rather than the column total.
/// The column lookup table is kept between samples so its allocation is reused.
pub struct SampleAccumulator<T = f64, H = Murmur3Hasher> {
    hasher: H,
    n_features: NonZeroU32,
    alternate_sign: bool,
    expand_string_values: bool,
    slots: HashMap<u32, usize>,
    _value: PhantomData<T>,
}

impl<T: HashValue> SampleAccumulator<T, Murmur3Hasher> {
    pub fn new(n_features: NonZeroU32, alternate_sign: bool) -> Self {
        Self::with_hasher(Murmur3Hasher::default(), n_features, alternate_sign)
    }
}

impl<T: HashValue, H: FeatureHashFunction> SampleAccumulator<T, H> {
    pub fn with_hasher(hasher: H, n_features: NonZeroU32, alternate_sign: bool) -> Self {
        Self {
            hasher,
            n_features,
            alternate_sign,
            expand_string_values: false,
            slots: HashMap::new(),
            _value: PhantomData,
        }
    }

    pub fn expand_string_values(mut self, expand: bool) -> Self {
        self.expand_string_values = expand;
        self
    }

    /// Hashes every `(name, value)` pair of one sample and sums contributions
    /// that land in the same column.
    ///
    /// When `recorder` is given, every name is recorded with its column, even
    /// if its value is zero and it contributes nothing to the row.
    pub fn accumulate<I>(
        &mut self,
        features: I,
        mut recorder: Option<&mut FeatureMap>,
    ) -> Result<SparseRow<T>, AccumulateError>
    where
        I: IntoIterator<Item = (FeatureName, FeatureValue)>,
    {
        self.slots.clear();
        let mut entries: Vec<(u32, T)> = Vec::new();

        for (name, value) in features {
            let (name, value) = match value {
                FeatureValue::Int(value) => (name, value as f64),
                FeatureValue::Float(value) if value.is_finite() => (name, value),
                FeatureValue::Float(value) => {
                    return Err(AccumulateError::NonFiniteValue {
                        feature: name.to_string(),
                        value,
                    })
                }
                FeatureValue::Bool(value) => (name, if value { 1.0 } else { 0.0 }),
                FeatureValue::Text(text) if self.expand_string_values => {
                    (name.with_text_value(&text), 1.0)
                }
                other => {
                    return Err(AccumulateError::UnsupportedValueKind {
                        feature: name.to_string(),
                        kind: other.kind(),
                    })
                }
            };

            let hashed = derive_with(&self.hasher, name.as_bytes(), self.n_features);
            if let Some(recorder) = recorder.as_deref_mut() {
                recorder.record(&name, hashed.column);
            }
            if value == 0.0 {
                continue;
            }

            let contribution = T::from_f64(if self.alternate_sign {
                hashed.sign.apply(value)
            } else {
                value
            });
            match self.slots.entry(hashed.column) {
                Entry::Occupied(slot) => {
                    let merged = &mut entries[*slot.get()].1;
                    *merged = merged.add_saturating(contribution);
                }
                Entry::Vacant(slot) => {
                    slot.insert(entries.len());
                    entries.push((hashed.column, contribution));
                }
            }
        }

        Ok(SparseRow { entries })
    }
}
