use std::collections::HashMap;

use hashvec_error::{ErrorCodes, HashvecError};
use thiserror::Error;

use crate::types::FeatureName;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error(
        "FeatureHasher was built with mapping persistence off. \
         Set mapping_persistence to `fit` or `always` to save the mappings."
    )]
    NotSaved,
    #[error("FeatureHasher has not transformed yet. Call fit_transform() first.")]
    NotTransformed,
}

impl HashvecError for MappingError {
    fn code(&self) -> ErrorCodes {
        ErrorCodes::FailedPrecondition
    }
}

/// Records which column each observed feature name hashed to.
///
/// Entries are only ever added. Since the column of a name is a pure function
/// of the name, recording a name twice is a no-op.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureMap {
    columns: HashMap<FeatureName, u32>,
    // First-seen order of the keys in `columns`.
    order: Vec<FeatureName>,
}

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &FeatureName, column: u32) {
        if self.columns.contains_key(name.as_bytes()) {
            return;
        }
        self.columns.insert(name.clone(), column);
        self.order.push(name.clone());
    }

    pub fn column(&self, name: impl AsRef<[u8]>) -> Option<u32> {
        self.columns.get(name.as_ref()).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates `(name, column)` in the order names were first recorded.
    pub fn iter(&self) -> impl Iterator<Item = (&FeatureName, u32)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.columns.get(name).map(|column| (name, *column)))
    }

    /// Adds every entry of `other` not already present, keeping first-seen order.
    pub fn merge(&mut self, other: FeatureMap) {
        for name in other.order {
            if let Some(column) = other.columns.get(&name) {
                if !self.columns.contains_key(&name) {
                    self.columns.insert(name.clone(), *column);
                    self.order.push(name);
                }
            }
        }
    }

    /// Reverse view: for each column in `0..n_features`, the distinct names
    /// that hashed to it, decoded as UTF-8. Unused columns get an empty list.
    pub fn feature_names(&self, n_features: u32) -> Vec<Vec<String>> {
        let mut names = vec![Vec::new(); n_features as usize];
        for (name, column) in self.iter() {
            if let Some(bucket) = names.get_mut(column as usize) {
                bucket.push(name.to_string_lossy().into_owned());
            }
        }
        names
    }
}
