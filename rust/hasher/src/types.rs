use std::borrow::{Borrow, Cow};
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::InputShape;

/// The name of a feature, compared and hashed byte for byte.
///
/// Text names are stored as their UTF-8 encoding without any Unicode
/// normalization, so `"foo"` and `b"foo"` name the same feature.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureName(Vec<u8>);

impl FeatureName {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Decodes the name as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Builds the `name=value` feature used when textual values are expanded.
    pub(crate) fn with_text_value(&self, value: &str) -> Self {
        let mut bytes = Vec::with_capacity(self.0.len() + 1 + value.len());
        bytes.extend_from_slice(&self.0);
        bytes.push(b'=');
        bytes.extend_from_slice(value.as_bytes());
        Self(bytes)
    }
}

impl fmt::Debug for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureName({:?})", self.to_string_lossy())
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl Borrow<[u8]> for FeatureName {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for FeatureName {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for FeatureName {
    fn from(name: &str) -> Self {
        Self(name.as_bytes().to_vec())
    }
}

impl From<String> for FeatureName {
    fn from(name: String) -> Self {
        Self(name.into_bytes())
    }
}

impl From<&String> for FeatureName {
    fn from(name: &String) -> Self {
        Self(name.as_bytes().to_vec())
    }
}

impl From<&[u8]> for FeatureName {
    fn from(name: &[u8]) -> Self {
        Self(name.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for FeatureName {
    fn from(name: &[u8; N]) -> Self {
        Self(name.to_vec())
    }
}

impl From<Vec<u8>> for FeatureName {
    fn from(name: Vec<u8>) -> Self {
        Self(name)
    }
}

impl From<char> for FeatureName {
    fn from(name: char) -> Self {
        let mut buf = [0u8; 4];
        Self(name.encode_utf8(&mut buf).as_bytes().to_vec())
    }
}

impl Serialize for FeatureName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

impl<'de> Deserialize<'de> for FeatureName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// The value attached to a feature in one sample.
///
/// Only numeric values contribute directly. Text is accepted when the hasher
/// expands string values into `name=value` features; anything else is rejected
/// while the sample is accumulated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl FeatureValue {
    /// The implicit weight of a bare feature name.
    pub const fn unit() -> Self {
        FeatureValue::Float(1.0)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FeatureValue::Bool(_) => "bool",
            FeatureValue::Int(_) => "int",
            FeatureValue::Float(_) => "float",
            FeatureValue::Text(_) => "text",
            FeatureValue::Null => "null",
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Float(value)
    }
}

impl From<f32> for FeatureValue {
    fn from(value: f32) -> Self {
        FeatureValue::Float(value as f64)
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Int(value)
    }
}

impl From<i32> for FeatureValue {
    fn from(value: i32) -> Self {
        FeatureValue::Int(value as i64)
    }
}

impl From<u32> for FeatureValue {
    fn from(value: u32) -> Self {
        FeatureValue::Int(value as i64)
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Bool(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Text(value)
    }
}

impl<V: Into<FeatureValue>> From<Option<V>> for FeatureValue {
    fn from(value: Option<V>) -> Self {
        value.map(Into::into).unwrap_or(FeatureValue::Null)
    }
}

/// One input sample in one of the three accepted shapes.
///
/// Every sample handed to a [`crate::FeatureHasher`] must use the shape its
/// configuration names; the hasher normalizes all of them into
/// `(name, value)` pairs before hashing.
#[derive(Clone, Debug, PartialEq)]
pub enum RawSample {
    /// A name to value mapping.
    Mapping(BTreeMap<FeatureName, FeatureValue>),
    /// A sequence of `(name, value)` pairs. Names may repeat.
    Pairs(Vec<(FeatureName, FeatureValue)>),
    /// A sequence of bare names, each weighted 1. Names may repeat.
    Names(Vec<FeatureName>),
}

impl RawSample {
    pub fn mapping<I, N, V>(features: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<FeatureName>,
        V: Into<FeatureValue>,
    {
        RawSample::Mapping(
            features
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    pub fn pairs<I, N, V>(features: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<FeatureName>,
        V: Into<FeatureValue>,
    {
        RawSample::Pairs(
            features
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    pub fn names<I, N>(features: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<FeatureName>,
    {
        RawSample::Names(features.into_iter().map(Into::into).collect())
    }

    pub fn shape(&self) -> InputShape {
        match self {
            RawSample::Mapping(_) => InputShape::Mapping,
            RawSample::Pairs(_) => InputShape::Pairs,
            RawSample::Names(_) => InputShape::Names,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawSample::Mapping(features) => features.is_empty(),
            RawSample::Pairs(features) => features.is_empty(),
            RawSample::Names(features) => features.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_byte_names_are_equal() {
        assert_eq!(FeatureName::from("foo"), FeatureName::from(b"foo"));
        assert_eq!(FeatureName::from('é').as_bytes(), "é".as_bytes());
    }

    #[test]
    fn test_invalid_utf8_name_decodes_lossily() {
        let name = FeatureName::from(vec![b'a', 0xff]);
        assert_eq!(name.to_string_lossy(), "a\u{fffd}");
    }

    #[test]
    fn test_feature_value_from_json() {
        let values: Vec<FeatureValue> =
            serde_json::from_str(r#"[1, 2.5, "x", null, true]"#).unwrap();
        assert_eq!(
            values,
            vec![
                FeatureValue::Int(1),
                FeatureValue::Float(2.5),
                FeatureValue::Text("x".to_string()),
                FeatureValue::Null,
                FeatureValue::Bool(true),
            ]
        );
    }

    #[test]
    fn test_mapping_sample_from_json_object() {
        let mapping: BTreeMap<FeatureName, FeatureValue> =
            serde_json::from_str(r#"{"dog": 1, "cat": 2}"#).unwrap();
        let sample = RawSample::Mapping(mapping);
        assert_eq!(sample.shape(), InputShape::Mapping);
        assert_eq!(sample, RawSample::mapping([("cat", 2), ("dog", 1)]));
    }

    #[test]
    fn test_names_sample() {
        let sample = RawSample::names(["a", "b", "a"]);
        assert_eq!(sample.shape(), InputShape::Names);
        assert!(!sample.is_empty());
        assert!(RawSample::names(Vec::<&str>::new()).is_empty());
    }
}
