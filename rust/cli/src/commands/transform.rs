use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use clap::Args;
use hashvec::{
    CsrTriples, FeatureHasher, FeatureName, FeatureValue, HashValue, HasherConfig, InputShape,
    MappingPersistence, RawSample, ValueDtype,
};
use serde::Serialize;

use crate::types::CliError;

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// YAML config file. Defaults to ./hashvec_config.yaml when present.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// JSON-lines input file, or `-` for stdin.
    #[arg(long, default_value = "-")]
    pub input: String,
    #[arg(long)]
    pub n_features: Option<u64>,
    /// One of mapping, pairs, names (or dict, pair, string).
    #[arg(long, value_parser = parse_input_shape)]
    pub input_shape: Option<InputShape>,
    #[arg(long)]
    pub no_alternate_sign: bool,
    /// Also print the column to feature names mapping.
    #[arg(long)]
    pub feature_names: bool,
}

fn parse_input_shape(value: &str) -> Result<InputShape, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("expected one of mapping, pairs, names; got `{value}`"))
}

#[derive(Serialize)]
struct TransformOutput<'a, T> {
    shape: (usize, usize),
    indptr: &'a [usize],
    indices: &'a [usize],
    data: &'a [T],
    #[serde(skip_serializing_if = "Option::is_none")]
    feature_names: Option<Vec<Vec<String>>>,
}

impl TransformArgs {
    fn hasher_config(&self) -> Result<HasherConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => HasherConfig::load_from_path(path)?,
            None => HasherConfig::load()?,
        };
        if let Some(n_features) = self.n_features {
            config.n_features = n_features;
        }
        if let Some(input_shape) = self.input_shape {
            config.input_shape = input_shape;
        }
        if self.no_alternate_sign {
            config.alternate_sign = false;
        }
        if self.feature_names && !config.mapping_persistence.is_enabled() {
            config.mapping_persistence = MappingPersistence::Fit;
        }
        Ok(config)
    }
}

pub fn transform_command<W: Write>(writer: &mut W, args: TransformArgs) -> Result<(), CliError> {
    let config = args.hasher_config()?;
    if args.input == "-" {
        let stdin = io::stdin();
        transform_reader(stdin.lock(), writer, config, args.feature_names)
    } else {
        let file = File::open(&args.input)?;
        transform_reader(BufReader::new(file), writer, config, args.feature_names)
    }
}

/// Hashes the JSON-lines samples in `reader` and writes the matrix as one
/// JSON object. Blank lines are skipped.
pub fn transform_reader<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    config: HasherConfig,
    feature_names: bool,
) -> Result<(), CliError> {
    match config.value_dtype {
        ValueDtype::Float32 => hash_lines::<f32, _, _>(reader, writer, config, feature_names),
        ValueDtype::Float64 => hash_lines::<f64, _, _>(reader, writer, config, feature_names),
        ValueDtype::Int32 => hash_lines::<i32, _, _>(reader, writer, config, feature_names),
        ValueDtype::Int64 => hash_lines::<i64, _, _>(reader, writer, config, feature_names),
    }
}

fn hash_lines<T, R, W>(
    reader: R,
    writer: &mut W,
    config: HasherConfig,
    feature_names: bool,
) -> Result<(), CliError>
where
    T: HashValue + Serialize,
    R: BufRead,
    W: Write,
{
    let shape = config.input_shape;
    let mut hasher = FeatureHasher::<T>::new(config)?;

    // Samples are parsed lazily; the first bad line stops the stream.
    let mut failure = None;
    let samples = reader
        .lines()
        .enumerate()
        .map_while(|(index, line)| {
            let parsed = line.map_err(CliError::from).and_then(|line| {
                parse_sample(&line, shape).map_err(|source| CliError::Parse {
                    line: index + 1,
                    source,
                })
            });
            parsed.map_err(|err| failure = Some(err)).ok()
        })
        .flatten();

    let result = if feature_names {
        hasher
            .fit_transform(samples)
            .map(|matrix| CsrTriples::from(&matrix))
    } else {
        hasher.transform_triples(samples)
    };
    if let Some(err) = failure {
        return Err(err);
    }
    let triples = result?;

    let feature_names = if feature_names {
        Some(hasher.feature_names()?)
    } else {
        None
    };
    tracing::debug!(
        n_samples = triples.n_samples(),
        nnz = triples.nnz(),
        "writing matrix"
    );
    let output = TransformOutput {
        shape: triples.shape(),
        indptr: &triples.indptr,
        indices: &triples.indices,
        data: &triples.data,
        feature_names,
    };
    serde_json::to_writer(&mut *writer, &output).map_err(CliError::Output)?;
    writeln!(writer)?;
    Ok(())
}

fn parse_sample(line: &str, shape: InputShape) -> Result<Option<RawSample>, serde_json::Error> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let sample = match shape {
        InputShape::Mapping => {
            RawSample::Mapping(serde_json::from_str::<BTreeMap<FeatureName, FeatureValue>>(line)?)
        }
        InputShape::Pairs => {
            RawSample::Pairs(serde_json::from_str::<Vec<(FeatureName, FeatureValue)>>(line)?)
        }
        InputShape::Names => RawSample::Names(serde_json::from_str::<Vec<FeatureName>>(line)?),
    };
    Ok(Some(sample))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashvec_error::{ErrorCodes, HashvecError};

    fn run(input: &str, config: HasherConfig, feature_names: bool) -> Result<serde_json::Value, CliError> {
        let mut out = Vec::new();
        transform_reader(input.as_bytes(), &mut out, config, feature_names)?;
        Ok(serde_json::from_slice(&out).unwrap())
    }

    #[test]
    fn test_mapping_lines() {
        let config = HasherConfig {
            n_features: 10,
            ..Default::default()
        };
        let output = run(
            "{\"dog\": 1, \"cat\": 2, \"elephant\": 4}\n\n{\"dog\": 2, \"run\": 5}\n",
            config,
            false,
        )
        .unwrap();
        assert_eq!(
            output,
            serde_json::json!({
                "shape": [2, 10],
                "indptr": [0, 3, 5],
                "indices": [2, 3, 9, 3, 4],
                "data": [-4.0, -1.0, 2.0, -2.0, -5.0],
            })
        );
    }

    #[test]
    fn test_names_with_feature_names() {
        let config = HasherConfig {
            n_features: 5,
            input_shape: InputShape::Names,
            mapping_persistence: MappingPersistence::Fit,
            ..Default::default()
        };
        let output = run("[\"a\"]\n[\"b\"]\n[\"z\"]\n", config, true).unwrap();
        assert_eq!(output["shape"], serde_json::json!([3, 5]));
        assert_eq!(
            output["feature_names"],
            serde_json::json!([["a", "z"], ["b"], [], [], []])
        );
    }

    #[test]
    fn test_pairs_lines_with_integer_dtype() {
        let config = HasherConfig {
            n_features: 16,
            input_shape: InputShape::Pairs,
            value_dtype: ValueDtype::Int64,
            alternate_sign: false,
            ..Default::default()
        };
        let output = run("[[\"foo\", 2], [\"foo\", 1.5]]\n", config, false).unwrap();
        assert_eq!(output["indices"], serde_json::json!([0]));
        assert_eq!(output["data"], serde_json::json!([3]));
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let config = HasherConfig {
            input_shape: InputShape::Names,
            ..Default::default()
        };
        let err = run("[\"a\"]\n{\"a\": 1}\n[\"b\"]\n", config, false).unwrap_err();
        assert!(matches!(err, CliError::Parse { line: 2, .. }));
        assert_eq!(err.code(), ErrorCodes::InvalidArgument);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let err = run("\n", HasherConfig::default(), false).unwrap_err();
        assert_eq!(err.code(), ErrorCodes::UnprocessableEntity);
    }

    #[test]
    fn test_args_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hashvec.yaml");
        std::fs::write(&path, "n_features: 8\ninput_shape: pairs\n").unwrap();
        let args = TransformArgs {
            config: Some(path),
            input: "-".to_string(),
            n_features: Some(32),
            input_shape: None,
            no_alternate_sign: true,
            feature_names: true,
        };
        let config = args.hasher_config().unwrap();
        assert_eq!(config.n_features, 32);
        assert_eq!(config.input_shape, InputShape::Pairs);
        assert!(!config.alternate_sign);
        assert_eq!(config.mapping_persistence, MappingPersistence::Fit);
    }

    #[test]
    fn test_parse_input_shape_aliases() {
        assert_eq!(parse_input_shape("dict"), Ok(InputShape::Mapping));
        assert_eq!(parse_input_shape("pairs"), Ok(InputShape::Pairs));
        assert!(parse_input_shape("matrix").is_err());
    }
}
