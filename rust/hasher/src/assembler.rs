use std::num::NonZeroU32;

use hashvec_error::{ErrorCodes, HashvecError};
use sprs::CsMat;
use thiserror::Error;

use crate::accumulator::SparseRow;
use crate::config::ValueDtype;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error("Cannot vectorize empty sequence")]
    EmptyInput,
    #[error("Invalid sparse structure: {0}")]
    Structure(String),
}

impl HashvecError for AssembleError {
    fn code(&self) -> ErrorCodes {
        match self {
            AssembleError::EmptyInput => ErrorCodes::UnprocessableEntity,
            AssembleError::Structure(_) => ErrorCodes::Internal,
        }
    }
}

/// Element types the assembled matrix can hold.
pub trait HashValue: Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    const DTYPE: ValueDtype;

    fn from_f64(value: f64) -> Self;

    fn abs(self) -> Self;

    /// Addition that clamps at the type bounds instead of overflowing.
    fn add_saturating(self, other: Self) -> Self;
}

impl HashValue for f64 {
    const DTYPE: ValueDtype = ValueDtype::Float64;

    fn from_f64(value: f64) -> Self {
        value
    }

    fn abs(self) -> Self {
        f64::abs(self)
    }

    fn add_saturating(self, other: Self) -> Self {
        self + other
    }
}

impl HashValue for f32 {
    const DTYPE: ValueDtype = ValueDtype::Float32;

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn abs(self) -> Self {
        f32::abs(self)
    }

    fn add_saturating(self, other: Self) -> Self {
        self + other
    }
}

// Integer conversions truncate toward zero and saturate at the type bounds.
impl HashValue for i32 {
    const DTYPE: ValueDtype = ValueDtype::Int32;

    fn from_f64(value: f64) -> Self {
        value as i32
    }

    fn abs(self) -> Self {
        self.saturating_abs()
    }

    fn add_saturating(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

impl HashValue for i64 {
    const DTYPE: ValueDtype = ValueDtype::Int64;

    fn from_f64(value: f64) -> Self {
        value as i64
    }

    fn abs(self) -> Self {
        self.saturating_abs()
    }

    fn add_saturating(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

/// The three parallel arrays of a compressed sparse row matrix.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CsrTriples<T> {
    pub n_features: usize,
    /// Offsets into `indices`/`data`; `indptr[r]..indptr[r + 1]` is row `r`.
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<T>,
}

impl<T: HashValue> CsrTriples<T> {
    pub fn n_samples(&self) -> usize {
        self.indptr.len().saturating_sub(1)
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_samples(), self.n_features)
    }

    /// Hands the arrays to `sprs`, which re-checks the structure.
    pub fn into_csr(self) -> Result<CsMat<T>, AssembleError> {
        let shape = self.shape();
        CsMat::try_new(shape, self.indptr, self.indices, self.data)
            .map_err(|(.., err)| AssembleError::Structure(format!("{err:?}")))
    }
}

impl<T: HashValue> From<&CsMat<T>> for CsrTriples<T> {
    fn from(matrix: &CsMat<T>) -> Self {
        if !matrix.is_csr() {
            return Self::from(&matrix.to_csr());
        }
        let mut triples = CsrTriples {
            n_features: matrix.cols(),
            indptr: Vec::with_capacity(matrix.rows() + 1),
            indices: Vec::with_capacity(matrix.nnz()),
            data: Vec::with_capacity(matrix.nnz()),
        };
        triples.indptr.push(0);
        for row in matrix.outer_iterator() {
            for (column, value) in row.iter() {
                triples.indices.push(column);
                triples.data.push(*value);
            }
            triples.indptr.push(triples.indices.len());
        }
        triples
    }
}

/// Collects rows as they stream in and builds the CSR arrays.
///
/// The number of rows does not need to be known up front. Rows may contain
/// repeated or unsorted columns; [`CsrAssembler::finish_triples`] sorts each
/// row, sums repeated columns and drops entries that sum to zero.
#[derive(Debug)]
pub struct CsrAssembler<T = f64> {
    n_features: NonZeroU32,
    non_negative: bool,
    indptr: Vec<usize>,
    indices: Vec<u32>,
    data: Vec<T>,
}

impl<T: HashValue> CsrAssembler<T> {
    pub fn new(n_features: NonZeroU32) -> Self {
        Self {
            n_features,
            non_negative: false,
            indptr: vec![0],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Deprecated behavior: store the absolute value of every entry. Applied
    /// after sign alternation and after duplicates are summed.
    pub fn non_negative(mut self, non_negative: bool) -> Self {
        self.non_negative = non_negative;
        self
    }

    pub fn push_row(&mut self, row: SparseRow<T>) {
        self.push_entries(row.into_entries());
    }

    pub fn push_entries(&mut self, entries: impl IntoIterator<Item = (u32, T)>) {
        for (column, value) in entries {
            self.indices.push(column);
            self.data.push(value);
        }
        self.indptr.push(self.indices.len());
    }

    pub fn n_rows(&self) -> usize {
        self.indptr.len() - 1
    }

    pub fn finish_triples(self) -> Result<CsrTriples<T>, AssembleError> {
        if self.n_rows() == 0 {
            return Err(AssembleError::EmptyInput);
        }
        let n_features = self.n_features.get();

        let mut triples = CsrTriples {
            n_features: n_features as usize,
            indptr: Vec::with_capacity(self.indptr.len()),
            indices: Vec::with_capacity(self.indices.len()),
            data: Vec::with_capacity(self.data.len()),
        };
        triples.indptr.push(0);

        let mut row = Vec::new();
        for bounds in self.indptr.windows(2) {
            row.clear();
            row.extend(
                self.indices[bounds[0]..bounds[1]]
                    .iter()
                    .copied()
                    .zip(self.data[bounds[0]..bounds[1]].iter().copied()),
            );
            row.sort_unstable_by_key(|(column, _)| *column);

            for run in row.chunk_by(|a, b| a.0 == b.0) {
                let column = run[0].0;
                if column >= n_features {
                    return Err(AssembleError::Structure(format!(
                        "column {column} out of range for {n_features} features"
                    )));
                }
                let mut value = run
                    .iter()
                    .fold(T::default(), |sum, (_, value)| sum.add_saturating(*value));
                if self.non_negative {
                    value = value.abs();
                }
                if value == T::default() {
                    continue;
                }
                triples.indices.push(column as usize);
                triples.data.push(value);
            }
            triples.indptr.push(triples.indices.len());
        }

        Ok(triples)
    }

    pub fn finish(self) -> Result<CsMat<T>, AssembleError> {
        self.finish_triples()?.into_csr()
    }
}

/// Assembles a CSR matrix from a stream of rows.
pub fn assemble<T, I>(
    rows: I,
    n_features: NonZeroU32,
    non_negative: bool,
) -> Result<CsMat<T>, AssembleError>
where
    T: HashValue,
    I: IntoIterator<Item = SparseRow<T>>,
{
    let mut assembler = CsrAssembler::new(n_features).non_negative(non_negative);
    for row in rows {
        assembler.push_row(row);
    }
    assembler.finish()
}
