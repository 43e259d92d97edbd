//! Flat inner-product vector index over L2-normalized vectors.
//!
//! Position `i` in the index is document `i`; the index never reorders or
//! drops vectors after `build`.

use std::cmp::Ordering;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("cannot build an index from zero vectors")]
    Empty,

    #[error("vector {position} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        found: usize,
    },

    #[error("vector {0} contains a non-finite value")]
    NonFinite(usize),

    #[error("vectors must have at least one dimension")]
    ZeroDimension,
}

/// Scales `v` to unit length in place. Zero vectors are left unchanged.
pub fn normalize_l2(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 1e-20 {
        let norm = norm_sq.sqrt();
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[inline]
fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Exhaustive inner-product index. Search is O(n·d), which is fine for the
/// few dozen chunks a resume produces.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Builds an index from already-normalized vectors, in order.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        let dimension = vectors.first().map(Vec::len).ok_or(IndexError::Empty)?;
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }
        for (position, v) in vectors.iter().enumerate() {
            if v.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    position,
                    expected: dimension,
                    found: v.len(),
                });
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(IndexError::NonFinite(position));
            }
        }
        Ok(Self { dimension, vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Top-`k` `(id, score)` pairs by descending inner product.
    /// Equal scores keep ascending id order. `k` is clamped to the index size.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                position: 0,
                expected: self.dimension,
                found: query.len(),
            });
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(IndexError::NonFinite(0));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, v)| (id, dot_product(v, query)))
            .collect();

        // Stable sort keeps ascending id among ties.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k.min(self.vectors.len()));
        Ok(scored)
    }
}
