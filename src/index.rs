//! Exact nearest-neighbour index over embedding vectors.
//!
//! A flat (brute-force) index: every search scores all stored vectors by
//! squared Euclidean distance. The index is built fresh for each retrieval
//! request and has no update or persistence path; every query costs O(n).

use anyhow::{bail, Result};

/// One search hit: position of the vector at build time and its distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    /// Squared L2 distance to the query.
    pub distance: f32,
}

/// Brute-force L2 index.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dims: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    /// Build an index over `vectors`. All vectors must share one non-zero
    /// dimension.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = vectors.first() else {
            bail!("cannot build an index over zero vectors");
        };
        let dims = first.len();
        if dims == 0 {
            bail!("embedding vectors must not be empty");
        }
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dims) {
            bail!(
                "embedding {} has {} dimensions, expected {}",
                i,
                v.len(),
                dims
            );
        }
        Ok(Self { dims, vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The `min(k, len)` nearest vectors, closest first. Equal distances keep
    /// build order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dims {
            bail!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dims
            );
        }
        let mut scored: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, v)| Neighbor {
                index,
                distance: squared_l2(v, query),
            })
            .collect();
        // stable: ties stay in build order
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Squared Euclidean distance between equal-length vectors.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
