//! Flat-vector view of a structured parameter collection.
//!
//! A parameter group is a list of tensors, each stored as its own flat
//! buffer. The solvers work on a single dense vector; [`flatten`] and
//! [`Layout::unflatten`] are the two directions of that bijection.

use crate::error::ShapeError;

/// Lengths of the tensors in a parameter collection, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layout {
    lens: Vec<usize>,
}

impl Layout {
    /// Record the layout of `params`.
    pub fn of<F>(params: &[Vec<F>]) -> Self {
        Layout {
            lens: params.iter().map(Vec::len).collect(),
        }
    }

    /// Lengths of the individual tensors.
    pub fn lens(&self) -> &[usize] {
        &self.lens
    }

    /// Total number of scalars (the flat dimension).
    pub fn total(&self) -> usize {
        self.lens.iter().sum()
    }

    /// Split `flat` back into tensors of this layout.
    pub fn unflatten<F: Copy>(&self, flat: &[F]) -> Result<Vec<Vec<F>>, ShapeError> {
        let expected = self.total();
        if flat.len() != expected {
            return Err(ShapeError::LayoutMismatch {
                expected,
                got: flat.len(),
            });
        }
        let mut out = Vec::with_capacity(self.lens.len());
        let mut offset = 0;
        for &len in &self.lens {
            out.push(flat[offset..offset + len].to_vec());
            offset += len;
        }
        Ok(out)
    }
}

/// Concatenate all tensors of `params` into one vector.
pub fn flatten<F: Copy>(params: &[Vec<F>]) -> Vec<F> {
    params.iter().flat_map(|p| p.iter().copied()).collect()
}
