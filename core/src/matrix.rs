use crate::error::{LinkError, Result};

/// Frame-major feature matrix: `n_frames` rows of `dim` values each.
///
/// Row order is the acoustic frame order and is never changed after
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix<T> {
    n_frames: usize,
    dim: usize,
    data: Vec<T>,
}

/// Dequantized features as consumed by the matcher
pub type Features = FeatureMatrix<f32>;

/// Packet payload form
pub type QuantizedFeatures = FeatureMatrix<i8>;

impl<T> FeatureMatrix<T> {
    /// Wrap row-major `data`; fails if its length is not `n_frames * dim`
    pub fn new(n_frames: usize, dim: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != n_frames * dim {
            return Err(LinkError::MatrixSize {
                n_frames,
                dim,
                expected: n_frames * dim,
                actual: data.len(),
            });
        }
        Ok(Self { n_frames, dim, data })
    }

    /// Build from nested rows. An empty list yields a 0x0 matrix.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let n_frames = rows.len();
        let dim = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_frames * dim);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != dim {
                return Err(LinkError::RaggedMatrix {
                    row,
                    len: values.len(),
                    dim,
                });
            }
            data.extend(values);
        }
        Ok(Self { n_frames, dim, data })
    }

    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.n_frames == 0
    }

    pub fn row(&self, index: usize) -> &[T] {
        &self.data[index * self.dim..(index + 1) * self.dim]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.n_frames).map(move |i| self.row(i))
    }

    /// Row-major view of every value
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Apply `f` to every element, keeping the shape
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> FeatureMatrix<U> {
        FeatureMatrix {
            n_frames: self.n_frames,
            dim: self.dim,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T: Clone> FeatureMatrix<T> {
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        self.rows().map(<[T]>::to_vec).collect()
    }
}
