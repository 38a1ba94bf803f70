use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Dense square origin-destination matrix over corridor stops.
///
/// Stored as a flat vector indexed `from * n + to`. The storage sits behind
/// an `Arc` so an instance, its services and any number of solutions can
/// hold the same travel-time matrix without copying it; `clone` shares
/// storage.
///
/// The corridor is directed from stop 0 towards stop n-1, so only entries
/// strictly above the diagonal carry data. Everything else stays zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdMatrix {
    values: Arc<Vec<f64>>,
    n: usize,
}

impl OdMatrix {
    /// Ones strictly above the diagonal, zeros elsewhere.
    pub fn upper_ones(n: usize) -> Self {
        Self::from_fn(n, |from, to| if from < to { 1.0 } else { 0.0 })
    }

    pub fn from_flat(n: usize, values: Vec<f64>) -> Self {
        assert_eq!(values.len(), n * n, "flat matrix must hold n * n entries");

        OdMatrix {
            values: Arc::new(values),
            n,
        }
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let n = rows.len();
        for row in rows {
            assert_eq!(row.len(), n, "matrix rows must all have length n");
        }

        OdMatrix {
            values: Arc::new(rows.iter().flatten().copied().collect()),
            n,
        }
    }

    pub fn from_fn(n: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut values = vec![0.0; n * n];
        for from in 0..n {
            for to in 0..n {
                values[from * n + to] = f(from, to);
            }
        }

        OdMatrix {
            values: Arc::new(values),
            n,
        }
    }

    #[inline(always)]
    fn index(&self, from: usize, to: usize) -> usize {
        from * self.n + to
    }

    #[inline(always)]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.values[self.index(from, to)]
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Entries strictly above the diagonal, row by row.
    pub fn upper_triangle(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.n).flat_map(move |from| {
            (from + 1..self.n).map(move |to| (from, to, self.get(from, to)))
        })
    }

    /// Largest entry above the diagonal, 0.0 for matrices smaller than 2x2.
    pub fn upper_max(&self) -> f64 {
        self.upper_triangle()
            .map(|(_, _, value)| value)
            .fold(0.0, f64::max)
    }

    /// Shares storage with `self` iff both clones point at the same buffer.
    pub fn shares_storage_with(&self, other: &OdMatrix) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}
