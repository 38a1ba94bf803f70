use serde::Serialize;
use skipstop_assign::OdMatrix;

/// Four-number reduction of a metric: minimum, mean, maximum, sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub sum: f64,
}

impl Summary {
    /// Placeholder for a metric with no defined value in the current state.
    pub const NAN: Summary = Summary {
        min: f64::NAN,
        mean: f64::NAN,
        max: f64::NAN,
        sum: f64::NAN,
    };

    pub fn of_scalar(value: f64) -> Summary {
        summarize(std::iter::once(value), true)
    }

    pub fn as_tuple(self) -> (f64, f64, f64, f64) {
        (self.min, self.mean, self.max, self.sum)
    }
}

/// Reduces a sequence of values to a [`Summary`].
///
/// `with_sum` disabled reports a NaN sum, for metrics where a total is
/// meaningless (ratios, unit values). An empty sequence or any NaN input
/// yields [`Summary::NAN`].
pub fn summarize(values: impl IntoIterator<Item = f64>, with_sum: bool) -> Summary {
    let mut count = 0usize;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut total = 0.0;

    for value in values {
        if value.is_nan() {
            return Summary::NAN;
        }
        count += 1;
        total += value;
        min = min.min(value);
        max = max.max(value);
    }

    if count == 0 {
        return Summary::NAN;
    }

    Summary {
        min,
        mean: total / count as f64,
        max,
        sum: if with_sum { total } else { f64::NAN },
    }
}

/// [`summarize`] over the strict upper triangle of a square matrix. The
/// diagonal and the unused lower half never enter the reduction.
pub fn summarize_matrix(matrix: &OdMatrix, with_sum: bool) -> Summary {
    summarize(matrix.upper_triangle().map(|(_, _, value)| value), with_sum)
}
