use crate::matrix::OdMatrix;

/// A service as the assignment sees it: the ordered corridor stops it calls
/// at and how many departures per minute it offers. Borrowed from the owning
/// service for the duration of one assignment.
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    pub stops: &'a [usize],
    pub frequency: f64,
}

impl Line<'_> {
    pub fn num_segments(&self) -> usize {
        self.stops.len().saturating_sub(1)
    }

    /// Travel time of one full one-way run over this line's stops.
    pub fn trip_time(&self, travel_time: &OdMatrix) -> f64 {
        trip_time(travel_time, self.stops)
    }
}

/// Sum of leg times over consecutive stops. Each leg's entry carries its own
/// dwell component, so a line that calls at fewer stops runs faster.
pub fn trip_time(travel_time: &OdMatrix, stops: &[usize]) -> f64 {
    stops
        .windows(2)
        .map(|leg| travel_time.get(leg[0], leg[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> OdMatrix {
        // 4 stops, 2.0 between neighbours, skip legs save one dwell each:
        // direct 0->2 costs 3.5 instead of 4.0, 0->3 costs 5.0 instead of 6.0.
        OdMatrix::from_rows(&[
            vec![0.0, 2.0, 3.5, 5.0],
            vec![0.0, 0.0, 2.0, 3.5],
            vec![0.0, 0.0, 0.0, 2.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ])
    }

    #[test]
    fn trip_time_sums_consecutive_legs() {
        let mat = corridor();

        assert_eq!(trip_time(&mat, &[0, 1, 2, 3]), 6.0);
        assert_eq!(trip_time(&mat, &[0, 2, 3]), 5.5);
        assert_eq!(trip_time(&mat, &[0, 3]), 5.0);
    }

    #[test]
    fn degenerate_stop_sets_have_zero_trip_time() {
        let mat = corridor();

        assert_eq!(trip_time(&mat, &[]), 0.0);
        assert_eq!(trip_time(&mat, &[2]), 0.0);
    }

    #[test]
    fn line_segment_count() {
        let stops = [0usize, 2, 3];
        let line = Line {
            stops: &stops,
            frequency: 0.1,
        };

        assert_eq!(line.num_segments(), 2);
        assert_eq!(line.trip_time(&corridor()), 5.5);
    }
}
