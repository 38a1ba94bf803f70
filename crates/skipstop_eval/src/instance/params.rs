use serde::{Deserialize, Serialize};

/// Knobs for synthetic corridor generation.
///
/// Defaults describe an urban trunk route: 15 to 40 stops a few hundred
/// meters apart, headways between 3 and 10 minutes, a capacity of 50
/// passengers per bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceParams {
    /// Inclusive bounds on the number of stops.
    pub min_stops: usize,
    pub max_stops: usize,
    /// Inclusive bounds on the spacing between adjacent stops, meters.
    pub min_spacing: f64,
    pub max_spacing: f64,
    /// Headway band, minutes. The fleet is sized so the all-stop headway
    /// lands inside it.
    pub min_headway: f64,
    pub max_headway: f64,
    /// Cruising speed, km/h.
    pub speed: f64,
    /// Dwell time folded into every leg, minutes. Skipping a stop saves
    /// one dwell, which is what makes an express overlay worthwhile.
    pub dwell_time: f64,
    /// Upper bound on the number of demand peaks layered over the base
    /// noise. One or less disables peaks.
    pub max_demand_peaks: usize,
    /// Concentration divisor for peak spread; larger means tighter peaks.
    pub demand_peak_conc: f64,
    /// Height of each peak relative to the base noise.
    pub demand_peak_size: f64,
    /// Per-bus passenger capacity.
    pub capacity: f64,
    /// Cap on any one OD entry as a fraction of capacity.
    pub max_od_demand: f64,
    /// Whether crowding feeds back into travel times.
    pub congested: bool,
    /// Iteration cap for the congested assignment.
    pub max_iters: usize,
}

impl Default for InstanceParams {
    fn default() -> Self {
        Self {
            min_stops: 15,
            max_stops: 40,
            min_spacing: 300.0,
            max_spacing: 1200.0,
            min_headway: 3.0,
            max_headway: 10.0,
            speed: 25.0,
            dwell_time: 0.5,
            max_demand_peaks: 4,
            demand_peak_conc: 1.0,
            demand_peak_size: 5.0,
            capacity: 50.0,
            max_od_demand: 0.025,
            congested: true,
            max_iters: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let params: InstanceParams =
            serde_json::from_str(r#"{"min_stops": 8, "max_stops": 12, "congested": false}"#)
                .unwrap();

        assert_eq!(params.min_stops, 8);
        assert_eq!(params.max_stops, 12);
        assert!(!params.congested);
        assert_eq!(params.capacity, InstanceParams::default().capacity);
    }

    #[test]
    fn round_trips_through_json() {
        let params = InstanceParams {
            speed: 30.0,
            dwell_time: 0.75,
            ..InstanceParams::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        let back: InstanceParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
