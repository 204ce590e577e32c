//! Display helpers for durations and distances.

/// Whole minutes, e.g. `"20 min"`.
pub fn format_minutes(duration_sec: f64) -> String {
    format!("{} min", (duration_sec / 60.0).round() as i64)
}

/// Meters below 1 km, kilometers with two decimals above.
pub fn format_distance(distance_m: f64) -> String {
    if distance_m < 1000.0 {
        format!("{} m", distance_m.round() as i64)
    } else {
        format!("{:.2} km", distance_m / 1000.0)
    }
}
