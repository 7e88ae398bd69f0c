use crate::{geo_fix::GeoFix, track_path::TrackPath};

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two fixes (haversine).
pub fn distance_meters(a: &GeoFix, b: &GeoFix) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Float rounding can push h a hair past 1.0, and asin would answer NaN.
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Appends `fix` and returns only the distance it added, so a live session
/// stays O(1) per fix instead of re-walking the whole path.
pub fn accumulate(path: &mut TrackPath, fix: GeoFix) -> f64 {
    let added = match path.last() {
        Some(last) => distance_meters(last, &fix),
        None => 0.0,
    };
    path.push(fix);
    added
}

/// Full-path length, summed over consecutive pairs.
pub fn path_length_meters(path: &TrackPath) -> f64 {
    path.as_slice()
        .windows(2)
        .map(|pair| distance_meters(&pair[0], &pair[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    fn fix(latitude: f64, longitude: f64) -> GeoFix {
        GeoFix::new(latitude, longitude, DateTime::<Utc>::from_timestamp(0, 0).unwrap())
    }

    #[test]
    fn symmetric() {
        let aarhus = fix(56.1629, 10.2039);
        let copenhagen = fix(55.6761, 12.5683);
        assert_eq!(
            distance_meters(&aarhus, &copenhagen),
            distance_meters(&copenhagen, &aarhus)
        );
    }

    #[test]
    fn zero_for_identical_points() {
        let a = fix(56.1629, 10.2039);
        assert_eq!(distance_meters(&a, &a), 0.0);
    }

    #[test]
    fn hundredth_degree_of_latitude_at_equator() {
        let d = distance_meters(&fix(0.0, 0.0), &fix(0.01, 0.0));
        assert!((d - 1110.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn antipodal_points_stay_finite() {
        let d = distance_meters(&fix(0.0, 0.0), &fix(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_METERS).abs() < 1.0);
    }

    #[test]
    fn incremental_equals_batch() {
        let fixes = [
            fix(56.1629, 10.2039),
            fix(56.1701, 10.1998),
            fix(56.1755, 10.2101),
            fix(56.1755, 10.2101), // duplicate adds zero
            fix(56.1802, 10.2233),
        ];

        let mut path = TrackPath::new();
        let mut total = 0.0;
        for f in &fixes {
            total += accumulate(&mut path, f.clone());
        }

        let batch = path_length_meters(&path);
        assert!((total - batch).abs() < 1e-9, "incremental {total} vs batch {batch}");
        assert_eq!(path.len(), fixes.len());
    }

    #[test]
    fn accumulate_on_empty_path_adds_nothing() {
        let mut path = TrackPath::new();
        assert_eq!(accumulate(&mut path, fix(0.0, 0.0)), 0.0);
        assert_eq!(path.len(), 1);
    }
}
