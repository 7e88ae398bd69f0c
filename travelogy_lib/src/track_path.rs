use serde::{Deserialize, Serialize};

use crate::{distance, geo_fix::GeoFix};

/// Ordered, append-only sequence of fixes. Insertion order is chronological
/// order and is never changed afterwards; consumers get clones, not access to
/// the backing storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackPath {
    fixes: Vec<GeoFix>,
}

impl TrackPath {
    pub fn new() -> Self {
        Self { fixes: Vec::new() }
    }

    pub fn push(&mut self, fix: GeoFix) {
        self.fixes.push(fix);
    }

    pub fn last(&self) -> Option<&GeoFix> {
        self.fixes.last()
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn clear(&mut self) {
        self.fixes.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeoFix> {
        self.fixes.iter()
    }

    pub fn as_slice(&self) -> &[GeoFix] {
        &self.fixes
    }

    /// Ramer-Douglas-Peucker reduction for export. Endpoints are always kept;
    /// paths with fewer than three fixes come back unchanged.
    pub fn simplified(&self, tolerance_meters: f64) -> TrackPath {
        if self.fixes.len() < 3 {
            return self.clone();
        }

        let mut keep = vec![false; self.fixes.len()];
        keep[0] = true;
        keep[self.fixes.len() - 1] = true;
        mark_kept(&self.fixes, 0, self.fixes.len() - 1, tolerance_meters, &mut keep);

        self.fixes
            .iter()
            .zip(&keep)
            .filter(|(_, kept)| **kept)
            .map(|(fix, _)| fix.clone())
            .collect()
    }

    /// Drops interior fixes that sit far from both neighbours compared to the
    /// distance between those neighbours. GPS receivers produce such spikes
    /// when the signal degrades for a single sample.
    pub fn without_spikes(&self) -> TrackPath {
        if self.fixes.len() < 3 {
            return self.clone();
        }

        let mut kept = Vec::with_capacity(self.fixes.len());
        kept.push(self.fixes[0].clone());
        for window in self.fixes.windows(3) {
            let [prev, curr, next] = window else {
                continue;
            };
            let to_prev = distance::distance_meters(prev, curr);
            let to_next = distance::distance_meters(curr, next);
            let between_neighbours = distance::distance_meters(prev, next);

            if to_prev.max(to_next) > between_neighbours * 5.0 {
                continue;
            }

            kept.push(curr.clone());
        }
        kept.push(self.fixes[self.fixes.len() - 1].clone());

        TrackPath { fixes: kept }
    }
}

impl From<Vec<GeoFix>> for TrackPath {
    fn from(fixes: Vec<GeoFix>) -> Self {
        Self { fixes }
    }
}

impl FromIterator<GeoFix> for TrackPath {
    fn from_iter<I: IntoIterator<Item = GeoFix>>(iter: I) -> Self {
        Self {
            fixes: iter.into_iter().collect(),
        }
    }
}

fn mark_kept(fixes: &[GeoFix], first: usize, last: usize, tolerance_meters: f64, keep: &mut [bool]) {
    if last <= first + 1 {
        return;
    }

    let mut max_deviation = 0.0;
    let mut furthest = first;
    for i in first + 1..last {
        let deviation = deviation_meters(&fixes[i], &fixes[first], &fixes[last]);
        if deviation > max_deviation {
            max_deviation = deviation;
            furthest = i;
        }
    }

    if max_deviation > tolerance_meters {
        keep[furthest] = true;
        mark_kept(fixes, first, furthest, tolerance_meters, keep);
        mark_kept(fixes, furthest, last, tolerance_meters, keep);
    }
}

/// Distance from `fix` to the segment `a`-`b`, computed in a local tangent
/// plane around `a`. Plenty accurate at the spacings a GPS track produces.
fn deviation_meters(fix: &GeoFix, a: &GeoFix, b: &GeoFix) -> f64 {
    let lat0 = a.latitude.to_radians();
    let to_xy = |f: &GeoFix| {
        let x = (f.longitude - a.longitude).to_radians() * lat0.cos() * distance::EARTH_RADIUS_METERS;
        let y = (f.latitude - a.latitude).to_radians() * distance::EARTH_RADIUS_METERS;
        (x, y)
    };

    let (px, py) = to_xy(fix);
    let (bx, by) = to_xy(b);

    let segment_len2 = bx * bx + by * by;
    if segment_len2 == 0.0 {
        return distance::distance_meters(fix, a);
    }

    let t = ((px * bx + py * by) / segment_len2).clamp(0.0, 1.0);
    let dx = px - t * bx;
    let dy = py - t * by;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    fn fix(latitude: f64, longitude: f64) -> GeoFix {
        GeoFix::new(latitude, longitude, DateTime::<Utc>::from_timestamp(0, 0).unwrap())
    }

    #[test]
    fn push_preserves_order() {
        let mut path = TrackPath::new();
        path.push(fix(0.0, 0.0));
        path.push(fix(0.0, 0.001));
        path.push(fix(0.0, 0.002));

        let longitudes: Vec<f64> = path.iter().map(|f| f.longitude).collect();
        assert_eq!(longitudes, vec![0.0, 0.001, 0.002]);
        assert_eq!(path.last().unwrap().longitude, 0.002);
    }

    #[test]
    fn simplify_collapses_collinear_points() {
        let path: TrackPath = (0..10).map(|i| fix(0.0, i as f64 * 0.001)).collect();
        let simplified = path.simplified(5.0);

        assert_eq!(simplified.len(), 2);
        assert_eq!(simplified.as_slice()[0], path.as_slice()[0]);
        assert_eq!(simplified.last(), path.last());
    }

    #[test]
    fn simplify_keeps_a_real_corner() {
        let path: TrackPath = vec![
            fix(0.0, 0.0),
            fix(0.0, 0.01),
            fix(0.01, 0.01), // the corner
            fix(0.01, 0.02),
        ]
        .into();

        let simplified = path.simplified(50.0);
        assert!(simplified.len() >= 3);
        assert!(simplified.as_slice().contains(&fix(0.01, 0.01)));
    }

    #[test]
    fn simplify_short_paths_unchanged() {
        let path: TrackPath = vec![fix(0.0, 0.0), fix(0.0, 0.001)].into();
        assert_eq!(path.simplified(1000.0), path);
    }

    #[test]
    fn spike_filter_drops_the_outlier() {
        let path: TrackPath = vec![
            fix(0.0, 0.000),
            fix(0.0, 0.001),
            fix(0.5, 0.002), // ~55 km off a ~100 m step
            fix(0.0, 0.003),
            fix(0.0, 0.004),
        ]
        .into();

        let filtered = path.without_spikes();
        assert_eq!(filtered.len(), 4);
        assert!(!filtered.as_slice().iter().any(|f| f.latitude == 0.5));
        assert_eq!(filtered.as_slice()[0], path.as_slice()[0]);
        assert_eq!(filtered.last(), path.last());
    }
}
