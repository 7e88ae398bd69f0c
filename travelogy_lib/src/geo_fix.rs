use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single location sample. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl GeoFix {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters: None,
            timestamp,
        }
    }

    pub fn with_accuracy(
        latitude: f64,
        longitude: f64,
        accuracy_meters: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters: Some(accuracy_meters),
            timestamp,
        }
    }

    /// Coordinates inside the WGS84 ranges, accuracy non-negative when known.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.accuracy_meters.map_or(true, |accuracy| accuracy >= 0.0)
    }
}
