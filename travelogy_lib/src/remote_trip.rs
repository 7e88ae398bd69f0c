//! Wire types for the optional trip backend. The backend's payloads are
//! loosely shaped and vary across deployments, so everything coming in is
//! coerced into explicit optional fields here, at the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::track_path::TrackPath;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemotePathPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartTripRequest {
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

/// Tolerant view of whatever the start endpoint answers. Some deployments
/// return a bare id, some a differently named one, some nest the whole
/// created record under `trip`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartTripResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub trip_id: Option<Value>,
    #[serde(default)]
    pub uuid: Option<Value>,
    #[serde(default)]
    pub trip: Option<RemoteTripRecord>,
}

impl StartTripResponse {
    /// First recognizable id, coerced to a string. `None` means the trip has
    /// no usable remote identity and tracking stays local-only.
    pub fn remote_id(&self) -> Option<String> {
        [&self.id, &self.trip_id, &self.uuid]
            .into_iter()
            .flatten()
            .find_map(coerce_id)
            .or_else(|| self.trip.as_ref().and_then(|trip| trip.id.clone()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteTripRequest {
    pub end_time: DateTime<Utc>,
    pub distance_km: f64,
    pub path: Vec<RemotePathPoint>,
}

impl CompleteTripRequest {
    pub fn new(end_time: DateTime<Utc>, distance_meters: f64, path: &TrackPath) -> Self {
        Self {
            end_time,
            distance_km: round_km(distance_meters / 1000.0),
            path: path
                .iter()
                .map(|fix| RemotePathPoint {
                    lat: fix.latitude,
                    lon: fix.longitude,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteTripResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub trip: Option<RemoteTripRecord>,
}

/// The backend's view of a trip. Only ever used for diagnostics and
/// reconciliation logging; local data remains the source of truth.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteTripRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub path: Vec<RemotePathPoint>,
}

fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_id))
}

// Django-style backends serialize decimal columns as strings.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|value| match value {
        Value::Number(number) => number.as_f64(),
        Value::String(number) => number.parse().ok(),
        _ => None,
    }))
}

fn round_km(km: f64) -> f64 {
    (km * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use serde_json::json;

    use crate::geo_fix::GeoFix;

    use super::*;

    #[test]
    fn remote_id_aliases() {
        let cases = [
            (json!({ "id": 17 }), Some("17".to_string())),
            (json!({ "trip_id": "abc" }), Some("abc".to_string())),
            (json!({ "uuid": "de30-51" }), Some("de30-51".to_string())),
            (json!({ "trip": { "id": 4, "status": "active" } }), Some("4".to_string())),
            (json!({ "message": "ok" }), None),
            (json!({ "id": null, "uuid": "" }), None),
        ];

        for (body, expected) in cases {
            let response: StartTripResponse = serde_json::from_value(body.clone()).unwrap();
            assert_eq!(response.remote_id(), expected, "body {body}");
        }
    }

    #[test]
    fn record_coerces_stringly_distance() {
        let record: RemoteTripRecord =
            serde_json::from_value(json!({ "id": "t1", "distance_km": "12.345" })).unwrap();
        assert_eq!(record.distance_km, Some(12.345));

        let record: RemoteTripRecord =
            serde_json::from_value(json!({ "id": 9, "distance_km": 3.5 })).unwrap();
        assert_eq!(record.id.as_deref(), Some("9"));
        assert_eq!(record.distance_km, Some(3.5));
    }

    #[test]
    fn complete_request_rounds_and_transposes() {
        let timestamp = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let path: TrackPath = vec![
            GeoFix::new(56.1629, 10.2039, timestamp),
            GeoFix::new(56.1701, 10.1998, timestamp),
        ]
        .into();

        let request = CompleteTripRequest::new(timestamp, 1234.5678, &path);
        assert_eq!(request.distance_km, 1.235);
        assert_eq!(request.path.len(), 2);
        assert_eq!(request.path[0].lat, 56.1629);
        assert_eq!(request.path[0].lon, 10.2039);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["path"][1]["lat"], json!(56.1701));
    }
}
