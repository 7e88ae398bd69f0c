use chrono::{DateTime, Utc};
use travelogy_lib::{
    geo_fix::GeoFix,
    remote_trip::{CompleteTripRequest, CompleteTripResponse, StartTripRequest, StartTripResponse},
    track_path::TrackPath,
};

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteError {
    Network(String),
    Status(u16),
    Decode(String),
}

/// Transport seam towards the trip backend. The browser build speaks HTTP,
/// tests script the responses.
#[allow(async_fn_in_trait)]
pub trait TripApi {
    async fn start_trip(
        &self,
        request: &StartTripRequest,
    ) -> Result<StartTripResponse, RemoteError>;

    async fn complete_trip(
        &self,
        trip_id: &str,
        request: &CompleteTripRequest,
    ) -> Result<CompleteTripResponse, RemoteError>;
}

/// Best-effort bridge between local tracking and the backend trip record.
/// The backend is an enhancement, not a dependency: every failure ends here
/// as a log line and the tracking path never sees an error.
pub struct RemoteTripLifecycle<A> {
    api: A,
}

impl<A: TripApi> RemoteTripLifecycle<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Registers the trip remotely. `None` on any failure, or when the
    /// response carries nothing recognizable as an id; the session then runs
    /// in local-only mode.
    pub async fn create_remote(
        &self,
        started_at: DateTime<Utc>,
        origin: Option<&GeoFix>,
    ) -> Option<String> {
        let request = StartTripRequest {
            start_time: started_at,
            lat: origin.map(|fix| fix.latitude),
            lon: origin.map(|fix| fix.longitude),
        };

        match self.api.start_trip(&request).await {
            Ok(response) => {
                let id = response.remote_id();
                if id.is_none() {
                    log::warn!("trip registered but the response carried no usable id");
                }
                id
            }
            Err(err) => {
                log::warn!("start_trip failed, tracking locally: {err:?}");
                None
            }
        }
    }

    /// Marks the remote record complete with the final path and distance.
    /// With no remote id this is a no-op returning `false`: there never was a
    /// record to complete. A failed call is logged and also answers `false`;
    /// nothing is rolled back locally either way.
    pub async fn complete_remote(
        &self,
        remote_trip_id: Option<&str>,
        path: &TrackPath,
        distance_meters: f64,
        ended_at: DateTime<Utc>,
    ) -> bool {
        let Some(trip_id) = remote_trip_id else {
            return false;
        };

        let request = CompleteTripRequest::new(ended_at, distance_meters, path);
        match self.api.complete_trip(trip_id, &request).await {
            Ok(response) => {
                reconcile(trip_id, &response, distance_meters);
                true
            }
            Err(err) => {
                log::warn!("complete_trip for {trip_id} failed: {err:?}");
                false
            }
        }
    }
}

/// The completion response echoes the backend's view of the trip. Local data
/// stays authoritative; a large disagreement is only worth a log line.
fn reconcile(trip_id: &str, response: &CompleteTripResponse, distance_meters: f64) {
    let Some(remote_km) = response.trip.as_ref().and_then(|trip| trip.distance_km) else {
        return;
    };

    let local_km = distance_meters / 1000.0;
    if local_km > 0.0 && ((remote_km - local_km) / local_km).abs() > 0.05 {
        log::warn!("trip {trip_id}: remote distance {remote_km} km diverges from local {local_km} km");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use chrono::DateTime;
    use serde_json::json;
    use travelogy_lib::geo_fix::GeoFix;

    use super::*;

    struct ScriptedApi {
        start_response: Result<StartTripResponse, RemoteError>,
        complete_response: Result<CompleteTripResponse, RemoteError>,
        completions: RefCell<Vec<(String, CompleteTripRequest)>>,
    }

    impl ScriptedApi {
        fn new(start: serde_json::Value, complete: serde_json::Value) -> Self {
            Self {
                start_response: Ok(serde_json::from_value(start).unwrap()),
                complete_response: Ok(serde_json::from_value(complete).unwrap()),
                completions: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                start_response: Err(RemoteError::Network("connection refused".into())),
                complete_response: Err(RemoteError::Status(502)),
                completions: RefCell::new(Vec::new()),
            }
        }
    }

    impl TripApi for ScriptedApi {
        async fn start_trip(
            &self,
            _request: &StartTripRequest,
        ) -> Result<StartTripResponse, RemoteError> {
            self.start_response.clone()
        }

        async fn complete_trip(
            &self,
            trip_id: &str,
            request: &CompleteTripRequest,
        ) -> Result<CompleteTripResponse, RemoteError> {
            self.completions
                .borrow_mut()
                .push((trip_id.to_string(), request.clone()));
            self.complete_response.clone()
        }
    }

    fn run<F: Future>(future: F) -> F::Output {
        futures::executor::block_on(future)
    }

    #[test]
    fn create_yields_id_from_tolerant_response() {
        let lifecycle = RemoteTripLifecycle::new(ScriptedApi::new(
            json!({ "message": "Trip started successfully", "trip": { "id": 42 } }),
            json!({}),
        ));

        let started_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let origin = GeoFix::new(56.1629, 10.2039, started_at);
        let id = run(lifecycle.create_remote(started_at, Some(&origin)));
        assert_eq!(id.as_deref(), Some("42"));
    }

    #[test]
    fn create_swallows_failures() {
        let lifecycle = RemoteTripLifecycle::new(ScriptedApi::failing());
        let started_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(run(lifecycle.create_remote(started_at, None)), None);
    }

    #[test]
    fn complete_without_id_is_a_noop() {
        let api = ScriptedApi::new(json!({}), json!({}));
        let lifecycle = RemoteTripLifecycle::new(api);
        let ended_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let done = run(lifecycle.complete_remote(None, &TrackPath::new(), 0.0, ended_at));
        assert!(!done);
        assert!(lifecycle.api.completions.borrow().is_empty());
    }

    #[test]
    fn complete_posts_final_track() {
        let api = ScriptedApi::new(
            json!({}),
            json!({ "trip": { "id": "t1", "distance_km": "1.235", "status": "completed" } }),
        );
        let lifecycle = RemoteTripLifecycle::new(api);

        let timestamp = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let path: TrackPath = vec![
            GeoFix::new(0.0, 0.0, timestamp),
            GeoFix::new(0.0, 0.001, timestamp),
        ]
        .into();

        let done = run(lifecycle.complete_remote(Some("t1"), &path, 1234.9, timestamp));
        assert!(done);

        let completions = lifecycle.api.completions.borrow();
        let (trip_id, request) = &completions[0];
        assert_eq!(trip_id, "t1");
        assert_eq!(request.distance_km, 1.235);
        assert_eq!(request.path.len(), 2);
    }

    #[test]
    fn complete_failure_reports_false() {
        let lifecycle = RemoteTripLifecycle::new(ScriptedApi::failing());
        let ended_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let done = run(lifecycle.complete_remote(Some("t1"), &TrackPath::new(), 10.0, ended_at));
        assert!(!done);
    }
}
