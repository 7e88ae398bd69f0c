use gloo_net::http::Request;
use travelogy_lib::remote_trip::{
    CompleteTripRequest, CompleteTripResponse, StartTripRequest, StartTripResponse,
};
use travelogy_tracking::remote::{RemoteError, TripApi};

/// HTTP transport towards the trip backend.
pub struct HttpTripApi {
    base: String,
}

impl HttpTripApi {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }
}

impl TripApi for HttpTripApi {
    async fn start_trip(
        &self,
        request: &StartTripRequest,
    ) -> Result<StartTripResponse, RemoteError> {
        post_json(&format!("{}/trips/start", self.base), request).await
    }

    async fn complete_trip(
        &self,
        trip_id: &str,
        request: &CompleteTripRequest,
    ) -> Result<CompleteTripResponse, RemoteError> {
        post_json(&format!("{}/trips/{}/complete", self.base, trip_id), request).await
    }
}

async fn post_json<B, R>(url: &str, body: &B) -> Result<R, RemoteError>
where
    B: serde::Serialize,
    R: serde::de::DeserializeOwned,
{
    let response = Request::post(url)
        .json(body)
        .map_err(|err| RemoteError::Network(err.to_string()))?
        .send()
        .await
        .map_err(|err| RemoteError::Network(err.to_string()))?;

    if !response.ok() {
        return Err(RemoteError::Status(response.status()));
    }

    response
        .json::<R>()
        .await
        .map_err(|err| RemoteError::Decode(err.to_string()))
}
