//! Browser glue for the tracking engine: the geolocation source, the HTTP
//! trip API and the file download live here, behind the interfaces the engine
//! defines. Page composition stays out of this crate.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use travelogy_tracking::{
    remote::RemoteTripLifecycle,
    session::{Spawner, TrackingSession},
};

use crate::{api::HttpTripApi, geolocation::WebGeolocationSource};

pub mod api;
pub mod download;
pub mod geolocation;

pub struct BrowserSpawner;

impl Spawner for BrowserSpawner {
    fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(future);
    }
}

pub type BrowserSession = TrackingSession<WebGeolocationSource, HttpTripApi>;

/// Wires a session against `navigator.geolocation` and the trip backend
/// mounted at `api_base` (for example "/api").
pub fn browser_session(api_base: &str) -> BrowserSession {
    TrackingSession::new(
        Rc::new(WebGeolocationSource::new()),
        Rc::new(RemoteTripLifecycle::new(HttpTripApi::new(api_base))),
        Rc::new(BrowserSpawner),
    )
}
