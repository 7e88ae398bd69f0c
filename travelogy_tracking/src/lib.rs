pub mod export;
pub mod geolocation;
pub mod remote;
pub mod session;

use crate::geolocation::GeolocationError;

#[derive(Debug, Clone, PartialEq)]
pub enum TrackingError {
    /// The platform has no location capability at all. Fatal to `start`, the
    /// caller decides whether to offer a retry.
    GeolocationUnavailable,
    /// A session is already running. Stop it before starting another one.
    SessionAlreadyActive,
    /// The continuous position subscription could not be established.
    Subscription(GeolocationError),
}
