use std::fmt;
use std::time::Duration;

use travelogy_lib::geo_fix::GeoFix;

/// Options passed through to the underlying positioning API.
#[derive(Debug, Clone, PartialEq)]
pub struct FixOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(30),
            maximum_age: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeolocationError {
    /// No positioning capability on this platform.
    Unsupported,
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Subscription(String),
}

impl fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "geolocation is not supported on this platform"),
            Self::PermissionDenied => write!(f, "location permission denied"),
            Self::PositionUnavailable => write!(f, "position unavailable"),
            Self::Timeout => write!(f, "timed out waiting for a position"),
            Self::Subscription(message) => write!(f, "location subscription failed: {message}"),
        }
    }
}

pub type FixCallback = Box<dyn FnMut(Result<GeoFix, GeolocationError>)>;

/// Push-based position source. The platform delivers fixes through the
/// callback handed to `watch`; at most one watch exists at a time and it is
/// owned by the tracking session.
///
/// Modelled as an explicit subscription with a disposable handle so the
/// session can be exercised against a scripted fake without a browser.
#[allow(async_fn_in_trait)]
pub trait GeolocationSource {
    type Watch;

    /// Capability probe. `start` fails up front when this is false.
    fn supported(&self) -> bool;

    /// One-shot fix, used to pin the origin of a session.
    async fn current_fix(&self, options: &FixOptions) -> Result<GeoFix, GeolocationError>;

    /// Begins continuous delivery. Per-fix failures are reported through the
    /// callback, not by tearing the subscription down.
    fn watch(
        &self,
        on_fix: FixCallback,
        options: &FixOptions,
    ) -> Result<Self::Watch, GeolocationError>;

    /// Cancels delivery and releases the platform location handle.
    fn clear_watch(&self, watch: Self::Watch);
}
