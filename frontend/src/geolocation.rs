use std::{cell::RefCell, rc::Rc};

use chrono::{DateTime, Utc};
use futures::channel::oneshot;
use gloo_console::warn;
use travelogy_lib::geo_fix::GeoFix;
use travelogy_tracking::geolocation::{
    FixCallback, FixOptions, GeolocationError, GeolocationSource,
};
use wasm_bindgen::{JsCast, closure::Closure};
use web_sys::{Geolocation, Position, PositionError, PositionOptions};

/// `navigator.geolocation` behind the engine's source interface.
pub struct WebGeolocationSource;

impl WebGeolocationSource {
    pub fn new() -> Self {
        Self
    }

    fn geolocation(&self) -> Result<Geolocation, GeolocationError> {
        gloo_utils::window()
            .navigator()
            .geolocation()
            .map_err(|_| GeolocationError::Unsupported)
    }
}

impl Default for WebGeolocationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the JS callbacks alive for as long as the platform may invoke them.
pub struct WebWatch {
    id: i32,
    _on_fix: Closure<dyn FnMut(Position)>,
    _on_error: Closure<dyn FnMut(PositionError)>,
}

impl GeolocationSource for WebGeolocationSource {
    type Watch = WebWatch;

    fn supported(&self) -> bool {
        self.geolocation().is_ok()
    }

    async fn current_fix(&self, options: &FixOptions) -> Result<GeoFix, GeolocationError> {
        let geolocation = self.geolocation()?;

        let (sender, receiver) = oneshot::channel();
        let sender = Rc::new(RefCell::new(Some(sender)));

        let on_fix = {
            let sender = Rc::clone(&sender);
            Closure::<dyn FnMut(Position)>::new(move |position: Position| {
                if let Some(sender) = sender.borrow_mut().take() {
                    let _ = sender.send(Ok(convert_position(&position)));
                }
            })
        };
        let on_error = {
            let sender = Rc::clone(&sender);
            Closure::<dyn FnMut(PositionError)>::new(move |error: PositionError| {
                if let Some(sender) = sender.borrow_mut().take() {
                    let _ = sender.send(Err(convert_error(&error)));
                }
            })
        };

        geolocation
            .get_current_position_with_error_callback_and_options(
                on_fix.as_ref().unchecked_ref(),
                Some(on_error.as_ref().unchecked_ref()),
                &position_options(options),
            )
            .map_err(|err| GeolocationError::Subscription(format!("{err:?}")))?;

        // The closures live on this stack frame until the platform answers.
        receiver
            .await
            .unwrap_or(Err(GeolocationError::PositionUnavailable))
    }

    fn watch(
        &self,
        on_fix: FixCallback,
        options: &FixOptions,
    ) -> Result<WebWatch, GeolocationError> {
        let geolocation = self.geolocation()?;

        // Success and error callbacks both feed the one session callback.
        let callback = Rc::new(RefCell::new(on_fix));

        let fix_closure = {
            let callback = Rc::clone(&callback);
            Closure::<dyn FnMut(Position)>::new(move |position: Position| {
                let mut on_fix = callback.borrow_mut();
                (*on_fix)(Ok(convert_position(&position)));
            })
        };
        let error_closure = {
            let callback = Rc::clone(&callback);
            Closure::<dyn FnMut(PositionError)>::new(move |error: PositionError| {
                let mut on_fix = callback.borrow_mut();
                (*on_fix)(Err(convert_error(&error)));
            })
        };

        let id = geolocation
            .watch_position_with_error_callback_and_options(
                fix_closure.as_ref().unchecked_ref(),
                Some(error_closure.as_ref().unchecked_ref()),
                &position_options(options),
            )
            .map_err(|err| GeolocationError::Subscription(format!("{err:?}")))?;

        Ok(WebWatch {
            id,
            _on_fix: fix_closure,
            _on_error: error_closure,
        })
    }

    fn clear_watch(&self, watch: WebWatch) {
        match self.geolocation() {
            Ok(geolocation) => geolocation.clear_watch(watch.id),
            Err(_) => warn!("geolocation disappeared before the watch was cleared"),
        }
        // Dropping the handle drops the JS callbacks with it.
    }
}

fn position_options(options: &FixOptions) -> PositionOptions {
    let opts = PositionOptions::new();
    opts.set_enable_high_accuracy(options.high_accuracy);
    opts.set_timeout(options.timeout.as_millis() as u32);
    opts.set_maximum_age(options.maximum_age.as_millis() as u32);
    opts
}

fn convert_position(position: &Position) -> GeoFix {
    let coords = position.coords();
    let timestamp =
        DateTime::from_timestamp_millis(position.timestamp() as i64).unwrap_or_else(Utc::now);
    GeoFix::with_accuracy(
        coords.latitude(),
        coords.longitude(),
        coords.accuracy(),
        timestamp,
    )
}

fn convert_error(error: &PositionError) -> GeolocationError {
    match error.code() {
        PositionError::PERMISSION_DENIED => GeolocationError::PermissionDenied,
        PositionError::POSITION_UNAVAILABLE => GeolocationError::PositionUnavailable,
        PositionError::TIMEOUT => GeolocationError::Timeout,
        _ => GeolocationError::Subscription(error.message()),
    }
}
