use std::{cell::RefCell, rc::Rc};

use chrono::{DateTime, Utc};
use futures::future::LocalBoxFuture;
use travelogy_lib::{distance, geo_fix::GeoFix, track_path::TrackPath};

use crate::{
    TrackingError,
    geolocation::{FixOptions, GeolocationError, GeolocationSource},
    remote::{RemoteTripLifecycle, TripApi},
};

/// Fire-and-forget executor seam. The browser build hands futures to the JS
/// microtask queue; tests drive a local pool deterministically.
pub trait Spawner {
    fn spawn(&self, future: LocalBoxFuture<'static, ()>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Active,
    /// Transient: resolves to `Idle` before `stop` returns.
    Stopping,
}

/// Read-only view handed to the UI. Everything in here is a copy; mutating it
/// cannot race the live session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub path: TrackPath,
    pub cumulative_distance_meters: f64,
    pub duration_seconds: i64,
    pub remote_trip_id: Option<String>,
    /// Most recent transient fix error, cleared by the next good fix.
    pub last_error: Option<GeolocationError>,
}

type Listener = Rc<dyn Fn(&SessionSnapshot)>;

struct SessionState {
    status: SessionStatus,
    /// Bumped on every `start` so stale callbacks and late remote results
    /// from a previous run cannot touch the current one.
    epoch: u64,
    starting: bool,
    path: TrackPath,
    cumulative_distance_meters: f64,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    remote_trip_id: Option<String>,
    last_error: Option<GeolocationError>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            epoch: 0,
            starting: false,
            path: TrackPath::new(),
            cumulative_distance_meters: 0.0,
            started_at: None,
            stopped_at: None,
            remote_trip_id: None,
            last_error: None,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        let duration_seconds = match self.started_at {
            Some(started_at) => {
                let end = match self.status {
                    SessionStatus::Idle => self.stopped_at.unwrap_or(started_at),
                    SessionStatus::Active | SessionStatus::Stopping => Utc::now(),
                };
                (end - started_at).num_seconds()
            }
            None => 0,
        };

        SessionSnapshot {
            status: self.status,
            path: self.path.clone(),
            cumulative_distance_meters: self.cumulative_distance_meters,
            duration_seconds,
            remote_trip_id: self.remote_trip_id.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

/// The one owner of live tracking state. Subscribes to the geolocation
/// source, grows the path fix by fix, and mirrors the session lifecycle to
/// the remote backend without ever depending on it.
///
/// Single-threaded by design: fixes arrive as callbacks and each one runs to
/// completion before the next is processed.
pub struct TrackingSession<S: GeolocationSource, A> {
    source: Rc<S>,
    remote: Rc<RemoteTripLifecycle<A>>,
    spawner: Rc<dyn Spawner>,
    options: FixOptions,
    state: Rc<RefCell<SessionState>>,
    watch: RefCell<Option<S::Watch>>,
    listeners: Rc<RefCell<Vec<Listener>>>,
}

impl<S, A> TrackingSession<S, A>
where
    S: GeolocationSource,
    A: TripApi + 'static,
{
    pub fn new(source: Rc<S>, remote: Rc<RemoteTripLifecycle<A>>, spawner: Rc<dyn Spawner>) -> Self {
        Self::with_options(source, remote, spawner, FixOptions::default())
    }

    pub fn with_options(
        source: Rc<S>,
        remote: Rc<RemoteTripLifecycle<A>>,
        spawner: Rc<dyn Spawner>,
        options: FixOptions,
    ) -> Self {
        Self {
            source,
            remote,
            spawner,
            options,
            state: Rc::new(RefCell::new(SessionState::new())),
            watch: RefCell::new(None),
            listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Begins a tracking session: seeds the path with one high-accuracy fix,
    /// subscribes to continuous updates and registers the trip remotely in
    /// the background.
    ///
    /// Failing to obtain the seed fix is not fatal; the session starts with
    /// an empty path and the origin is simply not pinned. Only a missing
    /// location capability or a failed subscription abort the start.
    pub async fn start(&self) -> Result<(), TrackingError> {
        let started_at = Utc::now();
        let epoch = {
            let mut state = self.state.borrow_mut();
            if state.status != SessionStatus::Idle || state.starting {
                return Err(TrackingError::SessionAlreadyActive);
            }
            if !self.source.supported() {
                return Err(TrackingError::GeolocationUnavailable);
            }
            state.starting = true;
            state.epoch += 1;
            state.path.clear();
            state.cumulative_distance_meters = 0.0;
            state.started_at = Some(started_at);
            state.stopped_at = None;
            state.remote_trip_id = None;
            state.last_error = None;
            state.epoch
        };

        let origin = match self.source.current_fix(&self.options).await {
            Ok(fix) => {
                self.state.borrow_mut().path.push(fix.clone());
                Some(fix)
            }
            Err(err) => {
                log::warn!("initial fix failed, starting with an unpinned origin: {err}");
                None
            }
        };

        let on_fix = {
            let state = Rc::clone(&self.state);
            let listeners = Rc::clone(&self.listeners);
            Box::new(move |result: Result<GeoFix, GeolocationError>| {
                handle_fix(&state, &listeners, epoch, result);
            })
        };

        let watch = match self.source.watch(on_fix, &self.options) {
            Ok(watch) => watch,
            Err(err) => {
                self.state.borrow_mut().starting = false;
                return Err(TrackingError::Subscription(err));
            }
        };
        *self.watch.borrow_mut() = Some(watch);

        let snapshot = {
            let mut state = self.state.borrow_mut();
            state.starting = false;
            state.status = SessionStatus::Active;
            state.snapshot()
        };

        let remote = Rc::clone(&self.remote);
        let state = Rc::clone(&self.state);
        self.spawner.spawn(Box::pin(async move {
            let Some(id) = remote.create_remote(started_at, origin.as_ref()).await else {
                return;
            };
            let mut state = state.borrow_mut();
            // The id only belongs to this run, and only while it is live; a
            // session stopped mid-request completes remotely as local-only.
            if state.epoch == epoch && state.status == SessionStatus::Active {
                state.remote_trip_id = Some(id);
            }
        }));

        notify(&self.listeners, &snapshot);
        Ok(())
    }

    /// Ends the active session. A no-op while `Idle`. The watch is released
    /// unconditionally; remote completion runs in the background and its
    /// outcome never reopens or alters the local record. Path and distance
    /// stay readable until the next `start`.
    pub fn stop(&self) {
        {
            let mut state = self.state.borrow_mut();
            if state.status != SessionStatus::Active {
                return;
            }
            state.status = SessionStatus::Stopping;
        }

        if let Some(watch) = self.watch.borrow_mut().take() {
            self.source.clear_watch(watch);
        }

        let ended_at = Utc::now();
        let (snapshot, remote_trip_id, path, distance_meters) = {
            let mut state = self.state.borrow_mut();
            state.status = SessionStatus::Idle;
            state.stopped_at = Some(ended_at);
            (
                state.snapshot(),
                state.remote_trip_id.clone(),
                state.path.clone(),
                state.cumulative_distance_meters,
            )
        };

        let remote = Rc::clone(&self.remote);
        self.spawner.spawn(Box::pin(async move {
            remote
                .complete_remote(remote_trip_id.as_deref(), &path, distance_meters, ended_at)
                .await;
        }));

        notify(&self.listeners, &snapshot);
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().snapshot()
    }

    /// Registers a read-only observer. Listeners run after every accepted
    /// fix, every fix error, on start and on stop.
    pub fn on_update(&self, listener: impl Fn(&SessionSnapshot) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }
}

impl<S: GeolocationSource, A> Drop for TrackingSession<S, A> {
    fn drop(&mut self) {
        // The location handle must not outlive its owner.
        if let Some(watch) = self.watch.borrow_mut().take() {
            self.source.clear_watch(watch);
        }
    }
}

fn handle_fix(
    state: &Rc<RefCell<SessionState>>,
    listeners: &Rc<RefCell<Vec<Listener>>>,
    epoch: u64,
    result: Result<GeoFix, GeolocationError>,
) {
    let snapshot = {
        let mut state = state.borrow_mut();
        if state.epoch != epoch || state.status != SessionStatus::Active {
            // Late delivery from a watch that is already being torn down.
            return;
        }

        match result {
            Ok(fix) => {
                let added = distance::accumulate(&mut state.path, fix);
                state.cumulative_distance_meters += added;
                state.last_error = None;
            }
            Err(err) => {
                // Transient by contract: the subscription stays up and only
                // an explicit stop ends the session.
                log::warn!("fix error while tracking: {err}");
                state.last_error = Some(err);
            }
        }

        state.snapshot()
    };

    notify(listeners, &snapshot);
}

fn notify(listeners: &Rc<RefCell<Vec<Listener>>>, snapshot: &SessionSnapshot) {
    // Clone out so a listener may register further listeners.
    let current: Vec<Listener> = listeners.borrow().iter().cloned().collect();
    for listener in current {
        listener(snapshot);
    }
}
