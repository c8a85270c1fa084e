// Display controller - Reconciles refresh, mode and render timing into one frame per tick
use crate::application::frame_composer::FrameComposer;
use crate::application::weather_source::{FetchError, WeatherSource};
use crate::domain::airport::AirportCode;
use crate::domain::frame::{DisplayMode, Frame};
use crate::domain::weather::WeatherSnapshot;
use crate::infrastructure::demo_source::DemoSource;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::JoinHandle;

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_MODE_ALTERNATION: Duration = Duration::from_secs(10);
pub const DEFAULT_DEMO_ROTATION: Duration = Duration::from_secs(30);

/// Shortest interval any timer may run at.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Animation phase wraps after this many ticks.
const ANIMATION_CYCLE: u32 = 60;

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub airport: AirportCode,
    pub update_interval: Duration,
    pub mode_alternation: Duration,
    pub demo_rotation: Duration,
}

impl ControllerSettings {
    pub fn new(airport: AirportCode) -> Self {
        Self {
            airport,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            mode_alternation: DEFAULT_MODE_ALTERNATION,
            demo_rotation: DEFAULT_DEMO_ROTATION,
        }
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = clamp_interval(interval);
        self
    }

    pub fn with_mode_alternation(mut self, interval: Duration) -> Self {
        self.mode_alternation = clamp_interval(interval);
        self
    }

    pub fn with_demo_rotation(mut self, interval: Duration) -> Self {
        self.demo_rotation = clamp_interval(interval);
        self
    }
}

pub fn clamp_interval(interval: Duration) -> Duration {
    interval.max(MIN_INTERVAL)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Live,
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Bootstrapping,
    Live,
    DemoFallback,
}

/// Runtime aggregate owned by the render loop.
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub latest_snapshot: Option<WeatherSnapshot>,
    pub current_mode: DisplayMode,
    pub last_fetch: Option<Instant>,
    pub last_mode_switch: Option<Instant>,
    pub source_mode: SourceMode,
    pub demo_scenario_index: usize,
    pub animation_phase: u32,
}

struct InFlightFetch {
    mailbox: oneshot::Receiver<Result<WeatherSnapshot, FetchError>>,
    task: JoinHandle<()>,
}

pub struct DisplayController<S> {
    settings: ControllerSettings,
    live_source: Option<Arc<S>>,
    demo: DemoSource,
    composer: FrameComposer,
    state: ControllerState,
    in_flight: Option<InFlightFetch>,
    fetch_attempts: u64,
    consecutive_failures: u32,
}

impl<S> DisplayController<S>
where
    S: WeatherSource + 'static,
{
    /// `live_source` is `None` when no API token is configured; the controller then
    /// runs on demo data for the whole run.
    pub fn new(
        settings: ControllerSettings,
        live_source: Option<Arc<S>>,
        composer: FrameComposer,
    ) -> Self {
        let source_mode = if live_source.is_some() {
            SourceMode::Live
        } else {
            SourceMode::Demo
        };

        Self {
            settings,
            live_source,
            demo: DemoSource::new(),
            composer,
            state: ControllerState {
                latest_snapshot: None,
                current_mode: DisplayMode::Main,
                last_fetch: None,
                last_mode_switch: None,
                source_mode,
                demo_scenario_index: 0,
                animation_phase: 0,
            },
            in_flight: None,
            fetch_attempts: 0,
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Live fetches dispatched so far.
    pub fn fetch_attempts(&self) -> u64 {
        self.fetch_attempts
    }

    pub fn fetch_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn phase(&self) -> ControllerPhase {
        match (self.state.source_mode, &self.state.latest_snapshot) {
            (SourceMode::Demo, _) => ControllerPhase::DemoFallback,
            (SourceMode::Live, None) => ControllerPhase::Bootstrapping,
            (SourceMode::Live, Some(_)) => ControllerPhase::Live,
        }
    }

    /// Advance all timers to `now` and return the frame to show. Never fails: fetch
    /// errors are logged and absorbed, and a placeholder is shown until data exists.
    pub fn tick(&mut self, now: Instant) -> Frame {
        self.state.animation_phase = (self.state.animation_phase + 1) % ANIMATION_CYCLE;

        self.collect_fetch_result(now);
        if self.refresh_due(now) {
            self.refresh(now);
        }
        self.advance_mode(now);

        self.compose()
    }

    /// Refresh the snapshot from the active source, regardless of the timer.
    pub fn refresh(&mut self, now: Instant) {
        match self.state.source_mode {
            SourceMode::Live => self.dispatch_live_fetch(now),
            SourceMode::Demo => self.rotate_demo(now),
        }
    }

    /// Abandon any outstanding fetch; a late result is discarded.
    pub fn shutdown(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.task.abort();
            tracing::debug!("Abandoned in-flight weather fetch for {}", self.settings.airport);
        }
    }

    fn compose(&self) -> Frame {
        match &self.state.latest_snapshot {
            Some(snapshot) => {
                self.composer
                    .compose(snapshot, self.state.current_mode, self.state.animation_phase)
            }
            None => self
                .composer
                .compose_placeholder(&self.settings.airport, self.state.animation_phase),
        }
    }

    fn refresh_interval(&self) -> Duration {
        match self.state.source_mode {
            SourceMode::Live => self.settings.update_interval,
            SourceMode::Demo => self.settings.demo_rotation,
        }
    }

    fn refresh_due(&self, now: Instant) -> bool {
        match self.state.last_fetch {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.refresh_interval(),
        }
    }

    fn advance_mode(&mut self, now: Instant) {
        match self.state.last_mode_switch {
            None => self.state.last_mode_switch = Some(now),
            Some(last) if now.saturating_duration_since(last) >= self.settings.mode_alternation => {
                self.state.current_mode = self.state.current_mode.toggled();
                self.state.last_mode_switch = Some(now);
                tracing::debug!("Display mode switched to {:?}", self.state.current_mode);
            }
            Some(_) => {}
        }
    }

    fn dispatch_live_fetch(&mut self, now: Instant) {
        if self.in_flight.is_some() {
            tracing::debug!("Weather fetch still in flight, not dispatching another");
            return;
        }
        let Some(source) = self.live_source.clone() else {
            self.enter_demo(now);
            return;
        };

        self.state.last_fetch = Some(now);
        self.fetch_attempts += 1;

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                let error = FetchError::NetworkUnavailable(format!("no async runtime: {}", e));
                self.apply_fetch_result(Err(error), now);
                return;
            }
        };

        let (tx, rx) = oneshot::channel();
        let airport = self.settings.airport.clone();
        tracing::info!("Fetching weather for {}", airport);
        let task = runtime.spawn(async move {
            let result = source.fetch(&airport).await;
            // Receiver is gone if the controller shut down; the result is dropped.
            let _ = tx.send(result);
        });

        self.in_flight = Some(InFlightFetch { mailbox: rx, task });
    }

    fn collect_fetch_result(&mut self, now: Instant) {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return;
        };

        let result = match in_flight.mailbox.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Closed) => Err(FetchError::NetworkUnavailable(
                "fetch task ended without a result".to_string(),
            )),
        };
        self.in_flight = None;
        self.apply_fetch_result(result, now);
    }

    fn apply_fetch_result(&mut self, result: Result<WeatherSnapshot, FetchError>, now: Instant) {
        match result {
            Ok(snapshot) => {
                if self.state.latest_snapshot.is_none() {
                    tracing::info!("Live weather acquired for {}", snapshot.airport());
                }
                tracing::info!(
                    "Weather updated: {} {:?}",
                    snapshot.flight_rules().label(),
                    snapshot.weather_condition()
                );
                self.consecutive_failures = 0;
                self.state.latest_snapshot = Some(snapshot);
            }
            Err(error) if self.state.latest_snapshot.is_none() => {
                tracing::warn!(
                    "First weather fetch for {} failed ({}), switching to demo data",
                    self.settings.airport,
                    error
                );
                self.enter_demo(now);
            }
            Err(error) => {
                self.consecutive_failures += 1;
                tracing::warn!(
                    "Weather refresh failed ({}), keeping last observation ({} in a row)",
                    error,
                    self.consecutive_failures
                );
            }
        }
    }

    fn enter_demo(&mut self, now: Instant) {
        tracing::info!("Running on demo weather data for {}", self.settings.airport);
        self.state.source_mode = SourceMode::Demo;
        self.state.demo_scenario_index = 0;
        self.state.latest_snapshot = None;
        self.rotate_demo(now);
    }

    fn rotate_demo(&mut self, now: Instant) {
        if self.state.latest_snapshot.is_some() {
            self.state.demo_scenario_index =
                (self.state.demo_scenario_index + 1) % self.demo.scenario_count();
        }
        let snapshot = self
            .demo
            .scenario(self.state.demo_scenario_index, &self.settings.airport);
        tracing::debug!(
            "Demo scenario {} loaded: {}",
            self.state.demo_scenario_index,
            snapshot.flight_rules().label()
        );
        self.state.latest_snapshot = Some(snapshot);
        self.state.last_fetch = Some(now);
    }
}

impl<S> Drop for DisplayController<S> {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::weather::{CloudCoverage, CloudLayer, FlightRules, Observation};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted responses in order, repeating the last one forever.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<WeatherSnapshot, FetchError>>>,
        calls: AtomicUsize,
        hang: bool,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<WeatherSnapshot, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                hang: false,
            })
        }

        fn hanging() -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
                hang: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherSource for ScriptedSource {
        async fn fetch(&self, _airport: &AirportCode) -> Result<WeatherSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses
                    .front()
                    .cloned()
                    .unwrap_or(Err(FetchError::NetworkUnavailable("no script".into())))
            }
        }
    }

    fn kjfk() -> AirportCode {
        AirportCode::parse("KJFK").unwrap()
    }

    fn kjfk_vfr() -> WeatherSnapshot {
        let obs = Observation {
            temperature_c: Some(18),
            wind_speed_kt: Some(10),
            wind_direction_deg: Some(310),
            visibility_sm: Some(10.0),
            altimeter_inhg: Some(30.01),
            cloud_layers: vec![CloudLayer::new(CloudCoverage::Scattered, 6000)],
            ..Default::default()
        };
        WeatherSnapshot::new(kjfk(), obs, false)
    }

    fn controller(source: Option<Arc<ScriptedSource>>) -> DisplayController<ScriptedSource> {
        DisplayController::new(ControllerSettings::new(kjfk()), source, FrameComposer::new(64, 32))
    }

    fn at(t0: Instant, secs: u64) -> Instant {
        t0 + Duration::from_secs(secs)
    }

    /// Let spawned fetch tasks run to completion on the test runtime.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_settings_clamp_intervals() {
        let settings = ControllerSettings::new(kjfk())
            .with_update_interval(Duration::ZERO)
            .with_mode_alternation(Duration::from_millis(10))
            .with_demo_rotation(Duration::from_secs(45));
        assert_eq!(settings.update_interval, Duration::from_secs(1));
        assert_eq!(settings.mode_alternation, Duration::from_secs(1));
        assert_eq!(settings.demo_rotation, Duration::from_secs(45));
    }

    #[tokio::test]
    async fn test_without_token_enters_demo_on_first_tick() {
        let mut controller = controller(None);
        let t0 = Instant::now();

        let frame = controller.tick(t0);

        assert_eq!(controller.phase(), ControllerPhase::DemoFallback);
        assert_eq!(controller.fetch_attempts(), 0);
        let snapshot = controller.state().latest_snapshot.as_ref().unwrap();
        assert!(snapshot.is_demo());
        assert_eq!(controller.state().demo_scenario_index, 0);
        assert_eq!(frame.dimensions(), (64, 32));
    }

    #[tokio::test]
    async fn test_bootstrapping_shows_placeholder_until_first_fetch() {
        let source = ScriptedSource::new(vec![Ok(kjfk_vfr())]);
        let mut controller = controller(Some(source.clone()));
        let composer = FrameComposer::new(64, 32);
        let t0 = Instant::now();

        let frame = controller.tick(t0);
        assert_eq!(controller.phase(), ControllerPhase::Bootstrapping);
        assert_eq!(frame, composer.compose_placeholder(&kjfk(), 1));

        settle().await;
        let frame = controller.tick(at(t0, 1));
        assert_eq!(controller.phase(), ControllerPhase::Live);
        assert_eq!(controller.state().latest_snapshot, Some(kjfk_vfr()));
        assert_eq!(frame, composer.compose(&kjfk_vfr(), DisplayMode::Main, 2));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_first_fetch_failure_falls_back_to_demo() {
        let source = ScriptedSource::new(vec![Err(FetchError::Unauthorized)]);
        let mut controller = controller(Some(source.clone()));
        let t0 = Instant::now();

        controller.tick(t0);
        settle().await;
        controller.tick(at(t0, 1));

        assert_eq!(controller.phase(), ControllerPhase::DemoFallback);
        assert!(controller.state().latest_snapshot.as_ref().unwrap().is_demo());

        // Demo is terminal: the live source is never consulted again.
        for s in 2..=1000 {
            controller.tick(at(t0, s));
            settle().await;
        }
        assert_eq!(source.calls(), 1);
        assert_eq!(controller.phase(), ControllerPhase::DemoFallback);
    }

    #[tokio::test]
    async fn test_rate_limited_refresh_keeps_previous_snapshot() {
        let source = ScriptedSource::new(vec![Ok(kjfk_vfr()), Err(FetchError::RateLimited)]);
        let mut controller = controller(Some(source.clone()));
        let t0 = Instant::now();

        controller.tick(t0);
        settle().await;
        controller.tick(at(t0, 1));
        assert_eq!(controller.state().latest_snapshot, Some(kjfk_vfr()));

        controller.tick(at(t0, 300));
        assert_eq!(controller.state().last_fetch, Some(at(t0, 300)));
        settle().await;
        controller.tick(at(t0, 301));

        let snapshot = controller.state().latest_snapshot.as_ref().unwrap();
        assert_eq!(snapshot.airport().as_str(), "KJFK");
        assert_eq!(snapshot.flight_rules(), FlightRules::Vfr);
        assert_eq!(controller.state().last_fetch, Some(at(t0, 300)));
        assert_eq!(controller.phase(), ControllerPhase::Live);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_repeated_failures_never_replace_snapshot() {
        let source = ScriptedSource::new(vec![
            Ok(kjfk_vfr()),
            Err(FetchError::NetworkUnavailable("down".into())),
        ]);
        let settings = ControllerSettings::new(kjfk()).with_update_interval(Duration::from_secs(5));
        let mut controller =
            DisplayController::new(settings, Some(source.clone()), FrameComposer::new(64, 32));
        let t0 = Instant::now();

        controller.tick(t0);
        settle().await;
        let before = controller.tick(at(t0, 1));
        assert_eq!(controller.state().latest_snapshot, Some(kjfk_vfr()));

        for s in 2..=200 {
            let frame = controller.tick(at(t0, s));
            assert_eq!(frame.dimensions(), before.dimensions());
            settle().await;
        }

        assert!(source.calls() >= 30);
        assert_eq!(controller.state().latest_snapshot, Some(kjfk_vfr()));
        assert_eq!(controller.phase(), ControllerPhase::Live);
    }

    #[tokio::test]
    async fn test_mode_and_fetch_timers_are_independent() {
        let source = ScriptedSource::new(vec![Ok(kjfk_vfr())]);
        let mut controller = controller(Some(source.clone()));
        let t0 = Instant::now();

        let mut toggles = 0;
        let mut mode = controller.state().current_mode;
        for s in 0..=1000 {
            controller.tick(at(t0, s));
            if controller.state().current_mode != mode {
                toggles += 1;
                mode = controller.state().current_mode;
            }
            settle().await;
        }

        assert_eq!(toggles, 100);
        assert!(source.calls() <= 4);
        assert_eq!(controller.fetch_attempts(), 4);
    }

    #[tokio::test]
    async fn test_demo_rotation_cycles_back_after_150_seconds() {
        let mut controller = controller(None);
        let t0 = Instant::now();

        let mut seen = Vec::new();
        for s in 0..=150 {
            controller.tick(at(t0, s));
            let index = controller.state().demo_scenario_index;
            if seen.last() != Some(&index) {
                seen.push(index);
            }
            if s == 149 {
                assert_eq!(index, 4);
            }
        }

        assert_eq!(seen, vec![0, 1, 2, 3, 4, 0]);
        assert_eq!(controller.state().demo_scenario_index, 0);
    }

    #[tokio::test]
    async fn test_outstanding_fetch_is_not_duplicated() {
        let source = ScriptedSource::hanging();
        let mut controller = controller(Some(source.clone()));
        let t0 = Instant::now();

        controller.tick(t0);
        settle().await;
        for s in [300, 600, 900] {
            let frame = controller.tick(at(t0, s));
            settle().await;
            assert_eq!(frame.dimensions(), (64, 32));
        }

        assert_eq!(source.calls(), 1);
        assert_eq!(controller.fetch_attempts(), 1);
        assert!(controller.fetch_in_flight());
        assert_eq!(controller.phase(), ControllerPhase::Bootstrapping);

        controller.shutdown();
        assert!(!controller.fetch_in_flight());
    }

    #[tokio::test]
    async fn test_late_result_after_shutdown_is_discarded() {
        let source = ScriptedSource::new(vec![Ok(kjfk_vfr())]);
        let mut controller = controller(Some(source));
        let t0 = Instant::now();

        controller.tick(t0);
        controller.shutdown();
        settle().await;
        controller.tick(at(t0, 1));

        // The aborted fetch is not applied; a new one is only dispatched on schedule.
        assert!(controller.state().latest_snapshot.is_none());
        assert_eq!(controller.fetch_attempts(), 1);
    }

    #[test]
    fn test_tick_outside_runtime_does_not_panic() {
        let source = ScriptedSource::new(vec![Ok(kjfk_vfr())]);
        let mut controller = controller(Some(source.clone()));

        controller.tick(Instant::now());

        assert_eq!(source.calls(), 0);
        assert_eq!(controller.phase(), ControllerPhase::DemoFallback);
    }
}
