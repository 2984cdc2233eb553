//! Assembly and threaded runtime.
//!
//! `LiftSystem::builder()` collects the collaborators; `start()` restores or
//! calibrates the travel bounds inline, then spawns one thread per activity:
//! height sampler, motion controller, panel dispatcher, display refresher,
//! battery poller and host link. All of them watch one shutdown flag.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as xch;
use eyre::WrapErr;
use lift_traits::clock::{Clock, MonotonicClock};
use lift_traits::{Actuator, BatteryLink, DisplaySink, HostSink, KvStore, LimitSwitches, RangeSensor};
use lift_ui::addr;

use crate::actuator::ActuatorDriver;
use crate::battery::BatteryPoller;
use crate::bus::EventBus;
use crate::config::LiftCfg;
use crate::display::DisplayRefresher;
use crate::error::{BuildError, Result};
use crate::height::{HeightSampler, HeightSource, SamplerThread};
use crate::host::{HostEvent, HostLink};
use crate::hw_error::map_hw_error;
use crate::limits::LimitSensor;
use crate::motion::{BootOutcome, MotionController};
use crate::panel::{ButtonEvent, PanelDispatcher};
use crate::settings::Settings;
use crate::shared::{Flag, SharedState};

pub type BoxedSensor = Box<dyn RangeSensor + Send>;
pub type BoxedActuator = Box<dyn Actuator + Send>;
pub type BoxedSwitches = Box<dyn LimitSwitches + Send>;
pub type BoxedBattery = Box<dyn BatteryLink + Send>;
pub type BoxedDisplay = Box<dyn DisplaySink + Send>;
pub type BoxedHost = Box<dyn HostSink + Send>;

/// Slice used by the slow activities to notice shutdown promptly.
const SHUTDOWN_SLICE: Duration = Duration::from_millis(50);

/// Fully assembled but not yet running lift.
pub struct LiftSystem<C: Clock = MonotonicClock> {
    sensor: BoxedSensor,
    actuator: BoxedActuator,
    switches: BoxedSwitches,
    battery: BoxedBattery,
    display: BoxedDisplay,
    host: BoxedHost,
    store: Arc<dyn KvStore>,
    cfg: LiftCfg,
    clock: C,
}

impl LiftSystem<MonotonicClock> {
    pub fn builder() -> LiftSystemBuilder<MonotonicClock> {
        LiftSystemBuilder::default()
    }
}

pub struct LiftSystemBuilder<C: Clock = MonotonicClock> {
    sensor: Option<BoxedSensor>,
    actuator: Option<BoxedActuator>,
    switches: Option<BoxedSwitches>,
    battery: Option<BoxedBattery>,
    display: Option<BoxedDisplay>,
    host: Option<BoxedHost>,
    store: Option<Arc<dyn KvStore>>,
    cfg: LiftCfg,
    clock: C,
}

impl Default for LiftSystemBuilder<MonotonicClock> {
    fn default() -> Self {
        Self {
            sensor: None,
            actuator: None,
            switches: None,
            battery: None,
            display: None,
            host: None,
            store: None,
            cfg: LiftCfg::default(),
            clock: MonotonicClock::new(),
        }
    }
}

impl<C: Clock> LiftSystemBuilder<C> {
    pub fn with_sensor(mut self, s: impl RangeSensor + Send + 'static) -> Self {
        self.sensor = Some(Box::new(s));
        self
    }

    pub fn with_actuator(mut self, a: impl Actuator + Send + 'static) -> Self {
        self.actuator = Some(Box::new(a));
        self
    }

    pub fn with_switches(mut self, l: impl LimitSwitches + Send + 'static) -> Self {
        self.switches = Some(Box::new(l));
        self
    }

    pub fn with_battery(mut self, b: impl BatteryLink + Send + 'static) -> Self {
        self.battery = Some(Box::new(b));
        self
    }

    pub fn with_display(mut self, d: impl DisplaySink + Send + 'static) -> Self {
        self.display = Some(Box::new(d));
        self
    }

    pub fn with_host(mut self, h: impl HostSink + Send + 'static) -> Self {
        self.host = Some(Box::new(h));
        self
    }

    pub fn with_store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_config(mut self, cfg: LiftCfg) -> Self {
        self.cfg = cfg;
        self
    }

    /// Swap the time source (e.g. a `TestClock`).
    pub fn with_clock<C2: Clock>(self, clock: C2) -> LiftSystemBuilder<C2> {
        LiftSystemBuilder {
            sensor: self.sensor,
            actuator: self.actuator,
            switches: self.switches,
            battery: self.battery,
            display: self.display,
            host: self.host,
            store: self.store,
            cfg: self.cfg,
            clock,
        }
    }

    /// Check that every collaborator is present and the config is usable.
    pub fn try_build(self) -> Result<LiftSystem<C>> {
        let cfg = self.cfg;
        if cfg.bus_capacity == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig("bus capacity must be >= 1")));
        }
        if cfg.estimator.batch_size == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig("batch size must be >= 1")));
        }
        if cfg.motion.poll_ms == 0 || cfg.display_refresh_ms == 0 || cfg.host.poll_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig("activity periods must be >= 1 ms")));
        }
        Ok(LiftSystem {
            sensor: self.sensor.ok_or(BuildError::MissingSensor)?,
            actuator: self.actuator.ok_or(BuildError::MissingActuator)?,
            switches: self.switches.ok_or(BuildError::MissingSwitches)?,
            battery: self.battery.ok_or(BuildError::MissingBattery)?,
            display: self.display.ok_or(BuildError::MissingDisplay)?,
            host: self.host.ok_or(BuildError::MissingHost)?,
            store: self.store.ok_or(BuildError::MissingStore)?,
            cfg,
            clock: self.clock,
        })
    }
}

fn spawn_named(name: &str, f: impl FnOnce() + Send + 'static) -> Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .wrap_err_with(|| format!("spawning {name} thread"))
}

impl<C> LiftSystem<C>
where
    C: Clock + Clone + Send + Sync + 'static,
{
    /// Boot the lift and start every activity.
    ///
    /// Bounds are restored from storage or, on first boot, calibrated here
    /// before any thread exists; the panel is driven directly meanwhile.
    pub fn start(self) -> Result<LiftHandle> {
        let LiftSystem {
            sensor,
            actuator,
            switches,
            battery,
            mut display,
            host,
            store,
            cfg,
            clock,
        } = self;

        let settings = Settings::new(store);
        let (shared, writer) = SharedState::new(settings.theme());
        let bus = EventBus::new(cfg.bus_capacity);

        if let Err(e) = display.set_page(shared.idle_page()) {
            tracing::warn!(error = %map_hw_error(&*e), "boot page not shown");
        }
        let name = settings.device_name_or_default(&cfg.host.default_device_name);
        if let Err(e) = display.set_text(addr::DEVICE_NAME, &lift_ui::padded_name(&name)) {
            tracing::warn!(error = %map_hw_error(&*e), "device name not shown");
        }

        let mut sampler = HeightSampler::new(sensor, cfg.estimator.clone(), writer, clock.clone());
        let limits = LimitSensor::new(switches, shared.height.clone(), shared.bounds.clone(), cfg.limits.clone());
        let driver = ActuatorDriver::new(actuator, cfg.motion.full_duty, shared.lockout.clone());
        let mut motion = MotionController::new(
            driver,
            limits,
            shared.clone(),
            settings.clone(),
            bus.motor.clone(),
            bus.display.clone(),
            cfg.motion.clone(),
            clock.clone(),
        );
        let boot = motion.boot(&mut sampler, &mut display);
        tracing::info!(?boot, "boot complete");

        let shutdown = Flag::new();
        let mut threads = Vec::with_capacity(5);
        // motion must not see the unpublished 0.0 height
        sampler.refresh();
        let sampler = sampler.spawn();

        {
            let stop = shutdown.clone();
            threads.push(spawn_named("motion", move || motion.run(&stop))?);
        }

        let (panel_tx, panel_rx) = xch::unbounded::<ButtonEvent>();
        {
            let stop = shutdown.clone();
            let poll = Duration::from_millis(cfg.motion.poll_ms);
            let dispatcher = PanelDispatcher::new(
                cfg.presets.long_press_us,
                settings.clone(),
                bus.clone(),
                shared.clone(),
                clock.clone(),
            );
            threads.push(spawn_named("panel", move || dispatcher.run(&panel_rx, &stop, poll))?);
        }

        {
            let stop = shutdown.clone();
            let period = Duration::from_millis(cfg.display_refresh_ms);
            let refresher = DisplayRefresher::new(display, bus.display.clone(), shared.clone());
            let clock = clock.clone();
            threads.push(spawn_named("display", move || refresher.run(&clock, period, &stop))?);
        }

        {
            let stop = shutdown.clone();
            let poller = BatteryPoller::new(battery, cfg.power.clone(), bus.clone(), shared.clone(), clock.clone());
            threads.push(spawn_named("battery", move || poller.run(&stop, SHUTDOWN_SLICE))?);
        }

        let (host_tx, host_rx) = xch::unbounded::<HostEvent>();
        {
            let stop = shutdown.clone();
            let link = HostLink::new(host, settings, bus.clone(), shared.clone(), cfg.host.clone(), clock);
            threads.push(spawn_named("host", move || link.run(&host_rx, &stop))?);
        }

        Ok(LiftHandle {
            panel: panel_tx,
            host: host_tx,
            shared,
            bus,
            boot,
            shutdown,
            threads,
            sampler: Some(sampler),
        })
    }
}

/// Handle to a running lift; stops and joins every activity on drop.
pub struct LiftHandle {
    panel: xch::Sender<ButtonEvent>,
    host: xch::Sender<HostEvent>,
    shared: SharedState,
    bus: EventBus,
    boot: BootOutcome,
    shutdown: Flag,
    threads: Vec<JoinHandle<()>>,
    sampler: Option<SamplerThread>,
}

impl LiftHandle {
    /// Feed a decoded panel event.
    pub fn press(&self, ev: ButtonEvent) {
        if self.panel.send(ev).is_err() {
            tracing::warn!("panel dispatcher gone; event dropped");
        }
    }

    /// Feed a decoded host-link event.
    pub fn host_event(&self, ev: HostEvent) {
        if self.host.send(ev).is_err() {
            tracing::warn!("host link gone; event dropped");
        }
    }

    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn boot_outcome(&self) -> BootOutcome {
        self.boot
    }

    /// Milliseconds since the height sampler last produced a height.
    pub fn sampler_stalled_ms(&self) -> u64 {
        self.sampler.as_ref().map_or(0, SamplerThread::stalled_for_now)
    }

    /// Stop every activity and wait for them.
    pub fn shutdown(mut self) {
        self.stop_all();
    }

    fn stop_all(&mut self) {
        self.shutdown.set(true);
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("activity").to_string();
            if handle.join().is_err() {
                tracing::warn!(thread = %name, "activity panicked during shutdown");
            }
        }
        // Joined last: the motion thread may still be reading heights.
        self.sampler.take();
        tracing::info!(dropped = self.bus.dropped_total(), "lift stopped");
    }
}

impl Drop for LiftHandle {
    fn drop(&mut self) {
        if !self.threads.is_empty() || self.sampler.is_some() {
            self.stop_all();
        }
    }
}
