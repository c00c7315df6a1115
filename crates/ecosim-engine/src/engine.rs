//! Simulation engine: a tick scheduler with start/pause/resume/stop/step
//! controls, driven by a background thread.
//!
//! All world mutation happens inside a tick, and ticks are serialized through
//! a gate mutex shared by the background driver and manual `step()` calls, so
//! only one tick is ever in flight. The inter-tick sleep is a condvar wait
//! that `stop()` interrupts, keeping shutdown prompt.

use crate::listener::SimulationListener;
use ecosim_core::{EcosystemConfig, EcosystemStats, Error, Result};
use ecosim_world::World;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounds for the inter-tick interval.
pub const MIN_TICK_INTERVAL_MS: u64 = 50;
pub const MAX_TICK_INTERVAL_MS: u64 = 2000;

/// Rolling statistics history bound; oldest entries are evicted on overflow.
const MAX_HISTORY: usize = 500;

/// Engine life cycle. `Finished` is terminal except through `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Stopped,
    Running,
    Paused,
    Finished,
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationState::Stopped => write!(f, "stopped"),
            SimulationState::Running => write!(f, "running"),
            SimulationState::Paused => write!(f, "paused"),
            SimulationState::Finished => write!(f, "finished"),
        }
    }
}

struct EngineInner {
    world: RwLock<Option<World>>,
    config: RwLock<Option<EcosystemConfig>>,
    state: Mutex<SimulationState>,
    running: AtomicBool,
    tick_interval_ms: AtomicU64,
    history: Mutex<VecDeque<EcosystemStats>>,
    listeners: RwLock<Vec<Arc<dyn SimulationListener>>>,
    /// Serializes tick execution between the driver and manual `step()`.
    tick_gate: Mutex<()>,
    sleep_lock: Mutex<()>,
    sleep_cv: Condvar,
    driver: Mutex<Option<JoinHandle<()>>>,
}

/// Thread-safe engine handle. Clones share the same engine.
#[derive(Clone)]
pub struct SimulationEngine {
    inner: Arc<EngineInner>,
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationEngine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EngineInner {
                world: RwLock::new(None),
                config: RwLock::new(None),
                state: Mutex::new(SimulationState::Stopped),
                running: AtomicBool::new(false),
                tick_interval_ms: AtomicU64::new(200),
                history: Mutex::new(VecDeque::new()),
                listeners: RwLock::new(Vec::new()),
                tick_gate: Mutex::new(()),
                sleep_lock: Mutex::new(()),
                sleep_cv: Condvar::new(),
                driver: Mutex::new(None),
            }),
        }
    }

    /// Build a fresh world from `config`, record the tick-0 snapshot and
    /// notify observers with it.
    pub fn initialize(&self, config: EcosystemConfig) {
        let _gate = self.inner.tick_gate.lock();
        self.set_tick_interval_ms(config.simulation.tick_interval_ms);

        let mut world = World::new(config.clone());
        world.initialize();
        let initial = world.statistics();

        *self.inner.world.write() = Some(world);
        *self.inner.config.write() = Some(config);
        {
            let mut history = self.inner.history.lock();
            history.clear();
            history.push_back(initial.clone());
        }
        info!(stats = %initial, "engine initialized");
        self.inner.notify_update(&initial);
    }

    /// Spin up the background tick-driver. Observers see the `Running`
    /// transition before any tick's `on_update`.
    pub fn start(&self) -> Result<()> {
        match self.state() {
            SimulationState::Running => return Ok(()),
            SimulationState::Finished => {
                return Err(Error::InvalidState(
                    "simulation finished; reset before starting again".into(),
                ))
            }
            _ => {}
        }
        if self.inner.world.read().is_none() {
            warn!("start() called before initialize()");
            return Err(Error::NotInitialized);
        }

        if self.inner.running.swap(true, Ordering::SeqCst) {
            // The driver is already alive (paused); just resume it.
            self.inner.set_state(SimulationState::Running);
            return Ok(());
        }

        self.inner.set_state(SimulationState::Running);
        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name("ecosim-tick-driver".into())
            .spawn(move || inner.drive())
            .map_err(|err| Error::InvalidState(format!("failed to spawn tick driver: {err}")))?;
        *self.inner.driver.lock() = Some(handle);
        Ok(())
    }

    /// Pause the timed loop; the driver stays alive and keeps sleeping.
    pub fn pause(&self) {
        let changed = {
            let mut state = self.inner.state.lock();
            if *state == SimulationState::Running {
                *state = SimulationState::Paused;
                true
            } else {
                false
            }
        };
        if changed {
            self.inner.notify_state(SimulationState::Paused);
        }
    }

    pub fn resume(&self) {
        let changed = {
            let mut state = self.inner.state.lock();
            if *state == SimulationState::Paused {
                *state = SimulationState::Running;
                true
            } else {
                false
            }
        };
        if changed {
            self.inner.notify_state(SimulationState::Running);
        }
    }

    /// Stop the driver and wait for it to exit. The sleep is interrupted, so
    /// this returns promptly; a partially started tick still completes behind
    /// the gate before the thread observes the flag.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.wake_driver();
        if let Some(handle) = self.inner.driver.lock().take() {
            if thread::current().id() != handle.thread().id() {
                let _ = handle.join();
            }
        }
        self.inner.set_state(SimulationState::Stopped);
    }

    /// Stop, then rebuild the world from the last configuration.
    pub fn reset(&self) {
        self.stop();
        let config = self.inner.config.read().clone();
        if let Some(config) = config {
            self.initialize(config);
        }
    }

    /// Perform exactly one tick while not running, for manual stepping. May
    /// be called from any thread; concurrent ticks are rejected, never
    /// interleaved.
    pub fn step(&self) -> Result<()> {
        match self.state() {
            SimulationState::Running => {
                return Err(Error::InvalidState("cannot single-step while running".into()))
            }
            SimulationState::Finished => {
                return Err(Error::InvalidState("simulation already finished".into()))
            }
            _ => {}
        }
        if self.inner.world.read().is_none() {
            return Err(Error::NotInitialized);
        }

        let Some(gate) = self.inner.tick_gate.try_lock() else {
            return Err(Error::TickInFlight);
        };
        let Some(stats) = self.inner.run_tick_locked() else {
            return Err(Error::NotInitialized);
        };
        drop(gate);

        if let Some(reason) = self.inner.end_reason(&stats) {
            self.inner.finish(&reason, stats);
        }
        Ok(())
    }

    // === Speed controls ===

    /// Clamped to [`MIN_TICK_INTERVAL_MS`, `MAX_TICK_INTERVAL_MS`].
    pub fn set_tick_interval_ms(&self, interval_ms: u64) {
        let clamped = interval_ms.clamp(MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS);
        self.inner.tick_interval_ms.store(clamped, Ordering::SeqCst);
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.inner.tick_interval_ms.load(Ordering::SeqCst)
    }

    pub fn speed_up(&self) {
        self.set_tick_interval_ms(self.tick_interval_ms() / 2);
    }

    pub fn slow_down(&self) {
        self.set_tick_interval_ms(self.tick_interval_ms().saturating_mul(2));
    }

    // === Observers ===

    /// Register an observer. Registering the same handle twice is a no-op,
    /// so each observer receives every event exactly once per occurrence.
    pub fn add_listener(&self, listener: Arc<dyn SimulationListener>) {
        let mut listeners = self.inner.listeners.write();
        if !listeners.iter().any(|known| Arc::ptr_eq(known, &listener)) {
            listeners.push(listener);
        }
    }

    pub fn remove_listener(&self, listener: &Arc<dyn SimulationListener>) {
        self.inner
            .listeners
            .write()
            .retain(|known| !Arc::ptr_eq(known, listener));
    }

    // === Read-only queries ===

    pub fn state(&self) -> SimulationState {
        *self.inner.state.lock()
    }

    /// Rolling history of statistics snapshots, oldest first.
    pub fn history(&self) -> Vec<EcosystemStats> {
        self.inner.history.lock().iter().cloned().collect()
    }

    pub fn current_stats(&self) -> Option<EcosystemStats> {
        self.inner.world.read().as_ref().map(World::statistics)
    }

    /// Run a read-only closure against the world, if one is initialized.
    /// Ticks are blocked for the duration; keep the closure short.
    pub fn with_world<R>(&self, f: impl FnOnce(&World) -> R) -> Option<R> {
        self.inner.world.read().as_ref().map(f)
    }
}

impl EngineInner {
    /// Background loop: tick while `Running`, then sleep the configured
    /// interval. Exits when the running flag drops or the end condition
    /// fires; a cleared flag is observed before starting another tick, never
    /// mid-tick.
    fn drive(&self) {
        debug!("tick driver started");
        while self.running.load(Ordering::SeqCst) {
            let active = *self.state.lock() == SimulationState::Running;
            if active {
                let Some(stats) = self.run_tick() else {
                    break;
                };
                if let Some(reason) = self.end_reason(&stats) {
                    self.finish(&reason, stats);
                    break;
                }
            }
            self.sleep_between_ticks();
        }
        debug!("tick driver exited");
    }

    fn run_tick(&self) -> Option<EcosystemStats> {
        let _gate = self.tick_gate.lock();
        self.run_tick_locked()
    }

    /// One tick: advance the world, record the snapshot, fan out `on_update`.
    /// Caller holds the tick gate.
    fn run_tick_locked(&self) -> Option<EcosystemStats> {
        let stats = {
            let mut world = self.world.write();
            world.as_mut()?.step()
        };
        {
            let mut history = self.history.lock();
            history.push_back(stats.clone());
            if history.len() > MAX_HISTORY {
                history.pop_front();
            }
        }
        self.notify_update(&stats);
        Some(stats)
    }

    fn end_reason(&self, stats: &EcosystemStats) -> Option<String> {
        if !stats.is_ecosystem_alive() {
            return Some("all consumers have died; only producers remain".to_string());
        }
        let max_generations = self
            .config
            .read()
            .as_ref()
            .map_or(u64::MAX, |config| config.simulation.max_generations);
        if stats.generation >= max_generations {
            return Some(format!("reached the maximum of {max_generations} generations"));
        }
        None
    }

    fn finish(&self, reason: &str, stats: EcosystemStats) {
        self.running.store(false, Ordering::SeqCst);
        self.set_state(SimulationState::Finished);
        info!(reason, generation = stats.generation, "simulation finished");
        for listener in self.listeners.read().iter() {
            listener.on_simulation_ended(reason, &stats);
        }
    }

    fn set_state(&self, new_state: SimulationState) {
        {
            *self.state.lock() = new_state;
        }
        self.notify_state(new_state);
    }

    fn notify_state(&self, new_state: SimulationState) {
        debug!(state = %new_state, "engine state changed");
        for listener in self.listeners.read().iter() {
            listener.on_state_changed(new_state);
        }
    }

    fn notify_update(&self, stats: &EcosystemStats) {
        for listener in self.listeners.read().iter() {
            listener.on_update(stats);
        }
    }

    /// Interruptible inter-tick sleep: checking the running flag under the
    /// sleep lock means a wake from `stop()` is never missed.
    fn sleep_between_ticks(&self) {
        let interval = Duration::from_millis(self.tick_interval_ms.load(Ordering::SeqCst));
        let mut guard = self.sleep_lock.lock();
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        self.sleep_cv.wait_for(&mut guard, interval);
    }

    fn wake_driver(&self) {
        let _guard = self.sleep_lock.lock();
        self.sleep_cv.notify_all();
    }
}
