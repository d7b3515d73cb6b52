// simulation.rs
//
// Wall-clock driver around the engine. The engine lives behind a shared handle so a
// presentation layer can poll snapshots and push inputs between ticks.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};

use crate::communication::headless::HeadlessPresenter;
use crate::communication::messages::{ControlCommand, PresentationSignal};
use crate::monitoring::persistence::{self, KeyValueStore};
use crate::monitoring::report::RunReport;
use crate::simulation_engine::engine::Engine;
use crate::simulation_engine::environment::EnvironmentSnapshot;

/// Shared, possibly not-yet-initialized engine. Every accessor is a no-op returning `None`
/// or `false` until `install` has been called.
#[derive(Clone, Default)]
pub struct EngineHandle {
    inner: Arc<Mutex<Option<Engine>>>,
}

impl EngineHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, engine: Engine) {
        *self.lock() = Some(engine);
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Engine>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn with_engine<T>(&self, f: impl FnOnce(&mut Engine) -> T) -> Option<T> {
        self.lock().as_mut().map(f)
    }

    pub fn snapshot(&self) -> Option<EnvironmentSnapshot> {
        self.with_engine(|engine| engine.snapshot())
    }

    pub fn send_signal(&self, signal: PresentationSignal) -> bool {
        self.with_engine(|engine| engine.apply_signal(signal)).is_some()
    }

    pub fn send_command(&self, command: ControlCommand) -> bool {
        self.with_engine(|engine| engine.apply_command(command)).is_some()
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> bool {
        self.with_engine(|engine| engine.save_to(store)).unwrap_or(false)
    }

    /// Zeroes the session timer in memory and removes the stored value.
    pub fn clear_session_time(&self, store: &mut dyn KeyValueStore) -> bool {
        self.send_command(ControlCommand::ClearSessionTime)
            && persistence::clear_session_time(store)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Stop after this many processed ticks.
    pub max_ticks: Option<u64>,
    /// Skip the per-tick wall-clock delay.
    pub fast: bool,
    pub autosave_secs: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_ticks: None,
            fast: false,
            autosave_secs: 30,
        }
    }
}

/// Steps the engine `sim_speed` times per wall-clock second (or flat out in fast mode)
/// until the tick limit or Ctrl-C, autosaving along the way. Returns the number of ticks
/// processed. Learning is always saved before returning.
pub async fn run_simulation(
    handle: EngineHandle,
    options: RunOptions,
    presenter: &mut HeadlessPresenter,
    store: &mut dyn KeyValueStore,
    report: &mut RunReport,
) -> u64 {
    if !handle.is_initialized() {
        log::warn!("Simulation started before the engine was installed; nothing to run");
        return 0;
    }

    let mut autosave = interval(Duration::from_secs(options.autosave_secs.max(1)));
    autosave.set_missed_tick_behavior(MissedTickBehavior::Skip);
    autosave.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut ticks_run = 0u64;
    loop {
        if options.max_ticks.is_some_and(|max| ticks_run >= max) {
            break;
        }
        let speed = handle
            .with_engine(|engine| engine.config().sim_speed)
            .unwrap_or(1)
            .max(1);
        let delay = if options.fast {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / speed as f64)
        };

        tokio::select! {
            _ = &mut ctrl_c => {
                log::info!("Interrupted after {} ticks", ticks_run);
                break;
            }
            _ = autosave.tick() => {
                if handle.save(store) {
                    log::debug!("Autosaved learning");
                }
            }
            _ = sleep(delay) => {
                let stepped = handle.with_engine(|engine| {
                    let stepped = engine.step().is_some();
                    presenter.sync(engine);
                    if stepped {
                        let learned = engine.agent().table.len();
                        report.sample(engine.environment(), learned);
                    }
                    stepped
                });
                if stepped == Some(true) {
                    ticks_run += 1;
                }
            }
        }
    }

    if !handle.save(store) {
        log::warn!("Final save did not complete");
    }
    ticks_run
}
