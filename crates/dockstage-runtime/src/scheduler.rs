#![forbid(unsafe_code)]

//! The stage scheduler.
//!
//! A [`Scheduler`] owns every piece of state the dispatch path touches: the
//! stage table, the action registry, and the module table. Nothing is
//! process-global, so independent schedulers can coexist (one per embedded
//! view, for instance) and tests get deterministic, isolated instances.
//!
//! # Dispatch ladder
//!
//! [`Scheduler::run`] resolves an action's callable and enqueues it:
//!
//! 1. A direct callable wins.
//! 2. A numeric code is looked up in the code table. A miss is *not* an
//!    error at this point — the action is enqueued unresolved and silently
//!    never fires.
//! 3. A dotted name is looked up in the name table. On a miss the name's
//!    module namespace decides: already loaded means the export is simply
//!    missing (logged, rejected); currently loading means the action waits
//!    on that load's continuation; otherwise a load starts with this action
//!    registered as its continuation. Nothing is enqueued until the module
//!    arrives.
//! 4. No callable, code, or name: logged and rejected.
//!
//! Failures never propagate to the caller as errors; the scheduler is
//! fire-and-forget and reports what happened through the [`Dispatch`] value.
//!
//! # Drivers
//!
//! Every stage with pending work has a periodic driver: a background thread
//! waiting on a condvar-signalled stop flag, ticking the stage through the
//! shared core each interval. A tick that reports the stage stopped ends
//! the driver; re-enqueueing restarts one. Hosts that want full control
//! disable `spawn_tickers` and call [`Scheduler::tick_now`] themselves.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread;
use std::time::Duration;

use dockstage_core::uid::UidGen;
use web_time::Instant;

use crate::action::{Action, ActionCx, ActionSignal};
use crate::loader::{ActionPath, LoadRequest, ModuleLoader, ModuleTable, NullLoader};
use crate::loader::{cache_busted, script_url};
use crate::registry::ActionRegistry;
use crate::stage::{Stage, TickReport, tick_stage};

/// Scheduler tunables.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Stage id used by actions that do not name one. Default: `Stage1`.
    pub default_stage: String,
    /// Tick interval assigned to stages created on demand. Default: 2s.
    pub tick_interval: Duration,
    /// Library base path that derived module resources resolve against.
    /// Default: `src/`.
    pub lib_url: String,
    /// Append a unique query parameter to every module URL. Default: on.
    pub cache_bust: bool,
    /// Spawn periodic driver threads for running stages. Disable for
    /// manual ticking via [`Scheduler::tick_now`]. Default: on.
    pub spawn_tickers: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_stage: "Stage1".to_string(),
            tick_interval: Duration::from_millis(2000),
            lib_url: "src/".to_string(),
            cache_bust: true,
            spawn_tickers: true,
        }
    }
}

/// Outcome of handing an action to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The action is on a stage timeline under the given key.
    Scheduled { stage: String, key: String },
    /// A module load was started; the action runs when it completes.
    LoadStarted { module: String },
    /// The module was already loading; the action was dropped in favor of
    /// the load's registered continuation.
    LoadPending { module: String },
    /// The action could not be resolved and was not scheduled.
    Rejected(DispatchError),
}

/// Why a dispatch was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The action carried no callable, code, or name.
    MissingCallable,
    /// The name's module is loaded but exports no such action.
    UndefinedAction { name: String, module: String },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCallable => write!(f, "action has no callable, code, or name"),
            Self::UndefinedAction { name, module } => {
                write!(f, "module {module} is loaded but action {name} is undefined")
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Instruction to start a stage's periodic driver.
#[derive(Debug, Clone)]
struct StartRequest {
    stage: String,
    interval: Duration,
    generation: u64,
}

/// Everything behind the core lock.
struct Core {
    config: SchedulerConfig,
    stages: BTreeMap<String, Stage>,
    registry: ActionRegistry,
    modules: ModuleTable,
    loader: Box<dyn ModuleLoader>,
    uid: UidGen,
}

impl Core {
    fn new(config: SchedulerConfig, loader: Box<dyn ModuleLoader>) -> Self {
        Self {
            config,
            stages: BTreeMap::new(),
            registry: ActionRegistry::new(),
            modules: ModuleTable::default(),
            loader,
            uid: UidGen::new(),
        }
    }

    /// Enqueue onto a stage, creating the stage on first reference.
    fn put(&mut self, mut act: Action) -> (String, String, Option<StartRequest>) {
        let stage_id = match act.stage.clone() {
            Some(id) => id,
            None => {
                let id = self.config.default_stage.clone();
                act.stage = Some(id.clone());
                id
            }
        };
        if act.start_at.is_none() && (act.start_delay.is_some() || act.timeout.is_some()) {
            act.start_at = Some(Instant::now() + act.start_delay.unwrap_or_default());
        }
        let interval = self.config.tick_interval;
        let stage = self
            .stages
            .entry(stage_id.clone())
            .or_insert_with(|| Stage::new(stage_id.clone(), interval));

        // After-keyed actions always land on the after timeline; everything
        // else gets a main-timeline key, generated when absent. Same-key
        // insertion replaces, which is the at-most-once-per-tick coalescing.
        let key = if let Some(after_key) = act.after_key.clone() {
            stage.after.insert(after_key.clone(), act);
            after_key
        } else {
            let key = match act.key.clone() {
                Some(key) => key,
                None => {
                    let key = self.uid.tagged("a");
                    act.key = Some(key.clone());
                    key
                }
            };
            stage.timeline.insert(key.clone(), act);
            key
        };

        let start = if stage.running {
            None
        } else {
            stage.running = true;
            stage.generation += 1;
            Some(StartRequest {
                stage: stage_id.clone(),
                interval: stage.interval,
                generation: stage.generation,
            })
        };
        (stage_id, key, start)
    }

    /// Resolve and dispatch. See the module docs for the ladder.
    fn run(&mut self, mut act: Action) -> (Dispatch, Option<StartRequest>) {
        if act.callable.is_none() {
            if let Some(code) = act.code {
                // A code-table miss still enqueues; the action just never
                // fires until the code is registered.
                act.callable = self.registry.by_code(code).cloned();
            } else if let Some(name) = act.name.clone() {
                if let Some(f) = self.registry.by_name(&name) {
                    act.callable = Some(f.clone());
                } else {
                    return (self.defer_to_module_load(act, &name), None);
                }
            } else {
                tracing::warn!("run: undefined action");
                return (Dispatch::Rejected(DispatchError::MissingCallable), None);
            }
        }
        let (stage, key, start) = self.put(act);
        (Dispatch::Scheduled { stage, key }, start)
    }

    /// Name miss: decide between rejection, waiting, and starting a load.
    fn defer_to_module_load(&mut self, act: Action, name: &str) -> Dispatch {
        let path = ActionPath::derive(name);
        if self.modules.is_loaded(&path.module) {
            tracing::warn!(
                action = %name,
                module = %path.module,
                "module is loaded but the action is undefined"
            );
            return Dispatch::Rejected(DispatchError::UndefinedAction {
                name: name.to_string(),
                module: path.module,
            });
        }
        if self.modules.is_loading(&path.module) {
            // The load's registered continuation will retry; nothing to do.
            return Dispatch::LoadPending {
                module: path.module,
            };
        }
        let mut url = script_url(&self.config.lib_url, &path.resource);
        if self.config.cache_bust {
            url = cache_busted(&url, self.uid.next());
        }
        tracing::debug!(script = %url, module = %path.module, "loading module for deferred action");
        let on_fail = act.on_fail.clone().map(|b| *b);
        let request = LoadRequest {
            module: path.module.clone(),
            path: url,
        };
        self.modules.begin(&path.module, &request.path, act, on_fail);
        self.loader.load(&request);
        Dispatch::LoadStarted {
            module: path.module,
        }
    }

    /// Tick a stage and dispatch whatever the tick deferred.
    fn tick(&mut self, stage_id: &str) -> (Option<TickReport>, Vec<StartRequest>) {
        let now = Instant::now();
        let mut deferred = Vec::new();
        let report = match self.stages.get_mut(stage_id) {
            Some(stage) => tick_stage(stage, now, &mut deferred),
            None => return (None, Vec::new()),
        };
        let mut starts = Vec::new();
        for act in deferred {
            let (_, start) = self.run(act);
            starts.extend(start);
        }
        (Some(report), starts)
    }

    /// Restart an idle stage's driver, as after an explicit stop.
    fn restart_stage(&mut self, stage_id: &str) -> Option<StartRequest> {
        let stage = self.stages.get_mut(stage_id)?;
        if stage.running {
            return None;
        }
        stage.running = true;
        stage.generation += 1;
        Some(StartRequest {
            stage: stage_id.to_string(),
            interval: stage.interval,
            generation: stage.generation,
        })
    }

    fn module_loaded(&mut self, module: &str) -> (Option<Dispatch>, Option<StartRequest>) {
        let Some(record) = self.modules.complete(module) else {
            tracing::warn!(module, "module_loaded for a module that was not loading");
            return (None, None);
        };
        match record.on_done {
            Some(act) => {
                let (dispatch, start) = self.run(act);
                (Some(dispatch), start)
            }
            None => (None, None),
        }
    }

    fn module_failed(&mut self, module: &str) -> (Option<Dispatch>, Option<StartRequest>) {
        let Some(record) = self.modules.fail(module) else {
            tracing::warn!(module, "module_failed for a module that was not loading");
            return (None, None);
        };
        tracing::warn!(module, "module load failed");
        match record.on_fail {
            Some(act) => {
                let (dispatch, start) = self.run(act);
                (Some(dispatch), start)
            }
            None => (None, None),
        }
    }
}

/// Condvar-backed stop flag for driver threads.
struct StopFlag {
    stopped: Mutex<bool>,
    cvar: Condvar,
}

impl StopFlag {
    fn new() -> Self {
        Self {
            stopped: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }

    fn stop(&self) {
        let mut stopped = self.stopped.lock().unwrap();
        *stopped = true;
        self.cvar.notify_all();
    }

    /// Wait for the flag or the interval, whichever first. Returns `true`
    /// when the flag was raised.
    fn wait_timeout(&self, duration: Duration) -> bool {
        let stopped = self.stopped.lock().unwrap();
        if *stopped {
            return true;
        }
        let (stopped, _) = self.cvar.wait_timeout(stopped, duration).unwrap();
        *stopped
    }
}

/// A running stage driver.
struct Ticker {
    generation: u64,
    flag: Arc<StopFlag>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for Ticker {
    fn drop(&mut self) {
        // Wake the thread so it exits promptly; joining is the shutdown
        // path's business, not drop's.
        self.flag.stop();
    }
}

struct Shared {
    core: Mutex<Core>,
    tickers: Mutex<BTreeMap<String, Ticker>>,
    spawn_tickers: bool,
}

/// The public scheduler handle.
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Create a scheduler with the null module loader.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_loader(config, Box::new(NullLoader))
    }

    /// Create a scheduler with an explicit module-loader collaborator.
    ///
    /// The loader is called with the core lock held; it must start the
    /// fetch and return without calling back into the scheduler. Outcomes
    /// are reported later through [`Scheduler::module_loaded`] /
    /// [`Scheduler::module_failed`].
    #[must_use]
    pub fn with_loader(config: SchedulerConfig, loader: Box<dyn ModuleLoader>) -> Self {
        let spawn_tickers = config.spawn_tickers;
        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(Core::new(config, loader)),
                tickers: Mutex::new(BTreeMap::new()),
                spawn_tickers,
            }),
        }
    }

    /// Resolve and dispatch an action. Fire-and-forget: failures surface
    /// only in the returned [`Dispatch`] and the log.
    pub fn run(&self, action: Action) -> Dispatch {
        let (dispatch, start) = self.shared.core.lock().unwrap().run(action);
        self.apply_starts(start);
        dispatch
    }

    /// Enqueue an already-resolved action directly onto its stage.
    ///
    /// Returns the stage id and the timeline key the action landed under.
    pub fn put(&self, action: Action) -> (String, String) {
        let (stage, key, start) = self.shared.core.lock().unwrap().put(action);
        self.apply_starts(start);
        (stage, key)
    }

    /// Tick a stage synchronously. This is the manual drive for hosts with
    /// `spawn_tickers` off, and works alongside running drivers too.
    pub fn tick_now(&self, stage_id: &str) -> Option<TickReport> {
        let (report, starts) = self.shared.core.lock().unwrap().tick(stage_id);
        for start in starts {
            self.apply_starts(Some(start));
        }
        report
    }

    /// Restart the periodic driver of an idle stage.
    pub fn run_stage(&self, stage_id: &str) {
        let start = self.shared.core.lock().unwrap().restart_stage(stage_id);
        self.apply_starts(start);
    }

    /// Register a callable under a dotted name.
    pub fn register_action(
        &self,
        name: impl Into<String>,
        f: impl Fn(&mut ActionCx<'_>) -> ActionSignal + Send + Sync + 'static,
    ) {
        let mut core = self.shared.core.lock().unwrap();
        core.registry.register_name(name, Arc::new(f));
    }

    /// Register a callable under a numeric code.
    pub fn register_action_code(
        &self,
        code: crate::action::ActionCode,
        f: impl Fn(&mut ActionCx<'_>) -> ActionSignal + Send + Sync + 'static,
    ) {
        let mut core = self.shared.core.lock().unwrap();
        core.registry.register_code(code, Arc::new(f));
    }

    /// Mark a module as loaded without a fetch (inline registration).
    pub fn register_module(&self, module: &str) {
        let mut core = self.shared.core.lock().unwrap();
        core.modules.mark_loaded(module, "");
    }

    /// Report a module load as finished. The load's continuation action is
    /// re-dispatched; its exports are expected to be registered by now.
    pub fn module_loaded(&self, module: &str) -> Option<Dispatch> {
        let (dispatch, start) = self.shared.core.lock().unwrap().module_loaded(module);
        self.apply_starts(start);
        dispatch
    }

    /// Report a module load as failed, dispatching the registered failure
    /// continuation if there is one.
    pub fn module_failed(&self, module: &str) -> Option<Dispatch> {
        let (dispatch, start) = self.shared.core.lock().unwrap().module_failed(module);
        self.apply_starts(start);
        dispatch
    }

    /// Pending (main, after) counts for a stage.
    #[must_use]
    pub fn stage_pending(&self, stage_id: &str) -> Option<(usize, usize)> {
        let core = self.shared.core.lock().unwrap();
        core.stages.get(stage_id).map(Stage::pending)
    }

    /// Tick interval of a stage, if the stage exists.
    #[must_use]
    pub fn stage_interval(&self, stage_id: &str) -> Option<Duration> {
        let core = self.shared.core.lock().unwrap();
        core.stages.get(stage_id).map(|s| s.interval)
    }

    /// Whether a stage currently has a periodic driver.
    #[must_use]
    pub fn stage_running(&self, stage_id: &str) -> bool {
        let core = self.shared.core.lock().unwrap();
        core.stages.get(stage_id).is_some_and(|s| s.running)
    }

    /// Flag a stage's target surface as live or torn down. A dead surface
    /// makes the stage inert; its next tick retires the driver.
    pub fn set_stage_surface_live(&self, stage_id: &str, live: bool) -> bool {
        let mut core = self.shared.core.lock().unwrap();
        match core.stages.get_mut(stage_id) {
            Some(stage) => {
                stage.surface_live = live;
                true
            }
            None => false,
        }
    }

    /// Create a stage up front with a non-default tick interval, or adjust
    /// an existing stage's interval (taking effect when its driver next
    /// starts).
    pub fn configure_stage(&self, stage_id: &str, interval: Duration) {
        let mut core = self.shared.core.lock().unwrap();
        core.stages
            .entry(stage_id.to_string())
            .and_modify(|s| s.interval = interval)
            .or_insert_with(|| Stage::new(stage_id, interval));
    }

    /// Stop every driver and wait for the threads to exit.
    pub fn shutdown(&self) {
        let tickers = {
            let mut map = self.shared.tickers.lock().unwrap();
            std::mem::take(&mut *map)
        };
        for (_, mut ticker) in tickers {
            ticker.flag.stop();
            if let Some(handle) = ticker.thread.take() {
                let _ = handle.join();
            }
        }
    }

    fn apply_starts(&self, start: Option<StartRequest>) {
        if !self.shared.spawn_tickers {
            return;
        }
        if let Some(req) = start {
            spawn_ticker(&self.shared, req);
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.core.lock().unwrap();
        f.debug_struct("Scheduler")
            .field("stages", &core.stages.len())
            .field("spawn_tickers", &self.shared.spawn_tickers)
            .finish()
    }
}

/// Start a driver thread for one stage.
///
/// The thread holds only a weak reference between ticks, so dropping the
/// scheduler tears drivers down even if a signal is missed. A driver whose
/// tick reports the stage stopped removes its own ticker entry — but only
/// if the generation still matches, so it never evicts a successor that
/// was started while it was winding down.
fn spawn_ticker(shared: &Arc<Shared>, req: StartRequest) {
    let flag = Arc::new(StopFlag::new());
    let thread_flag = Arc::clone(&flag);
    let weak: Weak<Shared> = Arc::downgrade(shared);
    let stage_id = req.stage.clone();
    let generation = req.generation;
    let interval = req.interval;

    let handle = thread::spawn(move || {
        loop {
            if thread_flag.wait_timeout(interval) {
                break;
            }
            let Some(shared) = weak.upgrade() else {
                break;
            };
            let (report, starts) = {
                let mut core = shared.core.lock().unwrap();
                core.tick(&stage_id)
            };
            for start in starts {
                spawn_ticker(&shared, start);
            }
            let stopped = report.is_none_or(|r| r.stopped);
            if stopped {
                let mut tickers = shared.tickers.lock().unwrap();
                if tickers
                    .get(&stage_id)
                    .is_some_and(|t| t.generation == generation)
                {
                    tickers.remove(&stage_id);
                }
                break;
            }
        }
    });

    let mut tickers = shared.tickers.lock().unwrap();
    tickers.insert(
        req.stage,
        Ticker {
            generation,
            flag,
            thread: Some(handle),
        },
    );
}
