#![forbid(unsafe_code)]

//! Actions: units of deferred work.
//!
//! An action carries either a resolved callable or the means to resolve one
//! (a dotted name or a numeric code), plus scheduling metadata. Exactly one
//! of callable/code/name determines what runs; resolution happens lazily at
//! dispatch time.
//!
//! The callable is invoked once per stage tick with an [`ActionCx`] view of
//! its own record. Returning [`ActionSignal::Continue`] keeps it on the
//! timeline for the next tick; anything else removes it, and `Done`/`Failed`
//! trigger the corresponding follow-up chain after the tick.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use web_time::Instant;

/// Numeric action code, the compact alternative to a dotted name.
pub type ActionCode = u32;

/// A resolved action callable.
///
/// Callables own their state through capture; there is no detached target
/// object. `Send + Sync` lets registered callables be shared with stage
/// ticker threads.
pub type ActionFn = Arc<dyn Fn(&mut ActionCx<'_>) -> ActionSignal + Send + Sync>;

/// What an action callable tells the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSignal {
    /// Keep the action on its timeline; run it again next tick.
    Continue,
    /// Work finished; remove the action and dispatch its on-done chain.
    Done,
    /// Work failed; remove the action and dispatch its on-fail chain.
    Failed,
}

/// Where an action stands relative to its declared start delay and timeout.
///
/// The scheduler never gates on these fields itself; a callable that wants
/// delayed-start or timeout behavior checks its window each tick and returns
/// `Continue` before the start, or `Failed` once expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionWindow {
    /// The declared start delay has not elapsed yet.
    NotYet,
    /// Between start and timeout (or no bounds declared).
    Open,
    /// The timeout elapsed after the start time.
    Expired,
}

/// A unit of deferred work plus its scheduling metadata.
#[derive(Clone, Default)]
pub struct Action {
    /// Resolved callable, or `None` while resolution is pending.
    pub callable: Option<ActionFn>,
    /// Dotted action name, e.g. `ui.control.Button.hide`.
    pub name: Option<String>,
    /// Numeric action code. Ignored when a name or callable is present.
    pub code: Option<ActionCode>,
    /// Main-timeline dedupe key. Auto-generated at enqueue when absent.
    pub key: Option<String>,
    /// After-timeline dedupe key. Mutually exclusive with `key`: an action
    /// carrying one always lands on the after timeline.
    pub after_key: Option<String>,
    /// Target stage id. Defaults to the scheduler's configured stage.
    pub stage: Option<String>,
    /// Delay before the action's window opens.
    pub start_delay: Option<Duration>,
    /// Maximum time after the start before the window expires.
    pub timeout: Option<Duration>,
    /// Follow-up dispatched when the callable signals `Done`.
    pub on_done: Option<Box<Action>>,
    /// Follow-up dispatched when the callable signals `Failed` (or when a
    /// module load for this action fails).
    pub on_fail: Option<Box<Action>>,
    /// Window origin, stamped at enqueue when a delay or timeout is set.
    pub(crate) start_at: Option<Instant>,
}

impl Action {
    /// An action wrapping a callable directly.
    pub fn call(f: impl Fn(&mut ActionCx<'_>) -> ActionSignal + Send + Sync + 'static) -> Self {
        Self {
            callable: Some(Arc::new(f)),
            ..Self::default()
        }
    }

    /// An action resolved by dotted name through the registry.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// An action resolved by numeric code through the registry.
    pub fn coded(code: ActionCode) -> Self {
        Self {
            code: Some(code),
            ..Self::default()
        }
    }

    /// Set the main-timeline dedupe key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Route onto the after timeline under the given key.
    #[must_use]
    pub fn with_after_key(mut self, key: impl Into<String>) -> Self {
        self.after_key = Some(key.into());
        self
    }

    /// Target a specific stage.
    #[must_use]
    pub fn on_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Declare a start delay.
    #[must_use]
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    /// Declare a timeout, measured from the start time.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Chain a follow-up for the `Done` signal.
    #[must_use]
    pub fn then(mut self, next: Action) -> Self {
        self.on_done = Some(Box::new(next));
        self
    }

    /// Chain a follow-up for the `Failed` signal.
    #[must_use]
    pub fn or_else(mut self, fail: Action) -> Self {
        self.on_fail = Some(Box::new(fail));
        self
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("callable", &self.callable.is_some())
            .field("name", &self.name)
            .field("code", &self.code)
            .field("key", &self.key)
            .field("after_key", &self.after_key)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

/// The view an action callable gets of itself during a tick.
pub struct ActionCx<'a> {
    now: Instant,
    action: &'a Action,
    deferred: &'a mut Vec<Action>,
}

impl<'a> ActionCx<'a> {
    pub(crate) fn new(now: Instant, action: &'a Action, deferred: &'a mut Vec<Action>) -> Self {
        Self {
            now,
            action,
            deferred,
        }
    }

    /// Timestamp of the current tick.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.now
    }

    /// This action's main-timeline key, if it has one.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.action.key.as_deref()
    }

    /// The stage this action is ticking on.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        self.action.stage.as_deref()
    }

    /// Classify the tick against the action's start delay and timeout.
    #[must_use]
    pub fn window(&self) -> ActionWindow {
        let Some(start) = self.action.start_at else {
            return ActionWindow::Open;
        };
        if self.now < start {
            return ActionWindow::NotYet;
        }
        if let Some(timeout) = self.action.timeout
            && self.now >= start + timeout
        {
            return ActionWindow::Expired;
        }
        ActionWindow::Open
    }

    /// Dispatch another action once this tick completes.
    ///
    /// Deferred dispatch is what makes re-entrant scheduling safe: an action
    /// enqueued from inside a tick is never processed within that same tick,
    /// and a same-key re-enqueue replaces whatever survived the tick.
    pub fn run(&mut self, action: Action) {
        self.deferred.push(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_fill_metadata() {
        let act = Action::named("ui.control.Button.hide")
            .with_key("hide")
            .on_stage("chrome")
            .with_timeout(Duration::from_secs(2));
        assert_eq!(act.name.as_deref(), Some("ui.control.Button.hide"));
        assert_eq!(act.key.as_deref(), Some("hide"));
        assert_eq!(act.stage.as_deref(), Some("chrome"));
        assert_eq!(act.timeout, Some(Duration::from_secs(2)));
        assert!(act.callable.is_none());
    }

    #[test]
    fn window_is_open_without_bounds() {
        let act = Action::call(|_| ActionSignal::Done);
        let mut deferred = Vec::new();
        let cx = ActionCx::new(Instant::now(), &act, &mut deferred);
        assert_eq!(cx.window(), ActionWindow::Open);
    }

    #[test]
    fn window_tracks_start_and_timeout() {
        let mut act = Action::call(|_| ActionSignal::Continue)
            .with_start_delay(Duration::from_millis(100))
            .with_timeout(Duration::from_millis(50));
        let origin = Instant::now();
        act.start_at = Some(origin + Duration::from_millis(100));
        let mut deferred = Vec::new();

        let cx = ActionCx::new(origin, &act, &mut deferred);
        assert_eq!(cx.window(), ActionWindow::NotYet);

        let cx = ActionCx::new(origin + Duration::from_millis(120), &act, &mut deferred);
        assert_eq!(cx.window(), ActionWindow::Open);

        let cx = ActionCx::new(origin + Duration::from_millis(200), &act, &mut deferred);
        assert_eq!(cx.window(), ActionWindow::Expired);
    }

    #[test]
    fn deferred_runs_accumulate() {
        let act = Action::call(|_| ActionSignal::Done);
        let mut deferred = Vec::new();
        let mut cx = ActionCx::new(Instant::now(), &act, &mut deferred);
        cx.run(Action::coded(7));
        cx.run(Action::coded(8));
        assert_eq!(deferred.len(), 2);
        assert_eq!(deferred[0].code, Some(7));
    }

    #[test]
    fn debug_shape_hides_the_callable() {
        let act = Action::call(|_| ActionSignal::Done).with_key("x");
        let shown = format!("{act:?}");
        assert!(shown.contains("callable: true"));
        assert!(shown.contains("\"x\""));
    }
}
