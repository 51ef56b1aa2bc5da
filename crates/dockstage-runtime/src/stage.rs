#![forbid(unsafe_code)]

//! Stages: named batches of actions ticking at a fixed interval.
//!
//! Each stage holds two keyed timelines. The *main* timeline is processed
//! first every tick; the *after* timeline runs strictly once the main
//! removals are applied, which makes it the place for end-of-tick
//! aggregation work (one coalesced refresh after many individual
//! mutations). Within a timeline the processing order is the key order of
//! the map, and callables must not rely on their position relative to
//! siblings.
//!
//! # Tick contract
//!
//! 1. A stage whose target surface is gone is inert: neither timeline is
//!    touched, but the stop condition still runs, so the stage retires.
//! 2. Each action's callable runs at most once per tick, against a key
//!    snapshot taken at tick start.
//! 3. Actions that did not signal `Continue` are removed after their
//!    timeline's pass; `Done`/`Failed` follow-ups and re-entrant runs are
//!    collected and dispatched only after both passes.
//! 4. The stage's driver stops when a tick processed nothing, or when both
//!    timelines are empty after removals.
//!
//! A panicking callable is not caught; the tick aborts with it. That is the
//! documented best-effort contract, not an accident.

use std::collections::BTreeMap;
use std::time::Duration;

use web_time::Instant;

use crate::action::{Action, ActionCx, ActionSignal};

/// A named, independently ticking batch of pending actions.
#[derive(Debug)]
pub struct Stage {
    /// Stage identifier.
    pub id: String,
    /// Tick cadence of the periodic driver.
    pub interval: Duration,
    /// Whether the stage's target surface still exists. A dead surface
    /// makes every tick a no-op until the stage retires.
    pub surface_live: bool,
    /// Whether a periodic driver currently owns this stage.
    pub running: bool,
    /// Bumped every time the driver is (re)started, so a retiring driver
    /// can tell itself apart from its replacement.
    pub(crate) generation: u64,
    pub(crate) timeline: BTreeMap<String, Action>,
    pub(crate) after: BTreeMap<String, Action>,
}

impl Stage {
    pub(crate) fn new(id: impl Into<String>, interval: Duration) -> Self {
        Self {
            id: id.into(),
            interval,
            surface_live: true,
            running: false,
            generation: 0,
            timeline: BTreeMap::new(),
            after: BTreeMap::new(),
        }
    }

    /// Pending action counts: (main timeline, after timeline).
    #[must_use]
    pub fn pending(&self) -> (usize, usize) {
        (self.timeline.len(), self.after.len())
    }
}

/// What one tick did to a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Actions visited across both timelines.
    pub processed: usize,
    /// Actions removed because they did not signal `Continue`.
    pub removed: usize,
    /// Actions still pending after removals.
    pub survivors: usize,
    /// Whether the stage's driver should stop.
    pub stopped: bool,
}

/// Run one tick over a stage, collecting follow-ups and re-entrant runs
/// into `deferred` for the caller to dispatch.
pub(crate) fn tick_stage(stage: &mut Stage, now: Instant, deferred: &mut Vec<Action>) -> TickReport {
    let mut processed = 0;
    let mut removed = 0;
    if stage.surface_live {
        removed += tick_timeline(&mut stage.timeline, now, deferred, &mut processed);
        removed += tick_timeline(&mut stage.after, now, deferred, &mut processed);
    } else {
        tracing::debug!(stage = %stage.id, "target surface gone; tick is inert");
    }
    let survivors = stage.timeline.len() + stage.after.len();
    let stopped = processed == 0 || survivors == 0;
    if stopped {
        stage.running = false;
        tracing::debug!(stage = %stage.id, survivors, "stage idle; stopping driver");
    }
    TickReport {
        processed,
        removed,
        survivors,
        stopped,
    }
}

/// One pass over a timeline: invoke every callable against a key snapshot,
/// then apply removals. Returns the number removed.
fn tick_timeline(
    timeline: &mut BTreeMap<String, Action>,
    now: Instant,
    deferred: &mut Vec<Action>,
    processed: &mut usize,
) -> usize {
    let keys: Vec<String> = timeline.keys().cloned().collect();
    let mut eliminate: Vec<(String, ActionSignal)> = Vec::new();
    for key in keys {
        let Some(act) = timeline.get(&key) else {
            continue;
        };
        *processed += 1;
        // An action that never resolved a callable stays pending; it counts
        // as processed so the stage keeps ticking, and silently never fires.
        let Some(f) = act.callable.clone() else {
            continue;
        };
        let signal = {
            let mut cx = ActionCx::new(now, act, deferred);
            f(&mut cx)
        };
        if signal != ActionSignal::Continue {
            eliminate.push((key, signal));
        }
    }
    let removed = eliminate.len();
    for (key, signal) in eliminate {
        if let Some(mut act) = timeline.remove(&key) {
            let follow_up = match signal {
                ActionSignal::Done => act.on_done.take(),
                ActionSignal::Failed => act.on_fail.take(),
                ActionSignal::Continue => None,
            };
            if let Some(next) = follow_up {
                deferred.push(*next);
            }
        }
    }
    removed
}
