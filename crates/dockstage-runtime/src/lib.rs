#![forbid(unsafe_code)]

//! Dockstage runtime: staged action scheduling.
//!
//! # Key components
//!
//! - [`Action`] - a unit of deferred work and its scheduling metadata
//! - [`Scheduler`] - stage table, dispatch ladder, and periodic drivers
//! - [`ActionRegistry`] - name and code lookup tables for callables
//! - [`ModuleLoader`] - the asynchronous module-fetch collaborator
//! - [`Bus`] - publish/subscribe wiring between toolkit objects
//!
//! # How it fits together
//!
//! Client code hands an [`Action`] to [`Scheduler::run`]. The scheduler
//! resolves the callable (immediately, or after a module load) and enqueues
//! it on a stage timeline, where a periodic driver invokes it once per tick
//! until it stops signalling `Continue`. Stages with nothing left to do
//! retire their drivers; enqueueing restarts them.

pub mod action;
pub mod bus;
pub mod loader;
pub mod registry;
pub mod scheduler;
pub mod stage;

pub use action::{Action, ActionCode, ActionCx, ActionFn, ActionSignal, ActionWindow};
pub use bus::{Bus, BusHandler};
pub use loader::{ActionPath, LoadRequest, ModuleLoader, NullLoader, cache_busted, script_url};
pub use registry::ActionRegistry;
pub use scheduler::{Dispatch, DispatchError, Scheduler, SchedulerConfig};
pub use stage::{Stage, TickReport};
