//! # Soma Core
//!
//! Data layer for the soma limbic scheduler: the finite set of signal
//! kinds and their tunable parameters, the closed boost record supplied by
//! the external state provider, the per-kind accumulator state that the
//! scheduler owns and the store persists, and the configuration surface.
//!
//! Everything in this crate is plain data — the behavior lives in
//! `soma_limbic`. Keeping the types here lets the store and the scheduler
//! share them without a dependency cycle.

pub mod boost;
pub mod config;
pub mod error;
pub mod signal;
pub mod state;

pub use boost::BoostSnapshot;
pub use config::{SignalTuning, SomaConfig};
pub use error::{AdminError, ConfigError};
pub use signal::{default_registry, EmittedSignal, Outcome, Registry, Signal, SignalConfig};
pub use state::{AccumulatorState, QuietWindow};
