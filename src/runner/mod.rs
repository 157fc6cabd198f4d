mod controller;
mod executor;
pub mod pause;
mod progress;
mod sequencer;
mod state;

#[cfg(test)]
mod mock;

#[allow(unused_imports)]
pub use controller::{RunHandle, RunSummary, Runner, ValidationError};
pub use pause::PauseRange;
#[allow(unused_imports)]
pub use progress::Progress;
pub use state::{AccountRange, RunConfig};
