//! gridfuzz core library: structural map mutation, target execution and crash archiving.

#[path = "model/actions.rs"]
mod actions;
#[path = "cmd/artifacts.rs"]
mod artifacts;
#[path = "runtime/clock.rs"]
mod clock;
#[path = "platform/config.rs"]
mod config;
#[path = "cmd/corpus.rs"]
mod corpus;
#[path = "platform/duration.rs"]
mod duration;
#[path = "platform/envinfo.rs"]
mod envinfo;
#[path = "platform/error.rs"]
mod error;
#[path = "platform/fsutil.rs"]
mod fsutil;
#[path = "modes/fuzz.rs"]
mod fuzz;
#[path = "modes/generate.rs"]
mod generate;
#[path = "model/grid.rs"]
mod grid;
#[path = "modes/mutate.rs"]
mod mutate;
#[path = "model/outcome.rs"]
mod outcome;
#[path = "modes/replay.rs"]
mod replay;
#[path = "model/reporting.rs"]
mod reporting;
#[path = "runtime/rng.rs"]
mod rng;
#[path = "runtime/runner.rs"]
mod runner;

pub use actions::*;
pub use artifacts::*;
pub use clock::*;
pub use config::*;
pub use corpus::*;
pub use duration::*;
pub use envinfo::*;
pub use error::*;
pub use fsutil::*;
pub use fuzz::*;
pub use generate::*;
pub use grid::*;
pub use mutate::*;
pub use outcome::*;
pub use replay::*;
pub use reporting::*;
pub use rng::*;
pub use runner::*;
