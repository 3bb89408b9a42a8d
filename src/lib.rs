pub mod blend;
pub mod build;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod logging;
pub mod output;
pub mod plan;

pub use build::{build_target, BuildError, BuildOutput};
pub use config::{Config, Source, Target};
pub use plan::{Plan, PlanError};
