//! imgstack core - build planning and orchestration
//!
//! Derives image tags, composes build-engine flags, fans stages out across
//! platforms and runs them in dependency order through a pluggable
//! [`CommandRunner`].

pub mod compose;
pub mod config;
pub mod error;
pub mod identity;
pub mod invoker;
pub mod manifest;
pub mod pipeline;
pub mod plan;
pub mod tag;

// Re-export commonly used types
pub use compose::{compose, BuildOptions};
pub use config::{BuildConfig, Engine};
pub use error::{Result, StackError};
pub use identity::HostIdentity;
pub use invoker::{
    BuildCommand, BuildInvoker, BuildResult, CommandRunner, DryRunner, ProcessRunner,
    RecordingRunner,
};
pub use manifest::Manifest;
pub use pipeline::{BaseImageRef, Pipeline, PipelineOutcome, PipelineState, Stage};
pub use plan::{expand, PlannedBuild, StagePlan};
pub use tag::derive;

/// imgstack version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
