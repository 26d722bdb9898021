//! imgstack CLI - ordered container image builds.

pub mod commands;
pub mod output;
