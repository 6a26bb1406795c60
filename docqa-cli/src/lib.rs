//! # docqa-cli
//!
//! The `docqa` command: ingest text files into a persistent vector store and
//! ask questions about them through an OpenAI-compatible model server.
//!
//! Configuration is read from YAML (see [`config::AppConfig`]); every
//! section is optional.

pub mod cli;
pub mod config;
pub mod logging;

pub use cli::{Cli, Commands, build_pipeline, run};
pub use config::AppConfig;
