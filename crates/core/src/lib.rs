#![warn(clippy::all, missing_docs)]

//! Core logic for the dtop container console.
//!
//! This crate hosts the resource models, the container runtime adapters,
//! configuration handling and the console state machine used by the
//! terminal UI and any future frontends.

pub mod backend;
pub mod config;
pub mod console;
pub mod models;

pub use backend::{BackendError, DockerBackend, MemoryBackend, ResourceBackend};
pub use config::{AppConfig, BackendChoice};
pub use console::{ConsoleCompositor, ConsoleMode, Key, ResourceConsole};
pub use models::{ImageReference, ResourceKind, ResourceRecord};
