//! Agent-NN Dispatch - authorization-gated learning dispatcher
//!
//! This crate wires the authorization engine and the selectors together:
//! - Layered configuration (file + environment)
//! - The synchronous [`Dispatcher`] composition root
//! - An async [`DispatchService`] that serializes concurrent callers

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dispatcher;
pub mod service;

pub use config::{AccessConfig, Config, LearningConfig, LogConfig, PolicyConfig, SelectionMode};
pub use dispatcher::Dispatcher;
pub use service::DispatchService;
