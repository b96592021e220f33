//! Declarative request-processing pipelines for JSON endpoints.
//!
//! An endpoint is a [`step::StepsDefinition`]: per-stage handler
//! declarations resolved once into a [`step::Pipeline`] that runs a fixed
//! sequence of processing and response stages over a per-request
//! [`step::StepContext`]. Shared [`registry::ProcessorRegistry`] instances
//! supply mappers ([`mapping`]) and validators ([`validation`]), and the
//! [`adapter`] module mounts pipelines on an axum router.

pub mod adapter;
pub mod error;
pub mod history;
pub mod mapping;
pub mod registry;
pub mod step;
pub mod steps;
pub mod validation;

pub use error::{ConfigError, StepError};
pub use step::{
    MethodDispatcher, Pipeline, RequestHandle, Stage, Step, StepContext, StepHandler, StepResult,
    StepsDefinition,
};
