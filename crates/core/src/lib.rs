//! Core library: configuration, the provider-agnostic tagging service and the
//! note capture pipeline.

pub mod config;
pub mod models;
pub mod pipeline;
pub mod service;
