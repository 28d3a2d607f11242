//! Conveyor Core
//!
//! Core types and abstractions for the Conveyor pipe launcher.
//!
//! This crate contains:
//! - Domain types: the pipe definition model (Pipe, Segment, Endpoint, Payload)
//! - Validation: the schema check every pipe definition passes before it is catalogued

pub mod domain;
pub mod validation;

pub use domain::pipe::{
    DataType, Endpoint, Payload, PayloadBody, PayloadHeader, Pipe, PipeBody, PipeHeader, Segment,
    SegmentBody, SegmentHeader,
};
pub use validation::{PIPE_SCHEMA, PipeSchema, SchemaValidator, ValidationError};
