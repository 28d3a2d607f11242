//! Core domain types
//!
//! These types mirror the JSON pipe-definition document. They are shared between
//! the launcher (which catalogues and dispatches them) and the client (which puts
//! them on the wire).

pub mod pipe;
