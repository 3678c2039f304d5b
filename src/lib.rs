//! apimodel - declarative schemas for API payloads
//!
//! A schema is an ordered list of properties. Loading turns a wire map
//! (JSON-compatible values) into a validated domain record; dumping does
//! the reverse. Properties carry constraints, optional marshallers for
//! non-JSON types, and references to nested models.

pub mod cli;
pub mod engine;
pub mod mail;
pub mod schema;
