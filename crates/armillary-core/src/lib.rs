//! Armillary Core Document Model
//!
//! This crate provides the foundational types for the Armillary model
//! document. It includes:
//!
//! - **Identifiers**: String-interned names and qualified symbols
//!   ([`identifier::Name`], [`identifier::Symbol`])
//! - **Schema**: Element kinds, reference kinds, and cascade policies
//!   ([`schema`] module)
//! - **Elements**: Tree nodes with lifecycle state, attributes, and
//!   reference slots ([`element`] module)
//! - **Storage**: Generation-checked element storage ([`arena`] module)
//! - **Symbols**: The qualified-name registry ([`symbols`] module)
//! - **Document**: The element tree with coherent structure and naming
//!   ([`document::Document`])
//!
//! Reference resolution, reverse indexing, and the transaction engine build
//! on these types from the `armillary` crate.

pub mod arena;
pub mod document;
pub mod element;
pub mod identifier;
pub mod schema;
pub mod symbols;
pub mod value;
