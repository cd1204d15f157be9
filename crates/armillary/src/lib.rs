//! Armillary - A transactional editing engine for tree-shaped model
//! documents.
//!
//! Every mutation of a document goes through a transaction: a batch of
//! operations run in order, with prerequisites, deferred consistency
//! rules, cascading deletes, and rollback on any failure. This crate
//! provides:
//!
//! - **Sessions**: a document plus its reverse-reference index and the
//!   checkpoint machinery ([`session::Session`])
//! - **Operations**: the editing surface - create, delete, rename, set
//!   attribute, set reference ([`operation`] module)
//! - **Processor**: the transaction driver ([`processor::Processor`])
//! - **Resolver**: symbolic names to element handles and back
//!   ([`resolver`] module)
//! - **Rules**: deduplicated follow-up work run after the queue drains
//!   ([`rules`] module)
//! - **Reports**: what a committed transaction tells its caller
//!   ([`report`] module)
//!
//! # Example
//!
//! ```
//! use armillary::{
//!     document::Document,
//!     identifier::Name,
//!     operation::{CreateElement, NameSpec, Operation},
//!     processor::Processor,
//!     schema::ElementKind,
//!     session::Session,
//! };
//!
//! let mut session = Session::new(Document::new("Model"));
//! let root = session.document().root();
//!
//! let entity = CreateElement::new(
//!     ElementKind::EntityType,
//!     root,
//!     NameSpec::Explicit(Name::new("Customer")),
//! );
//! let property = CreateElement::under_output(
//!     ElementKind::Property,
//!     entity.id(),
//!     NameSpec::Explicit(Name::new("Id")),
//! );
//!
//! let mut processor = Processor::new(&mut session, "add customer");
//! processor.enqueue(Box::new(property)); // order does not matter;
//! processor.enqueue(Box::new(entity)); // prerequisites do
//! let report = processor.invoke().expect("transaction failed");
//!
//! assert_eq!(report.stats().operations_run(), 2);
//! assert!(report.unresolved().is_empty());
//! ```

pub mod antidep;
pub mod config;
pub mod error;
pub mod operation;
pub mod processor;
pub mod report;
pub mod resolver;
pub mod rules;
pub mod session;
pub mod transaction;

pub use armillary_core::{arena, document, element, identifier, schema, symbols, value};

pub use error::{EngineError, ValidationError};
