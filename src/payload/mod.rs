//! # Payload Contract Module
//!
//! A compact contract language for request payloads and the engine that
//! interprets it.
//!
//! ## Scalar formats
//!
//! Each scalar field is described by a short string of registry characters:
//!
//! ```text
//! s i I + ?
//! │ │ │ │ └─ nullable
//! │ │ │ └─── checks, AND'd in order, run after promotion
//! │ │ └───── at most one promotion
//! └─┴─────── types, OR'd
//! ```
//!
//! ## Structural formats
//!
//! Scalars nest inside sequences (`["i"]`) and keyed shapes
//! (`{"name": "s", "age?": "i"}`); see [`Format`].
//!
//! ## Usage
//!
//! ```rust
//! use pactrouter::payload::{Format, PayloadVerifier};
//! use serde_json::json;
//!
//! let verifier = PayloadVerifier::default();
//! let format = Format::from_value(&json!({"name": "s", "favorite_number": "siI"})).unwrap();
//! let mut payload = json!({"name": "Roger", "favorite_number": "33"});
//! verifier.verify(&mut payload, &format).unwrap();
//! assert_eq!(payload["favorite_number"], json!(33));
//! ```

mod cache;
mod coerce;
mod format;
mod registry;
mod schema;
mod verify;

pub use cache::RuleCache;
pub use format::{parse, FormatError, Rule};
pub use registry::{CheckFn, PromoteFn, RegistryError, SchemaRegistry, TypeFn, NULLABLE_MARKER};
pub use schema::{FieldKey, Format};
pub use verify::{ContractViolation, PayloadVerifier, VerifyError, VerifyOptions, ViolationReason};
