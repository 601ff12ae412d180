//! Splicing source methods into target methods
//!
//! ### Pipeline
//!
//! A [`SpliceDescriptor`] names a target method, a static source method, a [`SpliceKind`], and a
//! priority. Descriptors are collected in a [`SpliceRegistry`], grouped by target class. For each
//! class, the [`ClassTransformer`] then:
//!
//!   1. groups the class's descriptors by target method
//!   2. orders the descriptors and drops conflicting ones ([`resolve`])
//!   3. looks up every remaining source body through a [`MethodSource`], turning descriptors into
//!      [`SpliceRequest`]s
//!   4. applies the survivors one after another with the [`SpliceEngine`]
//!
//! ### Splice kinds
//!
//!   - `BEFORE` prepends the source code (minus its returns)
//!   - `HEAD` does the same, but after leading parameter loads, or after the `super(..)` call of
//!     a constructor
//!   - `AFTER`/`TAIL` run the source code in front of every return, stashing the returned value
//!     in a fresh local for the duration
//!   - `REPLACE` swaps out the whole body (and its exception table and debug info)
//!   - `AROUND` currently behaves exactly like `REPLACE`
//!
//! ### Local slots and labels
//!
//! Sources are static while targets may have a receiver, so copied code has its local slots
//! shifted: parameters onto the target's parameters, other locals past the end of the target's
//! parameters (see [`SlotRemap`]). Labels are always freshly allocated from the target's label
//! generator.

pub mod conflict;
pub mod copier;
mod engine;
mod errors;
mod processor;
mod registry;
mod request;
pub mod returns;
mod settings;
mod source;
mod transformer;
pub mod validate;

pub use conflict::{resolve, Candidate, Resolution};
pub use copier::SlotRemap;
pub use engine::*;
pub use errors::*;
pub use processor::*;
pub use registry::*;
pub use request::*;
pub use settings::*;
pub use source::*;
pub use transformer::*;
