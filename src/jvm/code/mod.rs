//! Method code as a flat sequence of instructions
//!
//! ### Structure
//!
//! Unlike a code generator, a splicer mostly cuts sequences apart and pastes them back together.
//! Method bodies are therefore kept as one ordered `Vec` of [`Instruction`]s, with labels and line
//! numbers stored as pseudo-instructions in the stream. Nothing is ever addressed by offset, so
//! inserting code anywhere is just a `Vec` splice.
//!
//! Labels ([`SynLabel`]) are opaque and only meaningful inside the body that allocated them. Moving
//! instructions from one body into another always rewrites their labels through a [`LabelMap`]
//! built for that copy, with fresh labels drawn from the receiving body's generator.
//!
//! ### Listings
//!
//! The [`listing`] module renders code to (and parses code from) a small line-based assembly
//! format. It is what the command line tool reads and writes.

mod instructions;
mod label;
pub mod listing;

pub use instructions::*;
pub use label::*;
