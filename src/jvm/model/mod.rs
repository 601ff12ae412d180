//! Semantic representations of classes and method bodies
//!
//!   - __Class__ is represented using [`ClassBody`] (and collections of them with [`ClassPool`])
//!   - __Method__ is represented using [`MethodBody`]
//!
//! Only the parts of a class that splicing touches are modelled: fields, constant pools, and
//! stack map frames belong to whatever reads and writes the actual class files.

mod class;
mod method;

pub use class::*;
pub use method::*;
