//! Splice the code of one JVM method into another
//!
//! Given a _target_ method and a static _source_ method, the [`splice`] module produces a new
//! target body combining the two in one of several ways (before, after, replace, head, tail,
//! around). Local variable slots, labels, exception ranges, and return values are all kept
//! consistent along the way. The [`jvm`] module holds the class and code model being spliced.

pub mod jvm;
pub mod splice;
mod util;

pub use util::Width;
