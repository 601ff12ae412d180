//! Model of JVM classes and method code, as far as splicing needs one
//!
//! ### Simple example
//!
//! Consider the following static method:
//!
//! ```java,ignore,no_run
//! static int twice(int x) {
//!     return x + x;
//! }
//! ```
//!
//! Its body can be built up as follows:
//!
//! ```
//! use jvm_splice::jvm::code::{Instruction::*, StackOp, ValueKind};
//! use jvm_splice::jvm::model::MethodBody;
//! use jvm_splice::jvm::*;
//!
//! let twice = MethodBody::new(
//!     UnqualifiedName::from_string(String::from("twice")).unwrap(),
//!     MethodAccessFlags::STATIC,
//!     MethodDescriptor::parse("(I)I").unwrap(),
//!     vec![
//!         Load(ValueKind::Int, 0),
//!         Load(ValueKind::Int, 0),
//!         Op(StackOp::IAdd),
//!         Return(Some(ValueKind::Int)),
//!     ],
//! );
//! assert_eq!(twice.max_locals, 1);
//! assert!(!twice.has_receiver());
//! ```

mod access_flags;
pub mod code;
mod descriptors;
pub mod model;
mod names;

pub use access_flags::*;
pub use descriptors::*;
pub use names::*;
