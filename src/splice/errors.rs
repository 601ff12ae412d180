use crate::jvm::code::SynLabel;
use crate::jvm::model::MethodKey;
use crate::splice::SpliceKind;
use std::fmt;

/// Reasons a single splice request may fail
///
/// None of these abort more than the request (or method, for [`Error::Internal`]) they came from.
#[derive(Debug)]
pub enum Error {
    /// Request is malformed or the two methods are incompatible (request skipped)
    Validation(ValidationError),

    /// Target method cannot take the splice (request aborted, body left as it was)
    Structural(StructuralError),

    /// Method could not be located (request skipped)
    Resource(ResourceError),

    /// Inconsistency in the code being spliced (whole method rolled back)
    Internal(InternalError),
}

#[derive(Debug)]
pub enum ValidationError {
    /// Source parameters don't line up with the target's
    IncompatibleParameters {
        kind: SpliceKind,
        source: String,
        target: String,
    },

    /// Source and target disagree on a return type that has to match
    IncompatibleReturn {
        kind: SpliceKind,
        source: String,
        target: String,
    },

    /// Source code has to run without a receiver
    SourceNotStatic(String),

    /// Descriptor fields could not be parsed
    MalformedDescriptor(String),

    /// Splice kind name is not recognized
    UnknownKind(String),
}

#[derive(Debug)]
pub enum StructuralError {
    /// AFTER and TAIL need at least one return site to attach to
    NoReturnSites { kind: SpliceKind, target: String },

    /// Target method is `abstract` or `native`
    TargetHasNoCode(String),
}

#[derive(Debug)]
pub enum ResourceError {
    /// Source method could not be found
    SourceNotFound(MethodKey),

    /// Target class does not declare the method
    TargetNotFound(MethodKey),

    /// No processor factory is registered under the identifier
    UnknownProcessor(String),
}

#[derive(Debug)]
pub enum InternalError {
    /// Instruction refers to a label that was never placed in its body
    UnmappedLabel(SynLabel),

    /// Remapped local slot does not fit in a `u16`
    LocalSlotOverflow(i64),
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Error {
        Error::Validation(err)
    }
}

impl From<StructuralError> for Error {
    fn from(err: StructuralError) -> Error {
        Error::Structural(err)
    }
}

impl From<ResourceError> for Error {
    fn from(err: ResourceError) -> Error {
        Error::Resource(err)
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Error {
        Error::Internal(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(err) => write!(f, "validation failed: {}", err),
            Error::Structural(err) => write!(f, "structural problem: {}", err),
            Error::Resource(err) => write!(f, "missing resource: {}", err),
            Error::Internal(err) => write!(f, "internal inconsistency: {}", err),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::IncompatibleParameters {
                kind,
                source,
                target,
            } => write!(
                f,
                "{} source parameters {} do not fit target {}",
                kind, source, target
            ),
            ValidationError::IncompatibleReturn {
                kind,
                source,
                target,
            } => write!(
                f,
                "{} source return of {} does not fit target {}",
                kind, source, target
            ),
            ValidationError::SourceNotStatic(method) => {
                write!(f, "source method {} must be static", method)
            }
            ValidationError::MalformedDescriptor(msg) => write!(f, "malformed descriptor: {}", msg),
            ValidationError::UnknownKind(kind) => write!(f, "unknown splice kind '{}'", kind),
        }
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralError::NoReturnSites { kind, target } => {
                write!(f, "{} needs a return site, but {} has none", kind, target)
            }
            StructuralError::TargetHasNoCode(target) => {
                write!(f, "target {} is abstract or native", target)
            }
        }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::SourceNotFound(key) => write!(f, "source method {} not found", key),
            ResourceError::TargetNotFound(key) => write!(f, "target method {} not found", key),
            ResourceError::UnknownProcessor(id) => write!(f, "no processor registered as '{}'", id),
        }
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalError::UnmappedLabel(lbl) => write!(f, "label {} is never placed", lbl),
            InternalError::LocalSlotOverflow(slot) => {
                write!(f, "local slot {} is out of range", slot)
            }
        }
    }
}

impl std::error::Error for Error {}
