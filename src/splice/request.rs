use crate::jvm::model::{MethodBody, MethodKey};
use crate::splice::ValidationError;
use std::fmt;
use std::str::FromStr;

/// How the source code gets combined with the target's
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum SpliceKind {
    /// Prepend the source code
    Before,

    /// Run the source code at every return site, keeping the returned value
    After,

    /// Throw away the target code and use the source code instead
    Replace,

    /// Prepend the source code, but after the `super(..)`/`this(..)` call in constructors
    Head,

    /// Run the source code at every return site
    Tail,

    /// Wrap the target code (currently handled as [`SpliceKind::Replace`])
    Around,
}

impl SpliceKind {
    pub const ALL: [SpliceKind; 6] = [
        SpliceKind::Before,
        SpliceKind::After,
        SpliceKind::Replace,
        SpliceKind::Head,
        SpliceKind::Tail,
        SpliceKind::Around,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SpliceKind::Before => "BEFORE",
            SpliceKind::After => "AFTER",
            SpliceKind::Replace => "REPLACE",
            SpliceKind::Head => "HEAD",
            SpliceKind::Tail => "TAIL",
            SpliceKind::Around => "AROUND",
        }
    }

    /// Does a splice of this kind exclude every other splice on the same target?
    pub fn is_exclusive(self) -> bool {
        self == SpliceKind::Replace
    }
}

impl fmt::Display for SpliceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpliceKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpliceKind::ALL
            .iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| ValidationError::UnknownKind(s.to_owned()))
    }
}

/// Declaration that some source method should be spliced into some target method
///
/// This is what plugin metadata boils down to. It only names the methods involved; the source
/// code itself is looked up later, when the target class gets transformed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpliceDescriptor {
    pub target: MethodKey,
    pub source: MethodKey,
    pub kind: SpliceKind,

    /// Lower values get applied first (and win conflicts)
    pub priority: i32,
}

impl SpliceDescriptor {
    pub fn new(target: MethodKey, source: MethodKey, kind: SpliceKind, priority: i32) -> Self {
        SpliceDescriptor {
            target,
            source,
            kind,
            priority,
        }
    }

    /// Build a descriptor out of raw metadata strings
    ///
    /// Method keys are written as `owner/Class.name(params)ret`.
    pub fn parse(
        target: &str,
        source: &str,
        kind: &str,
        priority: i32,
    ) -> Result<SpliceDescriptor, ValidationError> {
        let parse_key = |role: &str, text: &str| {
            MethodKey::parse(text).map_err(|err| {
                ValidationError::MalformedDescriptor(format!("{} '{}': {}", role, text, err))
            })
        };
        Ok(SpliceDescriptor {
            target: parse_key("target", target)?,
            source: parse_key("source", source)?,
            kind: kind.parse()?,
            priority,
        })
    }

    /// Unique identifier of the splice point, `target->source`
    pub fn id(&self) -> String {
        format!("{}->{}", self.target, self.source)
    }
}

impl fmt::Display for SpliceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (priority {})",
            self.kind,
            self.id(),
            self.priority
        )
    }
}

/// Descriptor whose source method body has been located
#[derive(Clone, Debug)]
pub struct SpliceRequest {
    pub descriptor: SpliceDescriptor,
    pub source_body: MethodBody,
}

impl SpliceRequest {
    pub fn new(descriptor: SpliceDescriptor, source_body: MethodBody) -> SpliceRequest {
        SpliceRequest {
            descriptor,
            source_body,
        }
    }

    pub fn kind(&self) -> SpliceKind {
        self.descriptor.kind
    }

    pub fn priority(&self) -> i32 {
        self.descriptor.priority
    }
}
