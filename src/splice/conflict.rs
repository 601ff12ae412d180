use crate::splice::{SpliceDescriptor, SpliceRequest};
use std::cmp::Ordering;

/// Anything competing for a splice point: bare descriptors, or requests with their source loaded
pub trait Candidate {
    fn descriptor(&self) -> &SpliceDescriptor;
}

impl Candidate for SpliceDescriptor {
    fn descriptor(&self) -> &SpliceDescriptor {
        self
    }
}

impl Candidate for SpliceRequest {
    fn descriptor(&self) -> &SpliceDescriptor {
        &self.descriptor
    }
}

/// Outcome of resolving the candidate splices for one target method
#[derive(Debug)]
pub struct Resolution<C = SpliceRequest> {
    /// Candidates to apply, in order
    pub applied: Vec<C>,

    /// Candidates that lost out to an exclusive one
    pub discarded: Vec<C>,
}

fn precedence<C: Candidate>(a: &C, b: &C) -> Ordering {
    let (a, b) = (a.descriptor(), b.descriptor());
    a.priority
        .cmp(&b.priority)
        .then_with(|| a.source.to_string().cmp(&b.source.to_string()))
}

/// Order the candidates for one target and drop the ones that can't coexist
///
/// Candidates are sorted by ascending priority, then by source method (the sort is stable, so
/// anything still tied keeps its original order). If any candidate is a `REPLACE`, the first one
/// in that order is the only one applied.
///
/// Only descriptors are consulted, so this runs before any source body is looked up: a `REPLACE`
/// excludes the rest even if its own source is missing.
pub fn resolve<C: Candidate>(mut candidates: Vec<C>) -> Resolution<C> {
    candidates.sort_by(precedence);

    let exclusive = candidates
        .iter()
        .position(|candidate| candidate.descriptor().kind.is_exclusive());
    let winner = match exclusive {
        None => {
            return Resolution {
                applied: candidates,
                discarded: vec![],
            }
        }
        Some(winner) => candidates.remove(winner),
    };

    let competing = candidates
        .iter()
        .filter(|candidate| candidate.descriptor().kind.is_exclusive())
        .count();
    let winning = winner.descriptor();
    if competing > 0 {
        log::warn!(
            "{} has {} REPLACE splices, only applying {}",
            winning.target,
            competing + 1,
            winning.source
        );
    }
    for loser in &candidates {
        log::debug!(
            "Discarding {} in favour of REPLACE by {}",
            loser.descriptor(),
            winning.source
        );
    }

    Resolution {
        applied: vec![winner],
        discarded: candidates,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::model::{MethodBody, MethodKey};
    use crate::jvm::{MethodAccessFlags, MethodDescriptor, ParseDescriptor};
    use crate::splice::{SpliceDescriptor, SpliceKind};

    fn candidate(kind: SpliceKind, priority: i32, source: &str) -> SpliceRequest {
        let source = MethodKey::parse(source).unwrap();
        let body = MethodBody::new(
            source.name.clone(),
            MethodAccessFlags::STATIC,
            MethodDescriptor::parse("()V").unwrap(),
            vec![],
        );
        let descriptor = SpliceDescriptor::new(
            MethodKey::parse("demo/Target.run()V").unwrap(),
            source,
            kind,
            priority,
        );
        SpliceRequest::new(descriptor, body)
    }

    fn sources(requests: &[SpliceRequest]) -> Vec<String> {
        requests
            .iter()
            .map(|request| request.descriptor.source.name.to_string())
            .collect()
    }

    #[test]
    fn ordered_by_priority_then_source() {
        let resolution = resolve(vec![
            candidate(SpliceKind::Tail, 20, "demo/M.c()V"),
            candidate(SpliceKind::Before, 10, "demo/M.b()V"),
            candidate(SpliceKind::Head, 10, "demo/M.a()V"),
            candidate(SpliceKind::Around, 5, "demo/M.d()V"),
        ]);
        assert_eq!(sources(&resolution.applied), vec!["d", "a", "b", "c"]);
        assert!(resolution.discarded.is_empty());
    }

    #[test]
    fn replace_is_exclusive() {
        let resolution = resolve(vec![
            candidate(SpliceKind::Before, 1, "demo/M.a()V"),
            candidate(SpliceKind::Replace, 900, "demo/M.b()V"),
            candidate(SpliceKind::After, 2, "demo/M.c()V"),
        ]);
        assert_eq!(sources(&resolution.applied), vec!["b"]);
        assert_eq!(sources(&resolution.discarded), vec!["a", "c"]);
    }

    #[test]
    fn first_replace_wins() {
        let resolution = resolve(vec![
            candidate(SpliceKind::Replace, 50, "demo/M.late()V"),
            candidate(SpliceKind::Replace, 10, "demo/M.early()V"),
        ]);
        assert_eq!(sources(&resolution.applied), vec!["early"]);
        assert_eq!(sources(&resolution.discarded), vec!["late"]);
    }

    #[test]
    fn descriptors_resolve_without_sources() {
        let descriptor = |kind: &str, priority: i32, source: &str| {
            SpliceDescriptor::parse("demo/Target.run()V", source, kind, priority).unwrap()
        };
        let resolution = resolve(vec![
            descriptor("BEFORE", 500, "demo/M.before()V"),
            descriptor("REPLACE", 100, "demo/M.gone()V"),
        ]);
        assert_eq!(resolution.applied.len(), 1);
        assert_eq!(resolution.applied[0].kind, SpliceKind::Replace);
        assert_eq!(resolution.discarded.len(), 1);
        assert_eq!(resolution.discarded[0].kind, SpliceKind::Before);
    }
}
