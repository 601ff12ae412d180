use crate::jvm::model::{ClassBody, InstructionStats, MethodBody, MethodKey};
use crate::jvm::{BinaryName, Name};
use crate::splice::conflict::resolve;
use crate::splice::{
    Error, MethodSource, ResourceError, Settings, SpliceDescriptor, SpliceEngine, SpliceRegistry,
    SpliceRequest,
};

/// What happened to one splice descriptor during a class transformation
#[derive(Debug)]
pub enum SpliceOutcome {
    /// Spliced into the target method
    Applied,

    /// Lost a conflict to an exclusive splice on the same method
    Discarded,

    /// Could not be applied (the rest of the class carried on without it)
    Failed(Error),

    /// Applied or pending, but undone when a later splice of the same method hit an internal error
    RolledBack,
}

/// Per-descriptor record of a class transformation
#[derive(Debug)]
pub struct TransformReport {
    pub class: BinaryName,
    pub entries: Vec<(SpliceDescriptor, SpliceOutcome)>,
}

impl TransformReport {
    fn new(class: BinaryName) -> TransformReport {
        TransformReport {
            class,
            entries: vec![],
        }
    }

    fn record(&mut self, descriptor: SpliceDescriptor, outcome: SpliceOutcome) {
        self.entries.push((descriptor, outcome));
    }

    fn count(&self, keep: impl Fn(&SpliceOutcome) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|(_, outcome)| keep(outcome))
            .count()
    }

    pub fn applied(&self) -> usize {
        self.count(|outcome| matches!(outcome, SpliceOutcome::Applied))
    }

    pub fn discarded(&self) -> usize {
        self.count(|outcome| matches!(outcome, SpliceOutcome::Discarded))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, SpliceOutcome::Failed(_) | SpliceOutcome::RolledBack))
    }
}

/// Result of running the transformer over one class
#[derive(Debug)]
pub enum TransformOutcome {
    /// Settings rule the class out entirely
    Excluded,

    /// No splices target the class
    Unaffected,

    /// Splices were attempted (see the report for which ones succeeded)
    Transformed {
        class: ClassBody,
        report: TransformReport,
    },
}

/// Applies every registered splice that targets a class
///
/// Failures are contained: a failed request only skips that request, and an internal error only
/// rolls back the method it happened in. The input class is never modified.
#[derive(Debug, Default)]
pub struct ClassTransformer {
    settings: Settings,
    engine: SpliceEngine,
}

impl ClassTransformer {
    pub fn new(settings: Settings) -> ClassTransformer {
        ClassTransformer {
            settings,
            engine: SpliceEngine::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn transform_class<S: MethodSource + ?Sized>(
        &self,
        class: &ClassBody,
        registry: &SpliceRegistry,
        source: &S,
    ) -> TransformOutcome {
        if self.settings.is_excluded(class.name.as_str()) {
            log::debug!("Skipping excluded class {}", class.name);
            return TransformOutcome::Excluded;
        }
        let descriptors = registry.for_class(class.name.as_str());
        if descriptors.is_empty() {
            return TransformOutcome::Unaffected;
        }
        log::debug!(
            "Transforming {} ({} splices)",
            class.name,
            descriptors.len()
        );

        // Group by target method, keeping the order methods are first mentioned in
        let mut groups: Vec<(&MethodKey, Vec<&SpliceDescriptor>)> = vec![];
        for descriptor in descriptors {
            match groups.iter_mut().find(|(key, _)| *key == &descriptor.target) {
                Some((_, group)) => group.push(descriptor),
                None => groups.push((&descriptor.target, vec![descriptor])),
            }
        }

        let mut transformed = class.clone();
        let mut report = TransformReport::new(class.name.clone());
        for (key, group) in groups {
            let method_idx = match class.methods.iter().position(|method| key.matches(method)) {
                Some(idx) => idx,
                None => {
                    log::warn!("{} does not declare {}", class.name, key);
                    for descriptor in group {
                        let err = ResourceError::TargetNotFound(key.clone());
                        report.record(descriptor.clone(), SpliceOutcome::Failed(err.into()));
                    }
                    continue;
                }
            };
            transformed.methods[method_idx] =
                self.transform_method(&class.methods[method_idx], group, source, &mut report);
        }

        log::info!(
            "Transformed {}: {} applied, {} discarded, {} failed",
            class.name,
            report.applied(),
            report.discarded(),
            report.failed()
        );
        TransformOutcome::Transformed {
            class: transformed,
            report,
        }
    }

    /// Resolve, order, and apply the splices for one method
    fn transform_method<S: MethodSource + ?Sized>(
        &self,
        original: &MethodBody,
        group: Vec<&SpliceDescriptor>,
        source: &S,
        report: &mut TransformReport,
    ) -> MethodBody {
        // Exclusivity is settled on descriptors alone, so a missing REPLACE source still wins
        let resolution = resolve(group.into_iter().cloned().collect::<Vec<SpliceDescriptor>>());
        for descriptor in resolution.discarded {
            report.record(descriptor, SpliceOutcome::Discarded);
        }

        let mut requests = vec![];
        for descriptor in resolution.applied {
            match source.find_method(&descriptor.source) {
                Some(body) => requests.push(SpliceRequest::new(descriptor, body.clone())),
                None => {
                    log::warn!("Skipping {}: source method not found", descriptor);
                    let err = ResourceError::SourceNotFound(descriptor.source.clone());
                    report.record(descriptor, SpliceOutcome::Failed(err.into()));
                }
            }
        }

        log::debug!(
            "{} before splicing: {:?}",
            original.name,
            InstructionStats::of(original)
        );
        let mut current = original.clone();
        let mut outcomes: Vec<(SpliceDescriptor, SpliceOutcome)> = vec![];
        let mut pending = requests.into_iter();
        for request in pending.by_ref() {
            match self.engine.apply(&current, &request) {
                Ok(merged) => {
                    current = merged;
                    outcomes.push((request.descriptor, SpliceOutcome::Applied));
                }
                Err(Error::Internal(err)) => {
                    log::error!(
                        "Rolling back {} after {}: {}",
                        original.name,
                        request.descriptor,
                        err
                    );
                    for (_, outcome) in &mut outcomes {
                        *outcome = SpliceOutcome::RolledBack;
                    }
                    outcomes.push((request.descriptor, SpliceOutcome::Failed(err.into())));
                    current = original.clone();
                    break;
                }
                Err(err) => {
                    log::warn!("Skipping {}: {}", request.descriptor, err);
                    outcomes.push((request.descriptor, SpliceOutcome::Failed(err)));
                }
            }
        }
        for request in pending {
            outcomes.push((request.descriptor, SpliceOutcome::RolledBack));
        }
        report.entries.extend(outcomes);

        log::debug!(
            "{} after splicing: {:?}",
            current.name,
            InstructionStats::of(&current)
        );
        current
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::listing::parse_classes;
    use crate::jvm::model::ClassPool;

    const CLASSES: &str = "\
class demo/Target
method public run ()V
  return
end

class demo/Mixin
method public static first ()V
  nop
  return
end
method public static second ()V
  pop
  return
end
method public static broken ()V
  goto L0
L0:
  return
end

class java/lang/Thread
method public run ()V
  return
end
";

    fn setup() -> ClassPool {
        let mut pool = ClassPool::new();
        pool.extend(parse_classes(CLASSES).unwrap());
        pool
    }

    fn descriptor(target: &str, source: &str, kind: &str, priority: i32) -> SpliceDescriptor {
        SpliceDescriptor::parse(target, source, kind, priority).unwrap()
    }

    fn target(pool: &ClassPool) -> &ClassBody {
        pool.get(&MethodKey::parse("demo/Target.run()V").unwrap().class)
            .unwrap()
    }

    #[test]
    fn excluded_and_unaffected() {
        let pool = setup();
        let registry = SpliceRegistry::new(vec![descriptor(
            "java/lang/Thread.run()V",
            "demo/Mixin.first()V",
            "HEAD",
            0,
        )]);
        let transformer = ClassTransformer::default();
        for class in pool.classes() {
            let outcome = transformer.transform_class(class, &registry, &pool);
            match class.name.as_str() {
                "java/lang/Thread" => assert!(matches!(outcome, TransformOutcome::Excluded)),
                _ => assert!(matches!(outcome, TransformOutcome::Unaffected)),
            }
        }
    }

    #[test]
    fn failures_are_isolated() {
        let pool = setup();
        let registry = SpliceRegistry::new(vec![
            descriptor("demo/Target.run()V", "demo/Mixin.second()V", "BEFORE", 20),
            descriptor("demo/Target.run()V", "demo/Mixin.missing()V", "BEFORE", 5),
            descriptor("demo/Target.run()V", "demo/Mixin.first()V", "BEFORE", 10),
            descriptor("demo/Target.stop()V", "demo/Mixin.first()V", "BEFORE", 10),
        ]);
        let outcome = ClassTransformer::default().transform_class(target(&pool), &registry, &pool);
        let (class, report) = match outcome {
            TransformOutcome::Transformed { class, report } => (class, report),
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(report.applied(), 2);
        assert_eq!(report.failed(), 2);

        // `second` has the lower precedence, so it ends up in front
        let rendered: Vec<String> = class.methods[0]
            .instructions
            .iter()
            .map(crate::jvm::code::listing::render_instruction)
            .collect();
        assert_eq!(rendered, vec!["pop", "nop", "return"]);

        // The input class is untouched
        assert_eq!(target(&pool).methods[0].instructions.len(), 1);
    }

    #[test]
    fn replace_discards_the_rest() {
        let pool = setup();
        let registry = SpliceRegistry::new(vec![
            descriptor("demo/Target.run()V", "demo/Mixin.first()V", "BEFORE", 1),
            descriptor("demo/Target.run()V", "demo/Mixin.broken()V", "REPLACE", 99),
        ]);
        let outcome = ClassTransformer::default().transform_class(target(&pool), &registry, &pool);
        if let TransformOutcome::Transformed { class, report } = outcome {
            assert_eq!(report.applied(), 1);
            assert_eq!(report.discarded(), 1);
            assert_eq!(class.methods[0].instructions.len(), 3);
        } else {
            panic!("class should have been transformed");
        }
    }

    #[test]
    fn missing_replace_source_still_excludes() {
        let pool = setup();
        let registry = SpliceRegistry::new(vec![
            descriptor("demo/Target.run()V", "demo/Mixin.first()V", "BEFORE", 500),
            descriptor("demo/Target.run()V", "demo/Mixin.gone()V", "REPLACE", 100),
        ]);
        let outcome = ClassTransformer::default().transform_class(target(&pool), &registry, &pool);
        let (class, report) = match outcome {
            TransformOutcome::Transformed { class, report } => (class, report),
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(report.applied(), 0);
        assert_eq!(report.discarded(), 1);
        assert_eq!(report.failed(), 1);
        for (descriptor, outcome) in &report.entries {
            match descriptor.kind.name() {
                "BEFORE" => assert!(matches!(outcome, SpliceOutcome::Discarded)),
                _ => assert!(matches!(
                    outcome,
                    SpliceOutcome::Failed(Error::Resource(ResourceError::SourceNotFound(_)))
                )),
            }
        }
        assert_eq!(class.methods[0].instructions, target(&pool).methods[0].instructions);
    }
}
