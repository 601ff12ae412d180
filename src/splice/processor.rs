use crate::splice::{ResourceError, SpliceRegistry};
use std::collections::HashMap;
use std::fmt;

/// Plugin hook notified whenever the set of splices is (re)loaded
pub trait SpliceProcessor {
    /// Identifier the processor was registered under
    fn id(&self) -> &str;

    /// Called once, after the registry is first populated
    fn on_init(&mut self, _registry: &SpliceRegistry) {}

    /// Called after every reload of the registry
    fn on_reload(&mut self, _registry: &SpliceRegistry) {}
}

/// Request for a processor to be instantiated
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessorDescriptor {
    pub id: String,

    /// Lower values get their hooks called first
    pub priority: i32,
}

type ProcessorFactory = Box<dyn Fn() -> Box<dyn SpliceProcessor> + Send + Sync>;

/// Factories for the processors that can be requested, keyed by identifier
#[derive(Default)]
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    pub fn new() -> ProcessorRegistry {
        ProcessorRegistry::default()
    }

    /// Register a factory, replacing any previous one with the same identifier
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn SpliceProcessor> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.factories.insert(id.clone(), Box::new(factory)).is_some() {
            log::warn!("Processor '{}' was registered twice, keeping the latest", id);
        }
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Create one processor per descriptor, ordered by ascending priority
    pub fn instantiate(
        &self,
        descriptors: &[ProcessorDescriptor],
    ) -> Result<ProcessorSet, ResourceError> {
        let mut ordered: Vec<&ProcessorDescriptor> = descriptors.iter().collect();
        ordered.sort_by_key(|descriptor| descriptor.priority);

        let mut processors = Vec::with_capacity(ordered.len());
        for descriptor in ordered {
            let factory = self
                .factories
                .get(&descriptor.id)
                .ok_or_else(|| ResourceError::UnknownProcessor(descriptor.id.clone()))?;
            processors.push(factory());
            log::debug!(
                "Instantiated processor '{}' (priority {})",
                descriptor.id,
                descriptor.priority
            );
        }
        Ok(ProcessorSet { processors })
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.factories.keys().collect();
        ids.sort();
        f.debug_struct("ProcessorRegistry")
            .field("factories", &ids)
            .finish()
    }
}

/// Instantiated processors, in the order their hooks run
#[derive(Default)]
pub struct ProcessorSet {
    processors: Vec<Box<dyn SpliceProcessor>>,
}

impl ProcessorSet {
    pub fn init(&mut self, registry: &SpliceRegistry) {
        for processor in &mut self.processors {
            log::debug!("Initializing processor '{}'", processor.id());
            processor.on_init(registry);
        }
    }

    pub fn reload(&mut self, registry: &SpliceRegistry) {
        for processor in &mut self.processors {
            log::debug!("Reloading processor '{}'", processor.id());
            processor.on_reload(registry);
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.processors.iter().map(|processor| processor.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        id: &'static str,
        reloads: Arc<AtomicUsize>,
    }

    impl SpliceProcessor for Counting {
        fn id(&self) -> &str {
            self.id
        }

        fn on_reload(&mut self, registry: &SpliceRegistry) {
            self.reloads.fetch_add(1 + registry.statistics().total, Ordering::SeqCst);
        }
    }

    #[test]
    fn instantiate_in_priority_order() {
        let reloads = Arc::new(AtomicUsize::new(0));
        let mut factories = ProcessorRegistry::new();
        let counter = reloads.clone();
        factories.register("counting", move || {
            Box::new(Counting {
                id: "counting",
                reloads: counter.clone(),
            }) as Box<dyn SpliceProcessor>
        });
        factories.register("quiet", || {
            Box::new(Counting {
                id: "quiet",
                reloads: Arc::new(AtomicUsize::new(0)),
            }) as Box<dyn SpliceProcessor>
        });
        assert!(factories.is_registered("quiet"));

        let mut processors = factories
            .instantiate(&[
                ProcessorDescriptor {
                    id: String::from("counting"),
                    priority: 50,
                },
                ProcessorDescriptor {
                    id: String::from("quiet"),
                    priority: 5,
                },
            ])
            .unwrap();
        assert_eq!(processors.ids(), vec!["quiet", "counting"]);

        let registry = SpliceRegistry::default();
        processors.init(&registry);
        processors.reload(&registry);
        processors.reload(&registry);
        assert_eq!(reloads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unknown_processor() {
        let factories = ProcessorRegistry::new();
        let result = factories.instantiate(&[ProcessorDescriptor {
            id: String::from("missing"),
            priority: 0,
        }]);
        assert!(matches!(result, Err(ResourceError::UnknownProcessor(id)) if id == "missing"));
    }
}
