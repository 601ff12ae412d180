use crate::jvm::model::MethodBody;
use crate::jvm::{BinaryName, MethodDescriptor, Name, ParseDescriptor, RenderDescriptor, UnqualifiedName};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Error, ErrorKind, Result};

/// Semantic representation of a class, as far as splicing cares: its name and its methods
#[derive(Clone, Debug)]
pub struct ClassBody {
    pub name: BinaryName,
    pub methods: Vec<MethodBody>,
}

impl ClassBody {
    pub fn new(name: BinaryName) -> ClassBody {
        ClassBody {
            name,
            methods: vec![],
        }
    }

    /// Find a method by name and descriptor
    pub fn method(&self, name: &UnqualifiedName, descriptor: &MethodDescriptor) -> Option<&MethodBody> {
        self.methods
            .iter()
            .find(|method| &method.name == name && &method.descriptor == descriptor)
    }
}

/// Collection of classes, indexed by name
#[derive(Clone, Debug, Default)]
pub struct ClassPool {
    classes: BTreeMap<BinaryName, ClassBody>,
}

impl ClassPool {
    pub fn new() -> ClassPool {
        ClassPool::default()
    }

    /// Add a class, returning the class it replaced (if any)
    pub fn insert(&mut self, class: ClassBody) -> Option<ClassBody> {
        self.classes.insert(class.name.clone(), class)
    }

    pub fn get(&self, name: &BinaryName) -> Option<&ClassBody> {
        self.classes.get(name)
    }

    /// Look up a method through its fully qualified key
    pub fn method(&self, key: &MethodKey) -> Option<&MethodBody> {
        self.get(&key.class)
            .and_then(|class| class.method(&key.name, &key.descriptor))
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassBody> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Extend<ClassBody> for ClassPool {
    fn extend<I: IntoIterator<Item = ClassBody>>(&mut self, iter: I) {
        for class in iter {
            self.insert(class);
        }
    }
}

/// Fully qualified reference to a method: `owner/Class.name(params)ret`
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct MethodKey {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
}

impl MethodKey {
    /// Parse a key like `demo/Target.compute(I)I`
    pub fn parse(source: &str) -> Result<MethodKey> {
        let paren = source.find('(').ok_or_else(|| {
            let msg = format!("Missing method descriptor in '{}'", source);
            Error::new(ErrorKind::InvalidInput, msg)
        })?;
        let (qualified, descriptor) = source.split_at(paren);
        let dot = qualified.rfind('.').ok_or_else(|| {
            let msg = format!("Missing class name in '{}'", source);
            Error::new(ErrorKind::InvalidInput, msg)
        })?;
        let class = BinaryName::from_string(qualified[..dot].to_owned())
            .map_err(|msg| Error::new(ErrorKind::InvalidInput, msg))?;
        let name = UnqualifiedName::from_string(qualified[dot + 1..].to_owned())
            .map_err(|msg| Error::new(ErrorKind::InvalidInput, msg))?;
        let descriptor = MethodDescriptor::parse(descriptor)?;
        Ok(MethodKey {
            class,
            name,
            descriptor,
        })
    }

    /// Key for a method of some class
    pub fn of(class: &BinaryName, method: &MethodBody) -> MethodKey {
        MethodKey {
            class: class.clone(),
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
        }
    }

    /// Does this key refer to the method (ignoring the class)?
    pub fn matches(&self, method: &MethodBody) -> bool {
        self.name == method.name && self.descriptor == method.descriptor
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}{}",
            self.class.as_str(),
            self.name.as_str(),
            self.descriptor.render()
        )
    }
}
