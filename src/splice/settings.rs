use crate::splice::SpliceKind;

/// Knobs for which classes get transformed and how unspecified descriptor fields are filled in
#[derive(Clone, Debug)]
pub struct Settings {
    /// Classes whose binary name starts with any of these are never transformed (eg. `java/`)
    pub excluded_prefixes: Vec<String>,

    /// Priority of splices that don't declare one
    pub default_priority: i32,

    /// Kind of splices that don't declare one
    pub default_kind: SpliceKind,

    /// Never transform array classes (names starting with `[`)
    pub skip_array_classes: bool,
}

impl Settings {
    pub const DEFAULT_PRIORITY: i32 = 1000;

    /// Prefixes of the JDK's own packages
    pub const JDK_PREFIXES: [&'static str; 5] = ["java/", "javax/", "sun/", "com/sun/", "jdk/"];

    pub fn add_excluded_prefix(&mut self, prefix: impl Into<String>) {
        let prefix = prefix.into().replace('.', "/");
        log::debug!("Excluding classes starting with '{}'", prefix);
        self.excluded_prefixes.push(prefix);
    }

    /// Is a class (by its binary name, or dotted Java name) off limits?
    pub fn is_excluded(&self, class_name: &str) -> bool {
        let class_name = class_name.replace('.', "/");
        if class_name.len() <= 1 {
            return true;
        }
        if self.skip_array_classes && class_name.starts_with('[') {
            return true;
        }
        self.excluded_prefixes
            .iter()
            .any(|prefix| class_name.starts_with(prefix.as_str()))
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            excluded_prefixes: Settings::JDK_PREFIXES
                .iter()
                .map(|prefix| String::from(*prefix))
                .collect(),
            default_priority: Settings::DEFAULT_PRIORITY,
            default_kind: SpliceKind::Replace,
            skip_array_classes: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exclusions() {
        let mut settings = Settings::default();
        assert!(settings.is_excluded("java/lang/String"));
        assert!(settings.is_excluded("com.sun.proxy.Foo"));
        assert!(settings.is_excluded("[Ljava/lang/Object;"));
        assert!(settings.is_excluded("A"));
        assert!(!settings.is_excluded("javafx/Stage"));
        assert!(!settings.is_excluded("demo/Target"));

        settings.add_excluded_prefix("demo.internal.");
        assert!(settings.is_excluded("demo/internal/Hidden"));
        assert!(!settings.is_excluded("demo/Target"));

        settings.skip_array_classes = false;
        assert!(!settings.is_excluded("[Ldemo/Target;"));
    }
}
