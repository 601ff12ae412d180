use bitflags::bitflags;

bitflags! {
    /// Access flags on methods
    ///
    /// Only `STATIC`, `ABSTRACT`, and `NATIVE` change how a body gets spliced: the first decides
    /// whether local slot 0 holds a receiver, the other two mean there is no code to splice into.
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6-200-A.1
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

impl MethodAccessFlags {
    /// Keywords used in textual listings, in the order they get rendered
    const KEYWORDS: [(&'static str, MethodAccessFlags); 12] = [
        ("public", MethodAccessFlags::PUBLIC),
        ("private", MethodAccessFlags::PRIVATE),
        ("protected", MethodAccessFlags::PROTECTED),
        ("static", MethodAccessFlags::STATIC),
        ("final", MethodAccessFlags::FINAL),
        ("synchronized", MethodAccessFlags::SYNCHRONIZED),
        ("bridge", MethodAccessFlags::BRIDGE),
        ("varargs", MethodAccessFlags::VARARGS),
        ("native", MethodAccessFlags::NATIVE),
        ("abstract", MethodAccessFlags::ABSTRACT),
        ("strict", MethodAccessFlags::STRICT),
        ("synthetic", MethodAccessFlags::SYNTHETIC),
    ];

    /// Look up the flag for a keyword like `static`
    pub fn from_keyword(keyword: &str) -> Option<MethodAccessFlags> {
        MethodAccessFlags::KEYWORDS
            .iter()
            .find(|(kw, _)| *kw == keyword)
            .map(|(_, flag)| *flag)
    }

    /// Keywords for all of the set flags
    pub fn keywords(&self) -> Vec<&'static str> {
        MethodAccessFlags::KEYWORDS
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(kw, _)| *kw)
            .collect()
    }

    /// Does the method have code that could be spliced?
    pub fn has_code(&self) -> bool {
        !self.intersects(MethodAccessFlags::ABSTRACT | MethodAccessFlags::NATIVE)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keywords() {
        let flags = MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC;
        assert_eq!(flags.keywords(), vec!["public", "static"]);
        assert_eq!(
            MethodAccessFlags::from_keyword("native"),
            Some(MethodAccessFlags::NATIVE)
        );
        assert_eq!(MethodAccessFlags::from_keyword("volatile"), None);
    }

    #[test]
    fn code_presence() {
        assert!(MethodAccessFlags::PUBLIC.has_code());
        assert!(!(MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT).has_code());
        assert!(!MethodAccessFlags::NATIVE.has_code());
    }
}
