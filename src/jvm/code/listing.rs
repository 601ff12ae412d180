//! Line-based assembly listings of classes and method bodies
//!
//! The format is deliberately close to what `javap -c` prints, minus the offsets:
//!
//! ```text
//! class demo/Target
//!
//! method public static compute (I)I
//!   .locals 2
//!   .annotation demo/Marker
//!   .catch L0 L1 L2 java/lang/Exception
//!   .var x I 0 L0 L1
//! L0:
//!   line 12 L0
//!   iload 0
//!   ifeq L1
//!   iconst_1
//!   ireturn
//! L1:
//!   iconst_0
//!   ireturn
//! L2:
//!   athrow
//! end
//! ```
//!
//! Label names are local to their method. Any token ending in `:` on its own line is a label
//! marker, and `#` starts a comment line.

use crate::jvm::code::{
    Constant, EqComparison, FieldAccess, FieldRef, Instruction, InvokeType, LabelGenerator,
    MethodRef, OrdComparison, StackOp, SynLabel, SynLabelGenerator, ValueKind,
};
use crate::jvm::model::{ClassBody, ExceptionRange, LocalVariable, MethodBody};
use crate::jvm::{
    BinaryName, FieldType, MethodAccessFlags, MethodDescriptor, Name, ParseDescriptor, RefType,
    RenderDescriptor, UnqualifiedName,
};
use std::collections::{HashMap, HashSet};
use std::io::{Error, ErrorKind, Result};

const ORD_SUFFIXES: [(OrdComparison, &str); 6] = [
    (OrdComparison::EQ, "eq"),
    (OrdComparison::NE, "ne"),
    (OrdComparison::LT, "lt"),
    (OrdComparison::GE, "ge"),
    (OrdComparison::GT, "gt"),
    (OrdComparison::LE, "le"),
];

const INVOKE_MNEMONICS: [(InvokeType, &str); 4] = [
    (InvokeType::Virtual, "invokevirtual"),
    (InvokeType::Special, "invokespecial"),
    (InvokeType::Static, "invokestatic"),
    (InvokeType::Interface, "invokeinterface"),
];

const FIELD_MNEMONICS: [(FieldAccess, &str); 4] = [
    (FieldAccess::GetStatic, "getstatic"),
    (FieldAccess::PutStatic, "putstatic"),
    (FieldAccess::GetField, "getfield"),
    (FieldAccess::PutField, "putfield"),
];

fn ord_suffix(op: OrdComparison) -> &'static str {
    ORD_SUFFIXES
        .iter()
        .find(|(o, _)| *o == op)
        .map_or("eq", |(_, suffix)| *suffix)
}

fn eq_suffix(op: EqComparison) -> &'static str {
    match op {
        EqComparison::EQ => "eq",
        EqComparison::NE => "ne",
    }
}

/// Render a single instruction (without indentation)
pub fn render_instruction(insn: &Instruction) -> String {
    use Instruction::*;

    match insn {
        Label(lbl) => format!("{}:", lbl),
        LineNumber(line, lbl) => format!("line {} {}", line, lbl),
        Load(kind, idx) => format!("{}load {}", kind.prefix(), idx),
        Store(kind, idx) => format!("{}store {}", kind.prefix(), idx),
        IInc(idx, by) => format!("iinc {} {}", idx, by),
        If(op, lbl) => format!("if{} {}", ord_suffix(*op), lbl),
        IfICmp(op, lbl) => format!("if_icmp{} {}", ord_suffix(*op), lbl),
        IfACmp(op, lbl) => format!("if_acmp{} {}", eq_suffix(*op), lbl),
        IfNull(EqComparison::EQ, lbl) => format!("ifnull {}", lbl),
        IfNull(EqComparison::NE, lbl) => format!("ifnonnull {}", lbl),
        Goto(lbl) => format!("goto {}", lbl),
        TableSwitch {
            default,
            low,
            targets,
        } => {
            let mut rendered = format!("tableswitch {} {}", low, default);
            for target in targets {
                rendered.push(' ');
                rendered.push_str(&target.to_string());
            }
            rendered
        }
        LookupSwitch { default, targets } => {
            let mut rendered = format!("lookupswitch {}", default);
            for (key, target) in targets {
                rendered.push_str(&format!(" {}:{}", key, target));
            }
            rendered
        }
        Invoke(typ, method) => {
            let mnemonic = INVOKE_MNEMONICS
                .iter()
                .find(|(t, _)| t == typ)
                .map_or("invokevirtual", |(_, m)| *m);
            format!(
                "{} {}.{} {}",
                mnemonic,
                method.owner,
                method.name,
                method.descriptor.render()
            )
        }
        Field(access, field) => {
            let mnemonic = FIELD_MNEMONICS
                .iter()
                .find(|(a, _)| a == access)
                .map_or("getfield", |(_, m)| *m);
            format!(
                "{} {}.{} {}",
                mnemonic,
                field.owner,
                field.name,
                field.descriptor.render()
            )
        }
        Return(None) => String::from("return"),
        Return(Some(kind)) => format!("{}return", kind.prefix()),
        Const(constant) => render_constant(constant),
        Op(op) => String::from(op.mnemonic()),
        New(class) => format!("new {}", class),
        NewArray(elem @ FieldType::Base(_)) => format!("newarray {}", elem.render()),
        NewArray(elem @ FieldType::Ref(_)) => format!("anewarray {}", elem.render()),
        CheckCast(typ) => format!("checkcast {}", typ.render()),
        InstanceOf(typ) => format!("instanceof {}", typ.render()),
    }
}

fn render_constant(constant: &Constant) -> String {
    match constant {
        Constant::Null => String::from("aconst_null"),
        Constant::Int(-1) => String::from("iconst_m1"),
        Constant::Int(i @ 0..=5) => format!("iconst_{}", i),
        Constant::Int(i) if i8::try_from(*i).is_ok() => format!("bipush {}", i),
        Constant::Int(i) if i16::try_from(*i).is_ok() => format!("sipush {}", i),
        Constant::Int(i) => format!("ldc {}", i),
        Constant::Long(l @ 0..=1) => format!("lconst_{}", l),
        Constant::Long(l) => format!("ldc {}L", l),
        Constant::Float(f) if [0.0f32, 1.0, 2.0].iter().any(|c| c.to_bits() == f.to_bits()) => {
            format!("fconst_{}", *f as u8)
        }
        Constant::Float(f) => format!("ldc {:?}f", f),
        Constant::Double(d) if [0.0f64, 1.0].iter().any(|c| c.to_bits() == d.to_bits()) => {
            format!("dconst_{}", *d as u8)
        }
        Constant::Double(d) => format!("ldc {:?}d", d),
        Constant::String(string) => {
            let mut rendered = String::from("ldc \"");
            for c in string.chars() {
                match c {
                    '"' => rendered.push_str("\\\""),
                    '\\' => rendered.push_str("\\\\"),
                    '\n' => rendered.push_str("\\n"),
                    '\r' => rendered.push_str("\\r"),
                    '\t' => rendered.push_str("\\t"),
                    c => rendered.push(c),
                }
            }
            rendered.push('"');
            rendered
        }
        Constant::Class(typ) => format!("ldc class {}", typ.render()),
    }
}

/// Render a method body, from its `method` header to its `end`
pub fn render_method(method: &MethodBody) -> String {
    let mut rendered = String::from("method");
    for keyword in method.access_flags.keywords() {
        rendered.push(' ');
        rendered.push_str(keyword);
    }
    rendered.push_str(&format!(
        " {} {}\n",
        method.name,
        method.descriptor.render()
    ));
    rendered.push_str(&format!("  .locals {}\n", method.max_locals));
    for annotation in &method.annotations {
        rendered.push_str(&format!("  .annotation {}\n", annotation));
    }
    for range in &method.exception_ranges {
        let typ = range
            .exception_type
            .as_ref()
            .map_or_else(|| String::from("any"), |typ| typ.to_string());
        rendered.push_str(&format!(
            "  .catch {} {} {} {}\n",
            range.start, range.end, range.handler, typ
        ));
    }
    for variable in method.local_variables.iter().flatten() {
        rendered.push_str(&format!(
            "  .var {} {} {} {} {}\n",
            variable.name,
            variable.descriptor.render(),
            variable.index,
            variable.start,
            variable.end
        ));
    }
    for insn in &method.instructions {
        if !matches!(insn, Instruction::Label(_)) {
            rendered.push_str("  ");
        }
        rendered.push_str(&render_instruction(insn));
        rendered.push('\n');
    }
    rendered.push_str("end\n");
    rendered
}

/// Render a class and all of its methods
pub fn render_class(class: &ClassBody) -> String {
    let mut rendered = format!("class {}\n", class.name);
    for method in &class.methods {
        rendered.push('\n');
        rendered.push_str(&render_method(method));
    }
    rendered
}

/// Label names seen so far in one method
struct LabelScope {
    names: HashMap<String, SynLabel>,
    placed: HashSet<SynLabel>,
    generator: SynLabelGenerator,
}

impl LabelScope {
    fn new() -> LabelScope {
        LabelScope {
            names: HashMap::new(),
            placed: HashSet::new(),
            generator: SynLabelGenerator::new(SynLabel::START),
        }
    }

    fn get(&mut self, name: &str) -> SynLabel {
        let generator = &mut self.generator;
        *self
            .names
            .entry(name.to_owned())
            .or_insert_with(|| generator.fresh_label())
    }

    fn place(&mut self, name: &str) -> std::result::Result<SynLabel, String> {
        let lbl = self.get(name);
        if self.placed.insert(lbl) {
            Ok(lbl)
        } else {
            Err(format!("Label '{}' is placed twice", name))
        }
    }
}

/// Method whose header has been parsed, but not its `end`
struct PendingMethod {
    name: UnqualifiedName,
    access_flags: MethodAccessFlags,
    descriptor: MethodDescriptor,
    declared_locals: u16,
    instructions: Vec<Instruction>,
    exception_ranges: Vec<ExceptionRange>,
    local_variables: Vec<LocalVariable>,
    annotations: Vec<BinaryName>,
    labels: LabelScope,
}

impl PendingMethod {
    fn finish(self) -> std::result::Result<MethodBody, String> {
        let mut unplaced: Vec<&String> = self
            .labels
            .names
            .iter()
            .filter(|(_, lbl)| !self.labels.placed.contains(*lbl))
            .map(|(name, _)| name)
            .collect();
        unplaced.sort();
        if let Some(name) = unplaced.first() {
            return Err(format!(
                "Label '{}' is used in '{}' but never placed",
                name, self.name
            ));
        }

        let mut body = MethodBody::new(
            self.name,
            self.access_flags,
            self.descriptor,
            self.instructions,
        );
        body.max_locals = body.max_locals.max(self.declared_locals);
        body.exception_ranges = self.exception_ranges;
        if !self.local_variables.is_empty() {
            body.local_variables = Some(self.local_variables);
        }
        body.annotations = self.annotations;
        body.label_generator = self.labels.generator;
        Ok(body)
    }
}

/// Parse every class in a listing
pub fn parse_classes(source: &str) -> Result<Vec<ClassBody>> {
    let mut classes = vec![];
    let mut class: Option<ClassBody> = None;
    let mut method: Option<PendingMethod> = None;

    for (line_idx, raw_line) in source.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let located = |msg: String| -> Error {
            let msg = format!("line {}: {}", line_idx + 1, msg);
            Error::new(ErrorKind::InvalidInput, msg)
        };
        let (keyword, rest) = split_word(line);

        if let Some(pending) = method.as_mut() {
            if keyword == "end" {
                let finished = method
                    .take()
                    .map_or_else(|| Err(String::from("No open method")), PendingMethod::finish)
                    .map_err(located)?;
                match class.as_mut() {
                    Some(class) => class.methods.push(finished),
                    None => return Err(located(String::from("Method outside of a class"))),
                }
            } else {
                parse_method_line(pending, keyword, rest).map_err(located)?;
            }
            continue;
        }

        match keyword {
            "class" => {
                let name = BinaryName::from_string(rest.to_owned()).map_err(located)?;
                classes.extend(class.replace(ClassBody::new(name)));
            }
            "method" => {
                if class.is_none() {
                    return Err(located(String::from("Method outside of a class")));
                }
                method = Some(parse_method_header(rest).map_err(located)?);
            }
            other => {
                return Err(located(format!("Unexpected '{}' outside of a method", other)));
            }
        }
    }

    if let Some(pending) = method {
        let msg = format!("Method '{}' is missing its 'end'", pending.name);
        return Err(Error::new(ErrorKind::UnexpectedEof, msg));
    }
    classes.extend(class);
    Ok(classes)
}

fn split_word(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    }
}

fn parse_method_header(rest: &str) -> std::result::Result<PendingMethod, String> {
    let words: Vec<&str> = rest.split_whitespace().collect();
    if words.len() < 2 {
        return Err(format!("Method header '{}' needs a name and descriptor", rest));
    }
    let (flag_words, signature) = words.split_at(words.len() - 2);
    let mut access_flags = MethodAccessFlags::empty();
    for word in flag_words {
        access_flags |= MethodAccessFlags::from_keyword(word)
            .ok_or_else(|| format!("Unknown access flag '{}'", word))?;
    }
    let name = UnqualifiedName::from_string(signature[0].to_owned())?;
    let descriptor = MethodDescriptor::parse(signature[1]).map_err(|err| err.to_string())?;
    Ok(PendingMethod {
        name,
        access_flags,
        descriptor,
        declared_locals: 0,
        instructions: vec![],
        exception_ranges: vec![],
        local_variables: vec![],
        annotations: vec![],
        labels: LabelScope::new(),
    })
}

fn parse_method_line(
    method: &mut PendingMethod,
    keyword: &str,
    rest: &str,
) -> std::result::Result<(), String> {
    let args: Vec<&str> = rest.split_whitespace().collect();
    match keyword {
        ".locals" => {
            method.declared_locals = parse_number(arg(&args, 0, "slot count")?)?;
        }
        ".annotation" => {
            let annotation = BinaryName::from_string(arg(&args, 0, "annotation type")?.to_owned())?;
            method.annotations.push(annotation);
        }
        ".catch" => {
            let exception_type = match arg(&args, 3, "exception type")? {
                "any" => None,
                name => Some(BinaryName::from_string(name.to_owned())?),
            };
            let range = ExceptionRange {
                start: method.labels.get(arg(&args, 0, "start label")?),
                end: method.labels.get(arg(&args, 1, "end label")?),
                handler: method.labels.get(arg(&args, 2, "handler label")?),
                exception_type,
            };
            method.exception_ranges.push(range);
        }
        ".var" => {
            let variable = LocalVariable {
                name: UnqualifiedName::from_string(arg(&args, 0, "variable name")?.to_owned())?,
                descriptor: FieldType::parse(arg(&args, 1, "variable type")?)
                    .map_err(|err| err.to_string())?,
                index: parse_number(arg(&args, 2, "variable slot")?)?,
                start: method.labels.get(arg(&args, 3, "start label")?),
                end: method.labels.get(arg(&args, 4, "end label")?),
            };
            method.local_variables.push(variable);
        }
        label if rest.is_empty() && label.len() > 1 && label.ends_with(':') => {
            let lbl = method.labels.place(&label[..label.len() - 1])?;
            method.instructions.push(Instruction::Label(lbl));
        }
        mnemonic => {
            let insn = parse_instruction(mnemonic, rest, &args, &mut method.labels)?;
            method.instructions.push(insn);
        }
    }
    Ok(())
}

fn arg<'a>(args: &[&'a str], idx: usize, what: &str) -> std::result::Result<&'a str, String> {
    args.get(idx)
        .copied()
        .ok_or_else(|| format!("Missing {}", what))
}

fn parse_number<N: std::str::FromStr>(text: &str) -> std::result::Result<N, String>
where
    N::Err: std::fmt::Display,
{
    text.parse::<N>()
        .map_err(|err| format!("Invalid number '{}': {}", text, err))
}

fn parse_member(text: &str) -> std::result::Result<(BinaryName, UnqualifiedName), String> {
    let (owner, name) = text
        .rsplit_once('.')
        .ok_or_else(|| format!("Expected 'owner.name', got '{}'", text))?;
    Ok((
        BinaryName::from_string(owner.to_owned())?,
        UnqualifiedName::from_string(name.to_owned())?,
    ))
}

fn parse_ref_type(text: &str) -> std::result::Result<RefType, String> {
    RefType::parse(text).map_err(|err| err.to_string())
}

fn parse_instruction(
    mnemonic: &str,
    rest: &str,
    args: &[&str],
    labels: &mut LabelScope,
) -> std::result::Result<Instruction, String> {
    use Instruction::*;

    let insn = match mnemonic {
        "line" => LineNumber(
            parse_number(arg(args, 0, "line number")?)?,
            labels.get(arg(args, 1, "line label")?),
        ),
        "iinc" => IInc(
            parse_number(arg(args, 0, "local slot")?)?,
            parse_number(arg(args, 1, "increment")?)?,
        ),
        "goto" => Goto(labels.get(arg(args, 0, "jump target")?)),
        "ifnull" => IfNull(EqComparison::EQ, labels.get(arg(args, 0, "jump target")?)),
        "ifnonnull" => IfNull(EqComparison::NE, labels.get(arg(args, 0, "jump target")?)),
        "tableswitch" => {
            let low = parse_number(arg(args, 0, "low key")?)?;
            let default = labels.get(arg(args, 1, "default target")?);
            let targets = args[2..].iter().map(|name| labels.get(name)).collect();
            TableSwitch {
                default,
                low,
                targets,
            }
        }
        "lookupswitch" => {
            let default = labels.get(arg(args, 0, "default target")?);
            let mut targets = vec![];
            for pair in &args[1..] {
                let (key, name) = pair
                    .split_once(':')
                    .ok_or_else(|| format!("Expected 'key:label', got '{}'", pair))?;
                targets.push((parse_number(key)?, labels.get(name)));
            }
            LookupSwitch { default, targets }
        }
        "return" => Return(None),
        "aconst_null" => Const(Constant::Null),
        "iconst_m1" => Const(Constant::Int(-1)),
        "bipush" | "sipush" => Const(Constant::Int(parse_number(arg(args, 0, "constant")?)?)),
        "ldc" | "ldc_w" | "ldc2_w" => Const(parse_ldc(rest)?),
        "new" => New(BinaryName::from_string(arg(args, 0, "class")?.to_owned())?),
        "newarray" | "anewarray" => NewArray(
            FieldType::parse(arg(args, 0, "element type")?).map_err(|err| err.to_string())?,
        ),
        "checkcast" => CheckCast(parse_ref_type(arg(args, 0, "type")?)?),
        "instanceof" => InstanceOf(parse_ref_type(arg(args, 0, "type")?)?),
        other => {
            if let Some(typ) = INVOKE_MNEMONICS.iter().find(|(_, m)| *m == other) {
                let (owner, name) = parse_member(arg(args, 0, "method")?)?;
                let descriptor = MethodDescriptor::parse(arg(args, 1, "method descriptor")?)
                    .map_err(|err| err.to_string())?;
                Invoke(
                    typ.0,
                    MethodRef {
                        owner,
                        name,
                        descriptor,
                    },
                )
            } else if let Some(access) = FIELD_MNEMONICS.iter().find(|(_, m)| *m == other) {
                let (owner, name) = parse_member(arg(args, 0, "field")?)?;
                let descriptor = FieldType::parse(arg(args, 1, "field descriptor")?)
                    .map_err(|err| err.to_string())?;
                Field(
                    access.0,
                    FieldRef {
                        owner,
                        name,
                        descriptor,
                    },
                )
            } else if let Some(op) = StackOp::from_mnemonic(other) {
                Op(op)
            } else {
                parse_prefixed(other, args, labels)?
            }
        }
    };
    Ok(insn)
}

/// Parse the families of instructions sharing a mnemonic prefix or suffix
fn parse_prefixed(
    mnemonic: &str,
    args: &[&str],
    labels: &mut LabelScope,
) -> std::result::Result<Instruction, String> {
    let unknown = || format!("Unknown instruction '{}'", mnemonic);
    let ord = |suffix: &str| {
        ORD_SUFFIXES
            .iter()
            .find(|(_, s)| *s == suffix)
            .map(|(op, _)| *op)
    };

    if let Some(suffix) = mnemonic.strip_prefix("if_icmp") {
        let op = ord(suffix).ok_or_else(unknown)?;
        return Ok(Instruction::IfICmp(op, labels.get(arg(args, 0, "jump target")?)));
    }
    if let Some(suffix) = mnemonic.strip_prefix("if_acmp") {
        let op = match suffix {
            "eq" => EqComparison::EQ,
            "ne" => EqComparison::NE,
            _ => return Err(unknown()),
        };
        return Ok(Instruction::IfACmp(op, labels.get(arg(args, 0, "jump target")?)));
    }
    if let Some(suffix) = mnemonic.strip_prefix("if") {
        let op = ord(suffix).ok_or_else(unknown)?;
        return Ok(Instruction::If(op, labels.get(arg(args, 0, "jump target")?)));
    }

    // `iconst_2`, `lconst_1`, `fconst_0`, `dconst_1`
    if let Some((prefix, value)) = mnemonic.split_once("const_") {
        let constant = match (prefix, value) {
            ("i", "0" | "1" | "2" | "3" | "4" | "5") => Constant::Int(parse_number(value)?),
            ("l", "0" | "1") => Constant::Long(parse_number(value)?),
            ("f", "0" | "1" | "2") => Constant::Float(parse_number(value)?),
            ("d", "0" | "1") => Constant::Double(parse_number(value)?),
            _ => return Err(unknown()),
        };
        return Ok(Instruction::Const(constant));
    }

    // `iload`, `astore`, `dreturn`, ...
    let mut chars = mnemonic.chars();
    let kind = chars
        .next()
        .and_then(ValueKind::from_prefix)
        .ok_or_else(unknown)?;
    match chars.as_str() {
        "load" => Ok(Instruction::Load(kind, parse_number(arg(args, 0, "local slot")?)?)),
        "store" => Ok(Instruction::Store(kind, parse_number(arg(args, 0, "local slot")?)?)),
        "return" => Ok(Instruction::Return(Some(kind))),
        _ => Err(unknown()),
    }
}

fn parse_ldc(text: &str) -> std::result::Result<Constant, String> {
    if let Some(quoted) = text.strip_prefix('"') {
        let body = quoted
            .strip_suffix('"')
            .ok_or_else(|| format!("Unterminated string {}", text))?;
        let mut string = String::new();
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                string.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => string.push('\n'),
                Some('r') => string.push('\r'),
                Some('t') => string.push('\t'),
                Some(c @ ('"' | '\\')) => string.push(c),
                other => return Err(format!("Invalid escape '\\{:?}' in {}", other, text)),
            }
        }
        return Ok(Constant::String(string));
    }
    if let Some(typ) = text.strip_prefix("class ") {
        return Ok(Constant::Class(parse_ref_type(typ.trim())?));
    }
    if let Some(long) = text.strip_suffix('L') {
        return Ok(Constant::Long(parse_number(long)?));
    }
    if let Some(float) = text.strip_suffix('f') {
        return Ok(Constant::Float(parse_number(float)?));
    }
    if let Some(double) = text.strip_suffix('d') {
        return Ok(Constant::Double(parse_number(double)?));
    }
    Ok(Constant::Int(parse_number(text)?))
}
