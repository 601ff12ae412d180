//! This module contains the AST of JVM method code as it gets spliced. The representation is
//! slightly different from the usual presentation to make splicing convenient:
//!
//!   - Labels and line numbers are pseudo-instructions living in the instruction stream, so that
//!     inserting code never requires recomputing offsets
//!
//!   - Loads, stores, and returns get abstracted into one instruction parametrized by the
//!     [`ValueKind`]. The `wide` and `xload_n` forms don't show up at all.
//!
//!   - Constant pushes (`iconst_*`, `bipush`, `sipush`, `ldc`, ...) are all [`Constant`]s
//!
//!   - Everything that doesn't reference locals, labels, or members is a [`StackOp`]

use crate::jvm::code::SynLabel;
use crate::jvm::{BinaryName, FieldType, MethodDescriptor, RefType, UnqualifiedName};
use crate::util::Width;
use std::ops::Not;

/// Kind of value as seen by loads, stores, and returns
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ValueKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl ValueKind {
    /// Mnemonic prefix (`i` in `iload`, `a` in `areturn`)
    pub fn prefix(self) -> char {
        match self {
            ValueKind::Int => 'i',
            ValueKind::Long => 'l',
            ValueKind::Float => 'f',
            ValueKind::Double => 'd',
            ValueKind::Reference => 'a',
        }
    }

    pub fn from_prefix(prefix: char) -> Option<ValueKind> {
        match prefix {
            'i' => Some(ValueKind::Int),
            'l' => Some(ValueKind::Long),
            'f' => Some(ValueKind::Float),
            'd' => Some(ValueKind::Double),
            'a' => Some(ValueKind::Reference),
            _ => None,
        }
    }

    /// Constant for the "zero" value of this kind (`0`, `0L`, `0.0f`, `0.0`, or `null`)
    pub fn zero(self) -> Constant {
        match self {
            ValueKind::Int => Constant::Int(0),
            ValueKind::Long => Constant::Long(0),
            ValueKind::Float => Constant::Float(0.0),
            ValueKind::Double => Constant::Double(0.0),
            ValueKind::Reference => Constant::Null,
        }
    }
}

impl Width for ValueKind {
    fn width(&self) -> usize {
        match self {
            ValueKind::Long | ValueKind::Double => 2,
            ValueKind::Int | ValueKind::Float | ValueKind::Reference => 1,
        }
    }
}

/// Constant pushed onto the stack
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Class(RefType),
}

/// Reference to a method, as found in `invoke*` instructions
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
}

impl MethodRef {
    /// Is this a call to an instance initializer (`super(..)`, `this(..)`, or after a `new`)?
    pub fn is_initializer(&self) -> bool {
        self.name == UnqualifiedName::INIT
    }
}

/// Reference to a field, as found in field access instructions
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType,
}

/// Type of method to invoke
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface,
}

/// Type of field access
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum FieldAccess {
    GetStatic,
    PutStatic,
    GetField,
    PutField,
}

/// Binary comparison operators available for `int` branches
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

impl Not for OrdComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            OrdComparison::EQ => OrdComparison::NE,
            OrdComparison::GE => OrdComparison::LT,
            OrdComparison::GT => OrdComparison::LE,
            OrdComparison::LE => OrdComparison::GT,
            OrdComparison::LT => OrdComparison::GE,
            OrdComparison::NE => OrdComparison::EQ,
        }
    }
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

impl Not for EqComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            EqComparison::EQ => EqComparison::NE,
            EqComparison::NE => EqComparison::EQ,
        }
    }
}

/// Instructions that only touch the operand stack
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum StackOp {
    Nop,
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    IAdd,
    LAdd,
    FAdd,
    DAdd,
    ISub,
    LSub,
    FSub,
    DSub,
    IMul,
    LMul,
    FMul,
    DMul,
    IDiv,
    LDiv,
    FDiv,
    DDiv,
    IRem,
    LRem,
    FRem,
    DRem,
    INeg,
    LNeg,
    FNeg,
    DNeg,
    IShl,
    LShl,
    IShr,
    LShr,
    IUShr,
    LUShr,
    IAnd,
    LAnd,
    IOr,
    LOr,
    IXor,
    LXor,
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,
    LCmp,
    FCmpL,
    FCmpG,
    DCmpL,
    DCmpG,
    IALoad,
    LALoad,
    FALoad,
    DALoad,
    AALoad,
    BALoad,
    CALoad,
    SALoad,
    IAStore,
    LAStore,
    FAStore,
    DAStore,
    AAStore,
    BAStore,
    CAStore,
    SAStore,
    ArrayLength,
    AThrow,
    MonitorEnter,
    MonitorExit,
}

impl StackOp {
    const MNEMONICS: [(StackOp, &'static str); 86] = [
        (StackOp::Nop, "nop"),
        (StackOp::Pop, "pop"),
        (StackOp::Pop2, "pop2"),
        (StackOp::Dup, "dup"),
        (StackOp::DupX1, "dup_x1"),
        (StackOp::DupX2, "dup_x2"),
        (StackOp::Dup2, "dup2"),
        (StackOp::Dup2X1, "dup2_x1"),
        (StackOp::Dup2X2, "dup2_x2"),
        (StackOp::Swap, "swap"),
        (StackOp::IAdd, "iadd"),
        (StackOp::LAdd, "ladd"),
        (StackOp::FAdd, "fadd"),
        (StackOp::DAdd, "dadd"),
        (StackOp::ISub, "isub"),
        (StackOp::LSub, "lsub"),
        (StackOp::FSub, "fsub"),
        (StackOp::DSub, "dsub"),
        (StackOp::IMul, "imul"),
        (StackOp::LMul, "lmul"),
        (StackOp::FMul, "fmul"),
        (StackOp::DMul, "dmul"),
        (StackOp::IDiv, "idiv"),
        (StackOp::LDiv, "ldiv"),
        (StackOp::FDiv, "fdiv"),
        (StackOp::DDiv, "ddiv"),
        (StackOp::IRem, "irem"),
        (StackOp::LRem, "lrem"),
        (StackOp::FRem, "frem"),
        (StackOp::DRem, "drem"),
        (StackOp::INeg, "ineg"),
        (StackOp::LNeg, "lneg"),
        (StackOp::FNeg, "fneg"),
        (StackOp::DNeg, "dneg"),
        (StackOp::IShl, "ishl"),
        (StackOp::LShl, "lshl"),
        (StackOp::IShr, "ishr"),
        (StackOp::LShr, "lshr"),
        (StackOp::IUShr, "iushr"),
        (StackOp::LUShr, "lushr"),
        (StackOp::IAnd, "iand"),
        (StackOp::LAnd, "land"),
        (StackOp::IOr, "ior"),
        (StackOp::LOr, "lor"),
        (StackOp::IXor, "ixor"),
        (StackOp::LXor, "lxor"),
        (StackOp::I2L, "i2l"),
        (StackOp::I2F, "i2f"),
        (StackOp::I2D, "i2d"),
        (StackOp::L2I, "l2i"),
        (StackOp::L2F, "l2f"),
        (StackOp::L2D, "l2d"),
        (StackOp::F2I, "f2i"),
        (StackOp::F2L, "f2l"),
        (StackOp::F2D, "f2d"),
        (StackOp::D2I, "d2i"),
        (StackOp::D2L, "d2l"),
        (StackOp::D2F, "d2f"),
        (StackOp::I2B, "i2b"),
        (StackOp::I2C, "i2c"),
        (StackOp::I2S, "i2s"),
        (StackOp::LCmp, "lcmp"),
        (StackOp::FCmpL, "fcmpl"),
        (StackOp::FCmpG, "fcmpg"),
        (StackOp::DCmpL, "dcmpl"),
        (StackOp::DCmpG, "dcmpg"),
        (StackOp::IALoad, "iaload"),
        (StackOp::LALoad, "laload"),
        (StackOp::FALoad, "faload"),
        (StackOp::DALoad, "daload"),
        (StackOp::AALoad, "aaload"),
        (StackOp::BALoad, "baload"),
        (StackOp::CALoad, "caload"),
        (StackOp::SALoad, "saload"),
        (StackOp::IAStore, "iastore"),
        (StackOp::LAStore, "lastore"),
        (StackOp::FAStore, "fastore"),
        (StackOp::DAStore, "dastore"),
        (StackOp::AAStore, "aastore"),
        (StackOp::BAStore, "bastore"),
        (StackOp::CAStore, "castore"),
        (StackOp::SAStore, "sastore"),
        (StackOp::ArrayLength, "arraylength"),
        (StackOp::AThrow, "athrow"),
        (StackOp::MonitorEnter, "monitorenter"),
        (StackOp::MonitorExit, "monitorexit"),
    ];

    pub fn mnemonic(self) -> &'static str {
        StackOp::MNEMONICS
            .iter()
            .find(|(op, _)| *op == self)
            .map_or("nop", |(_, mnemonic)| *mnemonic)
    }

    pub fn from_mnemonic(mnemonic: &str) -> Option<StackOp> {
        StackOp::MNEMONICS
            .iter()
            .find(|(_, m)| *m == mnemonic)
            .map(|(op, _)| *op)
    }
}

/// JVM method code instruction (or pseudo-instruction)
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// Marks the position of a label (pseudo-instruction)
    Label(SynLabel),

    /// Source line number starting at a label (pseudo-instruction)
    LineNumber(u16, SynLabel),

    Load(ValueKind, u16),  // covers `iload`, `iload_{0,3}`, and `wide iload`, etc.
    Store(ValueKind, u16), // covers `istore`, `istore_{0,3}`, and `wide istore`, etc.
    IInc(u16, i16),        // covers `iinc` and `wide iinc`

    If(OrdComparison, SynLabel), // covers `ifeq`, `ifne`, `iflt`, `ifge`, `ifgt`, `ifle`
    IfICmp(OrdComparison, SynLabel), // covers `if_icmpeq`, `if_icmpne`, ... `if_icmple`
    IfACmp(EqComparison, SynLabel), // covers `if_acmpeq`, `if_acmpne`
    IfNull(EqComparison, SynLabel), // covers `ifnull`, `ifnonnull`
    Goto(SynLabel),
    TableSwitch {
        default: SynLabel,
        low: i32,
        targets: Vec<SynLabel>,
    },
    LookupSwitch {
        default: SynLabel,
        targets: Vec<(i32, SynLabel)>,
    },

    Invoke(InvokeType, MethodRef),
    Field(FieldAccess, FieldRef),

    /// `None` is the plain `return` of `void` methods
    Return(Option<ValueKind>),

    Const(Constant),
    Op(StackOp),
    New(BinaryName),
    NewArray(FieldType), // covers `newarray` and `anewarray` (argument is the element type)
    CheckCast(RefType),
    InstanceOf(RefType),
}

impl Instruction {
    /// Is this one of the `*return` instructions?
    pub fn is_return(&self) -> bool {
        matches!(self, Instruction::Return(_))
    }

    /// Is this a jump (conditional, unconditional, or switch)?
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            Instruction::If(..)
                | Instruction::IfICmp(..)
                | Instruction::IfACmp(..)
                | Instruction::IfNull(..)
                | Instruction::Goto(_)
                | Instruction::TableSwitch { .. }
                | Instruction::LookupSwitch { .. }
        )
    }

    /// Is this a label or line number marker (ie. not a real instruction)?
    pub fn is_pseudo(&self) -> bool {
        matches!(self, Instruction::Label(_) | Instruction::LineNumber(..))
    }

    /// One past the last local slot touched by the instruction
    pub fn local_extent(&self) -> Option<usize> {
        match self {
            Instruction::Load(kind, idx) | Instruction::Store(kind, idx) => {
                Some(*idx as usize + kind.width())
            }
            Instruction::IInc(idx, _) => Some(*idx as usize + 1),
            _ => None,
        }
    }

    /// Rewrite the local variable index (if there is one)
    pub fn map_local<E>(&self, map_index: impl FnOnce(u16) -> Result<u16, E>) -> Result<Instruction, E> {
        Ok(match self {
            Instruction::Load(kind, idx) => Instruction::Load(*kind, map_index(*idx)?),
            Instruction::Store(kind, idx) => Instruction::Store(*kind, map_index(*idx)?),
            Instruction::IInc(idx, by) => Instruction::IInc(map_index(*idx)?, *by),
            other => other.clone(),
        })
    }

    /// All labels mentioned by the instruction (placed, jumped to, or annotated)
    pub fn labels(&self) -> Vec<SynLabel> {
        match self {
            Instruction::Label(lbl)
            | Instruction::LineNumber(_, lbl)
            | Instruction::If(_, lbl)
            | Instruction::IfICmp(_, lbl)
            | Instruction::IfACmp(_, lbl)
            | Instruction::IfNull(_, lbl)
            | Instruction::Goto(lbl) => vec![*lbl],
            Instruction::TableSwitch {
                default, targets, ..
            } => {
                let mut lbls = vec![*default];
                lbls.extend(targets.iter().copied());
                lbls
            }
            Instruction::LookupSwitch { default, targets } => {
                let mut lbls = vec![*default];
                lbls.extend(targets.iter().map(|(_, lbl)| *lbl));
                lbls
            }
            _ => vec![],
        }
    }

    /// Rewrite every label in the instruction, including label markers themselves
    pub fn map_labels<E>(
        &self,
        mut map_label: impl FnMut(SynLabel) -> Result<SynLabel, E>,
    ) -> Result<Instruction, E> {
        use Instruction::*;

        Ok(match self {
            Label(lbl) => Label(map_label(*lbl)?),
            LineNumber(line, lbl) => LineNumber(*line, map_label(*lbl)?),
            If(op, lbl) => If(*op, map_label(*lbl)?),
            IfICmp(op, lbl) => IfICmp(*op, map_label(*lbl)?),
            IfACmp(op, lbl) => IfACmp(*op, map_label(*lbl)?),
            IfNull(op, lbl) => IfNull(*op, map_label(*lbl)?),
            Goto(lbl) => Goto(map_label(*lbl)?),
            TableSwitch {
                default,
                low,
                targets,
            } => TableSwitch {
                default: map_label(*default)?,
                low: *low,
                targets: targets
                    .iter()
                    .map(|lbl| map_label(*lbl))
                    .collect::<Result<_, E>>()?,
            },
            LookupSwitch { default, targets } => LookupSwitch {
                default: map_label(*default)?,
                targets: targets
                    .iter()
                    .map(|(key, lbl)| map_label(*lbl).map(|lbl| (*key, lbl)))
                    .collect::<Result<_, E>>()?,
            },
            other => other.clone(),
        })
    }
}

/// One past the highest local slot touched by any of the instructions
pub fn required_locals(instructions: &[Instruction]) -> usize {
    instructions
        .iter()
        .filter_map(Instruction::local_extent)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mnemonics_are_unique() {
        for (op, mnemonic) in StackOp::MNEMONICS.iter() {
            assert_eq!(StackOp::from_mnemonic(mnemonic), Some(*op));
            assert_eq!(op.mnemonic(), *mnemonic);
        }
        assert_eq!(StackOp::from_mnemonic("iload"), None);
    }

    #[test]
    fn local_extents() {
        assert_eq!(Instruction::Load(ValueKind::Long, 3).local_extent(), Some(5));
        assert_eq!(Instruction::IInc(2, -1).local_extent(), Some(3));
        assert_eq!(Instruction::Op(StackOp::IAdd).local_extent(), None);

        let insns = vec![
            Instruction::Load(ValueKind::Int, 1),
            Instruction::Store(ValueKind::Double, 4),
            Instruction::Return(None),
        ];
        assert_eq!(required_locals(&insns), 6);
        assert_eq!(required_locals(&[]), 0);
    }

    #[test]
    fn switch_labels() {
        let switch = Instruction::LookupSwitch {
            default: SynLabel::new(0),
            targets: vec![(1, SynLabel::new(1)), (5, SynLabel::new(2))],
        };
        assert_eq!(
            switch.labels(),
            vec![SynLabel::new(0), SynLabel::new(1), SynLabel::new(2)]
        );
        let shifted = switch
            .map_labels(|lbl| Ok::<_, ()>(SynLabel::new(lbl.index() + 10)))
            .unwrap();
        assert_eq!(
            shifted,
            Instruction::LookupSwitch {
                default: SynLabel::new(10),
                targets: vec![(1, SynLabel::new(11)), (5, SynLabel::new(12))],
            }
        );
    }
}
