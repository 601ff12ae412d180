use crate::jvm::code::{Instruction, ValueKind};
use crate::jvm::model::MethodBody;
use crate::jvm::{BaseType, FieldType};
use crate::util::Width;

/// Declared return type of a method, as far as saving and restoring it is concerned
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ReturnKind {
    Void,
    Numeric(BaseType),
    Reference,
}

impl ReturnKind {
    pub fn of(return_type: Option<&FieldType>) -> ReturnKind {
        match return_type {
            None => ReturnKind::Void,
            Some(FieldType::Base(base)) => ReturnKind::Numeric(*base),
            Some(FieldType::Ref(_)) => ReturnKind::Reference,
        }
    }

    /// Kind used by the `*load`/`*store`/`*return` instructions (`None` for `void`)
    pub fn value_kind(self) -> Option<ValueKind> {
        match self {
            ReturnKind::Void => None,
            ReturnKind::Numeric(base) => Some(base.value_kind()),
            ReturnKind::Reference => Some(ValueKind::Reference),
        }
    }
}

impl Width for ReturnKind {
    fn width(&self) -> usize {
        self.value_kind().map_or(0, |kind| kind.width())
    }
}

/// Positions of every return instruction, in order
pub fn find_returns(body: &MethodBody) -> Vec<usize> {
    body.instructions
        .iter()
        .enumerate()
        .filter(|(_, insn)| insn.is_return())
        .map(|(idx, _)| idx)
        .collect()
}

pub fn declared_return_kind(body: &MethodBody) -> ReturnKind {
    ReturnKind::of(body.descriptor.return_type.as_ref())
}

/// Code that returns the default value for the return kind (`0`, `null`, or nothing)
pub fn default_return(kind: ReturnKind) -> Vec<Instruction> {
    match kind.value_kind() {
        None => vec![Instruction::Return(None)],
        Some(value_kind) => vec![
            Instruction::Const(value_kind.zero()),
            Instruction::Return(Some(value_kind)),
        ],
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::Constant;
    use crate::jvm::{BinaryName, MethodAccessFlags, MethodDescriptor, UnqualifiedName};

    #[test]
    fn return_kinds() {
        assert_eq!(ReturnKind::of(None), ReturnKind::Void);
        assert_eq!(ReturnKind::of(Some(&FieldType::boolean())).value_kind(), Some(ValueKind::Int));
        assert_eq!(ReturnKind::of(Some(&FieldType::double())).width(), 2);
        assert_eq!(ReturnKind::of(Some(&FieldType::object(BinaryName::STRING))).width(), 1);
        assert_eq!(ReturnKind::Void.width(), 0);
    }

    #[test]
    fn default_returns() {
        assert_eq!(default_return(ReturnKind::Void), vec![Instruction::Return(None)]);
        assert_eq!(
            default_return(ReturnKind::Numeric(BaseType::Char)),
            vec![
                Instruction::Const(Constant::Int(0)),
                Instruction::Return(Some(ValueKind::Int))
            ]
        );
        assert_eq!(
            default_return(ReturnKind::Numeric(BaseType::Long)),
            vec![
                Instruction::Const(Constant::Long(0)),
                Instruction::Return(Some(ValueKind::Long))
            ]
        );
        assert_eq!(
            default_return(ReturnKind::Reference),
            vec![
                Instruction::Const(Constant::Null),
                Instruction::Return(Some(ValueKind::Reference))
            ]
        );
    }

    #[test]
    fn return_positions() {
        let body = MethodBody::new(
            UnqualifiedName::INIT,
            MethodAccessFlags::PUBLIC,
            MethodDescriptor {
                parameters: vec![],
                return_type: None,
            },
            vec![
                Instruction::Return(None),
                Instruction::Op(crate::jvm::code::StackOp::Nop),
                Instruction::Return(None),
            ],
        );
        assert_eq!(find_returns(&body), vec![0, 2]);
        assert_eq!(declared_return_kind(&body), ReturnKind::Void);
    }
}
