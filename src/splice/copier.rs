//! Copying code from one method body into another
//!
//! The source's local variable slots get shifted so that its parameters line up with the target's
//! parameters and its remaining locals land after the target's parameters. Labels are replaced with
//! fresh labels from the target's generator, so the copy can never collide with the target's own.

use crate::jvm::code::{Instruction, LabelGenerator, LabelMap, SynLabel};
use crate::jvm::model::{MethodBody, SlotLayout, SlotRegion};
use crate::splice::InternalError;

/// Shift applied to local slots of a source body when copying it into a target body
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlotRemap {
    source: SlotLayout,
    pub param_offset: i64,
    pub local_offset: i64,
}

impl SlotRemap {
    pub fn between(source: &MethodBody, target: &MethodBody) -> SlotRemap {
        let source_layout = source.layout();
        let target_layout = target.layout();
        SlotRemap {
            source: source_layout,
            param_offset: target_layout.param_start as i64 - source_layout.param_start as i64,
            local_offset: target_layout.local_start as i64 - source_layout.local_start as i64,
        }
    }

    /// Slot in the target corresponding to a slot in the source
    pub fn map(&self, index: u16) -> Result<u16, InternalError> {
        let shifted = match self.source.region(index) {
            SlotRegion::Receiver => return Ok(index),
            SlotRegion::Parameter => index as i64 + self.param_offset,
            SlotRegion::Local => index as i64 + self.local_offset,
        };
        u16::try_from(shifted).map_err(|_| InternalError::LocalSlotOverflow(shifted))
    }
}

/// Copy all of the source's instructions into the target's slot and label space
///
/// The target only gets its label generator advanced: the copied code is returned (along with the
/// label mapping used) for the caller to place.
pub fn copy_with_remap(
    source: &MethodBody,
    target: &mut MethodBody,
) -> Result<(Vec<Instruction>, LabelMap), InternalError> {
    let remap = SlotRemap::between(source, target);
    let labels = LabelMap::allocate(&source.instructions, &mut target.label_generator);

    let instructions = source
        .instructions
        .iter()
        .map(|insn| {
            labels
                .map_instruction(insn)
                .map_err(InternalError::UnmappedLabel)?
                .map_local(|idx| remap.map(idx))
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "Copied {} instructions from {} into {} (param offset {}, local offset {})",
        instructions.len(),
        source.name,
        target.name,
        remap.param_offset,
        remap.local_offset
    );
    Ok((instructions, labels))
}

/// Same as [`copy_with_remap`], but with every return instruction dropped
pub fn copy_with_remap_excluding_returns(
    source: &MethodBody,
    target: &mut MethodBody,
) -> Result<Vec<Instruction>, InternalError> {
    let (mut instructions, _) = copy_with_remap(source, target)?;
    instructions.retain(|insn| !insn.is_return());
    Ok(instructions)
}

/// Clone already copied code with a fresh set of labels
///
/// Slots are left untouched. This is what lets the same block be placed at several sites of one
/// body without any two sites sharing a label.
pub fn relabel(
    instructions: &[Instruction],
    generator: &mut impl LabelGenerator<SynLabel>,
) -> Result<Vec<Instruction>, InternalError> {
    let labels = LabelMap::allocate(instructions, generator);
    instructions
        .iter()
        .map(|insn| {
            labels
                .map_instruction(insn)
                .map_err(InternalError::UnmappedLabel)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{OrdComparison, StackOp, ValueKind};
    use crate::jvm::{MethodAccessFlags, MethodDescriptor, Name, ParseDescriptor, UnqualifiedName};

    fn method(flags: MethodAccessFlags, desc: &str, insns: Vec<Instruction>) -> MethodBody {
        MethodBody::new(
            UnqualifiedName::from_string(String::from("m")).unwrap(),
            flags,
            MethodDescriptor::parse(desc).unwrap(),
            insns,
        )
    }

    #[test]
    fn static_source_into_instance_target() {
        // static (IJ)V: params in 0..3, first local at 3
        let source = method(
            MethodAccessFlags::STATIC,
            "(IJ)V",
            vec![
                Instruction::Load(ValueKind::Int, 0),
                Instruction::Load(ValueKind::Long, 1),
                Instruction::Store(ValueKind::Int, 3),
                Instruction::IInc(4, 1),
                Instruction::Return(None),
            ],
        );
        // instance (IJD)V: receiver at 0, params in 1..6, first local at 6
        let mut target = method(MethodAccessFlags::PUBLIC, "(IJD)V", vec![]);

        let remap = SlotRemap::between(&source, &target);
        assert_eq!(remap.param_offset, 1);
        assert_eq!(remap.local_offset, 3);

        let (copied, labels) = copy_with_remap(&source, &mut target).unwrap();
        assert!(labels.is_empty());
        assert_eq!(
            copied,
            vec![
                Instruction::Load(ValueKind::Int, 1),
                Instruction::Load(ValueKind::Long, 2),
                Instruction::Store(ValueKind::Int, 6),
                Instruction::IInc(7, 1),
                Instruction::Return(None),
            ]
        );
    }

    #[test]
    fn labels_come_from_target() {
        let source = method(
            MethodAccessFlags::STATIC,
            "(I)I",
            vec![
                Instruction::Load(ValueKind::Int, 0),
                Instruction::If(OrdComparison::EQ, SynLabel::new(0)),
                Instruction::Const(crate::jvm::code::Constant::Int(1)),
                Instruction::Return(Some(ValueKind::Int)),
                Instruction::Label(SynLabel::new(0)),
                Instruction::Const(crate::jvm::code::Constant::Int(0)),
                Instruction::Return(Some(ValueKind::Int)),
            ],
        );
        let mut target = method(
            MethodAccessFlags::STATIC,
            "(I)I",
            vec![
                Instruction::Label(SynLabel::new(0)),
                Instruction::Label(SynLabel::new(1)),
                Instruction::Load(ValueKind::Int, 0),
                Instruction::Return(Some(ValueKind::Int)),
            ],
        );

        let copied = copy_with_remap_excluding_returns(&source, &mut target).unwrap();
        assert_eq!(copied.len(), 5);
        assert!(copied.iter().all(|insn| !insn.is_return()));
        assert_eq!(copied[1], Instruction::If(OrdComparison::EQ, SynLabel::new(2)));
        assert_eq!(copied[3], Instruction::Label(SynLabel::new(2)));

        let again = relabel(&copied, &mut target.label_generator).unwrap();
        assert_eq!(again[1], Instruction::If(OrdComparison::EQ, SynLabel::new(3)));
        assert_eq!(again[3], Instruction::Label(SynLabel::new(3)));
    }

    #[test]
    fn jump_to_missing_label_is_internal() {
        let source = method(
            MethodAccessFlags::STATIC,
            "()V",
            vec![Instruction::Goto(SynLabel::new(5)), Instruction::Op(StackOp::Nop)],
        );
        let mut target = method(MethodAccessFlags::STATIC, "()V", vec![]);
        assert!(matches!(
            copy_with_remap(&source, &mut target),
            Err(InternalError::UnmappedLabel(lbl)) if lbl == SynLabel::new(5)
        ));
    }
}
