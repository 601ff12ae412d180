use crate::jvm::code::Instruction;
use std::collections::HashMap;
use std::fmt;

/// Opaque label
///
/// Labels are only meaningful inside the method body that allocated them. Copying instructions
/// between bodies always goes through a [`LabelMap`].
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct SynLabel(usize);

impl SynLabel {
    /// First label handed out by a fresh generator
    pub const START: SynLabel = SynLabel(0);

    pub const fn new(index: usize) -> SynLabel {
        SynLabel(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }

    /// Get the next fresh label
    pub fn next(&self) -> SynLabel {
        SynLabel(self.0 + 1)
    }
}

/// Generates new labels
pub trait LabelGenerator<Label> {
    /// Generate a fresh label
    fn fresh_label(&mut self) -> Label;
}

/// Label generator for [`SynLabel`]
///
/// Cloning does not split the generator source - the cloned generator will produce the same
/// sequence of labels as the original. Every method body owns exactly one of these.
#[derive(Clone, Debug)]
pub struct SynLabelGenerator(SynLabel);

impl SynLabelGenerator {
    pub fn new(start: SynLabel) -> SynLabelGenerator {
        SynLabelGenerator(start)
    }

    /// Generator whose labels are all distinct from those used in the instructions
    pub fn after<'a>(instructions: impl IntoIterator<Item = &'a Instruction>) -> SynLabelGenerator {
        let next = instructions
            .into_iter()
            .flat_map(Instruction::labels)
            .max()
            .map_or(SynLabel::START, |lbl| lbl.next());
        SynLabelGenerator(next)
    }
}

impl LabelGenerator<SynLabel> for SynLabelGenerator {
    fn fresh_label(&mut self) -> SynLabel {
        let to_return = self.0;
        self.0 = self.0.next();
        to_return
    }
}

impl fmt::Debug for SynLabel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}

impl fmt::Display for SynLabel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("L{}", self.0))
    }
}

/// Mapping from the labels of one body to fresh labels of another
///
/// A map is built for exactly one copy operation: all label markers are allocated up front (in
/// source order) so that forward jumps resolve, then instructions are rewritten through it.
#[derive(Default, Debug, Clone)]
pub struct LabelMap(HashMap<SynLabel, SynLabel>);

impl LabelMap {
    /// Allocate a fresh label for every label marker in `instructions`
    pub fn allocate(
        instructions: &[Instruction],
        generator: &mut impl LabelGenerator<SynLabel>,
    ) -> LabelMap {
        let mut map = HashMap::new();
        for insn in instructions {
            if let Instruction::Label(lbl) = insn {
                map.entry(*lbl).or_insert_with(|| generator.fresh_label());
            }
        }
        LabelMap(map)
    }

    pub fn get(&self, label: SynLabel) -> Option<SynLabel> {
        self.0.get(&label).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rewrite every label in the instruction
    ///
    /// Fails with the first label that has no entry in the map.
    pub fn map_instruction(&self, insn: &Instruction) -> Result<Instruction, SynLabel> {
        insn.map_labels(|lbl| self.get(lbl).ok_or(lbl))
    }
}
