use crate::jvm::code::{required_locals, Instruction, SynLabel, SynLabelGenerator};
use crate::jvm::{BinaryName, FieldType, MethodAccessFlags, MethodDescriptor, UnqualifiedName};
use crate::util::Width;

/// Semantic representation of a method and its code
///
/// A body is owned by whoever is currently mutating it. Splicing never mutates a caller's body in
/// place: the engine clones the target first and hands back the clone.
#[derive(Clone, Debug)]
pub struct MethodBody {
    pub name: UnqualifiedName,

    pub access_flags: MethodAccessFlags,

    pub descriptor: MethodDescriptor,

    /// Instructions, including label and line number markers
    pub instructions: Vec<Instruction>,

    /// Number of local variable slots the code uses (including parameters and `this`)
    pub max_locals: u16,

    /// Protected regions and their handlers, in priority order
    pub exception_ranges: Vec<ExceptionRange>,

    /// `LocalVariableTable` debug information, if any was present
    pub local_variables: Option<Vec<LocalVariable>>,

    /// Types of the annotations on the method
    pub annotations: Vec<BinaryName>,

    /// Source of fresh labels for this body
    pub label_generator: SynLabelGenerator,
}

impl MethodBody {
    /// Create a method body around some code
    ///
    /// The local slot count is computed from the parameters and the highest slot touched by the
    /// instructions, and the label generator starts after the highest label used.
    pub fn new(
        name: UnqualifiedName,
        access_flags: MethodAccessFlags,
        descriptor: MethodDescriptor,
        instructions: Vec<Instruction>,
    ) -> MethodBody {
        let has_receiver = !access_flags.contains(MethodAccessFlags::STATIC);
        let params = descriptor.parameter_length(has_receiver);
        let max_locals = params.max(required_locals(&instructions));
        let label_generator = SynLabelGenerator::after(&instructions);
        MethodBody {
            name,
            access_flags,
            descriptor,
            instructions,
            max_locals: u16::try_from(max_locals).unwrap_or(u16::MAX),
            exception_ranges: vec![],
            local_variables: None,
            annotations: vec![],
            label_generator,
        }
    }

    /// Static methods have no implicit receiver in slot 0
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    pub fn has_receiver(&self) -> bool {
        !self.is_static()
    }

    /// Is this an instance initializer (constructor)?
    pub fn is_initializer(&self) -> bool {
        self.name == UnqualifiedName::INIT
    }

    pub fn has_code(&self) -> bool {
        self.access_flags.has_code()
    }

    /// Compute the current split of local slots into receiver, parameters, and locals
    pub fn layout(&self) -> SlotLayout {
        let param_start: u16 = if self.has_receiver() { 1 } else { 0 };
        let param_width = self.descriptor.parameters.width();
        SlotLayout {
            param_start,
            local_start: param_start as usize + param_width,
        }
    }
}

/// Partition of local variable slots
///
/// Slots below `param_start` hold the receiver, slots in `param_start..local_start` hold the
/// declared parameters, and everything from `local_start` up is an ordinary local. This is always
/// recomputed from the method - it is never stored alongside it.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SlotLayout {
    pub param_start: u16,
    pub local_start: usize,
}

/// Which part of the local slots an index falls in
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SlotRegion {
    Receiver,
    Parameter,
    Local,
}

impl SlotLayout {
    pub fn region(&self, index: u16) -> SlotRegion {
        if index < self.param_start {
            SlotRegion::Receiver
        } else if (index as usize) < self.local_start {
            SlotRegion::Parameter
        } else {
            SlotRegion::Local
        }
    }
}

/// Entry in the exception table: `start..end` is protected by the code at `handler`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionRange {
    pub start: SynLabel,
    pub end: SynLabel,
    pub handler: SynLabel,

    /// `None` catches everything (as in `finally` blocks)
    pub exception_type: Option<BinaryName>,
}

/// Entry in the `LocalVariableTable` debug attribute
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalVariable {
    pub name: UnqualifiedName,
    pub descriptor: FieldType,
    pub start: SynLabel,
    pub end: SynLabel,
    pub index: u16,
}

/// Counts of the different sorts of instructions in a method body
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct InstructionStats {
    pub total: usize,
    pub variables: usize,
    pub jumps: usize,
    pub labels: usize,
    pub invokes: usize,
    pub field_accesses: usize,
    pub returns: usize,
}

impl InstructionStats {
    pub fn of(body: &MethodBody) -> InstructionStats {
        let mut stats = InstructionStats::default();
        for insn in &body.instructions {
            stats.total += 1;
            match insn {
                Instruction::Load(..) | Instruction::Store(..) | Instruction::IInc(..) => {
                    stats.variables += 1
                }
                Instruction::Label(_) => stats.labels += 1,
                Instruction::Invoke(..) => stats.invokes += 1,
                Instruction::Field(..) => stats.field_accesses += 1,
                Instruction::Return(_) => stats.returns += 1,
                other if other.is_jump() => stats.jumps += 1,
                _ => (),
            }
        }
        stats
    }
}
