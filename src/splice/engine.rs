use crate::jvm::code::{required_locals, Instruction, InvokeType, LabelMap};
use crate::jvm::model::{ExceptionRange, LocalVariable, MethodBody};
use crate::splice::copier::{copy_with_remap, copy_with_remap_excluding_returns, relabel};
use crate::splice::returns::{declared_return_kind, default_return, find_returns};
use crate::splice::validate::validate;
use crate::splice::{Error, InternalError, SpliceKind, SpliceRequest, StructuralError};
use crate::util::Width;

/// Merges source method bodies into target method bodies
///
/// Every application works on a copy of the target: when it fails, the body that was passed in is
/// exactly as it was. A successful application always hands back a body containing at least one
/// return instruction.
#[derive(Copy, Clone, Default, Debug)]
pub struct SpliceEngine;

impl SpliceEngine {
    pub fn new() -> SpliceEngine {
        SpliceEngine
    }

    /// Apply one request to a target body
    pub fn apply(&self, target: &MethodBody, request: &SpliceRequest) -> Result<MethodBody, Error> {
        let kind = request.kind();
        let source = &request.source_body;
        validate(kind, target, source)?;

        let mut merged = target.clone();
        match kind {
            SpliceKind::Before => splice_before(&mut merged, source)?,
            SpliceKind::Head => splice_head(&mut merged, source)?,
            SpliceKind::After | SpliceKind::Tail => splice_at_returns(kind, &mut merged, source)?,
            SpliceKind::Replace => splice_replace(&mut merged, source)?,
            SpliceKind::Around => {
                log::warn!(
                    "AROUND is not supported yet, replacing {} with {} instead",
                    merged.name,
                    source.name
                );
                splice_replace(&mut merged, source)?
            }
        }
        ensure_return(&mut merged);

        log::debug!(
            "Applied {} {} (now {} instructions, {} locals)",
            kind,
            request.descriptor.id(),
            merged.instructions.len(),
            merged.max_locals
        );
        Ok(merged)
    }
}

/// Raise `max_locals` so that it covers `required` slots
fn cover_slots(body: &mut MethodBody, required: usize) -> Result<(), InternalError> {
    if required > body.max_locals as usize {
        body.max_locals = u16::try_from(required)
            .map_err(|_| InternalError::LocalSlotOverflow(required as i64))?;
    }
    Ok(())
}

fn splice_before(target: &mut MethodBody, source: &MethodBody) -> Result<(), InternalError> {
    let copied = copy_with_remap_excluding_returns(source, target)?;
    cover_slots(target, required_locals(&copied))?;
    target.instructions.splice(0..0, copied);
    Ok(())
}

fn splice_head(target: &mut MethodBody, source: &MethodBody) -> Result<(), InternalError> {
    let copied = copy_with_remap_excluding_returns(source, target)?;
    cover_slots(target, required_locals(&copied))?;

    let position = if target.is_initializer() {
        initializer_call_end(&target.instructions)
    } else {
        first_non_parameter(&target.instructions)
    };
    let position = position.unwrap_or(0);
    log::debug!("HEAD of {} is at instruction {}", target.name, position);
    target.instructions.splice(position..position, copied);
    Ok(())
}

/// Position right after the `super(..)` or `this(..)` call of a constructor
///
/// The `invokespecial <init>` calls that initialize objects created with `new` in the same body
/// don't count: they are matched up with their `new` first.
pub fn initializer_call_end(instructions: &[Instruction]) -> Option<usize> {
    let mut pending_news = 0usize;
    for (idx, insn) in instructions.iter().enumerate() {
        match insn {
            Instruction::New(_) => pending_news += 1,
            Instruction::Invoke(InvokeType::Special, method) if method.is_initializer() => {
                if pending_news == 0 {
                    return Some(idx + 1);
                }
                pending_news -= 1;
            }
            _ => (),
        }
    }
    None
}

/// Position of the first instruction that isn't a load, label, or line number
pub fn first_non_parameter(instructions: &[Instruction]) -> Option<usize> {
    instructions
        .iter()
        .position(|insn| !matches!(insn, Instruction::Load(..)) && !insn.is_pseudo())
}

fn splice_at_returns(
    kind: SpliceKind,
    target: &mut MethodBody,
    source: &MethodBody,
) -> Result<(), Error> {
    let return_sites = find_returns(target);
    if return_sites.is_empty() {
        return Err(StructuralError::NoReturnSites {
            kind,
            target: target.name.to_string(),
        }
        .into());
    }

    let block = copy_with_remap_excluding_returns(source, target)?;
    cover_slots(target, required_locals(&block))?;

    // One temporary for the whole body, above anything the copied code touches
    let return_kind = declared_return_kind(target);
    let saved = match return_kind.value_kind() {
        None => None,
        Some(value_kind) => {
            let temp = target.max_locals;
            cover_slots(target, temp as usize + return_kind.width())?;
            Some((value_kind, temp))
        }
    };

    let mut blocks = Vec::with_capacity(return_sites.len());
    blocks.push(block);
    for _ in 1..return_sites.len() {
        let fresh = relabel(&blocks[0], &mut target.label_generator)?;
        blocks.push(fresh);
    }

    // Back to front, so that earlier positions stay valid
    for (&position, block) in return_sites.iter().zip(blocks).rev() {
        let mut inserted = Vec::with_capacity(block.len() + 2);
        if let Some((value_kind, temp)) = saved {
            inserted.push(Instruction::Store(value_kind, temp));
        }
        inserted.extend(block);
        if let Some((value_kind, temp)) = saved {
            inserted.push(Instruction::Load(value_kind, temp));
        }
        target.instructions.splice(position..position, inserted);
    }

    log::debug!(
        "{} inserted at {} return sites of {}",
        kind,
        return_sites.len(),
        target.name
    );
    Ok(())
}

fn splice_replace(target: &mut MethodBody, source: &MethodBody) -> Result<(), InternalError> {
    let (instructions, labels) = copy_with_remap(source, target)?;

    let mut exception_ranges = vec![];
    for range in &source.exception_ranges {
        match (
            labels.get(range.start),
            labels.get(range.end),
            labels.get(range.handler),
        ) {
            (Some(start), Some(end), Some(handler)) => exception_ranges.push(ExceptionRange {
                start,
                end,
                handler,
                exception_type: range.exception_type.clone(),
            }),
            _ => log::warn!(
                "Dropping exception range {}..{} (handler {}) of {}: labels are not placed",
                range.start,
                range.end,
                range.handler,
                source.name
            ),
        }
    }

    let local_variables = source.local_variables.as_ref().map(|variables| {
        variables
            .iter()
            .filter_map(|variable| remap_local_variable(variable, source, target, &labels))
            .collect()
    });

    target.instructions = instructions;
    target.exception_ranges = exception_ranges;
    target.local_variables = local_variables;
    target.annotations.clear();

    let params = target.descriptor.parameter_length(target.has_receiver());
    target.max_locals = 0;
    cover_slots(target, params.max(required_locals(&target.instructions)))?;
    Ok(())
}

fn remap_local_variable(
    variable: &LocalVariable,
    source: &MethodBody,
    target: &MethodBody,
    labels: &LabelMap,
) -> Option<LocalVariable> {
    let (start, end) = match (labels.get(variable.start), labels.get(variable.end)) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            log::warn!(
                "Dropping local variable {} of {}: labels are not placed",
                variable.name,
                source.name
            );
            return None;
        }
    };
    let index = match (source.has_receiver(), target.has_receiver()) {
        (false, true) => variable.index.checked_add(1),
        (true, false) => variable.index.checked_sub(1),
        _ => Some(variable.index),
    }?;
    Some(LocalVariable {
        name: variable.name.clone(),
        descriptor: variable.descriptor.clone(),
        start,
        end,
        index,
    })
}

/// Append a default return if the body has no return instruction at all
pub fn ensure_return(body: &mut MethodBody) {
    if !find_returns(body).is_empty() {
        return;
    }
    let fallback = default_return(declared_return_kind(body));
    log::debug!(
        "{} has no return instruction, appending {:?}",
        body.name,
        fallback
    );
    body.instructions.extend(fallback);
}
