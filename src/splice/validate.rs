use crate::jvm::model::MethodBody;
use crate::jvm::{FieldType, RenderDescriptor};
use crate::splice::{Error, SpliceKind, StructuralError, ValidationError};

/// Check everything that has to hold before a splice of some kind may run
///
/// The source must be static and the target must have code. Then the signatures are compared:
///
///   - `BEFORE`/`HEAD`/`TAIL`: source parameters are a prefix of the target's
///   - `AFTER`: source returns `void` and takes as many parameters as the target
///   - `REPLACE`/`AROUND`: parameters and return types are identical
pub fn validate(kind: SpliceKind, target: &MethodBody, source: &MethodBody) -> Result<(), Error> {
    if !source.is_static() {
        return Err(ValidationError::SourceNotStatic(source.name.to_string()).into());
    }
    if !target.has_code() {
        return Err(StructuralError::TargetHasNoCode(target.name.to_string()).into());
    }
    check_signature(kind, target, source)?;
    Ok(())
}

/// Signature compatibility rules alone
pub fn check_signature(
    kind: SpliceKind,
    target: &MethodBody,
    source: &MethodBody,
) -> Result<(), ValidationError> {
    let target_params = &target.descriptor.parameters;
    let source_params = &source.descriptor.parameters;

    let bad_params = || ValidationError::IncompatibleParameters {
        kind,
        source: render_params(source_params),
        target: render_params(target_params),
    };
    let bad_return = || ValidationError::IncompatibleReturn {
        kind,
        source: render_return(source.descriptor.return_type.as_ref()),
        target: render_return(target.descriptor.return_type.as_ref()),
    };

    match kind {
        SpliceKind::Before | SpliceKind::Head | SpliceKind::Tail => {
            if !target_params.starts_with(source_params) {
                return Err(bad_params());
            }
        }
        SpliceKind::After => {
            if source.descriptor.return_type.is_some() {
                return Err(bad_return());
            }
            if source_params.len() != target_params.len() {
                return Err(bad_params());
            }
        }
        SpliceKind::Replace | SpliceKind::Around => {
            if source_params != target_params {
                return Err(bad_params());
            }
            if source.descriptor.return_type != target.descriptor.return_type {
                return Err(bad_return());
            }
        }
    }
    Ok(())
}

fn render_params(params: &[FieldType]) -> String {
    let mut rendered = String::from("(");
    for param in params {
        param.render_to(&mut rendered);
    }
    rendered.push(')');
    rendered
}

fn render_return(return_type: Option<&FieldType>) -> String {
    return_type.map_or_else(|| String::from("V"), RenderDescriptor::render)
}
