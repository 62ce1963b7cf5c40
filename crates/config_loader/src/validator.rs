//! Configuration validation
//!
//! Rules:
//! - field constraints declared on the blueprint (`validator` derive)
//! - sink names unique
//! - file sinks carry a `path` parameter

use std::collections::HashSet;

use contracts::{ContractError, SessionBlueprint, SinkType};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a SessionBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_sink_names(blueprint)?;
    validate_sink_params(blueprint)?;
    Ok(())
}

/// Derived field constraints
fn validate_fields(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let (field, message) = first_error(&errors, String::new());
        ContractError::config_validation(field, message)
    })
}

/// Walk nested validation errors down to the first leaf, building a
/// dotted field path such as `sinks[1].queue_capacity`.
fn first_error(errors: &ValidationErrors, prefix: String) -> (String, String) {
    let join = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        }
    };

    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (name, kind) in fields {
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' constraint", err.code));
                    return (join(&**name), message);
                }
            }
            ValidationErrorsKind::Struct(inner) => return first_error(inner, join(&**name)),
            ValidationErrorsKind::List(items) => {
                if let Some((index, inner)) = items.iter().next() {
                    return first_error(inner, format!("{}[{index}]", join(&**name)));
                }
            }
        }
    }
    (prefix, "invalid configuration".to_string())
}

/// Sink names identify metrics and log lines; they must be unique
fn validate_sink_names(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

fn validate_sink_params(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.sink_type == SinkType::File
            && sink.params.get("path").is_none_or(|p| p.is_empty())
        {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].params.path"),
                "file sink requires a 'path' parameter",
            ));
        }
    }
    Ok(())
}
