//! Server command template rendering.
//!
//! The receiving server command is configured as a template with
//! `{placeholder}` slots. Validation happens at request time, before a
//! port is acquired; rendering happens exactly once, after the port has
//! been resolved.

use std::collections::HashMap;
use xferd_core::ProvisionError;

/// Placeholders a server command template may reference.
const SUPPORTED_PLACEHOLDERS: [&str; 6] = [
    "transfer_id",
    "port",
    "sudo_user",
    "mon_id",
    "mon_dest",
    "dest_files",
];

/// Collect the `{placeholder}` names referenced by a template.
///
/// An unterminated `{` is treated as literal text.
fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else { break };
        found.push(&after[..close]);
        rest = &after[close + 1..];
    }
    found
}

/// Check that every placeholder in the template is resolvable.
///
/// This must run before any port is acquired: a broken template is a
/// configuration error, not a launch failure.
pub fn validate_template(template: &str) -> Result<(), ProvisionError> {
    for name in placeholders(template) {
        if !SUPPORTED_PLACEHOLDERS.contains(&name) {
            return Err(ProvisionError::Configuration {
                detail: format!("server command template has no value for placeholder `{{{name}}}`"),
            });
        }
    }
    Ok(())
}

/// Render the template against concrete values.
///
/// Deterministic: identical inputs always produce the identical command
/// string. A missing value surfaces as the same configuration error the
/// earlier validation would have raised.
pub fn render_command(
    template: &str,
    values: &HashMap<&str, String>,
) -> Result<String, ProvisionError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            // Unterminated brace: keep the remainder literally.
            break;
        };
        let name = &after[..close];
        let value = values.get(name).ok_or_else(|| ProvisionError::Configuration {
            detail: format!("server command template has no value for placeholder `{{{name}}}`"),
        })?;
        out.push_str(&rest[..open]);
        out.push_str(value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
