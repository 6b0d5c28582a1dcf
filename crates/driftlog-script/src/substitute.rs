//! `${name}` placeholder substitution.

use driftlog_core::Variables;

/// Placeholder failure, without script context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderError {
    /// No value supplied for the named variable.
    Unknown(String),
    /// `${` without a closing `}`.
    Unterminated,
}

/// Replace every `${name}` in `text` with its value.
///
/// `$${` produces a literal `${`. A `$` not followed by `{` is kept as is.
pub fn substitute(text: &str, variables: &Variables) -> Result<String, PlaceholderError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];

        if let Some(after) = tail.strip_prefix("$${") {
            out.push_str("${");
            rest = after;
        } else if let Some(after) = tail.strip_prefix("${") {
            let end = after.find('}').ok_or(PlaceholderError::Unterminated)?;
            let name = after[..end].trim();
            let value = variables
                .get(name)
                .ok_or_else(|| PlaceholderError::Unknown(name.to_string()))?;
            out.push_str(value);
            rest = &after[end + 1..];
        } else {
            out.push('$');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    Ok(out)
}
