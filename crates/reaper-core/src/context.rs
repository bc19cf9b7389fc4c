//! Context sanitiser (C2)
//!
//! Validates the key-value context supplied with a mandate issuance request.
//! Output is the same map with no transformation beyond validation: context
//! values flow straight into rule condition comparisons and audit logs, so
//! refusing adversarial shapes at the edge keeps evaluation a pure
//! string-compare downstream.

use std::collections::BTreeMap;

use crate::error::{ReaperError, Result};

pub type Context = BTreeMap<String, String>;

const MAX_VALUE_LEN: usize = 1000;
const FORBIDDEN_CHARS: [char; 6] = ['<', '>', '\'', '"', ';', '`'];

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validate a raw context map, returning it unchanged on success.
///
/// Fails with `INVALID_CONTEXT` the moment any key or value violates the
/// shape, rather than collecting every violation — §4.1 describes sanitising
/// as a gate, not a linter.
pub fn sanitize(context: Context) -> Result<Context> {
    for (key, value) in &context {
        if !is_valid_key(key) {
            return Err(ReaperError::invalid_context(format!(
                "context key '{key}' must match ^[A-Za-z0-9_-]+$"
            )));
        }
        if value.len() > MAX_VALUE_LEN {
            return Err(ReaperError::invalid_context(format!(
                "context value for '{key}' exceeds {MAX_VALUE_LEN} characters"
            )));
        }
        if value.contains(|c| FORBIDDEN_CHARS.contains(&c)) {
            return Err(ReaperError::invalid_context(format!(
                "context value for '{key}' contains a forbidden character"
            )));
        }
    }
    Ok(context)
}
