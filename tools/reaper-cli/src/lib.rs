//! Pure helpers shared between the CLI binary and its benchmarks/tests: no
//! network calls live here, only request-shaping logic (§4.11).

use std::collections::BTreeMap;

use serde_json::Value;

/// Parse repeatable `key=value` CLI arguments (metadata, context) into a map.
/// Pairs without an `=` are silently dropped.
pub fn parse_kv_pairs(pairs: &[String]) -> BTreeMap<String, String> {
    pairs.iter().filter_map(|pair| pair.split_once('=')).map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// Turn parsed `key=value` pairs into a JSON object suitable for a mandate
/// issuance context body.
pub fn context_json(pairs: &[String]) -> Value {
    Value::Object(parse_kv_pairs(pairs).into_iter().map(|(k, v)| (k, Value::String(v))).collect())
}
