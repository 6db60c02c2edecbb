//! Cache key helpers shared by the in-memory store and the disk cache.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Shorten an arbitrary input to a 16-character lowercase hex key.
///
/// Truncated SHA-256 digest, used purely for key shortening and
/// filesystem-safe normalization, not for security. Same input always
/// yields the same output.
pub fn hash_key(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Build a colon-delimited composite key: `{resource}:{disc}:{disc}`.
///
/// This is the readable key form used for most cache entries, e.g.
/// `trending:movie:week:1`.
pub fn compose_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(":")
}

/// Serialize a JSON value with object keys sorted at every level.
///
/// Equal inputs always produce identical strings regardless of how the
/// value was assembled, so `hash_key(&canonical_json(v))` is a stable
/// fingerprint.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by_key(|(k, _)| k.as_str());
            out.push('{');
            for (i, (key, val)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Scalars already have a single JSON rendering
        _ => out.push_str(&value.to_string()),
    }
}
