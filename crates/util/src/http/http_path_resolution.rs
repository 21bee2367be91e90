use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex should compile"));

/// Resolves a path template by replacing `{key}` placeholders with
/// percent-encoded argument values. The placeholder format follows OpenAPI
/// (`/resource/{id}`).
///
/// Placeholders without a matching argument remain unchanged; use
/// [`unresolved_placeholders`] to detect them.
///
/// # Examples
/// ```rust
/// use fanout_util::build_path;
/// use serde_json::{Map, json};
///
/// let mut arguments = Map::new();
/// arguments.insert("user".into(), json!("ada lovelace"));
/// assert_eq!(build_path("/users/{user}/posts", &arguments), "/users/ada%20lovelace/posts");
/// ```
pub fn build_path(template: &str, variables: &Map<String, Value>) -> String {
    let mut path = template.to_string();
    for (k, v) in variables.iter() {
        let val = match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let enc = encode_path_placeholder_value(val.as_str());
        path = path.replace(&format!("{{{}}}", k), &enc);
    }
    path
}

/// Names of `{placeholder}` segments still present in `path`.
pub fn unresolved_placeholders(path: &str) -> Vec<String> {
    PLACEHOLDER_REGEX
        .captures_iter(path)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Percent-encodes a path placeholder value while preserving RFC3986 unreserved bytes.
fn encode_path_placeholder_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if is_unreserved_path_byte(byte) {
            encoded.push(byte as char);
        } else {
            encoded.push('%');
            encoded.push(to_upper_hex((byte >> 4) & 0x0f));
            encoded.push(to_upper_hex(byte & 0x0f));
        }
    }
    encoded
}

fn is_unreserved_path_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

fn to_upper_hex(nibble: u8) -> char {
    match nibble {
        0..=9 => (b'0' + nibble) as char,
        _ => (b'A' + (nibble - 10)) as char,
    }
}
