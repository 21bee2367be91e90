use once_cell::sync::Lazy;
use regex::Regex;

pub mod http;
mod path_processing;

pub use http::*;
pub use path_processing::expand_tilde;

static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: )([\w\-\.=:/+]+)",
        r"(?i)([A-Z0-9_]*?(KEY|TOKEN|SECRET|PASSWORD)=)([^\s&]+)",
        r#"(?i)("(?:access_token|api_key|password|secret)"\s*:\s*)("[^"]*")"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("redaction regex should compile"))
    .collect()
});

/// Redacts values that look like secrets in a string.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for re in SENSITIVE_PATTERNS.iter() {
        redacted = re
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::redact_sensitive;

    #[test]
    fn redacts_tokens_in_query_strings_and_json_bodies() {
        let line = redact_sensitive("GET /users?API_KEY=abc123&page=2");
        assert_eq!(line, "GET /users?API_KEY=<redacted>&page=2");

        let body = redact_sensitive(r#"{"user":"ada","access_token":"s3cr3t"}"#);
        assert_eq!(body, r#"{"user":"ada","access_token":<redacted>}"#);

        let header = redact_sensitive("Authorization: Bearer");
        assert_eq!(header, "Authorization: <redacted>");
    }
}
