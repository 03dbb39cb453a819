//! Directory names for per-file timelines

/// Percent-encode the characters that cannot appear in a single path segment
pub fn encode_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '%' => encoded.push_str("%25"),
            '/' => encoded.push_str("%2F"),
            '\\' => encoded.push_str("%5C"),
            ':' => encoded.push_str("%3A"),
            other => encoded.push(other),
        }
    }
    encoded
}

/// Reverse [`encode_path`]; `None` for a malformed escape
pub fn decode_path(encoded: &str) -> Option<String> {
    let mut decoded = String::with_capacity(encoded.len());
    let mut rest = encoded;
    while let Some(idx) = rest.find('%') {
        decoded.push_str(&rest[..idx]);
        let escape = rest.get(idx + 1..idx + 3)?;
        decoded.push(match escape.to_ascii_uppercase().as_str() {
            "25" => '%',
            "2F" => '/',
            "5C" => '\\',
            "3A" => ':',
            _ => return None,
        });
        rest = &rest[idx + 3..];
    }
    decoded.push_str(rest);
    Some(decoded)
}
