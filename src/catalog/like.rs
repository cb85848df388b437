use regex::Regex;

/// Compile a SQL LIKE pattern (`%` any run, `_` one character) to an anchored regex
pub fn like_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push_str("^(?s)");
    let mut literal = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut literal))),
        }
    }
    expr.push('$');
    Regex::new(&expr)
}
