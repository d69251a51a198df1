//! Case conversion for schema names: declared type name (PascalCase) -> collection name (snake_case, plural).

/// Convert a single identifier from PascalCase/camelCase to snake_case.
/// e.g. "BigCompany" -> "big_company", "HTTPServer" -> "http_server"
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).and_then(|p| chars.get(p));
            let next = chars.get(i + 1);
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c == '-' || c == ' ' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// English plural of a snake_case word (last segment only).
/// e.g. "company" -> "companies", "address" -> "addresses", "day" -> "days"
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|b| !"aeiou".contains(b)) {
            return format!("{}ies", stem);
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|suf| lower.ends_with(suf)) {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

/// Collection name (storage namespace and URL segment) for a declared schema name.
pub fn collection_name(schema_name: &str) -> String {
    pluralize(&to_snake_case(schema_name.trim()))
}
