use crate::core::{DbError, Result};

/// Lowercases everything outside single-quoted regions, leaving quoted
/// literals verbatim (quotes included).
fn lower_outside_quotes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_quote = false;
    let mut quote_start = 0usize;
    let mut i = 0usize;
    while i < input.len() {
        let c = input[i..].chars().next().unwrap();
        if c == '\'' {
            if !in_quote {
                in_quote = true;
                quote_start = i;
            } else {
                in_quote = false;
                out.push_str(&input[quote_start..=i]);
            }
            i += c.len_utf8();
            continue;
        }
        if !in_quote {
            out.extend(c.to_lowercase());
        }
        i += c.len_utf8();
    }
    if in_quote {
        // Unterminated quote: keep the tail verbatim, same as a closed region would be.
        out.push_str(&input[quote_start..]);
    }
    out
}

const GLUED_KEYWORDS: &[(&str, &str)] = &[
    ("group by", "group_by"),
    ("is not null", "is_not_null"),
    ("is null", "is_null"),
    ("if not exists", "if_not_exists"),
    ("if exists", "if_exists"),
    ("rows per shard", "rows_per_shard"),
];

/// Case-folds, glues multi-word keywords, pads punctuation, and splits the
/// input into whitespace-separated tokens. Quoted literals are preserved
/// as single tokens only when they contain no internal whitespace — this
/// mirrors the reference implementation's tokenizer, which does not
/// special-case embedded spaces inside string literals.
pub fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut s = input.trim().trim_end_matches(';').to_string();
    s = lower_outside_quotes(&s);
    for (phrase, glued) in GLUED_KEYWORDS {
        s = s.replace(phrase, glued);
    }
    s = s.replace(',', " , ").replace('(', " ( ").replace(')', " ) ");

    let toks: Vec<String> = s.split_whitespace().map(|t| t.to_string()).collect();
    if toks.is_empty() {
        return Err(DbError::ParseError("empty statement".to_string()));
    }
    Ok(toks)
}
