//! Translation of user queries into FTS5 match expressions.
//!
//! User input never reaches FTS5 verbatim: every term is emitted as a
//! quoted string so operators and punctuation lose their syntactic meaning.
//! Quoted phrases in the input stay phrases.
//!
//! | Mode | `rust "error handling" ok` |
//! |------|----------------------------|
//! | exact | `"rust" "error handling" "ok"` (all must match) |
//! | fuzzy | `"rust"* OR "error handling" OR "ok"` |

/// Unquoted tokens at least this long become prefix matches in fuzzy mode.
pub const FUZZY_MIN_PREFIX_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTerm {
    Word(String),
    Phrase(String),
}

/// Split on whitespace, keeping `"..."` spans together. An unterminated
/// quote runs to the end of the input.
pub fn tokenize(query: &str) -> Vec<QueryTerm> {
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut chars = query.chars();

    while let Some(c) = chars.next() {
        if c == '"' {
            push_word(&mut terms, &mut current);
            let phrase: String = chars.by_ref().take_while(|&ch| ch != '"').collect();
            let phrase = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
            if has_searchable_text(&phrase) {
                terms.push(QueryTerm::Phrase(phrase));
            }
        } else if c.is_whitespace() {
            push_word(&mut terms, &mut current);
        } else {
            current.push(c);
        }
    }
    push_word(&mut terms, &mut current);

    terms
}

fn push_word(terms: &mut Vec<QueryTerm>, current: &mut String) {
    if has_searchable_text(current) {
        terms.push(QueryTerm::Word(std::mem::take(current)));
    } else {
        current.clear();
    }
}

/// Terms made only of punctuation produce no tokens and are dropped.
fn has_searchable_text(s: &str) -> bool {
    s.chars().any(char::is_alphanumeric)
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Build the MATCH expression, or `None` when nothing searchable remains.
pub fn build_match_expression(query: &str, fuzzy: bool) -> Option<String> {
    let terms = tokenize(query);
    if terms.is_empty() {
        return None;
    }

    let parts: Vec<String> = terms
        .iter()
        .map(|term| match term {
            QueryTerm::Phrase(p) => quote(p),
            QueryTerm::Word(w) if fuzzy && w.chars().count() >= FUZZY_MIN_PREFIX_LEN => {
                format!("{}*", quote(w))
            }
            QueryTerm::Word(w) => quote(w),
        })
        .collect();

    let separator = if fuzzy { " OR " } else { " " };
    Some(parts.join(separator))
}
