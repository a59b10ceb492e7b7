//! Markdown to [`DocumentRecord`] conversion.
//!
//! Everything here is a pure text transformation except [`process_batch`],
//! which reads files through a [`Repository`]. Cleaning runs as a fixed
//! sequence of whole-document rewrites:
//!
//! 1. fenced code blocks and inline code spans are dropped
//! 2. HTML comments, then HTML tag markup (enclosed text survives)
//! 3. images, alt text included
//! 4. links collapse to their text, then HTML is stripped once more
//! 5. horizontal rules and list-item markers
//! 6. whitespace normalization

use anyhow::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::models::DocumentRecord;
use crate::repository::Repository;

static FRONTMATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A(?:\u{feff})?---[ \t]*\r?\n((?s:.*?))\r?\n?---[ \t]*(?:\r?\n|\z)").unwrap()
});
static TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+(.+?)[ \t]*$").unwrap());
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+(.+?)[ \t]*$").unwrap());

static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"``[^\n]*?``|`[^`\n]*`").unwrap());
static HTML_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?/?>").unwrap());
static IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
static HORIZONTAL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$").unwrap());
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)(?:[*+-]|\d+\.)(?:[ \t]+|$)").unwrap());
static TRAILING_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)[ \t]+$").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// `source::relative_path`.
pub fn generate_id(source: &str, relative_path: &str) -> String {
    format!("{}::{}", source, relative_path)
}

/// Split a leading `---` delimited block into a flat key/value map.
///
/// Returns the parsed map and the remaining body. Lines without a colon are
/// ignored; surrounding quotes on values are stripped.
pub fn parse_frontmatter(markdown: &str) -> (BTreeMap<String, String>, &str) {
    let Some(caps) = FRONTMATTER.captures(markdown) else {
        return (BTreeMap::new(), markdown);
    };

    let mut metadata = BTreeMap::new();
    for line in caps[1].lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || key.starts_with('#') {
            continue;
        }
        metadata.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
    (metadata, &markdown[end..])
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// First level-1 heading, if any.
pub fn extract_title(markdown: &str) -> Option<String> {
    let text = strip_fences(markdown);
    TITLE
        .captures(&text)
        .map(|c| strip_closing_hashes(&c[1]))
        .filter(|t| !t.is_empty())
}

/// All level 1-6 headings in document order, markers stripped.
pub fn extract_headings(markdown: &str) -> Vec<String> {
    let text = strip_fences(markdown);
    HEADING
        .captures_iter(&text)
        .map(|c| strip_closing_hashes(&c[1]))
        .filter(|h| !h.is_empty())
        .collect()
}

fn strip_closing_hashes(heading: &str) -> String {
    heading.trim_end_matches('#').trim_end().to_string()
}

/// Title derived from the last path segment: extension dropped, `-`/`_`
/// turned into spaces, first letter capitalized.
pub fn title_from_path(relative_path: &str) -> String {
    let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    let stem = file_name.strip_suffix(".md").unwrap_or(file_name);
    let spaced = stem.replace(['-', '_'], " ");

    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Opening or closing fence marker on `line`: fence char, run length, and
/// the text after the run.
fn fence_marker(line: &str) -> Option<(char, usize, &str)> {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = trimmed.chars().take_while(|c| *c == marker).count();
    if run < 3 {
        return None;
    }
    Some((marker, run, &trimmed[run..]))
}

/// Drop fenced code blocks, fence lines included.
///
/// A fence closes only on a bare run of the same character at least as long
/// as the opening run. An unterminated fence runs to the end of the text.
fn strip_fences(markdown: &str) -> String {
    let mut kept = Vec::new();
    let mut open: Option<(char, usize)> = None;

    for line in markdown.lines() {
        match open {
            None => match fence_marker(line) {
                // a backtick info string cannot contain backticks
                Some((marker, run, info)) if !(marker == '`' && info.contains('`')) => {
                    open = Some((marker, run))
                }
                _ => kept.push(line),
            },
            Some((marker, run)) => {
                let closes = matches!(
                    fence_marker(line),
                    Some((m, r, rest)) if m == marker && r >= run && rest.trim().is_empty()
                );
                if closes {
                    open = None;
                }
            }
        }
    }

    kept.join("\n")
}

/// Remove HTML comments and tags until none are left, so markup split
/// around a tag cannot reassemble into a new one.
fn strip_html(text: &str) -> String {
    let mut text = text.to_string();
    loop {
        let next = HTML_COMMENT.replace_all(&text, "");
        let next = HTML_TAG.replace_all(&next, "").into_owned();
        if next == text {
            return text;
        }
        text = next;
    }
}

/// Reduce markdown to plain searchable text.
pub fn clean_content(markdown: &str) -> String {
    // 1. code
    let text = strip_fences(markdown);
    let text = INLINE_CODE.replace_all(&text, "");

    // 2. html
    let text = strip_html(&text);

    // 3-4. images, links; link text may complete a tag, so strip again
    let text = IMAGE.replace_all(&text, "");
    let text = LINK.replace_all(&text, "$1");
    let text = strip_html(&text);

    // 5. rules, then list markers until nested markers are gone
    let mut text = HORIZONTAL_RULE.replace_all(&text, "").into_owned();
    loop {
        let next = LIST_MARKER.replace_all(&text, "$1").into_owned();
        if next == text {
            break;
        }
        text = next;
    }

    // 6. whitespace
    let text = TRAILING_SPACE.replace_all(&text, "");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    let text = SPACE_RUN.replace_all(&text, " ");
    text.trim().to_string()
}

/// Build a record from raw markdown.
///
/// The title is the first `#` heading anywhere in the body, while `headings`
/// lists every level in document order. `headings[0] == title` therefore
/// only holds when no lower-level heading precedes that H1.
///
/// `path` is the working-copy-relative location; `source_metadata` is the
/// source's configured metadata, overridden by frontmatter and then by the
/// computed `path`, `relative_path` and `source` fields.
pub fn process_document(
    markdown: &str,
    source: &str,
    relative_path: &str,
    path: &str,
    source_metadata: &BTreeMap<String, String>,
) -> DocumentRecord {
    let (frontmatter, body) = parse_frontmatter(markdown);

    let title = extract_title(body).unwrap_or_else(|| title_from_path(relative_path));
    let headings = extract_headings(body);
    let content = clean_content(body);

    let mut metadata = source_metadata.clone();
    metadata.extend(frontmatter);
    metadata.insert("path".to_string(), path.to_string());
    metadata.insert("relative_path".to_string(), relative_path.to_string());
    metadata.insert("source".to_string(), source.to_string());

    DocumentRecord {
        id: generate_id(source, relative_path),
        source: source.to_string(),
        path: path.to_string(),
        relative_path: relative_path.to_string(),
        title,
        headings,
        content,
        metadata,
    }
}

/// Read and process each file. Missing or unreadable files are skipped.
pub fn process_batch(repository: &Repository, files: &[String]) -> Result<Vec<DocumentRecord>> {
    let source = repository.source();
    let mut records = Vec::with_capacity(files.len());

    for relative_path in files {
        let Some(markdown) = repository.read_file(relative_path)? else {
            tracing::debug!(source = %source.name, file = %relative_path, "file skipped");
            continue;
        };
        records.push(process_document(
            &markdown,
            &source.name,
            relative_path,
            &repository.repository_path(relative_path),
            &source.metadata,
        ));
    }

    Ok(records)
}
