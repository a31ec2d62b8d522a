//! Recommendations text parser.
//!
//! The report service returns its AI-written recommendations as one
//! free-text blob with markdown-style section headers ("**Solar Energy:**")
//! and bullet items. The parser derives ordered, titled sections; output is
//! recomputed from the blob on every render and never persisted.

use serde::{Deserialize, Serialize};

/// Leading title line the service sometimes prepends to the blob.
const TITLE_MARKER: &str = "AI Recommendations";

/// A titled group of recommendation items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationSection {
    pub title: String,
    pub items: Vec<String>,
}

/// Split a recommendations blob into sections.
///
/// Lines are trimmed and blanks dropped. A header line opens a section;
/// any other line becomes an item of the currently open section, with a
/// single leading `*` or `-` bullet marker (plus following whitespace)
/// stripped. Lines before the first header are discarded and a section
/// with zero items is never emitted.
pub fn parse(text: &str) -> Vec<RecommendationSection> {
    let mut sections = Vec::new();
    let mut open: Option<RecommendationSection> = None;

    let lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    for (index, line) in lines.enumerate() {
        if index == 0 && line.contains(TITLE_MARKER) {
            continue;
        }
        if let Some(title) = header_title(line) {
            if let Some(section) = open.take() {
                if !section.items.is_empty() {
                    sections.push(section);
                }
            }
            open = Some(RecommendationSection {
                title,
                items: Vec::new(),
            });
        } else if let Some(section) = open.as_mut() {
            section.items.push(strip_bullet(line).to_string());
        }
    }

    if let Some(section) = open {
        if !section.items.is_empty() {
            sections.push(section);
        }
    }
    sections
}

/// A header is a trimmed line wrapped in a doubled emphasis marker and
/// ending in a colon, in either "**Title:**" or "**Title**:" form.
fn header_title(line: &str) -> Option<String> {
    if !line.starts_with("**") {
        return None;
    }
    if !(line.ends_with(":**") || line.ends_with("**:")) {
        return None;
    }
    let title = line
        .trim_start_matches('*')
        .trim_end_matches(|c| c == '*' || c == ':')
        .trim();
    Some(title.to_string())
}

fn strip_bullet(line: &str) -> &str {
    match line.strip_prefix('*').or_else(|| line.strip_prefix('-')) {
        Some(rest) => rest.trim_start(),
        None => line,
    }
}
