//! Markdown segmentation into heading-delimited sections.
//!
//! A section is an ATX heading line plus every line up to the next heading
//! of any level. Lines before the first heading form the level-0 preamble.
//! Segmentation is lossless: [`render_sections`] over the output of
//! [`parse_sections`] reproduces the input exactly.

use crate::error::{ParseError, ParseResult};

/// One section of a markdown document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkdownSection {
    /// The heading line exactly as written; empty for the preamble.
    pub header_line: String,
    /// Heading text without markers or closing hashes.
    pub title: String,
    /// Number of `#` characters; 0 for the preamble.
    pub level: u8,
    /// 1-based line number of the heading (or of the first preamble line).
    pub line_start: usize,
    /// Lines after the heading, up to the next heading.
    pub body_lines: Vec<String>,
}

impl MarkdownSection {
    /// Returns `true` for content before the first heading.
    pub fn is_preamble(&self) -> bool {
        self.level == 0
    }

    /// Body text, lines joined with `\n`.
    pub fn body(&self) -> String {
        self.body_lines.join("\n")
    }

    /// Body with trailing blank lines removed, for comparisons and marker
    /// blocks.
    pub fn body_content(&self) -> String {
        let (content, _) = split_trailing_blank(&self.body_lines);
        content.join("\n")
    }

    /// Number of blank lines that end the body.
    pub fn trailing_blank_lines(&self) -> usize {
        split_trailing_blank(&self.body_lines).1
    }

    /// Heading text normalized for exact matching.
    pub fn match_key(&self) -> String {
        self.title.trim().to_lowercase()
    }

    /// The section as text, without a final newline.
    pub fn render(&self) -> String {
        if self.is_preamble() {
            return self.body();
        }
        if self.body_lines.is_empty() {
            self.header_line.clone()
        } else {
            format!("{}\n{}", self.header_line, self.body())
        }
    }

    /// A copy of this heading carrying a different body.
    pub fn with_body(&self, body_lines: Vec<String>) -> Self {
        Self {
            body_lines,
            ..self.clone()
        }
    }
}

/// Split trailing blank lines off a body.
pub(crate) fn split_trailing_blank(lines: &[String]) -> (&[String], usize) {
    let keep = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(0, |pos| pos + 1);
    (&lines[..keep], lines.len() - keep)
}

/// Parse heading level and title from an ATX heading line.
///
/// Up to three spaces of indentation are allowed; the `#` run (1 to 6) must
/// be followed by whitespace or the end of the line.
pub(crate) fn heading(line: &str) -> Option<(u8, String)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let hashes = rest.len() - rest.trim_start_matches('#').len();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let after = &rest[hashes..];
    if !(after.is_empty() || after.starts_with(' ') || after.starts_with('\t')) {
        return None;
    }
    let mut title = after.trim();
    // Optional closing sequence: "## Title ##".
    let without_closing = title.trim_end_matches('#');
    if without_closing.len() < title.len()
        && (without_closing.is_empty() || without_closing.ends_with([' ', '\t']))
    {
        title = without_closing.trim_end();
    }
    Some((hashes as u8, title.to_string()))
}

/// Code fence opener: fence character and run length.
fn fence(line: &str) -> Option<(char, usize)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let ch = rest.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let run = rest.len() - rest.trim_start_matches(ch).len();
    if run < 3 {
        return None;
    }
    // Backtick fences may not contain backticks in their info string.
    if ch == '`' && rest[run..].contains('`') {
        return None;
    }
    Some((ch, run))
}

fn closes_fence(line: &str, open: (char, usize)) -> bool {
    match fence(line) {
        Some((ch, run)) => {
            let rest = line.trim();
            ch == open.0 && run >= open.1 && rest.len() == run
        }
        None => false,
    }
}

/// Split a document into sections.
///
/// Lines inside fenced code blocks are never headings. A fence that is
/// still open at the end of the document is a parse failure.
pub fn parse_sections(text: &str) -> ParseResult<Vec<MarkdownSection>> {
    let mut sections = Vec::new();
    let mut current = MarkdownSection {
        header_line: String::new(),
        title: String::new(),
        level: 0,
        line_start: 1,
        body_lines: Vec::new(),
    };
    let mut open_fence: Option<((char, usize), usize)> = None;

    for (idx, line) in text.split('\n').enumerate() {
        let line_no = idx + 1;
        if let Some((open, _)) = open_fence {
            if closes_fence(line, open) {
                open_fence = None;
            }
            current.body_lines.push(line.to_string());
            continue;
        }
        if let Some(opened) = fence(line) {
            open_fence = Some((opened, line_no));
            current.body_lines.push(line.to_string());
            continue;
        }
        if let Some((level, title)) = heading(line) {
            // An empty preamble (document starts with a heading) is dropped.
            if !(current.is_preamble() && current.body_lines.is_empty()) {
                sections.push(current);
            }
            current = MarkdownSection {
                header_line: line.to_string(),
                title,
                level,
                line_start: line_no,
                body_lines: Vec::new(),
            };
            continue;
        }
        current.body_lines.push(line.to_string());
    }

    if let Some((_, line)) = open_fence {
        return Err(ParseError::UnterminatedFence { line });
    }
    sections.push(current);
    Ok(sections)
}

/// Join sections back into a document.
pub fn render_sections(sections: &[MarkdownSection]) -> String {
    sections
        .iter()
        .map(MarkdownSection::render)
        .collect::<Vec<_>>()
        .join("\n")
}
