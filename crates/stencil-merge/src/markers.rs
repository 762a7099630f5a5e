//! Three-part conflict marker blocks.
//!
//! ```text
//! <<<<<<< Current (<base label>)
//! <current>
//! ||||||| Base
//! <base>
//! =======
//! <incoming>
//! >>>>>>> Incoming (<incoming label>)
//! ```
//!
//! Each marker is a seven-character run of a distinct character, so a
//! line-oriented scanner can find block boundaries without parsing markdown.
//! The format is consumed by editors and by [`scan_conflict_blocks`]; it
//! must not change.

/// Opens a block; followed by the current side.
pub const CURRENT_MARKER: &str = "<<<<<<<";
/// Starts the base side.
pub const BASE_MARKER: &str = "|||||||";
/// Starts the incoming side.
pub const SEPARATOR_MARKER: &str = "=======";
/// Closes a block.
pub const INCOMING_MARKER: &str = ">>>>>>>";
/// Base side when no base version is known at all.
pub const NO_BASE_PLACEHOLDER: &str = "(no base version)";

/// Render one conflict block, without a trailing newline.
///
/// `base` is `None` when no base version exists (fresh or undetected
/// installs); the base side then carries [`NO_BASE_PLACEHOLDER`] so it can
/// be told apart from a base that was genuinely empty. Empty sides
/// contribute no lines.
pub fn render_conflict_block(
    current: &str,
    base: Option<&str>,
    incoming: &str,
    base_label: &str,
    incoming_label: &str,
) -> String {
    let current_open = format!("{CURRENT_MARKER} Current ({base_label})");
    let incoming_close = format!("{INCOMING_MARKER} Incoming ({incoming_label})");
    let base_open = format!("{BASE_MARKER} Base");

    let mut lines: Vec<&str> = vec![current_open.as_str()];
    if !current.is_empty() {
        lines.push(current);
    }
    lines.push(base_open.as_str());
    match base {
        Some("") => {}
        Some(text) => lines.push(text),
        None => lines.push(NO_BASE_PLACEHOLDER),
    }
    lines.push(SEPARATOR_MARKER);
    if !incoming.is_empty() {
        lines.push(incoming);
    }
    lines.push(incoming_close.as_str());
    lines.join("\n")
}

/// Location of one conflict block, as 1-based line numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConflictBlock {
    /// The `<<<<<<<` line.
    pub start_line: usize,
    /// The `|||||||` line, if the block has a base side.
    pub base_line: Option<usize>,
    /// The `=======` line.
    pub separator_line: usize,
    /// The `>>>>>>>` line.
    pub end_line: usize,
}

fn is_marker(line: &str, marker: &str) -> bool {
    let line = line.trim_end_matches('\r');
    line == marker
        || line
            .strip_prefix(marker)
            .is_some_and(|rest| rest.starts_with(' '))
}

/// Find every complete conflict block in `text`.
///
/// Incomplete blocks (an opener without a separator and closer) are
/// skipped. A new opener inside a block restarts the search there.
pub fn scan_conflict_blocks(text: &str) -> Vec<ConflictBlock> {
    let mut blocks = Vec::new();
    let mut start: Option<usize> = None;
    let mut base_line = None;
    let mut separator = None;

    for (idx, line) in text.split('\n').enumerate() {
        let line_no = idx + 1;
        if is_marker(line, CURRENT_MARKER) {
            start = Some(line_no);
            base_line = None;
            separator = None;
            continue;
        }
        let Some(open) = start else { continue };
        if separator.is_none() && base_line.is_none() && is_marker(line, BASE_MARKER) {
            base_line = Some(line_no);
        } else if separator.is_none() && line.trim_end_matches('\r') == SEPARATOR_MARKER {
            separator = Some(line_no);
        } else if let (Some(sep), true) = (separator, is_marker(line, INCOMING_MARKER)) {
            blocks.push(ConflictBlock {
                start_line: open,
                base_line,
                separator_line: sep,
                end_line: line_no,
            });
            start = None;
            base_line = None;
            separator = None;
        }
    }
    blocks
}

/// Returns `true` if `text` contains at least one complete conflict block.
pub fn has_conflict_markers(text: &str) -> bool {
    !scan_conflict_blocks(text).is_empty()
}
