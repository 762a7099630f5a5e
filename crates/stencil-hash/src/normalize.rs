//! Canonical text form used for customization detection.
//!
//! Rules, applied in order:
//!
//! 1. a leading UTF-8 byte-order mark is dropped;
//! 2. every CRLF pair becomes LF (a lone CR is left alone);
//! 3. spaces and tabs at the end of every line are removed.
//!
//! Leading whitespace, blank lines and the presence of a final newline are
//! preserved. The rules are reapplied until the output stops changing:
//! `"a\r \n"` only becomes a CRLF once the trailing space is gone, and the
//! canonical form must be a fixed point of normalization.
//!
//! Repetition means a run of CRs directly before an LF collapses entirely:
//! `"a\r\r\n"` becomes `"a\n"`, because after the first pass the second
//! CR forms a new CRLF pair. A lone CR anywhere else survives. Keeping
//! the CR would leave the canonical form non-idempotent.

const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Canonicalize raw file bytes.
///
/// Works on bytes so that files which are not valid UTF-8 still hash
/// deterministically.
pub fn normalize_bytes(input: &[u8]) -> Vec<u8> {
    let mut current = normalize_bytes_once(input);
    loop {
        let next = normalize_bytes_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_bytes_once(input: &[u8]) -> Vec<u8> {
    let input = input.strip_prefix(BOM).unwrap_or(input);

    let mut unix = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'\r' && input.get(i + 1) == Some(&b'\n') {
            unix.push(b'\n');
            i += 2;
        } else {
            unix.push(input[i]);
            i += 1;
        }
    }

    let mut out = Vec::with_capacity(unix.len());
    for (idx, line) in unix.split(|&b| b == b'\n').enumerate() {
        if idx > 0 {
            out.push(b'\n');
        }
        let keep = line
            .iter()
            .rposition(|&b| b != b' ' && b != b'\t')
            .map_or(0, |pos| pos + 1);
        out.extend_from_slice(&line[..keep]);
    }
    out
}

/// Canonicalize text. Same rules as [`normalize_bytes`].
pub fn normalize(input: &str) -> String {
    let mut current = normalize_once(input);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(input: &str) -> String {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    input
        .replace("\r\n", "\n")
        .split('\n')
        .map(|line| line.trim_end_matches([' ', '\t']))
        .collect::<Vec<_>>()
        .join("\n")
}
