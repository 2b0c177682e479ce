//! Comment removal that preserves line structure.
//!
//! Every newline of the input survives, including those inside removed block
//! comments, so line numbers computed on the stripped text are the line
//! numbers of the original file.

/// Block comment markers for C-family sources.
pub const C_BLOCK: (&str, &str) = ("/*", "*/");

/// Strip `//` and `/* */` comments.
pub fn strip_c(text: &str) -> String {
    strip_comments(text, "//", Some(C_BLOCK))
}

/// Strip `#` comments (Makefiles, shell fragments).
pub fn strip_make(text: &str) -> String {
    strip_comments(text, "#", None)
}

/// Remove comments from `text`.
///
/// A `line_marker` only opens a comment at the start of a line or after
/// whitespace, so markers inside literals such as `"//"` or `a#b` are kept.
/// The marker `!` never fires when followed by `=`. A block comment runs
/// from its open marker to the next close marker, or to the end of the text.
/// A space replaces a removed block when the text on both sides would
/// otherwise fuse into a new marker, which keeps stripping idempotent.
pub fn strip_comments(text: &str, line_marker: &str, block: Option<(&str, &str)>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut in_block = false;

    while let Some(ch) = rest.chars().next() {
        if in_block {
            match block {
                Some((open, close)) if rest.starts_with(close) => {
                    rest = &rest[close.len()..];
                    in_block = false;
                    // keep `/` + `*` from fusing into a new marker across the gap
                    if fuses_marker(&out, rest, open) || fuses_marker(&out, rest, line_marker) {
                        out.push(' ');
                    }
                }
                _ => {
                    if ch == '\n' {
                        out.push('\n');
                    }
                    rest = &rest[ch.len_utf8()..];
                }
            }
            continue;
        }

        if let Some((open, _)) = block {
            if rest.starts_with(open) {
                rest = &rest[open.len()..];
                in_block = true;
                continue;
            }
        }

        if !line_marker.is_empty() && rest.starts_with(line_marker) && opens_line_comment(&out, rest, line_marker) {
            // drop up to (not including) the newline
            let cut = rest.find('\n').unwrap_or(rest.len());
            rest = &rest[cut..];
            continue;
        }

        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}

fn fuses_marker(emitted: &str, rest: &str, marker: &str) -> bool {
    let Some(last) = emitted.chars().next_back() else {
        return false;
    };
    marker.len() > last.len_utf8()
        && marker.starts_with(last)
        && rest.starts_with(&marker[last.len_utf8()..])
}

fn opens_line_comment(emitted: &str, rest: &str, marker: &str) -> bool {
    let at_boundary = emitted.chars().next_back().map_or(true, char::is_whitespace);
    if !at_boundary {
        return false;
    }
    if marker == "!" && rest[marker.len()..].starts_with('=') {
        return false;
    }
    true
}
