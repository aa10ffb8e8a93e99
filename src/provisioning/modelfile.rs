//! Modelfile template normalization.
//!
//! Templates edited on other platforms arrive with CRLF endings, a BOM, or
//! with several directives collapsed onto one line. The backend rejects all
//! three, so templates are normalized before upload.

/// Directives that must start a line.
const DIRECTIVES: &[&str] = &["FROM", "PARAMETER", "SYSTEM", "TEMPLATE", "ADAPTER", "LICENSE", "MESSAGE"];

/// Normalize a modelfile template.
///
/// Text inside `"""` blocks is left untouched.
pub fn normalize_modelfile(raw: &str) -> String {
    let text = raw
        .strip_prefix('\u{feff}')
        .unwrap_or(raw)
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut out = String::with_capacity(text.len() + 16);
    let mut in_block = false;
    let mut rest = text.as_str();

    while let Some(c) = rest.chars().next() {
        if rest.starts_with("\"\"\"") {
            in_block = !in_block;
            out.push_str("\"\"\"");
            rest = &rest[3..];
            continue;
        }

        if !in_block && out.ends_with([' ', '\t']) && current_line_has_content(&out) && starts_with_directive(rest) {
            let kept = out.trim_end_matches([' ', '\t']).len();
            out.truncate(kept);
            out.push('\n');
        }

        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn starts_with_directive(s: &str) -> bool {
    DIRECTIVES
        .iter()
        .any(|d| s.strip_prefix(d).is_some_and(|after| after.starts_with([' ', '\t'])))
}

fn current_line_has_content(out: &str) -> bool {
    out.rsplit('\n').next().is_some_and(|line| !line.trim().is_empty())
}
