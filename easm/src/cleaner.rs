//! Line cleanup applied before any other processing: comments go, whitespace
//! is normalized, string literals are left untouched.

/// Strip a `;` comment, trim the ends, and normalize interior whitespace.
///
/// Runs of whitespace collapse to one space, `:` and `,` are each followed by
/// exactly one space (and `,` absorbs any space before it), except inside a
/// string literal delimited by `"` or `'`, where every character survives.
pub fn clean_line(raw: &str) -> String {
    let line = match raw.find(';') {
        Some(pos) => &raw[..pos],
        None => raw,
    };

    normalize(line.trim())
}

fn normalize(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 4);
    let mut saw_space = false;
    let mut string_delim: Option<char> = None;

    for ch in line.chars() {
        if let Some(delim) = string_delim {
            out.push(ch);
            if ch == delim {
                string_delim = None;
            }
        } else if ch == ':' {
            out.push(':');
            out.push(' ');
            saw_space = true;
        } else if ch == ',' {
            if saw_space {
                out.pop();
            }
            out.push(',');
            out.push(' ');
            saw_space = true;
        } else if ch == '"' || ch == '\'' {
            string_delim = Some(ch);
            out.push(ch);
            saw_space = false;
        } else if ch.is_whitespace() {
            if !saw_space {
                out.push(' ');
                saw_space = true;
            }
        } else {
            out.push(ch);
            saw_space = false;
        }
    }

    if string_delim.is_none() {
        while out.ends_with(' ') {
            out.pop();
        }
    }

    out
}
