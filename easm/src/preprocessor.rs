//! The macro preprocessor: collects `mcro`/`mcroend` definitions and splices
//! macro bodies in at each call site, producing the text the first pass reads.
//!
//! Unlike the passes, preprocessing stops at the first problem: a broken
//! macro definition poisons everything after it.

use crate::cleaner::clean_line;
use crate::symbols::{is_legal_name, is_reserved};
use crate::{Diagnostic, Stage};
use ecpu::constants::{MAX_LABEL_LENGTH, MAX_LINE_LENGTH};
use std::collections::HashMap;

const MACRO_START: &str = "mcro";
const MACRO_END: &str = "mcroend";

struct Macro {
    body: String,
    /// Line (in the cleaned stream) of the `mcro` header.
    line: usize,
}

struct OpenMacro {
    name: String,
    line: usize,
    body: String,
}

/// Expand macros in `source`, returning the cleaned text the first pass
/// consumes. Line numbers in errors refer to the cleaned stream, which drops
/// blank and comment-only lines.
pub fn expand(source: &str) -> Result<String, Diagnostic> {
    let mut cleaned = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        if raw.chars().count() > MAX_LINE_LENGTH {
            return Err(error(format!(
                "line {} exceeds the maximum length of {} characters",
                index + 1,
                MAX_LINE_LENGTH
            )));
        }

        let line = clean_line(raw);
        if !line.is_empty() {
            cleaned.push(line);
        }
    }

    let mut macros: HashMap<String, Macro> = HashMap::new();
    let mut open: Option<OpenMacro> = None;
    let mut out = String::new();

    for (index, line) in cleaned.iter().enumerate() {
        let line_number = index + 1;
        let mut tokens = line.split_whitespace();
        let first = match tokens.next() {
            Some(token) => token,
            None => continue,
        };

        if first == MACRO_END {
            let finished = match open.take() {
                Some(finished) => finished,
                None => {
                    return Err(error(format!(
                        "{} without an open macro definition at line {}",
                        MACRO_END, line_number
                    )));
                }
            };
            if tokens.next().is_some() {
                return Err(error(format!(
                    "extra text after {} at line {}",
                    MACRO_END, line_number
                )));
            }

            macros.insert(
                finished.name,
                Macro {
                    body: finished.body,
                    line: finished.line,
                },
            );
            continue;
        }

        // inside a definition every other line is body text, kept verbatim
        if let Some(open) = open.as_mut() {
            open.body.push_str(line);
            open.body.push('\n');
            continue;
        }

        if first == MACRO_START {
            let name = match tokens.next() {
                Some(name) => name,
                None => {
                    return Err(error(format!(
                        "macro definition without a name at line {}",
                        line_number
                    )));
                }
            };
            if tokens.next().is_some() {
                return Err(error(format!(
                    "extra text after macro name at line {}",
                    line_number
                )));
            }
            if !is_legal_name(name)
                || is_reserved(name)
                || name.chars().count() > MAX_LABEL_LENGTH
            {
                return Err(error(format!(
                    "illegal name '{}' for a macro at line {}",
                    name, line_number
                )));
            }
            if let Some(existing) = macros.get(name) {
                return Err(error(format!(
                    "duplicate macro '{}' at line {}, first defined at line {}",
                    name, line_number, existing.line
                )));
            }

            open = Some(OpenMacro {
                name: name.to_owned(),
                line: line_number,
                body: String::new(),
            });
            continue;
        }

        // a call site is a known macro name alone on the line; the scan order
        // guarantees the definition came earlier in the file
        if let Some(called) = macros.get(first) {
            if tokens.next().is_some() {
                return Err(error(format!(
                    "extra text after call to macro '{}' at line {}",
                    first, line_number
                )));
            }

            out.push_str(&called.body);
            continue;
        }

        // a label may prefix a call site; the label survives, the call expands
        if first.len() > 1 && first.ends_with(':') {
            if let Some(second) = tokens.next() {
                if let Some(called) = macros.get(second) {
                    if tokens.next().is_some() {
                        return Err(error(format!(
                            "extra text after call to macro '{}' at line {}",
                            second, line_number
                        )));
                    }

                    out.push_str(first);
                    out.push(' ');
                    out.push_str(&called.body);
                    continue;
                }
            }
        }

        out.push_str(line);
        out.push('\n');
    }

    if let Some(open) = open {
        return Err(error(format!(
            "macro '{}' opened at line {} is missing {}",
            open.name, open.line, MACRO_END
        )));
    }

    Ok(out)
}

fn error(message: String) -> Diagnostic {
    Diagnostic::error(Stage::Preprocessor, message)
}

#[cfg(test)]
mod test {
    use super::expand;

    #[test]
    fn plain_text_is_cleaned_and_copied() {
        let out = expand("  mov  r1 , r2 ; comment\n\nstop\n").unwrap();
        assert_eq!(out, "mov r1, r2\nstop\n");
    }

    #[test]
    fn expands_a_macro_body_verbatim() {
        let source = "mcro twice\ninc r1\ninc r1\nmcroend\ntwice\nstop\ntwice\n";
        let out = expand(source).unwrap();
        assert_eq!(out, "inc r1\ninc r1\nstop\ninc r1\ninc r1\n");
    }

    #[test]
    fn label_prefixed_call_keeps_the_label() {
        let source = "mcro m\nstop\nmcroend\nEND: m\n";
        assert_eq!(expand(source).unwrap(), "END: stop\n");
    }

    #[test]
    fn unknown_name_is_just_a_line() {
        assert_eq!(expand("twice\n").unwrap(), "twice\n");
    }

    #[test]
    fn duplicate_macro_is_fatal() {
        let source = "mcro m\nstop\nmcroend\nmcro m\nrts\nmcroend\n";
        let err = expand(source).unwrap_err();
        assert!(err.message.contains("duplicate macro 'm'"));
    }

    #[test]
    fn header_errors() {
        assert!(expand("mcro\n").is_err());
        assert!(expand("mcro m extra\nmcroend\n").is_err());
        assert!(expand("mcro mov\nmcroend\n").is_err());
        assert!(expand("mcro 1m\nmcroend\n").is_err());
    }

    #[test]
    fn end_errors() {
        assert!(expand("mcroend\n").is_err());
        assert!(expand("mcro m\nstop\nmcroend extra\n").is_err());
    }

    #[test]
    fn call_with_extra_text_is_fatal() {
        let source = "mcro m\nstop\nmcroend\nm r1\n";
        assert!(expand(source).is_err());
    }

    #[test]
    fn unterminated_macro_is_fatal() {
        let err = expand("mcro m\nstop\n").unwrap_err();
        assert!(err.message.contains("missing mcroend"));
    }

    #[test]
    fn macro_keywords_inside_a_body_are_body_text() {
        let source = "mcro outer\nmcro inner\nmcroend\nouter\n";
        // the inner "mcro inner" line is plain body text; the single mcroend
        // closes `outer`, so the call emits it verbatim
        assert_eq!(expand(source).unwrap(), "mcro inner\n");
    }

    #[test]
    fn over_long_lines_are_rejected() {
        let long = "a".repeat(81);
        assert!(expand(&long).is_err());
        assert!(expand(&"a".repeat(80)).is_ok());
    }
}
