//! One-line rendering of decode errors.

use crate::error::DecodeError;

/// Inner messages shown per union error before eliding the rest.
pub const MAX_UNION_MESSAGES: usize = 5;
const RECEIVED_PREVIEW_CHARS: usize = 80;

/// Dot-join segments, except `[N]` index segments which attach directly.
pub fn join_path(path: &[String]) -> String {
    let mut out = String::new();
    for segment in path {
        if !out.is_empty() && !segment.starts_with('[') {
            out.push('.');
        }
        out.push_str(segment);
    }
    out
}

pub fn print_errors(errors: &[DecodeError]) -> String {
    print_errors_under(errors, &[])
}

fn print_errors_under(errors: &[DecodeError], parent: &[String]) -> String {
    match errors {
        [single] => print_error(single, parent),
        _ => errors
            .iter()
            .enumerate()
            .map(|(i, e)| format!("#{i} {}", print_error(e, parent)))
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

fn print_error(error: &DecodeError, parent: &[String]) -> String {
    let mut full = parent.to_vec();
    full.extend(error.path().iter().cloned());

    match error {
        DecodeError::Regular { message, received, .. } => {
            let mut line = message.clone();
            if !full.is_empty() {
                line.push_str(" at ");
                line.push_str(&join_path(&full));
            }
            line.push_str(", received ");
            line.push_str(&received.preview(RECEIVED_PREVIEW_CHARS));
            line
        }
        DecodeError::Union { errors, received, .. } => {
            if errors.is_empty() {
                let mut line = "no union member matched".to_string();
                if !full.is_empty() {
                    line.push_str(" at ");
                    line.push_str(&join_path(&full));
                }
                line.push_str(", received ");
                line.push_str(&received.preview(RECEIVED_PREVIEW_CHARS));
                return line;
            }
            let mut line = errors
                .iter()
                .take(MAX_UNION_MESSAGES)
                .map(|e| print_error(e, &full))
                .collect::<Vec<_>>()
                .join(" OR ");
            if errors.len() > MAX_UNION_MESSAGES {
                line.push_str(" and more...");
            }
            line
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn seg(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn index_segments_are_not_dot_joined() {
        assert_eq!(join_path(&seg(&["a", "[0]", "b", "[1]", "[2]"])), "a[0].b[1][2]");
        assert_eq!(join_path(&seg(&["[3]", "x"])), "[3].x");
    }

    #[test]
    fn single_error_has_no_numbering() {
        let e = DecodeError::regular("expected number", seg(&["b"]), Value::Undefined);
        assert_eq!(print_errors(&[e]), "expected number at b, received undefined");
    }

    #[test]
    fn multiple_errors_are_numbered_and_piped() {
        let errors = vec![
            DecodeError::regular("expected string", seg(&["a"]), Value::Number(1.0)),
            DecodeError::regular("expected number", seg(&["b"]), Value::Null),
        ];
        assert_eq!(
            print_errors(&errors),
            "#0 expected string at a, received 1 | #1 expected number at b, received null"
        );
    }

    #[test]
    fn union_errors_join_branches_and_elide_after_five() {
        let inner = (0..7)
            .map(|i| DecodeError::regular(format!("m{i}"), seg(&["x"]), Value::Null))
            .collect::<Vec<_>>();
        let e = DecodeError::union(seg(&["u"]), Value::Null, inner);
        let out = print_errors(&[e]);
        assert!(out.starts_with("m0 at u.x, received null OR m1 at u.x"));
        assert_eq!(out.matches(" OR ").count(), 4);
        assert!(out.ends_with(" and more..."));
    }
}
