use crate::issue::{IssueCode, RawIssue};
use serde_json::Value;

fn unit(origin: &str) -> Option<&'static str> {
    match origin {
        "string" => Some("characters"),
        "array" | "set" => Some("items"),
        "object" | "record" => Some("keys"),
        "file" => Some("bytes"),
        _ => None,
    }
}

fn bound(issue: &RawIssue, value: f64, small: bool) -> String {
    let origin = issue.origin.as_deref().unwrap_or("value");
    let exact = issue.properties.exact.unwrap_or(false);
    let inclusive = issue.properties.inclusive.unwrap_or(true);
    let adj = match (exact, small, inclusive) {
        (true, _, _) => "exactly ",
        (false, true, true) => ">=",
        (false, true, false) => ">",
        (false, false, true) => "<=",
        (false, false, false) => "<",
    };
    let head = if small { "Too small" } else { "Too big" };

    match unit(origin) {
        Some(unit) => format!("{}: expected {} to have {}{} {}", head, origin, adj, value, unit),
        None => format!("{}: expected {} to be {}{}", head, origin, adj, value),
    }
}

fn stringify(value: &Value) -> String {
    value.to_string()
}

fn quoted(keys: &[String]) -> String {
    keys.iter()
        .map(|key| format!("\"{}\"", key))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The English message used when no customizer produced one.
pub fn default_message(issue: &RawIssue) -> String {
    let props = &issue.properties;
    match issue.code {
        IssueCode::InvalidType => format!(
            "Invalid input: expected {}, received {}",
            props.expected.as_deref().unwrap_or("value"),
            props.received.as_deref().unwrap_or("unknown"),
        ),
        IssueCode::TooSmall => bound(issue, props.minimum.unwrap_or_default(), true),
        IssueCode::TooBig => bound(issue, props.maximum.unwrap_or_default(), false),
        IssueCode::InvalidFormat => {
            let format = props.format.as_deref().unwrap_or("format");
            match (format, props.pattern.as_deref()) {
                ("regex", Some(pattern)) => {
                    format!("Invalid string: must match pattern /{}/", pattern)
                }
                ("starts_with", Some(prefix)) => {
                    format!("Invalid string: must start with \"{}\"", prefix)
                }
                ("ends_with", Some(suffix)) => {
                    format!("Invalid string: must end with \"{}\"", suffix)
                }
                ("includes", Some(needle)) => {
                    format!("Invalid string: must include \"{}\"", needle)
                }
                (format, _) => format!("Invalid {}", format),
            }
        }
        IssueCode::NotMultipleOf => format!(
            "Invalid number: must be a multiple of {}",
            props.divisor.unwrap_or(1.0)
        ),
        IssueCode::InvalidValue => {
            let options = props.options.as_deref().unwrap_or(&[]);
            if options.len() == 1 {
                format!("Invalid input: expected {}", stringify(&options[0]))
            } else {
                format!(
                    "Invalid option: expected one of {}",
                    options.iter().map(stringify).collect::<Vec<_>>().join("|")
                )
            }
        }
        IssueCode::InvalidUnion => match props.note.as_deref() {
            Some(note) => format!("Invalid input: {}", note),
            None => "Invalid input".to_owned(),
        },
        IssueCode::InvalidXor => format!(
            "Invalid input: expected exactly one option to match, {} matched",
            props.match_count.unwrap_or_default()
        ),
        IssueCode::UnrecognizedKeys => {
            let keys = props.keys.as_deref().unwrap_or(&[]);
            let noun = if keys.len() == 1 { "key" } else { "keys" };
            format!("Unrecognized {}: {}", noun, quoted(keys))
        }
        IssueCode::InvalidKey => format!(
            "Invalid key in {}",
            issue.origin.as_deref().unwrap_or("object")
        ),
        IssueCode::InvalidElement => format!(
            "Invalid value in {}",
            issue.origin.as_deref().unwrap_or("collection")
        ),
        IssueCode::Custom => "Invalid input".to_owned(),
        IssueCode::NonoptionalViolation => "Invalid input: value is required".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn size_messages_name_the_unit() {
        let issue = RawIssue::too_small("string", 3.0, true, &json!("a"));
        assert_eq!(
            "Too small: expected string to have >=3 characters",
            default_message(&issue)
        );

        let mut issue = RawIssue::too_big("array", 2.0, true, &json!([1, 2, 3]));
        issue.properties.exact = Some(true);
        assert_eq!(
            "Too big: expected array to have exactly 2 items",
            default_message(&issue)
        );
    }

    #[test]
    fn numeric_bounds_have_no_unit() {
        let issue = RawIssue::too_big("number", 10.5, false, &json!(11));
        assert_eq!("Too big: expected number to be <10.5", default_message(&issue));
    }

    #[test]
    fn value_messages() {
        let single = RawIssue::invalid_value(vec![json!("a")], &json!("b"));
        assert_eq!("Invalid input: expected \"a\"", default_message(&single));

        let many = RawIssue::invalid_value(vec![json!("a"), json!(1)], &json!("b"));
        assert_eq!("Invalid option: expected one of \"a\"|1", default_message(&many));
    }

    #[test]
    fn unrecognized_keys_pluralizes() {
        let one = RawIssue::unrecognized_keys(vec!["x".to_owned()], &json!({}));
        assert_eq!("Unrecognized key: \"x\"", default_message(&one));

        let two = RawIssue::unrecognized_keys(vec!["x".to_owned(), "y".to_owned()], &json!({}));
        assert_eq!("Unrecognized keys: \"x\", \"y\"", default_message(&two));
    }

    #[test]
    fn regex_message_shows_pattern() {
        let mut issue = RawIssue::invalid_format("regex", &json!("x"));
        issue.properties.pattern = Some("^a+$".to_owned());
        assert_eq!(
            "Invalid string: must match pattern /^a+$/",
            default_message(&issue)
        );
    }
}
