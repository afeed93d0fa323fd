use serde_json::Value;

/// Name the server assigned to a finished file.
///
/// Without a configured field the whole body is the name. With one, the
/// body is parsed as a JSON object and that field is used; a body that
/// does not parse or lacks the field falls back to the raw body.
pub fn resolve_file_name(body: &str, field: Option<&str>) -> String {
    let Some(field) = field else {
        return body.to_string();
    };

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get(field) {
            Some(Value::String(name)) => name.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                tracing::warn!(field, "server response has no usable name field");
                body.to_string()
            }
        },
        Ok(_) => {
            tracing::warn!(field, "server response is not a JSON object");
            body.to_string()
        }
        Err(e) => {
            tracing::warn!(field, "failed to parse server response: {}", e);
            body.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_body() {
        assert_eq!(resolve_file_name("report.csv", None), "report.csv");
    }

    #[test]
    fn test_json_field() {
        let body = r#"{"name": "stored-1234.csv", "size": 25}"#;
        assert_eq!(resolve_file_name(body, Some("name")), "stored-1234.csv");
        assert_eq!(resolve_file_name(body, Some("size")), "25");
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(resolve_file_name("plain", Some("name")), "plain");
        assert_eq!(resolve_file_name("[1, 2]", Some("name")), "[1, 2]");
        assert_eq!(
            resolve_file_name(r#"{"other": "x"}"#, Some("name")),
            r#"{"other": "x"}"#
        );
    }
}
