// ABOUTME: Reference substitution over task fields before dispatch
// ABOUTME: Standalone references keep their native type, embedded ones splice as text

use serde_json::Value;
use tracing::warn;

use super::path::ReferencePath;
use crate::model::Task;

/// Expand every `$[path]` reference in the fields of a task against the
/// instance root.
///
/// Covers `parameters` (recursively) and the scalar gate fields; the child
/// `tasks` mapping is left untouched because children resolve at their own
/// dispatch. Unresolved references substitute null and log a warning; they
/// never fail the task.
pub fn resolve_task(task: &mut Task, root: &Value) {
    resolve_value(&mut task.parameters, root);

    for gate in [&mut task.skip_if, &mut task.error_if, &mut task.blocking] {
        if let Some(value) = gate.as_mut() {
            resolve_value(value, root);
        }
    }

    if let Some(handler) = task.handler.take() {
        task.handler = Some(match resolve_string(&handler, root) {
            Some(Value::String(s)) => s,
            Some(other) => value_to_string(&other),
            None => handler,
        });
    }
}

/// Recursively expand references in a JSON value tree, in place.
pub fn resolve_value(value: &mut Value, root: &Value) {
    match value {
        Value::String(s) => {
            if let Some(resolved) = resolve_string(s, root) {
                *value = resolved;
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                resolve_value(item, root);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                resolve_value(item, root);
            }
        }
        _ => {}
    }
}

/// Expand references in a single string. Returns `None` when the string
/// contains no reference and should be left as-is.
fn resolve_string(s: &str, root: &Value) -> Option<Value> {
    // A reference standing alone as the entire value keeps its native type.
    if let Some(body) = s.strip_prefix("$[") {
        if let Some(end) = reference_end(body) {
            if end + 1 == body.len() {
                return Some(lookup_or_null(&body[..end], root));
            }
        }
    }

    if !s.contains("$[") {
        return None;
    }

    // Embedded references splice in as text.
    let mut out = String::new();
    let mut rest = s;
    while let Some(start) = rest.find("$[") {
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        match reference_end(body) {
            Some(end) => {
                let resolved = lookup_or_null(&body[..end], root);
                out.push_str(&value_to_string(&resolved));
                rest = &body[end + 1..];
            }
            None => {
                // Unterminated opener: keep the literal text.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Some(Value::String(out))
}

/// Find the closing `]` of a reference body, skipping over `[index]`
/// subscripts. `body` starts just past the `$[` opener.
fn reference_end(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => {
                let close = body[i + 1..].find(']')? + i + 1;
                i = close + 1;
            }
            b']' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn lookup_or_null(path: &str, root: &Value) -> Value {
    let resolved = ReferencePath::parse(path).and_then(|p| p.lookup(root).cloned());
    match resolved {
        Some(value) => value,
        None => {
            warn!(reference = path, "unresolved reference, substituting null");
            Value::Null
        }
    }
}

/// Render a value for textual splicing: strings splice raw, everything else
/// as compact JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root() -> Value {
        json!({
            "name": "wf",
            "environment": {"HOME": "/tmp", "COUNT": "3"},
            "tasks": {
                "a": {
                    "parameters": {
                        "num": 42,
                        "flag": true,
                        "list": [1, 2, 3],
                        "obj": {"k": "v"},
                        "quoted": "say \"hi\"\\n"
                    }
                }
            }
        })
    }

    #[test]
    fn test_standalone_reference_preserves_type() {
        let root = root();

        let mut v = json!("$[tasks.a.parameters.num]");
        resolve_value(&mut v, &root);
        assert_eq!(v, json!(42));

        let mut v = json!("$[tasks.a.parameters.flag]");
        resolve_value(&mut v, &root);
        assert_eq!(v, json!(true));

        let mut v = json!("$[tasks.a.parameters.obj]");
        resolve_value(&mut v, &root);
        assert_eq!(v, json!({"k": "v"}));

        let mut v = json!("$[tasks.a.parameters.list]");
        resolve_value(&mut v, &root);
        assert_eq!(v, json!([1, 2, 3]));
    }

    #[test]
    fn test_standalone_with_subscript() {
        let root = root();
        let mut v = json!("$[tasks.a.parameters.list[1]]");
        resolve_value(&mut v, &root);
        assert_eq!(v, json!(2));
    }

    #[test]
    fn test_embedded_reference_splices_text() {
        let root = root();

        let mut v = json!("val=$[environment.HOME]");
        resolve_value(&mut v, &root);
        assert_eq!(v, json!("val=/tmp"));

        let mut v = json!("n=$[tasks.a.parameters.num], f=$[tasks.a.parameters.flag]");
        resolve_value(&mut v, &root);
        assert_eq!(v, json!("n=42, f=true"));

        let mut v = json!("obj=$[tasks.a.parameters.obj]!");
        resolve_value(&mut v, &root);
        assert_eq!(v, json!("obj={\"k\":\"v\"}!"));
    }

    #[test]
    fn test_unresolved_substitutes_null() {
        let root = root();

        let mut v = json!("$[tasks.missing.parameters.x]");
        resolve_value(&mut v, &root);
        assert_eq!(v, Value::Null);

        let mut v = json!("x=$[nope]");
        resolve_value(&mut v, &root);
        assert_eq!(v, json!("x=null"));
    }

    #[test]
    fn test_escaped_characters_survive_splicing() {
        let root = root();
        let mut v = json!("msg: $[tasks.a.parameters.quoted]");
        resolve_value(&mut v, &root);
        assert_eq!(v, json!("msg: say \"hi\"\\n"));
    }

    #[test]
    fn test_nested_structures_resolve() {
        let root = root();
        let mut v = json!({
            "outer": {"home": "$[environment.HOME]"},
            "items": ["$[tasks.a.parameters.num]", "plain"]
        });
        resolve_value(&mut v, &root);
        assert_eq!(
            v,
            json!({
                "outer": {"home": "/tmp"},
                "items": [42, "plain"]
            })
        );
    }

    #[test]
    fn test_unterminated_reference_left_verbatim() {
        let root = root();
        let mut v = json!("broken $[environment.HOME");
        resolve_value(&mut v, &root);
        assert_eq!(v, json!("broken $[environment.HOME"));
    }

    #[test]
    fn test_resolve_task_covers_gates_not_children() {
        let root = root();
        let mut task = Task {
            parameters: json!({"msg": "home is $[environment.HOME]"}),
            skip_if: Some(json!("$[tasks.a.parameters.flag]")),
            ..Default::default()
        };
        task.tasks.insert(
            "child".to_string(),
            Task {
                parameters: json!({"msg": "$[environment.HOME]"}),
                ..Default::default()
            },
        );

        resolve_task(&mut task, &root);

        assert_eq!(task.parameters, json!({"msg": "home is /tmp"}));
        assert_eq!(task.skip_if, Some(json!(true)));
        // Children resolve at their own dispatch.
        let child = task.tasks.get("child").unwrap();
        assert_eq!(child.parameters, json!({"msg": "$[environment.HOME]"}));
    }
}
