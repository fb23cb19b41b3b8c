// ABOUTME: Integration tests for the reference resolution contract
// ABOUTME: Exercises structural and textual substitution against a full instance tree

use serde_json::json;

use trellis::model::Task;
use trellis::reference::{resolve_task, resolve_value};

mod common;
use common::{handler_task, TestInstanceBuilder};

fn instance_root() -> serde_json::Value {
    let mut inner = handler_task("log", json!({"deep": [true, {"k": "v"}]}));
    inner.tasks.insert(
        "b".to_string(),
        handler_task("log", json!({"y": [10, 20, 30]})),
    );

    let instance = TestInstanceBuilder::new("resolver")
        .with_task(
            "a",
            handler_task(
                "log",
                json!({
                    "x": 7,
                    "text": "plain",
                    "tricky": "tab\there \"quoted\" back\\slash"
                }),
            ),
        )
        .with_task("outer", inner)
        .build();

    let mut root = serde_json::to_value(&instance).unwrap();
    root.as_object_mut().unwrap().insert(
        "environment".to_string(),
        json!({"HOME": "/home/tester", "EMPTY": ""}),
    );
    root
}

#[test]
fn test_whole_field_replacement_keeps_native_types() {
    let root = instance_root();

    let mut parameters = json!({
        "number": "$[tasks.a.parameters.x]",
        "array": "$[tasks.outer.tasks.b.parameters.y]",
        "indexed": "$[tasks.outer.tasks.b.parameters.y[2]]",
        "object": "$[tasks.outer.parameters.deep[1]]",
        "missing": "$[tasks.a.parameters.absent]"
    });
    resolve_value(&mut parameters, &root);

    assert_eq!(parameters["number"], json!(7));
    assert_eq!(parameters["array"], json!([10, 20, 30]));
    assert_eq!(parameters["indexed"], json!(30));
    assert_eq!(parameters["object"], json!({"k": "v"}));
    assert_eq!(parameters["missing"], json!(null));
}

#[test]
fn test_embedded_references_stringify() {
    let root = instance_root();

    let mut parameters = json!({
        "message": "x is $[tasks.a.parameters.x] at $[environment.HOME]",
        "list": "items: $[tasks.outer.tasks.b.parameters.y]"
    });
    resolve_value(&mut parameters, &root);

    assert_eq!(parameters["message"], json!("x is 7 at /home/tester"));
    assert_eq!(parameters["list"], json!("items: [10,20,30]"));
}

#[test]
fn test_escaped_characters_pass_through() {
    let root = instance_root();

    let mut parameters = json!({"copy": "$[tasks.a.parameters.tricky]"});
    resolve_value(&mut parameters, &root);
    assert_eq!(
        parameters["copy"],
        json!("tab\there \"quoted\" back\\slash")
    );

    let mut parameters = json!({"spliced": ">> $[tasks.a.parameters.tricky] <<"});
    resolve_value(&mut parameters, &root);
    assert_eq!(
        parameters["spliced"],
        json!(">> tab\there \"quoted\" back\\slash <<")
    );
}

#[test]
fn test_empty_environment_value_resolves_empty() {
    let root = instance_root();

    let mut parameters = json!({"value": "[$[environment.EMPTY]]"});
    resolve_value(&mut parameters, &root);
    assert_eq!(parameters["value"], json!("[]"));
}

#[test]
fn test_gate_fields_resolve_on_task() {
    let root = instance_root();

    let mut task = Task {
        handler: Some("log".to_string()),
        parameters: json!({"log": "$[tasks.a.parameters.text]"}),
        skip_if: Some(json!("$[tasks.a.parameters.absent]")),
        error_if: Some(json!("$[tasks.outer.parameters.deep[0]]")),
        ..Default::default()
    };

    resolve_task(&mut task, &root);

    assert_eq!(task.parameters["log"], json!("plain"));
    // Unresolved gate becomes null, which coerces falsy.
    assert_eq!(task.skip_if, Some(json!(null)));
    assert_eq!(task.error_if, Some(json!(true)));
}
