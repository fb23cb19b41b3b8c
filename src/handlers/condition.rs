// ABOUTME: Condition handler evaluating a single comparison between two values
// ABOUTME: Writes the boolean outcome into parameters.result for downstream gates

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{HandlerError, Result, TaskHandler};
use crate::model::{truthy, Task};

/// Evaluates `left <operator> right` and stores the outcome.
///
/// The condition language is deliberately restricted to this operator list
/// plus truthy coercion; there is no expression evaluation.
pub struct ConditionHandler;

#[derive(Debug, Deserialize)]
struct ConditionParameters {
    #[serde(default)]
    left: Value,
    operator: String,
    #[serde(default)]
    right: Value,
}

#[async_trait]
impl TaskHandler for ConditionHandler {
    async fn handle(&self, _workflow_id: &str, _task_name: &str, task: &mut Task) -> Result<()> {
        let params: ConditionParameters = serde_json::from_value(task.parameters.clone())
            .map_err(|e| HandlerError::InvalidParameters(e.to_string()))?;

        let result = evaluate(&params.left, &params.operator, &params.right)?;

        if let Some(map) = task.parameters.as_object_mut() {
            map.insert("result".to_string(), json!(result));
        } else {
            task.parameters = json!({"result": result});
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "condition"
    }
}

fn evaluate(left: &Value, operator: &str, right: &Value) -> Result<bool> {
    let outcome = match operator {
        "eq" => values_equal(left, right),
        "ne" => !values_equal(left, right),
        "gt" => matches!(compare(left, right), Some(std::cmp::Ordering::Greater)),
        "gte" => matches!(
            compare(left, right),
            Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
        ),
        "lt" => matches!(compare(left, right), Some(std::cmp::Ordering::Less)),
        "lte" => matches!(
            compare(left, right),
            Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
        ),
        "contains" => contains(left, right),
        "truthy" => truthy(left),
        other => {
            return Err(HandlerError::InvalidParameters(format!(
                "unknown operator: {}",
                other
            )))
        }
    };
    Ok(outcome)
}

/// Equality with numeric coercion so `1` and `1.0` compare equal.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

/// Ordered comparison; numbers compare numerically, strings
/// lexicographically, anything else is never ordered.
fn compare(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (left.as_str(), right.as_str()) {
        return Some(a.cmp(b));
    }
    None
}

fn contains(left: &Value, right: &Value) -> bool {
    match left {
        Value::String(s) => right.as_str().map(|r| s.contains(r)).unwrap_or(false),
        Value::Array(items) => items.contains(right),
        _ => false,
    }
}
