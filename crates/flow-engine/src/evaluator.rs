//! Condition evaluation
//!
//! Pure functions from a condition tree and a sensor snapshot to a boolean.
//! ALL and ANY evaluate their members left to right and stop at the first
//! member that decides the result, so later members are never read.

use flow_ast::{BaseCondition, Comparator, Condition};
use flow_core::{Snapshot, Value};
use tracing::{debug, trace};

use crate::error::{EvalError, EvalResult};

/// Evaluate a condition against a snapshot
pub fn evaluate(condition: &Condition, snapshot: &Snapshot) -> EvalResult<bool> {
    match condition {
        Condition::Base(base) => evaluate_base(base, snapshot),
        Condition::All(set) => evaluate_all(&set.conditions, snapshot),
        Condition::Any(set) => evaluate_any(&set.conditions, snapshot),
    }
}

/// AND over `conditions`; true when empty
pub fn evaluate_all(conditions: &[Condition], snapshot: &Snapshot) -> EvalResult<bool> {
    debug!(count = conditions.len(), "Evaluating ALL condition");

    for (index, condition) in conditions.iter().enumerate() {
        if !evaluate(condition, snapshot)? {
            trace!(index, "ALL short-circuited");
            return Ok(false);
        }
    }
    Ok(true)
}

/// OR over `conditions`; false when empty
pub fn evaluate_any(conditions: &[Condition], snapshot: &Snapshot) -> EvalResult<bool> {
    debug!(count = conditions.len(), "Evaluating ANY condition");

    for (index, condition) in conditions.iter().enumerate() {
        if evaluate(condition, snapshot)? {
            trace!(index, "ANY short-circuited");
            return Ok(true);
        }
    }
    Ok(false)
}

fn evaluate_base(base: &BaseCondition, snapshot: &Snapshot) -> EvalResult<bool> {
    let reading = snapshot
        .get(&base.sensor)
        .ok_or_else(|| EvalError::MissingSensor(base.sensor.clone()))?;

    let result =
        compare(reading, base.comparison, &base.value).ok_or_else(|| EvalError::TypeMismatch {
            sensor: base.sensor.clone(),
            comparator: base.comparison,
            found: reading.kind(),
            reference: base.value.kind(),
        })?;

    trace!(
        sensor = %base.sensor,
        reading = %reading,
        comparison = %base.comparison,
        reference = %base.value,
        result,
        "Sensor check result"
    );
    Ok(result)
}

/// Apply a comparator, `None` when the operands are not comparable
///
/// `=` accepts any kinds and is false across kinds. Ordering comparators
/// need two numbers.
pub fn compare(left: &Value, comparator: Comparator, right: &Value) -> Option<bool> {
    if !comparator.is_ordering() {
        return Some(left == right);
    }

    let (l, r) = (left.as_number()?, right.as_number()?);
    Some(match comparator {
        Comparator::Lt => l < r,
        Comparator::Gt => l > r,
        Comparator::Le => l <= r,
        Comparator::Ge => l >= r,
        Comparator::Eq => l == r,
    })
}
