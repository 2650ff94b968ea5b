//! Helpers for reading resolved inputs.

use conduit_block::{BlockError, InputMap};

/// The resolved value of `field`, or `""` when absent.
pub(crate) fn text<'a>(inputs: &'a InputMap, field: &str) -> &'a str {
  inputs.get(field).map(String::as_str).unwrap_or_default()
}

/// Parse `field` as a finite number.
pub(crate) fn number(inputs: &InputMap, field: &str) -> Result<f64, BlockError> {
  let raw = text(inputs, field).trim();
  match raw.parse::<f64>() {
    Ok(value) if value.is_finite() => Ok(value),
    _ => Err(BlockError::invalid_input(
      field,
      format!("expected a number, got '{raw}'"),
    )),
  }
}

/// Parse `field` as a number strictly greater than zero.
pub(crate) fn positive(inputs: &InputMap, field: &str) -> Result<f64, BlockError> {
  let value = number(inputs, field)?;
  if value > 0.0 {
    Ok(value)
  } else {
    Err(BlockError::invalid_input(
      field,
      format!("must be greater than zero, got {value}"),
    ))
  }
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> i64 {
  chrono::Utc::now().timestamp_millis()
}
