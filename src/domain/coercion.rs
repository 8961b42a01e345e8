//! Best-effort conversion of writer input into a [`Value`].
//!
//! Writers may hand in an already typed [`Value`] or loosely typed data
//! (text, JSON numbers, arrays, objects). Raw text that reads as a number
//! is always treated as a number, never as a string; this default is
//! lossy on purpose and callers that need a numeric-looking string must
//! send a typed [`Value::Text`].

use serde_json::Value as JsonValue;

use super::value::{ColumnData, Table, TableColumn, Value};
use crate::error::CoercionError;

/// Input accepted by channel writes and initial values.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelInput {
    /// Already typed; passes through coercion untouched.
    Typed(Value),
    /// Loosely typed; converted to the closest matching shape.
    Raw(JsonValue),
}

impl From<Value> for ChannelInput {
    fn from(value: Value) -> Self {
        Self::Typed(value)
    }
}

impl From<f64> for ChannelInput {
    fn from(v: f64) -> Self {
        Self::Typed(Value::Double(v))
    }
}

impl From<Vec<f64>> for ChannelInput {
    fn from(values: Vec<f64>) -> Self {
        Self::Typed(Value::DoubleArray(values))
    }
}

impl From<Vec<String>> for ChannelInput {
    fn from(values: Vec<String>) -> Self {
        Self::Typed(Value::StringArray(values))
    }
}

impl From<Table> for ChannelInput {
    fn from(table: Table) -> Self {
        Self::Typed(Value::Table(table))
    }
}

impl From<&str> for ChannelInput {
    fn from(text: &str) -> Self {
        Self::Raw(JsonValue::String(text.to_string()))
    }
}

impl From<String> for ChannelInput {
    fn from(text: String) -> Self {
        Self::Raw(JsonValue::String(text))
    }
}

impl From<JsonValue> for ChannelInput {
    fn from(raw: JsonValue) -> Self {
        Self::Raw(raw)
    }
}

/// Resolves an input into exactly one value shape.
///
/// # Errors
///
/// Returns a [`CoercionError`] when raw input has no matching shape.
pub fn coerce(input: ChannelInput) -> Result<Value, CoercionError> {
    match input {
        ChannelInput::Typed(value) => Ok(value),
        ChannelInput::Raw(raw) => from_json(raw),
    }
}

/// Parses text as a number, ignoring surrounding whitespace.
///
/// Decimal and exponent notation are accepted. The only non-finite
/// spellings recognized are `NaN` and `Infinity`, each with an optional
/// sign and in exactly that case; `inf`, `nan` and the like stay text.
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    match unsigned {
        "NaN" => Some(f64::NAN),
        "Infinity" if text.starts_with('-') => Some(f64::NEG_INFINITY),
        "Infinity" => Some(f64::INFINITY),
        _ if unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') => {
            text.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Converts loosely typed JSON data into a [`Value`].
///
/// Numeric-looking top-level strings become [`Value::Double`]; strings
/// inside arrays and tables are kept as text.
///
/// # Errors
///
/// Returns a [`CoercionError`] for null, booleans, mixed or nested arrays
/// and objects that do not form a table.
pub fn from_json(raw: JsonValue) -> Result<Value, CoercionError> {
    match raw {
        JsonValue::Null => Err(CoercionError::Unsupported("null")),
        JsonValue::Bool(_) => Err(CoercionError::Unsupported("bool")),
        JsonValue::Number(n) => number(&n).map(Value::Double),
        JsonValue::String(s) => Ok(match parse_number(&s) {
            Some(v) => Value::Double(v),
            None => Value::Text(s),
        }),
        JsonValue::Array(items) => match column_values(items)? {
            ColumnData::Double(values) => Ok(Value::DoubleArray(values)),
            ColumnData::Text(values) => Ok(Value::StringArray(values)),
        },
        JsonValue::Object(members) => {
            let mut columns = Vec::with_capacity(members.len());
            for (name, member) in members {
                let JsonValue::Array(items) = member else {
                    return Err(CoercionError::InvalidColumn(name));
                };
                let data =
                    column_values(items).map_err(|_| CoercionError::InvalidColumn(name.clone()))?;
                columns.push(TableColumn { name, data });
            }
            Table::new(columns).map(Value::Table)
        }
    }
}

fn number(n: &serde_json::Number) -> Result<f64, CoercionError> {
    n.as_f64()
        .ok_or_else(|| CoercionError::NotFinite(n.to_string()))
}

/// Homogeneous array contents. An empty array counts as numeric.
fn column_values(items: Vec<JsonValue>) -> Result<ColumnData, CoercionError> {
    let mut items = items.into_iter().peekable();
    match items.peek() {
        None | Some(JsonValue::Number(_)) => items
            .map(|item| match item {
                JsonValue::Number(n) => number(&n),
                _ => Err(CoercionError::MixedArray),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ColumnData::Double),
        Some(JsonValue::String(_)) => items
            .map(|item| match item {
                JsonValue::String(s) => Ok(s),
                _ => Err(CoercionError::MixedArray),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ColumnData::Text),
        Some(_) => Err(CoercionError::MixedArray),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numeric_text_becomes_double() {
        assert_eq!(coerce("3.25".into()), Ok(Value::Double(3.25)));
        assert_eq!(coerce(" 42 ".into()), Ok(Value::Double(42.0)));
        assert_eq!(coerce("1e3".into()), Ok(Value::Double(1000.0)));
    }

    #[test]
    fn non_numeric_text_stays_text() {
        assert_eq!(
            coerce("hello".into()),
            Ok(Value::Text("hello".to_string()))
        );
        assert_eq!(coerce("".into()), Ok(Value::Text(String::new())));
    }

    #[test]
    fn typed_text_is_not_reparsed() {
        let input = ChannelInput::Typed(Value::Text("7".to_string()));
        assert_eq!(coerce(input), Ok(Value::Text("7".to_string())));
    }

    #[test]
    fn nan_text_is_a_number() {
        let Ok(Value::Double(v)) = coerce("NaN".into()) else {
            panic!("expected a double");
        };
        assert!(v.is_nan());
        assert_eq!(parse_number(" -Infinity "), Some(f64::NEG_INFINITY));
        assert_eq!(parse_number("+Infinity"), Some(f64::INFINITY));
    }

    #[test]
    fn loose_non_finite_spellings_stay_text() {
        for text in ["inf", "-inf", "nan", "NAN", "infinity", "INFINITY", "Inf"] {
            assert_eq!(parse_number(text), None, "{text}");
            assert_eq!(coerce(text.into()), Ok(Value::Text(text.to_string())));
        }
    }

    #[test]
    fn numeric_text_forms() {
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("-.5"), Some(-0.5));
        assert_eq!(parse_number("+2.5"), Some(2.5));
        assert_eq!(parse_number("1.5x"), None);
        assert_eq!(parse_number("-"), None);
    }

    #[test]
    fn arrays_convert_by_element_kind() {
        assert_eq!(
            coerce(json!([1, 2.5]).into()),
            Ok(Value::DoubleArray(vec![1.0, 2.5]))
        );
        assert_eq!(
            coerce(json!(["a", "1"]).into()),
            Ok(Value::StringArray(vec!["a".to_string(), "1".to_string()]))
        );
        assert_eq!(coerce(json!([]).into()), Ok(Value::DoubleArray(vec![])));
    }

    #[test]
    fn mixed_and_nested_arrays_fail() {
        assert_eq!(
            coerce(json!([1, "a"]).into()),
            Err(CoercionError::MixedArray)
        );
        assert_eq!(
            coerce(json!([[1], [2]]).into()),
            Err(CoercionError::MixedArray)
        );
    }

    #[test]
    fn scalars_without_shape_fail() {
        assert_eq!(
            coerce(JsonValue::Null.into()),
            Err(CoercionError::Unsupported("null"))
        );
        assert_eq!(
            coerce(json!(true).into()),
            Err(CoercionError::Unsupported("bool"))
        );
    }

    #[test]
    fn object_of_columns_becomes_table() {
        let result = coerce(json!({"name": ["a", "b"], "value": [1, 2]}).into());
        let Ok(Value::Table(table)) = result else {
            panic!("expected a table");
        };
        assert_eq!(table.row_count(), 2);
        let Some(column) = table.column("value") else {
            panic!("missing column");
        };
        assert_eq!(column.data, ColumnData::Double(vec![1.0, 2.0]));
    }

    #[test]
    fn object_with_scalar_member_fails() {
        assert_eq!(
            coerce(json!({"x": 1}).into()),
            Err(CoercionError::InvalidColumn("x".to_string()))
        );
    }

    #[test]
    fn ragged_object_fails() {
        let result = coerce(json!({"a": [1, 2], "b": [1]}).into());
        assert!(matches!(result, Err(CoercionError::RaggedTable { .. })));
    }
}
