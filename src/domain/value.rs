//! Closed value model carried through every channel.
//!
//! A [`Value`] is always exactly one of five shapes, and [`ValueType`]
//! names those shapes. Channels lock themselves to a single
//! [`ValueType`] and reject values of any other shape.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoercionError, UnknownValueType};

/// The five value shapes a channel can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    /// A single `f64`.
    ScalarDouble,
    /// A single string.
    ScalarString,
    /// An array of `f64`.
    DoubleArray,
    /// An array of strings.
    StringArray,
    /// A table of named, equally sized columns.
    Table,
}

impl ValueType {
    /// All recognized shapes, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::ScalarDouble,
        Self::ScalarString,
        Self::DoubleArray,
        Self::StringArray,
        Self::Table,
    ];

    /// Returns the canonical type name (e.g. `"scalar-double"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ScalarDouble => "scalar-double",
            Self::ScalarString => "scalar-string",
            Self::DoubleArray => "double-array",
            Self::StringArray => "string-array",
            Self::Table => "table",
        }
    }

    /// Returns the legacy `V*` alias accepted alongside the canonical name.
    #[must_use]
    pub const fn legacy_name(self) -> &'static str {
        match self {
            Self::ScalarDouble => "VDouble",
            Self::ScalarString => "VString",
            Self::DoubleArray => "VDoubleArray",
            Self::StringArray => "VStringArray",
            Self::Table => "VTable",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = UnknownValueType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s || ty.legacy_name() == s)
            .ok_or_else(|| UnknownValueType(s.to_string()))
    }
}

/// Data of a single table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum ColumnData {
    /// Numeric column.
    Double(Vec<f64>),
    /// Text column.
    Text(Vec<String>),
}

impl ColumnData {
    /// Number of rows in the column.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Double(values) => values.len(),
            Self::Text(values) => values.len(),
        }
    }

    /// Returns `true` if the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column name, unique within its table.
    pub name: String,
    /// Column contents.
    pub data: ColumnData,
}

impl TableColumn {
    /// Creates a numeric column.
    #[must_use]
    pub fn doubles(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Double(values),
        }
    }

    /// Creates a text column.
    #[must_use]
    pub fn strings(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }
}

/// Ordered set of named columns sharing one row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TableColumn>", into = "Vec<TableColumn>")]
pub struct Table {
    columns: Vec<TableColumn>,
}

impl Table {
    /// Builds a table, checking column names are unique and every column
    /// has the same number of rows.
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError::DuplicateColumn`] or
    /// [`CoercionError::RaggedTable`] when the columns do not form a table.
    pub fn new(columns: Vec<TableColumn>) -> Result<Self, CoercionError> {
        let mut rows = None;
        for (idx, column) in columns.iter().enumerate() {
            if columns
                .iter()
                .take(idx)
                .any(|earlier| earlier.name == column.name)
            {
                return Err(CoercionError::DuplicateColumn(column.name.clone()));
            }
            let len = column.data.len();
            match rows {
                None => rows = Some(len),
                Some(expected) if expected != len => {
                    return Err(CoercionError::RaggedTable {
                        column: column.name.clone(),
                        expected,
                        actual: len,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(Self { columns })
    }

    /// Columns in insertion order.
    #[must_use]
    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of rows (zero for a table without columns).
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.data.len())
    }
}

impl TryFrom<Vec<TableColumn>> for Table {
    type Error = CoercionError;

    fn try_from(columns: Vec<TableColumn>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<Table> for Vec<TableColumn> {
    fn from(table: Table) -> Self {
        table.columns
    }
}

/// A typed channel value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Scalar double.
    #[serde(rename = "scalar-double")]
    Double(f64),
    /// Scalar string.
    #[serde(rename = "scalar-string")]
    Text(String),
    /// Array of doubles.
    #[serde(rename = "double-array")]
    DoubleArray(Vec<f64>),
    /// Array of strings.
    #[serde(rename = "string-array")]
    StringArray(Vec<String>),
    /// Table.
    #[serde(rename = "table")]
    Table(Table),
}

impl Value {
    /// Returns the shape of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Double(_) => ValueType::ScalarDouble,
            Self::Text(_) => ValueType::ScalarString,
            Self::DoubleArray(_) => ValueType::DoubleArray,
            Self::StringArray(_) => ValueType::StringArray,
            Self::Table(_) => ValueType::Table,
        }
    }

    /// Returns the scalar double, if this is one.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the scalar string, if this is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Value identity as used for initial values.
    ///
    /// Unlike `==`, doubles compare by bit pattern with every `NaN` equal
    /// to every other `NaN`, so `0.0` and `-0.0` differ.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Double(a), Self::Double(b)) => same_double(*a, *b),
            (Self::DoubleArray(a), Self::DoubleArray(b)) => same_doubles(a, b),
            (Self::Table(a), Self::Table(b)) => {
                a.columns.len() == b.columns.len()
                    && a.columns.iter().zip(&b.columns).all(|(x, y)| {
                        x.name == y.name
                            && match (&x.data, &y.data) {
                                (ColumnData::Double(p), ColumnData::Double(q)) => {
                                    same_doubles(p, q)
                                }
                                (p, q) => p == q,
                            }
                    })
            }
            _ => self == other,
        }
    }
}

fn same_double(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
}

fn same_doubles(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_double(*x, *y))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Double(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::DoubleArray(values) => write!(f, "{values:?}"),
            Self::StringArray(values) => write!(f, "{values:?}"),
            Self::Table(table) => write!(
                f,
                "table[{} columns x {} rows]",
                table.columns().len(),
                table.row_count()
            ),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Self::DoubleArray(values)
    }
}

impl From<Vec<String>> for Value {
    fn from(values: Vec<String>) -> Self {
        Self::StringArray(values)
    }
}

impl From<Table> for Value {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_and_legacy_names() {
        assert_eq!("scalar-double".parse::<ValueType>(), Ok(ValueType::ScalarDouble));
        assert_eq!("VStringArray".parse::<ValueType>(), Ok(ValueType::StringArray));
        assert_eq!("table".parse::<ValueType>(), Ok(ValueType::Table));
    }

    #[test]
    fn rejects_unknown_type_name() {
        let result = "VEnum".parse::<ValueType>();
        assert_eq!(result, Err(UnknownValueType("VEnum".to_string())));
    }

    #[test]
    fn value_type_matches_variant() {
        assert_eq!(Value::Double(1.0).value_type(), ValueType::ScalarDouble);
        assert_eq!(
            Value::Text("x".to_string()).value_type(),
            ValueType::ScalarString
        );
        assert_eq!(
            Value::DoubleArray(vec![]).value_type(),
            ValueType::DoubleArray
        );
    }

    #[test]
    fn table_rejects_ragged_columns() {
        let result = Table::new(vec![
            TableColumn::doubles("x", vec![1.0, 2.0]),
            TableColumn::strings("label", vec!["a".to_string()]),
        ]);
        let Err(CoercionError::RaggedTable {
            column,
            expected,
            actual,
        }) = result
        else {
            panic!("expected ragged table error");
        };
        assert_eq!(column, "label");
        assert_eq!((expected, actual), (2, 1));
    }

    #[test]
    fn table_rejects_duplicate_columns() {
        let result = Table::new(vec![
            TableColumn::doubles("x", vec![1.0]),
            TableColumn::doubles("x", vec![2.0]),
        ]);
        assert!(matches!(result, Err(CoercionError::DuplicateColumn(name)) if name == "x"));
    }

    #[test]
    fn table_serde_validates_columns() {
        let json = r#"[
            {"name": "x", "data": {"kind": "double", "values": [1.0, 2.0]}},
            {"name": "y", "data": {"kind": "double", "values": [1.0]}}
        ]"#;
        assert!(serde_json::from_str::<Table>(json).is_err());
    }

    #[test]
    fn value_serializes_with_type_tag() {
        let json = serde_json::to_string(&Value::Double(2.5)).unwrap_or_default();
        assert_eq!(json, r#"{"type":"scalar-double","value":2.5}"#);
    }

    #[test]
    fn same_as_treats_nan_as_itself() {
        assert!(Value::Double(f64::NAN).same_as(&Value::Double(f64::NAN)));
        assert!(!Value::Double(0.0).same_as(&Value::Double(-0.0)));
        let array = Value::DoubleArray(vec![1.0, f64::NAN]);
        assert!(array.same_as(&array.clone()));
        assert!(!Value::Double(1.0).same_as(&Value::Text("1".to_string())));

        let Ok(a) = Table::new(vec![TableColumn::doubles("x", vec![f64::NAN])]) else {
            panic!("valid table");
        };
        let Ok(b) = Table::new(vec![TableColumn::doubles("y", vec![f64::NAN])]) else {
            panic!("valid table");
        };
        assert!(Value::Table(a.clone()).same_as(&Value::Table(a.clone())));
        assert!(!Value::Table(a).same_as(&Value::Table(b)));
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(Value::Double(3.5).to_string(), "3.5");
        assert_eq!(Value::Text("hi".to_string()).to_string(), "\"hi\"");
        let Ok(table) = Table::new(vec![TableColumn::doubles("x", vec![1.0, 2.0])]) else {
            panic!("valid table");
        };
        assert_eq!(Value::Table(table).to_string(), "table[1 columns x 2 rows]");
    }
}
