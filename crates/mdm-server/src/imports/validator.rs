//! Row validation
//!
//! A [`RowValidator`] knows the target tables and turns a [`RawRow`] into a
//! [`ValidatedRecord`] or a [`RowError`]. The default implementation is a
//! schema catalog of the master-data tables; values arriving from CSV are
//! strings and get coerced to the field's kind.

use mdm_common::types::{FieldInfo, RawRow, TableInfo};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use super::error::RowError;

/// A row that passed validation, normalized and keyed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    pub table: String,
    pub key: String,
    pub data: Map<String, Value>,
}

pub trait RowValidator: Send + Sync {
    fn knows_table(&self, table: &str) -> bool;

    fn validate(&self, table: &str, row: &RawRow) -> Result<ValidatedRecord, RowError>;

    fn tables(&self) -> Vec<TableInfo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    /// Non-negative decimal amount
    Decimal,
    Boolean,
    Email,
    /// Three-letter currency code
    Currency,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::Boolean => "boolean",
            FieldKind::Email => "email",
            FieldKind::Currency => "currency",
        }
    }

    fn coerce(&self, value: &Value) -> Result<Value, String> {
        match self {
            FieldKind::Text => Ok(Value::String(scalar_text(value)?)),
            FieldKind::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
                _ => scalar_text(value)?
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| "must be a whole number".to_string()),
            },
            FieldKind::Decimal => {
                let amount = match value {
                    Value::Number(n) => n.as_f64(),
                    _ => scalar_text(value)?.parse::<f64>().ok(),
                }
                .filter(|f| f.is_finite())
                .ok_or_else(|| "must be a number".to_string())?;
                if amount < 0.0 {
                    return Err("must not be negative".to_string());
                }
                Number::from_f64(amount)
                    .map(Value::Number)
                    .ok_or_else(|| "must be a number".to_string())
            }
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                _ => match scalar_text(value)?.to_ascii_lowercase().as_str() {
                    "true" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
                    "false" | "no" | "n" | "0" => Ok(Value::Bool(false)),
                    _ => Err("must be true or false".to_string()),
                },
            },
            FieldKind::Email => {
                let text = scalar_text(value)?;
                match text.split_once('@') {
                    Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                        Ok(Value::String(text))
                    }
                    _ => Err("must be an email address".to_string()),
                }
            }
            FieldKind::Currency => {
                let text = scalar_text(value)?;
                if text.len() == 3 && text.chars().all(|c| c.is_ascii_alphabetic()) {
                    Ok(Value::String(text.to_ascii_uppercase()))
                } else {
                    Err("must be a three-letter currency code".to_string())
                }
            }
        }
    }
}

fn scalar_text(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err("must be a single value".to_string()),
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
        }
    }
}

/// Field list of one table. The first field is the unique record key.
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl TableSchema {
    pub fn new(name: &str, key: FieldSpec, rest: Vec<FieldSpec>) -> Self {
        let mut fields = vec![FieldSpec { required: true, ..key }];
        fields.extend(rest);
        Self {
            name: name.to_string(),
            fields,
        }
    }

    pub fn key_field(&self) -> &str {
        &self.fields[0].name
    }

    fn info(&self) -> TableInfo {
        TableInfo {
            name: self.name.clone(),
            key_field: self.key_field().to_string(),
            fields: self
                .fields
                .iter()
                .map(|f| FieldInfo {
                    name: f.name.clone(),
                    kind: f.kind.as_str().to_string(),
                    required: f.required,
                })
                .collect(),
        }
    }

    /// Columns not in the schema are ignored. The first offending field decides the error.
    fn validate(&self, row: &RawRow) -> Result<ValidatedRecord, RowError> {
        let mut data = Map::new();
        for field in &self.fields {
            let value = row.get(&field.name);
            if is_missing(value) {
                if field.required {
                    return Err(RowError::field(&field.name, "is required"));
                }
                continue;
            }
            let Some(value) = value else { continue };
            let coerced = field
                .kind
                .coerce(value)
                .map_err(|message| RowError::field(&field.name, message))?;
            data.insert(field.name.clone(), coerced);
        }

        let key = match data.get(self.key_field()) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => return Err(RowError::field(self.key_field(), "is required")),
        };

        Ok(ValidatedRecord {
            table: self.name.clone(),
            key,
            data,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    tables: BTreeMap<String, TableSchema>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, schema: TableSchema) -> Self {
        self.tables.insert(schema.name.clone(), schema);
        self
    }

    /// Master-data tables of the admin tool
    pub fn default_catalog() -> Self {
        use FieldKind::*;

        Self::new()
            .with_table(TableSchema::new(
                "items",
                FieldSpec::required("sku", Text),
                vec![
                    FieldSpec::required("name", Text),
                    FieldSpec::required("price", Decimal),
                    FieldSpec::optional("category", Text),
                    FieldSpec::optional("active", Boolean),
                ],
            ))
            .with_table(TableSchema::new(
                "stores",
                FieldSpec::required("code", Text),
                vec![
                    FieldSpec::required("name", Text),
                    FieldSpec::optional("address", Text),
                    FieldSpec::optional("phone", Text),
                ],
            ))
            .with_table(TableSchema::new(
                "staff",
                FieldSpec::required("employee_id", Text),
                vec![
                    FieldSpec::required("name", Text),
                    FieldSpec::required("email", Email),
                    FieldSpec::required("store_code", Text),
                ],
            ))
            .with_table(TableSchema::new(
                "prices",
                FieldSpec::required("sku", Text),
                vec![
                    FieldSpec::required("store_code", Text),
                    FieldSpec::required("amount", Decimal),
                    FieldSpec::optional("currency", Currency),
                ],
            ))
            .with_table(TableSchema::new(
                "payment_methods",
                FieldSpec::required("code", Text),
                vec![
                    FieldSpec::required("name", Text),
                    FieldSpec::optional("enabled", Boolean),
                ],
            ))
    }
}

impl RowValidator for SchemaValidator {
    fn knows_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    fn validate(&self, table: &str, row: &RawRow) -> Result<ValidatedRecord, RowError> {
        let schema = self
            .tables
            .get(table)
            .ok_or_else(|| RowError::Invalid(format!("Unknown target table '{}'", table)))?;
        schema.validate(row)
    }

    fn tables(&self) -> Vec<TableInfo> {
        self.tables.values().map(TableSchema::info).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RawRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    #[test]
    fn test_valid_item_is_coerced() {
        let validator = SchemaValidator::default_catalog();
        let record = validator
            .validate(
                "items",
                &row(json!({"sku": "A1", "name": "Apple", "price": "1.50", "active": "yes", "colour": "red"})),
            )
            .unwrap();

        assert_eq!(record.key, "A1");
        assert_eq!(record.data["price"], json!(1.5));
        assert_eq!(record.data["active"], json!(true));
        assert!(!record.data.contains_key("colour"));
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let validator = SchemaValidator::default_catalog();
        let err = validator
            .validate("items", &row(json!({"sku": "A1", "name": "", "price": "2"})))
            .unwrap_err();
        assert_eq!(err, RowError::field("name", "is required"));
        assert_eq!(err.to_string(), "name: is required");
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let validator = SchemaValidator::default_catalog();

        let err = validator
            .validate("items", &row(json!({"sku": "A1", "name": "Apple", "price": "abc"})))
            .unwrap_err();
        assert_eq!(err.to_string(), "price: must be a number");

        let err = validator
            .validate("prices", &row(json!({"sku": "A1", "store_code": "S1", "amount": -1})))
            .unwrap_err();
        assert_eq!(err.to_string(), "amount: must not be negative");

        let err = validator
            .validate(
                "staff",
                &row(json!({"employee_id": "E1", "name": "Kim", "email": "kim.example.com", "store_code": "S1"})),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "email: must be an email address");
    }

    #[test]
    fn test_currency_is_normalized() {
        let validator = SchemaValidator::default_catalog();
        let record = validator
            .validate(
                "prices",
                &row(json!({"sku": "A1", "store_code": "S1", "amount": "3", "currency": "jpy"})),
            )
            .unwrap();
        assert_eq!(record.data["currency"], json!("JPY"));
    }

    #[test]
    fn test_unknown_table() {
        let validator = SchemaValidator::default_catalog();
        assert!(!validator.knows_table("customers"));
        assert!(matches!(
            validator.validate("customers", &RawRow::new()),
            Err(RowError::Invalid(_))
        ));
    }

    #[test]
    fn test_catalog_lists_tables_with_key_first() {
        let tables = SchemaValidator::default_catalog().tables();
        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["items", "payment_methods", "prices", "staff", "stores"]);

        let staff = tables.iter().find(|t| t.name == "staff").unwrap();
        assert_eq!(staff.key_field, "employee_id");
        assert_eq!(staff.fields[0].name, "employee_id");
        assert!(staff.fields.iter().all(|f| f.required));
    }
}
