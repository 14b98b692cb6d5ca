//! Schema object models: routines, tables and columns

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{qualified_name, quote_ident};

/// Kind of schema object handled by a migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Routine,
    Table,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Routine => write!(f, "routine"),
            ObjectKind::Table => write!(f, "table"),
        }
    }
}

/// A stored procedure and its full definition text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub definition: String,
}

impl Routine {
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            definition: definition.into(),
        }
    }

    /// `schema.name`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub schema: String,
    pub name: String,
    /// CREATE TABLE script; only used when the table is absent from the target
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            definition: String::new(),
            columns: Vec::new(),
        }
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = definition.into();
        self
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// `[schema].[name]`
    pub fn quoted_name(&self) -> String {
        qualified_name(&self.schema, &self.name)
    }
}

/// A table column as reported by the catalog
///
/// `max_length` of `-1` means unbounded (`MAX`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub max_length: Option<i32>,
    pub precision: Option<u8>,
    pub scale: Option<i32>,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    pub ordinal_position: i32,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_identity: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            max_length: None,
            precision: None,
            scale: None,
            is_nullable: true,
            default_value: None,
            ordinal_position: 0,
            is_primary_key: false,
            is_identity: false,
        }
    }

    pub fn max_length(mut self, length: i32) -> Self {
        self.max_length = Some(length);
        self
    }

    pub fn precision(mut self, precision: u8, scale: Option<i32>) -> Self {
        self.precision = Some(precision);
        self.scale = scale;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn default_value(mut self, expression: impl Into<String>) -> Self {
        self.default_value = Some(expression.into());
        self
    }

    pub fn ordinal(mut self, position: i32) -> Self {
        self.ordinal_position = position;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn identity(mut self) -> Self {
        self.is_identity = true;
        self
    }

    /// Same column across databases: names match case-insensitively
    pub fn same_name(&self, other: &Column) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }

    /// Structural equality ignoring name and ordinal position
    pub fn definition_equals(&self, other: &Column) -> bool {
        self.data_type.eq_ignore_ascii_case(&other.data_type)
            && self.max_length == other.max_length
            && self.precision == other.precision
            && self.scale == other.scale
            && self.is_nullable == other.is_nullable
            && match (&self.default_value, &other.default_value) {
                (None, None) => true,
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => false,
            }
    }

    /// Type with dialect sizing, e.g. `nvarchar(50)`, `varchar(MAX)`, `decimal(18,2)`
    pub fn type_sql(&self) -> String {
        let data_type = self.data_type.to_ascii_lowercase();
        match data_type.as_str() {
            "char" | "nchar" | "varchar" | "nvarchar" | "binary" | "varbinary" => {
                match self.max_length {
                    Some(-1) => format!("{}(MAX)", self.data_type),
                    Some(length) => format!("{}({})", self.data_type, length),
                    None => self.data_type.clone(),
                }
            }
            "decimal" | "numeric" => match (self.precision, self.scale) {
                (Some(precision), Some(scale)) => {
                    format!("{}({},{})", self.data_type, precision, scale)
                }
                _ => self.data_type.clone(),
            },
            "float" => match self.precision {
                Some(precision) => format!("{}({})", self.data_type, precision),
                None => self.data_type.clone(),
            },
            _ => self.data_type.clone(),
        }
    }

    /// Column text accepted by `ALTER COLUMN`, which does not take a DEFAULT clause
    pub fn alter_definition_sql(&self) -> String {
        let nullability = if self.is_nullable { "NULL" } else { "NOT NULL" };
        format!("{} {} {}", quote_ident(&self.name), self.type_sql(), nullability)
    }

    /// `[name] TYPE(sizing) NULL|NOT NULL [DEFAULT expr]`
    pub fn definition_sql(&self) -> String {
        let mut sql = self.alter_definition_sql();
        if let Some(default) = self.default_value.as_deref().filter(|d| !d.is_empty()) {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_equals_ignores_name_and_position() {
        let a = Column::new("Name", "nvarchar")
            .max_length(50)
            .default_value("('N/A')")
            .ordinal(2);
        let b = Column::new("FullName", "NVARCHAR")
            .max_length(50)
            .default_value("('n/a')")
            .ordinal(7);
        assert!(a.definition_equals(&b));
    }

    #[test]
    fn test_definition_equals_detects_differences() {
        let base = Column::new("Amount", "decimal").precision(18, Some(2));
        assert!(!base.definition_equals(&base.clone().not_null()));
        assert!(!base.definition_equals(&Column::new("Amount", "decimal").precision(18, Some(4))));
        assert!(!base.definition_equals(&base.clone().default_value("0")));
        assert!(!base.definition_equals(&Column::new("Amount", "money")));
    }

    #[test]
    fn test_definition_sql_sizing() {
        assert_eq!(
            Column::new("Name", "nvarchar").max_length(50).definition_sql(),
            "[Name] nvarchar(50) NULL"
        );
        assert_eq!(
            Column::new("Notes", "varchar").max_length(-1).definition_sql(),
            "[Notes] varchar(MAX) NULL"
        );
        assert_eq!(
            Column::new("Total", "decimal")
                .precision(18, Some(2))
                .not_null()
                .default_value("((0))")
                .definition_sql(),
            "[Total] decimal(18,2) NOT NULL DEFAULT ((0))"
        );
        assert_eq!(
            Column::new("Ratio", "float").precision(53, None).definition_sql(),
            "[Ratio] float(53) NULL"
        );
        assert_eq!(
            Column::new("Id", "int").precision(10, Some(0)).not_null().definition_sql(),
            "[Id] int NOT NULL"
        );
    }

    #[test]
    fn test_full_names() {
        let routine = Routine::new("dbo", "GetOrders", "");
        assert_eq!(routine.full_name(), "dbo.GetOrders");
        let table = Table::new("sales", "Customer");
        assert_eq!(table.full_name(), "sales.Customer");
        assert_eq!(table.quoted_name(), "[sales].[Customer]");
    }
}
