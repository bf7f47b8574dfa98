use crate::core::error::DbError;
use std::fmt;

/// The fixed vocabulary of SQL scalar types a CREATE TABLE column may use.
///
/// Each variant maps to exactly one canonical physical (columnar) type via
/// [`DataType::physical_type`]; that mapping is what the worker's INSERT path
/// casts incoming data to before writing shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Boolean,
    Varchar,
    Binary,
    Date,
    Timestamp,
    Interval,
}

impl DataType {
    /// Parses a type token taken verbatim from CREATE TABLE column defs.
    pub fn parse(token: &str) -> Result<Self, DbError> {
        match token.to_ascii_lowercase().as_str() {
            "tinyint" => Ok(Self::TinyInt),
            "smallint" => Ok(Self::SmallInt),
            "int" | "integer" => Ok(Self::Int),
            "bigint" => Ok(Self::BigInt),
            "float" | "real" => Ok(Self::Float),
            "double" => Ok(Self::Double),
            "decimal" | "numeric" => Ok(Self::Decimal),
            "boolean" | "bool" => Ok(Self::Boolean),
            "varchar" | "text" | "char" | "string" => Ok(Self::Varchar),
            "binary" | "blob" | "bytea" => Ok(Self::Binary),
            "date" => Ok(Self::Date),
            "timestamp" | "datetime" => Ok(Self::Timestamp),
            "interval" => Ok(Self::Interval),
            other => Err(DbError::ParseError(format!("unknown column type '{other}'"))),
        }
    }

    /// Canonical physical (columnar) type name, as understood by the
    /// embedded engine's `CAST(expr AS <physical_type>)` syntax.
    pub fn physical_type(&self) -> &'static str {
        match self {
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Int => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Decimal => "DECIMAL(38,9)",
            Self::Boolean => "BOOLEAN",
            Self::Varchar => "VARCHAR",
            Self::Binary => "BLOB",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::Interval => "INTERVAL",
        }
    }

    /// The lowercase spelling persisted in `ColumnInfo.type` (catalog JSON).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TinyInt => "tinyint",
            Self::SmallInt => "smallint",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Varchar => "varchar",
            Self::Binary => "binary",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::Interval => "interval",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for DataType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for DataType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
