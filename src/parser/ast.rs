use crate::catalog::ColumnInfo;

/// A parsed statement: one of the four shapes the grammar recognises.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Select(SelectQuery),
    Create(CreateQuery),
    Insert(InsertQuery),
    Drop(DropQuery),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggFunc {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggFunc {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "avg" => Some(Self::Avg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggExpr {
    pub func: AggFunc,
    /// Column name, or `"*"` for `count(*)`.
    pub col: String,
    pub alias: Option<String>,
}

/// One item of a SELECT projection list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Column(ColumnRef),
    Agg(AggExpr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "=" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A scalar literal appearing in a predicate's right-hand side.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Literal {
    /// Renders the literal as it should appear in generated SQL text —
    /// string literals always re-wrapped in single quotes.
    pub fn as_sql(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Str(s) => format!("'{s}'"),
        }
    }
}

/// The predicate operator: a comparison against a value, or a nullness check.
#[derive(Debug, Clone, PartialEq)]
pub enum PredOp {
    Cmp(Cmp),
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredicateTerm {
    pub col: String,
    pub op: PredOp,
    pub value: Option<Literal>,
}

impl PredicateTerm {
    /// Renders `col op value`, or `col is_null`/`col is_not_null`.
    pub fn as_sql(&self) -> String {
        match &self.op {
            PredOp::IsNull => format!("{} IS NULL", self.col),
            PredOp::IsNotNull => format!("{} IS NOT NULL", self.col),
            PredOp::Cmp(cmp) => {
                let value = self
                    .value
                    .as_ref()
                    .expect("comparison predicate always carries a value");
                format!("{} {} {}", self.col, cmp.as_sql(), value.as_sql())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    pub select: Vec<SelectItem>,
    pub where_: Option<Vec<PredicateTerm>>,
    pub group_by: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateQuery {
    pub table: String,
    pub schema: Vec<ColumnInfo>,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    pub table: String,
    pub src_path: String,
    pub rows_per_shard: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropQuery {
    pub table: String,
    pub if_exists: bool,
}
