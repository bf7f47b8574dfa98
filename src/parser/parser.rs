use super::ast::*;
use super::lexer::tokenize;
use crate::catalog::ColumnInfo;
use crate::core::{DataType, DbError, Result};

/// Parses a raw statement string into one of the four supported query shapes.
///
/// Deterministic and total on well-formed input; never consults the
/// catalog. Any grammar violation surfaces as a [`DbError::ParseError`]
/// naming the offending sub-string.
pub fn parse(raw: &str) -> Result<Query> {
    let toks = tokenize(raw)?;
    let (head, rest) = toks.split_first().expect("tokenize never returns empty");
    match head.as_str() {
        "select" => parse_select(rest).map(Query::Select),
        "create" => parse_create(rest).map(Query::Create),
        "drop" => parse_drop(rest).map(Query::Drop),
        "insert" => parse_insert(rest).map(Query::Insert),
        other => Err(DbError::ParseError(format!("unexpected statement keyword '{other}'"))),
    }
}

fn err(toks: &[String], what: &str) -> DbError {
    DbError::ParseError(format!("{what} in '{}'", toks.join(" ")))
}

fn expect<'a>(toks: &'a [String], idx: usize, want: &str) -> Result<&'a str> {
    match toks.get(idx).map(|s| s.as_str()) {
        Some(t) if t == want => Ok(t),
        Some(t) => Err(DbError::ParseError(format!("expected '{want}', found '{t}'"))),
        None => Err(DbError::ParseError(format!("expected '{want}', found end of input"))),
    }
}

// ---------------------------------------------------------------- DROP

fn parse_drop(toks: &[String]) -> Result<DropQuery> {
    expect(toks, 0, "table")?;
    match toks.len() {
        2 => Ok(DropQuery {
            table: toks[1].clone(),
            if_exists: false,
        }),
        3 if toks[2] == "if_exists" => Ok(DropQuery {
            table: toks[1].clone(),
            if_exists: true,
        }),
        _ => Err(err(toks, "invalid DROP TABLE statement")),
    }
}

// ---------------------------------------------------------------- INSERT

fn parse_insert(toks: &[String]) -> Result<InsertQuery> {
    expect(toks, 0, "into")?;
    let table = toks.get(1).ok_or_else(|| err(toks, "missing table name"))?.clone();
    expect(toks, 2, "from")?;
    let src_path = toks.get(3).ok_or_else(|| err(toks, "missing source path"))?.clone();

    match toks.len() {
        4 => Ok(InsertQuery {
            table,
            src_path,
            rows_per_shard: None,
        }),
        6 if toks[4] == "rows_per_shard" => {
            let n: u64 = toks[5]
                .parse()
                .map_err(|_| err(toks, "rows_per_shard must be an integer"))?;
            Ok(InsertQuery {
                table,
                src_path,
                rows_per_shard: Some(n),
            })
        }
        _ => Err(err(toks, "invalid INSERT statement")),
    }
}

// ---------------------------------------------------------------- CREATE

fn parse_create(toks: &[String]) -> Result<CreateQuery> {
    expect(toks, 0, "table")?;
    let mut toks = toks;
    let if_not_exists = toks.last().map(|s| s.as_str()) == Some("if_not_exists");
    if if_not_exists {
        toks = &toks[..toks.len() - 1];
    }

    let table = toks.get(1).ok_or_else(|| err(toks, "missing table name"))?.clone();
    expect(toks, 2, "(")?;
    if toks.last().map(|s| s.as_str()) != Some(")") {
        return Err(err(toks, "CREATE TABLE column list must be parenthesised"));
    }

    let inner = &toks[3..toks.len() - 1];
    let schema = split_on_commas(inner)
        .into_iter()
        .map(parse_column_def)
        .collect::<Result<Vec<_>>>()?;

    Ok(CreateQuery {
        table,
        schema,
        if_not_exists,
    })
}

fn parse_column_def(toks: &[String]) -> Result<ColumnInfo> {
    match toks.len() {
        2 => Ok(ColumnInfo {
            name: toks[0].clone(),
            data_type: DataType::parse(&toks[1])?,
            nullable: true,
        }),
        3 if toks[2] == "is_not_null" => Ok(ColumnInfo {
            name: toks[0].clone(),
            data_type: DataType::parse(&toks[1])?,
            nullable: false,
        }),
        _ => Err(err(toks, "invalid column definition")),
    }
}

/// Splits a comma-separated token slice (commas are their own tokens after
/// punctuation padding) into the groups between them.
fn split_on_commas(toks: &[String]) -> Vec<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();
    for tok in toks {
        if tok == "," {
            groups.push(std::mem::take(&mut current));
        } else {
            current.push(tok.clone());
        }
    }
    groups.push(current);
    groups
}

// ---------------------------------------------------------------- SELECT

fn parse_select(toks: &[String]) -> Result<SelectQuery> {
    let from_idx = toks
        .iter()
        .position(|t| t == "from")
        .ok_or_else(|| err(toks, "missing FROM clause"))?;

    let select = split_on_commas(&toks[..from_idx])
        .into_iter()
        .map(|g| parse_select_item(&g))
        .collect::<Result<Vec<_>>>()?;

    let table = toks
        .get(from_idx + 1)
        .ok_or_else(|| err(toks, "missing table name after FROM"))?
        .clone();

    let where_idx = toks.iter().position(|t| t == "where");
    let group_idx = toks.iter().position(|t| t == "group_by");

    let where_ = match where_idx {
        Some(w) => {
            let end = group_idx.unwrap_or(toks.len());
            Some(parse_predicates(&toks[w + 1..end])?)
        }
        None => None,
    };

    let group_by = match group_idx {
        Some(g) => Some(parse_group_by(&toks[g + 1..])?),
        None => None,
    };

    Ok(SelectQuery {
        table,
        select,
        where_,
        group_by,
    })
}

fn parse_select_item(toks: &[String]) -> Result<SelectItem> {
    if let Some(func) = toks.first().and_then(|t| AggFunc::parse(t)) {
        expect(toks, 1, "(")?;
        let col = toks.get(2).ok_or_else(|| err(toks, "missing aggregate argument"))?.clone();
        expect(toks, 3, ")")?;
        let alias = match toks.len() {
            4 => None,
            6 if toks[4] == "as" => Some(toks[5].clone()),
            _ => return Err(err(toks, "invalid aggregate expression")),
        };
        return Ok(SelectItem::Agg(AggExpr { func, col, alias }));
    }

    match toks.len() {
        1 => Ok(SelectItem::Column(ColumnRef {
            name: toks[0].clone(),
            alias: None,
        })),
        3 if toks[1] == "as" => Ok(SelectItem::Column(ColumnRef {
            name: toks[0].clone(),
            alias: Some(toks[2].clone()),
        })),
        _ => Err(err(toks, "invalid select item")),
    }
}

fn parse_predicates(toks: &[String]) -> Result<Vec<PredicateTerm>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();
    for tok in toks {
        if tok == "and" {
            groups.push(std::mem::take(&mut current));
        } else {
            current.push(tok.clone());
        }
    }
    groups.push(current);
    groups.iter().map(|g| parse_predicate(g)).collect()
}

fn parse_predicate(toks: &[String]) -> Result<PredicateTerm> {
    match toks.len() {
        2 => {
            let op = match toks[1].as_str() {
                "is_null" => PredOp::IsNull,
                "is_not_null" => PredOp::IsNotNull,
                other => return Err(DbError::ParseError(format!("invalid null predicate '{other}'"))),
            };
            Ok(PredicateTerm {
                col: toks[0].clone(),
                op,
                value: None,
            })
        }
        3 => {
            let cmp = Cmp::parse(&toks[1])
                .ok_or_else(|| DbError::ParseError(format!("invalid comparison operator '{}'", toks[1])))?;
            Ok(PredicateTerm {
                col: toks[0].clone(),
                op: PredOp::Cmp(cmp),
                value: Some(cast_literal(&toks[2])?),
            })
        }
        _ => Err(err(toks, "invalid predicate")),
    }
}

fn cast_literal(tok: &str) -> Result<Literal> {
    if !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(i) = tok.parse::<i64>() {
            return Ok(Literal::Int(i));
        }
    }
    if tok.matches('.').count() == 1 {
        let digits_only: String = tok.chars().filter(|c| *c != '.').collect();
        if !digits_only.is_empty() && digits_only.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(f) = tok.parse::<f64>() {
                return Ok(Literal::Float(f));
            }
        }
    }
    if tok.starts_with('\'') && tok.ends_with('\'') && tok.len() >= 2 {
        return Ok(Literal::Str(tok[1..tok.len() - 1].to_string()));
    }
    Err(DbError::ParseError(format!("invalid literal '{tok}'")))
}

fn parse_group_by(toks: &[String]) -> Result<Vec<String>> {
    if toks.len() == 1 {
        return Ok(vec![toks[0].clone()]);
    }
    let mut cols = Vec::new();
    for (i, tok) in toks.iter().enumerate() {
        if i % 2 == 0 {
            cols.push(tok.clone());
        } else if tok != "," {
            return Err(err(toks, "expected comma between GROUP BY columns"));
        }
    }
    Ok(cols)
}
