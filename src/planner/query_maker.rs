use crate::parser::{AggFunc, SelectItem, SelectQuery};
use std::path::{Path, PathBuf};

/// Which level the final reduce step's inputs came from: straight from MAP
/// outputs (when the fanout already covers every shard) or from a chain of
/// intermediate reduces. Tracked explicitly by the caller rather than
/// re-derived from `inputs.len()` after the reduce loop exits, since a
/// fanout-sized final level is indistinguishable from a single intermediate
/// reduce by length alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputsLevel {
    Map,
    Intermediate,
}

fn safe_ident(s: &str) -> String {
    s.replace('*', "star").replace('.', "_").replace('-', "_")
}

fn sql_quote_path(p: &Path) -> String {
    format!("'{}'", p.display())
}

fn union_all_select_star(sources: &[PathBuf]) -> String {
    sources
        .iter()
        .map(|p| format!("SELECT * FROM {}", sql_quote_path(p)))
        .collect::<Vec<_>>()
        .join(" UNION ALL ")
}

fn materialize(select_sql: &str, out_path: &Path) -> String {
    let query = format!("COPY ({select_sql}) TO '{}' (FORMAT PARQUET);", out_path.display());
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn group_cols(q: &SelectQuery) -> Vec<String> {
    if let Some(g) = &q.group_by {
        return g.clone();
    }
    let has_agg = q.select.iter().any(|s| matches!(s, SelectItem::Agg(_)));
    if has_agg {
        return q
            .select
            .iter()
            .filter_map(|s| match s {
                SelectItem::Column(c) => Some(c.name.clone()),
                SelectItem::Agg(_) => None,
            })
            .collect();
    }
    Vec::new()
}

fn iter_aggs(q: &SelectQuery) -> impl Iterator<Item = &crate::parser::AggExpr> {
    q.select.iter().filter_map(|s| match s {
        SelectItem::Agg(a) => Some(a),
        SelectItem::Column(_) => None,
    })
}

fn has_sum_for_col<'a>(q: &'a SelectQuery, col: &str) -> Option<&'a crate::parser::AggExpr> {
    iter_aggs(q).find(|a| a.func == AggFunc::Sum && a.col == col)
}

fn map_alias(func: AggFunc, col: &str) -> String {
    let id = safe_ident(col);
    match func {
        AggFunc::Count => format!("c_{id}"),
        AggFunc::Sum => format!("s_{id}"),
        AggFunc::Min => format!("min_{id}"),
        AggFunc::Max => format!("max_{id}"),
        AggFunc::Avg => unreachable!("avg is decomposed before reaching map_alias"),
    }
}

fn merge_func(func: AggFunc) -> &'static str {
    match func {
        AggFunc::Count | AggFunc::Sum => "sum",
        AggFunc::Min => "min",
        AggFunc::Max => "max",
        AggFunc::Avg => unreachable!("avg is decomposed before reaching merge_func"),
    }
}

/// Deduped `(func, col)` pairs the MAP step must compute. `avg(x)` expands
/// into `sum(x)` and `count(x)`.
fn required_map_measures(q: &SelectQuery) -> Vec<(AggFunc, String)> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for agg in iter_aggs(q) {
        let pairs: &[AggFunc] = if agg.func == AggFunc::Avg {
            &[AggFunc::Sum, AggFunc::Count]
        } else {
            std::slice::from_ref(&agg.func)
        };
        for &f in pairs {
            let key = (f, agg.col.clone());
            if seen.insert(key.clone()) {
                out.push(key);
            }
        }
    }
    out
}

pub fn create_map_select(q: &SelectQuery, shard_name: &str, data_path: &Path) -> String {
    let group = group_cols(q);
    let mut select_parts: Vec<String> = Vec::new();

    for s in &q.select {
        if let SelectItem::Column(c) = s {
            if !select_parts.contains(&c.name) {
                select_parts.push(c.name.clone());
            }
        }
    }
    for c in &group {
        if !select_parts.contains(c) {
            select_parts.push(c.clone());
        }
    }
    for (func, col) in required_map_measures(q) {
        select_parts.push(format!("{}({col}) AS {}", func.as_str(), map_alias(func, &col)));
    }
    if select_parts.is_empty() {
        select_parts.push("*".to_string());
    }

    let source = data_path.join(&q.table).join(shard_name);
    let mut sql = format!("SELECT {} FROM {}", select_parts.join(", "), sql_quote_path(&source));

    if let Some(where_) = &q.where_ {
        let preds = where_.iter().map(|p| p.as_sql()).collect::<Vec<_>>().join(" AND ");
        sql.push_str(&format!(" WHERE {preds}"));
    }
    if !group.is_empty() {
        sql.push_str(&format!(" GROUP BY {}", group.join(", ")));
    }
    sql
}

/// Returns `(sql_to_execute, output_path)`.
pub fn create_map_job(q: &SelectQuery, shard_name: &str, data_path: &Path, tmp_dir: &Path) -> (String, PathBuf) {
    let out_path = tmp_dir.join(format!("map__{}__{}.parquet", q.table, safe_ident(shard_name)));
    let select_sql = create_map_select(q, shard_name, data_path);
    (materialize(&select_sql, &out_path), out_path)
}

pub fn create_intermediate_reduce_select(q: &SelectQuery, map_outputs: &[PathBuf]) -> String {
    let group = group_cols(q);
    let union_sql = union_all_select_star(map_outputs);
    let has_agg = q.select.iter().any(|s| matches!(s, SelectItem::Agg(_)));

    if !has_agg {
        if !group.is_empty() {
            return format!(
                "WITH partial AS ({union_sql}) SELECT {} FROM partial GROUP BY {}",
                group.join(", "),
                group.join(", ")
            );
        }
        return format!("WITH partial AS ({union_sql}) SELECT * FROM partial");
    }

    let mut reduce_select: Vec<String> = group.clone();

    for item in &q.select {
        let agg = match item {
            SelectItem::Column(_) => continue,
            SelectItem::Agg(a) => a,
        };

        if agg.func == AggFunc::Avg {
            let avg_alias = agg.alias.clone().unwrap_or_else(|| format!("avg_{}", safe_ident(&agg.col)));
            let cnt_map = map_alias(AggFunc::Count, &agg.col);
            reduce_select.push(format!("sum({cnt_map}) AS {avg_alias}_count_partial"));
            if has_sum_for_col(q, &agg.col).is_none() {
                let sum_map = map_alias(AggFunc::Sum, &agg.col);
                reduce_select.push(format!("sum({sum_map}) AS {avg_alias}_sum_partial"));
            }
            continue;
        }

        let map_col = map_alias(agg.func, &agg.col);
        let merge = merge_func(agg.func);

        let out_alias = if agg.func == AggFunc::Count && agg.col == "*" {
            "count_star_partial".to_string()
        } else if let Some(alias) = &agg.alias {
            format!("{alias}_partial")
        } else {
            format!("{}_{}_partial", agg.func.as_str(), safe_ident(&agg.col))
        };

        reduce_select.push(format!("{merge}({map_col}) AS {out_alias}"));
    }

    let mut sql = format!(
        "WITH partial AS ({union_sql}) SELECT {} FROM partial",
        reduce_select.join(", ")
    );
    if !group.is_empty() {
        sql.push_str(&format!(" GROUP BY {}", group.join(", ")));
    }
    sql
}

/// Returns `(sql_to_execute, output_path)`.
pub fn create_intermediate_reduce_job(
    q: &SelectQuery,
    map_outputs: &[PathBuf],
    tmp_dir: &Path,
    tag: &str,
) -> (String, PathBuf) {
    let out_path = tmp_dir.join(format!("reduce__{}__{}.parquet", q.table, safe_ident(tag)));
    let select_sql = create_intermediate_reduce_select(q, map_outputs);
    (materialize(&select_sql, &out_path), out_path)
}

pub fn create_final_reduce_select(q: &SelectQuery, inputs: &[PathBuf], inputs_level: InputsLevel) -> String {
    let group = group_cols(q);
    let union_sql = union_all_select_star(inputs);
    let has_agg = q.select.iter().any(|s| matches!(s, SelectItem::Agg(_)));

    if !has_agg {
        if !group.is_empty() {
            return format!(
                "WITH partial AS ({union_sql}) SELECT {} FROM partial GROUP BY {}",
                group.join(", "),
                group.join(", ")
            );
        }
        return format!("WITH partial AS ({union_sql}) SELECT * FROM partial");
    }

    let mut final_select: Vec<String> = group.clone();

    for item in &q.select {
        let agg = match item {
            SelectItem::Column(_) => continue,
            SelectItem::Agg(a) => a,
        };
        let func = agg.func;

        if inputs_level == InputsLevel::Map {
            match func {
                AggFunc::Avg => {
                    let avg_alias = agg.alias.clone().unwrap_or_else(|| format!("avg_{}", safe_ident(&agg.col)));
                    let s_col = map_alias(AggFunc::Sum, &agg.col);
                    let c_col = map_alias(AggFunc::Count, &agg.col);
                    final_select.push(format!("sum({s_col}) / nullif(sum({c_col}), 0) AS {avg_alias}"));
                }
                AggFunc::Count if agg.col == "*" => {
                    let out_col = agg.alias.clone().unwrap_or_else(|| "count_star".to_string());
                    final_select.push(format!("sum(c_star) AS {out_col}"));
                }
                AggFunc::Sum => {
                    let out_col = agg.alias.clone().unwrap_or_else(|| format!("sum_{}", safe_ident(&agg.col)));
                    final_select.push(format!("sum({}) AS {out_col}", map_alias(AggFunc::Sum, &agg.col)));
                }
                AggFunc::Count => {
                    let out_col = agg.alias.clone().unwrap_or_else(|| format!("count_{}", safe_ident(&agg.col)));
                    final_select.push(format!("sum({}) AS {out_col}", map_alias(AggFunc::Count, &agg.col)));
                }
                AggFunc::Min => {
                    let out_col = agg.alias.clone().unwrap_or_else(|| format!("min_{}", safe_ident(&agg.col)));
                    final_select.push(format!("min({}) AS {out_col}", map_alias(AggFunc::Min, &agg.col)));
                }
                AggFunc::Max => {
                    let out_col = agg.alias.clone().unwrap_or_else(|| format!("max_{}", safe_ident(&agg.col)));
                    final_select.push(format!("max({}) AS {out_col}", map_alias(AggFunc::Max, &agg.col)));
                }
            }
            continue;
        }

        match func {
            AggFunc::Avg => {
                let avg_alias = agg.alias.clone().unwrap_or_else(|| format!("avg_{}", safe_ident(&agg.col)));
                let sum_partial_col = match has_sum_for_col(q, &agg.col) {
                    Some(sum_agg) => {
                        let base = sum_agg.alias.clone().unwrap_or_else(|| format!("sum_{}", safe_ident(&sum_agg.col)));
                        format!("{base}_partial")
                    }
                    None => format!("{avg_alias}_sum_partial"),
                };
                let cnt_partial_col = format!("{avg_alias}_count_partial");
                final_select.push(format!(
                    "sum({sum_partial_col}) / nullif(sum({cnt_partial_col}), 0) AS {avg_alias}"
                ));
            }
            AggFunc::Count if agg.col == "*" => {
                let out_col = agg.alias.clone().unwrap_or_else(|| "count_star".to_string());
                final_select.push(format!("sum(count_star_partial) AS {out_col}"));
            }
            _ => {
                let in_col = match &agg.alias {
                    Some(alias) => format!("{alias}_partial"),
                    None => format!("{}_{}_partial", func.as_str(), safe_ident(&agg.col)),
                };
                let out_col = agg.alias.clone().unwrap_or_else(|| format!("{}_{}", func.as_str(), safe_ident(&agg.col)));
                final_select.push(format!("{}({in_col}) AS {out_col}", merge_func(func)));
            }
        }
    }

    let mut sql = format!(
        "WITH partial AS ({union_sql}) SELECT {} FROM partial",
        final_select.join(", ")
    );
    if !group.is_empty() {
        sql.push_str(&format!(" GROUP BY {}", group.join(", ")));
    }
    sql
}

/// Returns `(sql_to_execute, output_path)`.
pub fn create_final_reduce_job(
    q: &SelectQuery,
    inputs: &[PathBuf],
    out_path: &Path,
    inputs_level: InputsLevel,
) -> (String, PathBuf) {
    let select_sql = create_final_reduce_select(q, inputs, inputs_level);
    (materialize(&select_sql, out_path), out_path.to_path_buf())
}
