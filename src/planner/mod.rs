mod fanout;
mod plan;
mod query_maker;

pub use fanout::fanout;
pub use plan::Plan;
pub use query_maker::InputsLevel;

use crate::parser::SelectQuery;
use std::path::{Path, PathBuf};

/// Compiles a SELECT into a level-ordered plan of materialising statements.
///
/// `shards` is the target table's ordered shard file-name list; `data_path`
/// is the database root; `tmp_dir` is scratch space for map/reduce
/// intermediates; `out_path` is where the final level's output lands.
pub fn build_plan(query: &SelectQuery, shards: &[String], data_path: &Path, tmp_dir: &Path, out_path: &Path) -> Plan {
    let k = fanout(shards.len() as u64) as usize;

    let mut levels: Vec<Vec<String>> = Vec::new();

    let mut current_paths: Vec<PathBuf> = Vec::with_capacity(shards.len());
    let mut map_sqls: Vec<String> = Vec::with_capacity(shards.len());
    for shard in shards {
        let (sql, out) = query_maker::create_map_job(query, shard, data_path, tmp_dir);
        map_sqls.push(sql);
        current_paths.push(out);
    }
    levels.push(map_sqls);

    let mut ran_intermediate = false;
    let mut level = 0usize;
    while current_paths.len() > k {
        ran_intermediate = true;
        let mut next_sqls = Vec::new();
        let mut next_paths = Vec::new();
        for (chunk_i, chunk) in current_paths.chunks(k).enumerate() {
            let tag = format!("r{level}_{chunk_i}");
            let (sql, out) = query_maker::create_intermediate_reduce_job(query, chunk, tmp_dir, &tag);
            next_sqls.push(sql);
            next_paths.push(out);
        }
        levels.push(next_sqls);
        current_paths = next_paths;
        level += 1;
    }

    let inputs_level = if ran_intermediate {
        InputsLevel::Intermediate
    } else {
        InputsLevel::Map
    };
    let (final_sql, output_path) = query_maker::create_final_reduce_job(query, &current_paths, out_path, inputs_level);
    levels.push(vec![final_sql]);

    Plan { levels, output_path }
}
