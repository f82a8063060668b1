//! 数据库文本的中间文件构建与权威再生成
//!
//! 正向：从游戏数据库拉取当前文本，哈希去重后与上一轮已最终化的
//! 翻译树比对，生成带变更标记的可编辑记录文件。
//! 反向：把译者完成的记录重新展开成按键路径组织的翻译输出树，
//! 这是唯一允许整体覆盖输出的路径。

use crate::config::{TableIndex, WorkspaceConfig};
use crate::hashing::content_hash;
use crate::index_tree::{LeafEntry, Node};
use crate::record::TranslationRecord;
use crate::store::ContentStore;
use crate::utils::{collect_json_files, load_json, save_json, TlError};
use std::collections::HashMap;
use std::path::Path;

/// 上一轮最终化翻译的查找表：完整键路径段 -> 叶子记录
type PriorTable = HashMap<Vec<String>, LeafEntry>;

/// 一次构建的统计信息
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub tables: usize,
    pub records: usize,
    /// 因源文本相同被合并进既有记录的键数量
    pub deduped_keys: usize,
}

/// 把输出/编辑目录下的文件路径切成相对路径段（叶子段去掉 .json）
fn path_segments(root: &Path, path: &Path) -> Result<Vec<String>, TlError> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| TlError::MalformedDocument(format!("{:?} not under {:?}", path, root)))?;

    let mut segments: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if let Some(last) = segments.last_mut() {
        if let Some(stem) = last.strip_suffix(".json") {
            *last = stem.to_string();
        }
    }

    Ok(segments)
}

/// 加载上一轮最终化的翻译树
///
/// 新抽取的行要和这棵树比对：树里已有同样键路径的条目时，旧译文
/// 被带进新记录。输出目录下出现未声明的表是致命的配置错误。
fn load_prior(
    cfg: &WorkspaceConfig,
    index: &TableIndex,
) -> Result<HashMap<String, PriorTable>, TlError> {
    let mut prior: HashMap<String, PriorTable> = HashMap::new();

    for path in collect_json_files(&cfg.mdb_output_dir)? {
        let mut segments = path_segments(&cfg.mdb_output_dir, &path)?;
        let table = segments.remove(0);
        index.columns(&table)?;

        let entries: serde_json::Map<String, serde_json::Value> = load_json(&path)?;
        let table_map = prior.entry(table).or_default();

        for (leaf_id, value) in entries {
            let entry: LeafEntry = serde_json::from_value(value)?;
            let mut key_path = segments.clone();
            key_path.push(leaf_id);
            table_map.insert(key_path, entry);
        }
    }

    Ok(prior)
}

/// 从数据库生成可编辑的中间记录文件
///
/// # 行为
/// 1. 加载上一轮最终化的翻译树
/// 2. 逐表查询声明的列
/// 3. 逐行哈希，按（类别，哈希）去重：首次出现的行创建记录，
///    后续相同哈希的行只把键路径挂进 `keys`
/// 4. 新记录与旧树比对，决定 `new`/`edited` 并带回旧译文
/// 5. 复合主键≥2列的表按类别落成 `<表名>/<类别>.json`，
///    单键表直接落成 `<表名>.json`
pub fn build_intermediate(
    cfg: &WorkspaceConfig,
    store: &dyn ContentStore,
    index: &TableIndex,
) -> Result<BuildSummary, TlError> {
    println!("=== 生成可编辑文件 ===");

    let prior = load_prior(cfg, index)?;
    std::fs::create_dir_all(&cfg.mdb_editing_dir)?;

    let mut summary = BuildSummary::default();

    for (table, columns) in index.tables() {
        println!("{}", table);

        let rows = store.query(table, columns)?;
        let two_level = columns.len() > 2;

        let mut order: Vec<Option<i64>> = Vec::new();
        let mut groups: HashMap<Option<i64>, Vec<TranslationRecord>> = HashMap::new();
        let mut positions: HashMap<(Option<i64>, String), usize> = HashMap::new();

        for row in rows {
            let category = if two_level { Some(row.key[0]) } else { None };
            let hash = content_hash(&row.text);

            // 同类别下相同源文本只保留一条记录
            if let Some(&pos) = positions.get(&(category, hash.clone())) {
                if let Some(bucket) = groups.get_mut(&category) {
                    bucket[pos].keys.push(row.key);
                    summary.deduped_keys += 1;
                }
                continue;
            }

            let mut record = TranslationRecord::fresh(&row.text, row.key.clone());

            let segments: Vec<String> = row.key.iter().map(|k| k.to_string()).collect();
            if let Some(old) = prior.get(table).and_then(|t| t.get(&segments)) {
                record.inherit(&old.text, &old.hash);
            }

            let bucket = groups.entry(category).or_insert_with(|| {
                order.push(category);
                Vec::new()
            });
            positions.insert((category, record.hash.clone()), bucket.len());
            bucket.push(record);
        }

        for category in &order {
            let records = &groups[category];
            let path = match category {
                Some(id) => cfg
                    .mdb_editing_dir
                    .join(table)
                    .join(format!("{}.json", id)),
                None => cfg.mdb_editing_dir.join(format!("{}.json", table)),
            };
            save_json(&path, records)?;
            summary.records += records.len();
        }
        summary.tables += 1;
    }

    println!("Done");
    Ok(summary)
}

/// 权威再生成：把译者完成的记录展开回翻译输出树
///
/// 只保留 `text` 非空的记录；每条记录的 `keys` 被重新展开成
/// 每个键路径一条 `{text, hash}` 叶子。输入本身已经代表译者的
/// 最终意图，所以这里（也只有这里）允许整体覆盖输出文件。
pub fn regenerate_output(cfg: &WorkspaceConfig, index: &TableIndex) -> Result<(), TlError> {
    println!("=== 生成数据库翻译输出 ===");

    std::fs::create_dir_all(&cfg.mdb_output_dir)?;

    let mut table_order: Vec<String> = Vec::new();
    let mut trees: HashMap<String, Node> = HashMap::new();

    for path in collect_json_files(&cfg.mdb_editing_dir)? {
        let segments = path_segments(&cfg.mdb_editing_dir, &path)?;
        let table = segments[0].clone();
        index.columns(&table)?;

        let records: Vec<TranslationRecord> = load_json(&path)?;

        for record in records {
            if record.text.is_empty() {
                continue;
            }

            let node = trees.entry(table.clone()).or_insert_with(|| {
                table_order.push(table.clone());
                Node::branch()
            });

            for key in &record.keys {
                let (leaf, branch_path) = key.split_last().ok_or_else(|| {
                    TlError::MalformedDocument(format!("empty key path in table {}", table))
                })?;
                node.insert(
                    branch_path,
                    *leaf,
                    LeafEntry {
                        text: record.text.clone(),
                        hash: record.hash.clone(),
                    },
                )?;
            }
        }
    }

    for table in &table_order {
        if let Some(node) = trees.get(table) {
            node.write(&cfg.mdb_output_dir.join(table), true)?;
        }
    }

    println!("Done");
    Ok(())
}
