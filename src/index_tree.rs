//! 层级索引树
//!
//! 把「类别键路径 -> 叶子记录」的关联落盘成一棵目录树：分支层是
//! 子目录，叶子层是一个按整数键排序的JSON文件。节点在构造时就确定
//! 是分支还是叶子，不依赖运行时的字段嗅探。

use crate::utils::{ensure_parent_dir, load_json, TlError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 叶子记录：某个键位置上的翻译文本及其源文本哈希
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeafEntry {
    pub text: String,
    pub hash: String,
}

/// 索引树节点
///
/// 分支按名字映射到子节点（落盘为子目录），叶子按整数键映射到
/// 记录（落盘为一个JSON文件）。
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Branch(BTreeMap<String, Node>),
    Leaf(BTreeMap<i64, LeafEntry>),
}

impl Node {
    /// 新建空分支节点
    pub fn branch() -> Self {
        Node::Branch(BTreeMap::new())
    }

    /// 沿键路径插入一条叶子记录
    ///
    /// 路径上缺失的分支会按需创建；空分支在收到第一条记录时转为
    /// 叶子。在叶子下面继续走路径、或往非空分支直接插记录，都是
    /// 形状冲突错误。
    pub fn insert(&mut self, path: &[i64], leaf_id: i64, entry: LeafEntry) -> Result<(), TlError> {
        match self {
            Node::Leaf(entries) => {
                if !path.is_empty() {
                    return Err(TlError::TreeShape(format!(
                        "leaf node cannot contain branch key {}",
                        path[0]
                    )));
                }
                entries.insert(leaf_id, entry);
                Ok(())
            }
            Node::Branch(children) => match path.split_first() {
                None => {
                    if !children.is_empty() {
                        return Err(TlError::TreeShape(format!(
                            "branch node cannot hold leaf entry {}",
                            leaf_id
                        )));
                    }
                    let mut entries = BTreeMap::new();
                    entries.insert(leaf_id, entry);
                    *self = Node::Leaf(entries);
                    Ok(())
                }
                Some((head, rest)) => children
                    .entry(head.to_string())
                    .or_insert_with(Node::branch)
                    .insert(rest, leaf_id, entry),
            },
        }
    }

    /// 把树写到磁盘
    ///
    /// # 参数
    /// * `base` - 当前节点对应的路径（叶子写成 `<base>.json`）
    /// * `overwrite` - false 时合并既有文件：磁盘上已有的键原样保留，
    ///   只补充缺失的键，保证不冲掉译者已有的编辑；true 时整体替换，
    ///   仅供权威再生成路径使用
    pub fn write(&self, base: &Path, overwrite: bool) -> Result<(), TlError> {
        match self {
            Node::Branch(children) => {
                for (name, child) in children {
                    child.write(&base.join(name), overwrite)?;
                }
                Ok(())
            }
            Node::Leaf(entries) => write_leaf(base, entries, overwrite),
        }
    }
}

/// 叶子文件路径：在节点路径后追加 .json
fn leaf_file_path(base: &Path) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

fn write_leaf(base: &Path, entries: &BTreeMap<i64, LeafEntry>, overwrite: bool) -> Result<(), TlError> {
    let path = leaf_file_path(base);

    let mut merged: BTreeMap<i64, Value> = BTreeMap::new();
    for (id, entry) in entries {
        merged.insert(*id, serde_json::to_value(entry)?);
    }

    if !overwrite && path.exists() {
        // 既有条目原样保留（连同哈希一起，之后用于检测变更）
        let existing: serde_json::Map<String, Value> = load_json(&path)?;
        for (key, value) in existing {
            let id = parse_leaf_key(&key)?;
            merged.insert(id, value);
        }
    }

    // 按整数键排序后输出
    let mut sorted = serde_json::Map::new();
    for (id, value) in merged {
        sorted.insert(id.to_string(), value);
    }

    ensure_parent_dir(&path)?;
    std::fs::write(&path, serde_json::to_string_pretty(&sorted)?)?;
    Ok(())
}

/// 解析叶子键；非十进制整数的键是明确定义的错误
fn parse_leaf_key(key: &str) -> Result<i64, TlError> {
    key.parse::<i64>()
        .map_err(|_| TlError::NonNumericKey(key.to_string()))
}
