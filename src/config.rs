use crate::utils::{load_json, TlError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 工作目录布局配置
///
/// 所有路径都相对于运行目录（或配置文件中写绝对路径）。
/// `editing` 下是给译者直接编辑的中间文件，`translations` 下是
/// 最终交付给打包侧的输出文件。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// 按内容哈希寻址的游戏数据目录（<hash前2位>/<hash>）
    pub data_dir: PathBuf,
    /// 数据库文本的可编辑中间文件目录
    pub mdb_editing_dir: PathBuf,
    /// 数据库文本的翻译输出目录
    pub mdb_output_dir: PathBuf,
    /// 资源文本（剧情/歌词/图集）的可编辑中间文件目录
    pub assets_editing_dir: PathBuf,
    /// 资源文本的翻译输出目录
    pub assets_output_dir: PathBuf,
    /// 游戏主数据库（文本表）路径
    pub master_db_path: PathBuf,
    /// 资源元数据库（文件名/哈希清单）路径
    pub meta_db_path: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        WorkspaceConfig {
            data_dir: PathBuf::from("data"),
            mdb_editing_dir: PathBuf::from("editing/mdb"),
            mdb_output_dir: PathBuf::from("translations/mdb"),
            assets_editing_dir: PathBuf::from("editing/assets"),
            assets_output_dir: PathBuf::from("translations/assets"),
            master_db_path: PathBuf::from("master.mdb"),
            meta_db_path: PathBuf::from("meta.db"),
        }
    }
}

impl WorkspaceConfig {
    /// 从JSON文件加载配置；文件不存在时使用默认布局
    pub fn load(path: &Path) -> Result<Self, TlError> {
        if !path.exists() {
            return Ok(WorkspaceConfig::default());
        }
        load_json(path)
    }
}

/// 表索引：表名 -> 有序列名列表
///
/// 每个表除最后一列外都是复合主键列，最后一列是源文本列。
/// 保持声明顺序，保证多次运行按同样的顺序处理各表。
#[derive(Debug, Clone)]
pub struct TableIndex {
    tables: Vec<(String, Vec<String>)>,
}

impl TableIndex {
    /// 从JSON对象字符串解析（键顺序即处理顺序）
    pub fn from_json_str(json: &str) -> Result<Self, TlError> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;

        let mut tables = Vec::with_capacity(map.len());
        for (table, value) in map {
            let columns: Vec<String> = serde_json::from_value(value)?;
            tables.push((table, columns));
        }

        Ok(TableIndex { tables })
    }

    /// 内置的默认表索引
    pub fn embedded() -> Result<Self, TlError> {
        TableIndex::from_json_str(include_str!("../data/table_index.json"))
    }

    /// 从磁盘文件加载；文件不存在时回退到内置索引
    pub fn load_or_embedded(path: &Path) -> Result<Self, TlError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            TableIndex::from_json_str(&content)
        } else {
            TableIndex::embedded()
        }
    }

    /// 按声明顺序遍历所有表
    pub fn tables(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tables
            .iter()
            .map(|(table, columns)| (table.as_str(), columns.as_slice()))
    }

    /// 查询某个表声明的列；未声明的表是致命的配置错误
    pub fn columns(&self, table: &str) -> Result<&[String], TlError> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, columns)| columns.as_slice())
            .ok_or_else(|| TlError::UndeclaredTable(table.to_string()))
    }
}
