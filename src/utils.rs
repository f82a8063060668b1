use thiserror::Error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// 自定义错误类型
#[derive(Error, Debug)]
pub enum TlError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DbError(#[from] rusqlite::Error),

    #[error("Table not declared in index: {0}")]
    UndeclaredTable(String),

    #[error("No rows found for table: {0}")]
    EmptyTable(String),

    #[error("No entries found in asset catalog for: {0}")]
    EmptyCatalog(String),

    #[error("Leaf key is not a decimal integer: {0}")]
    NonNumericKey(String),

    #[error("Tree shape conflict at: {0}")]
    TreeShape(String),

    #[error("Unknown asset type for: {0}")]
    UnknownAssetKind(String),

    #[error("Invalid content hash: {0}")]
    InvalidContentHash(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),
}

/// 读取并反序列化JSON文件
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, TlError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// 序列化并写入JSON文件（带缩进，不转义非ASCII字符）
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), TlError> {
    ensure_parent_dir(path)?;
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// 确保文件的父目录存在
pub fn ensure_parent_dir(path: &Path) -> Result<(), TlError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// 备份文件名的时间戳后缀
fn backup_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// 给路径追加时间戳后缀，返回新路径
///
/// 注意：不是替换扩展名，而是整体追加（"a/b.json" -> "a/b.json.<时间戳>"），
/// 这样被备份的文件不会再被当作JSON扫描到。
pub fn timestamped_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}", backup_timestamp()));
    PathBuf::from(name)
}

/// 将文件重命名为带时间戳的备份
///
/// 用于结构性变化前的备份以及损坏文件的隔离。
pub fn backup_rename(path: &Path) -> Result<PathBuf, TlError> {
    if !path.exists() {
        return Err(TlError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "原文件不存在",
        )));
    }

    let backup_path = timestamped_path(path);
    std::fs::rename(path, &backup_path)?;
    Ok(backup_path)
}

/// 将文件复制为带时间戳的备份（保留原文件）
pub fn backup_copy(src: &Path, dest_base: &Path) -> Result<PathBuf, TlError> {
    let backup_path = timestamped_path(dest_base);
    ensure_parent_dir(&backup_path)?;
    std::fs::copy(src, &backup_path)?;
    Ok(backup_path)
}

/// 递归收集目录下所有的JSON文件
///
/// 结果按路径排序，保证多次运行遍历顺序一致。目录不存在时返回空列表。
pub fn collect_json_files(dir: &Path) -> Result<Vec<PathBuf>, TlError> {
    let mut files = Vec::new();
    if dir.is_dir() {
        collect_json_files_into(dir, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn collect_json_files_into(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), TlError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files_into(&path, files)?;
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
    Ok(())
}
