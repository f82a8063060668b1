//! 资源读取抽象层
//!
//! 资源按内容哈希寻址；本地副本的分发是带外进行的，找不到某个
//! 哈希不是错误，调用方跳过该条目即可。

use crate::utils::TlError;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// 资源读取 trait
///
/// # 职责
/// - 按内容哈希查找本地资源副本
/// - 返回资源的结构化字段树（容器解码由外部能力完成）
pub trait AssetReader: Sync {
    /// 读取资源的结构化字段树
    ///
    /// # 返回
    /// - `Ok(Some(tree))`: 本地存在该内容
    /// - `Ok(None)`: 本地没有该内容（非致命，调用方跳过）
    fn load_tree(&self, hash: &str) -> Result<Option<Value>, TlError>;

    /// 读取图集资源解码后的贴图字节
    fn load_texture(&self, hash: &str) -> Result<Option<Vec<u8>>, TlError>;
}

/// 按内容寻址目录的默认实现
///
/// 布局：`<data_dir>/<哈希前2位>/<哈希>`，字段树以JSON形式存放；
/// 贴图是同路径加 `.png` 后缀的解码结果。
pub struct DirectoryAssetReader {
    data_dir: PathBuf,
}

impl DirectoryAssetReader {
    pub fn new(data_dir: PathBuf) -> Self {
        DirectoryAssetReader { data_dir }
    }

    /// 哈希对应的本地路径
    fn blob_path(&self, hash: &str) -> Result<PathBuf, TlError> {
        let prefix = hash
            .get(..2)
            .ok_or_else(|| TlError::InvalidContentHash(hash.to_string()))?;
        Ok(self.data_dir.join(prefix).join(hash))
    }
}

impl AssetReader for DirectoryAssetReader {
    fn load_tree(&self, hash: &str) -> Result<Option<Value>, TlError> {
        let path = self.blob_path(hash)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn load_texture(&self, hash: &str) -> Result<Option<Vec<u8>>, TlError> {
        let mut name = self.blob_path(hash)?.into_os_string();
        name.push(".png");
        let path = Path::new(&name);

        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read(path)?))
    }
}
