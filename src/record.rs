use crate::hashing::content_hash;
use serde::{Deserialize, Serialize};

/// 编辑文件的结构版本号
pub const SCHEMA_VERSION: u32 = 4;

/// 一条可编辑的翻译记录
///
/// 同一类别范围内源文本相同（哈希相同）的所有键位置共享一条记录，
/// `keys` 里存着这些键路径。字段名和 `keys` 的编码方式是与译者
/// 工具之间的稳定契约，不能改动。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslationRecord {
    pub version: u32,
    /// 共享该记录的所有键路径；为控制文件体积，序列化成内嵌的
    /// JSON字符串而非原生数组，读取时需要再解析一次
    #[serde(with = "keys_as_json_string")]
    pub keys: Vec<Vec<i64>>,
    pub source: String,
    pub text: String,
    pub prev_text: String,
    pub hash: String,
    pub prev_hash: Option<String>,
    pub new: bool,
    pub edited: bool,
}

impl TranslationRecord {
    /// 为一行新抽取的源文本创建记录
    pub fn fresh(source: &str, key: Vec<i64>) -> Self {
        TranslationRecord {
            version: SCHEMA_VERSION,
            keys: vec![key],
            source: source.to_string(),
            text: String::new(),
            prev_text: String::new(),
            hash: content_hash(source),
            prev_hash: None,
            new: true,
            edited: false,
        }
    }

    /// 继承上一轮已保存的翻译状态
    ///
    /// 源文本哈希变了则标记 `edited`；旧译文同时写入 `text` 和
    /// `prev_text`，绝不清空，被替代的哈希记入 `prev_hash`。
    pub fn inherit(&mut self, old_text: &str, old_hash: &str) {
        self.new = false;
        if self.hash != old_hash {
            self.edited = true;
        }
        self.prev_hash = Some(old_hash.to_string());
        self.text = old_text.to_string();
        self.prev_text = old_text.to_string();
    }
}

/// `keys` 字段的内嵌JSON字符串编解码
mod keys_as_json_string {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(keys: &Vec<Vec<i64>>, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = serde_json::to_string(keys).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<i64>>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        serde_json::from_str(&encoded).map_err(D::Error::custom)
    }
}
