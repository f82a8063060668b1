use sha2::{Digest, Sha256};

/// 计算内容哈希（SHA-256十六进制）
///
/// 同一份源文本始终产生同一个哈希，作为去重键和变更检测信号使用。
pub fn content_hash(text: &str) -> String {
    content_hash_bytes(text.as_bytes())
}

/// 计算字节内容的哈希
pub fn content_hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
