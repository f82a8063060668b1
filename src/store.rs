//! 外部数据源抽象层
//!
//! 该模块定义了对游戏数据库的只读查询接口，支持依赖注入和测试 mock。
//! 解析游戏二进制容器不在本层职责内。

use crate::utils::TlError;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// 文本表的一行：复合主键 + 源文本
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// 复合主键（声明列中除最后一列外的所有列）
    pub key: Vec<i64>,
    /// 源文本（声明列的最后一列）
    pub text: String,
}

/// 资源清单的一行
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRow {
    pub row_index: i64,
    pub file_name: String,
    /// 内容哈希，既是变更检测信号也是按内容寻址的查找键
    pub hash: String,
}

/// 文本表只读查询 trait
///
/// # 职责
/// - 按声明的列从指定表读出所有行
/// - 不做任何写操作
pub trait ContentStore {
    /// 查询一个表
    ///
    /// # 参数
    /// * `table` - 表名（必须已在表索引中声明）
    /// * `columns` - 有序列名，最后一列是源文本列
    ///
    /// # 错误
    /// 声明过的表查不到任何行视为致命错误
    fn query(&self, table: &str, columns: &[String]) -> Result<Vec<TableRow>, TlError>;
}

/// 资源清单只读查询 trait
pub trait AssetCatalog {
    /// 按文件名模式列出资源行，按文件名升序
    fn list(&self, patterns: &[&str]) -> Result<Vec<AssetRow>, TlError>;
}

/// 基于SQLite的文本表查询实现
pub struct SqliteContentStore {
    conn: Connection,
}

impl SqliteContentStore {
    /// 以只读方式打开游戏主数据库
    pub fn open(path: &Path) -> Result<Self, TlError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(SqliteContentStore { conn })
    }
}

impl ContentStore for SqliteContentStore {
    fn query(&self, table: &str, columns: &[String]) -> Result<Vec<TableRow>, TlError> {
        // 表名和列名来自表索引配置，不是用户输入；加引号以允许
        // "index" 这类与SQL关键字同名的游戏列名
        let column_list = columns
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM \"{}\"", column_list, table);

        let mut stmt = self.conn.prepare(&sql)?;
        let key_count = columns.len() - 1;

        let rows = stmt
            .query_map([], |row| {
                let mut key = Vec::with_capacity(key_count);
                for i in 0..key_count {
                    key.push(row.get::<_, i64>(i)?);
                }
                let text: String = row.get(key_count)?;
                Ok(TableRow { key, text })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Err(TlError::EmptyTable(table.to_string()));
        }

        Ok(rows)
    }
}

/// 基于SQLite的资源清单实现
///
/// 元数据库的表结构（a(i, n, h)）由游戏客户端决定，属于外部契约。
pub struct SqliteAssetCatalog {
    conn: Connection,
}

impl SqliteAssetCatalog {
    /// 以只读方式打开资源元数据库
    pub fn open(path: &Path) -> Result<Self, TlError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(SqliteAssetCatalog { conn })
    }
}

impl AssetCatalog for SqliteAssetCatalog {
    fn list(&self, patterns: &[&str]) -> Result<Vec<AssetRow>, TlError> {
        let conditions = (1..=patterns.len())
            .map(|i| format!("n LIKE ?{}", i))
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!("SELECT i, n, h FROM a WHERE {} ORDER BY n ASC", conditions);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(patterns.iter()), |row| {
                Ok(AssetRow {
                    row_index: row.get(0)?,
                    file_name: row.get(1)?,
                    hash: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_master_db(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE text_data ("category" INTEGER, "index" INTEGER, "text" TEXT);
            INSERT INTO text_data VALUES (6, 1, 'スペシャルウィーク');
            INSERT INTO text_data VALUES (6, 2, 'サイレンススズカ');
            CREATE TABLE empty_table ("id" INTEGER, "message" TEXT);
            "#,
        )
        .unwrap();
    }

    fn create_meta_db(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE a (i INTEGER, n TEXT, h TEXT);
            INSERT INTO a VALUES (2, 'race/storyrace/text/storyrace_009001001', 'bb');
            INSERT INTO a VALUES (1, 'live/musicscores/m1001/m1001_lyrics', 'aa');
            INSERT INTO a VALUES (3, 'atlas/home/home_tex', 'cc');
            "#,
        )
        .unwrap();
    }

    #[test]
    fn test_query_table() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("master.mdb");
        create_master_db(&db_path);

        let store = SqliteContentStore::open(&db_path).unwrap();
        let columns = vec![
            "category".to_string(),
            "index".to_string(),
            "text".to_string(),
        ];
        let rows = store.query("text_data", &columns).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, vec![6, 1]);
        assert_eq!(rows[0].text, "スペシャルウィーク");
    }

    #[test]
    fn test_empty_table_is_fatal() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("master.mdb");
        create_master_db(&db_path);

        let store = SqliteContentStore::open(&db_path).unwrap();
        let columns = vec!["id".to_string(), "message".to_string()];
        assert!(matches!(
            store.query("empty_table", &columns),
            Err(TlError::EmptyTable(_))
        ));
    }

    #[test]
    fn test_catalog_patterns_and_order() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("meta.db");
        create_meta_db(&db_path);

        let catalog = SqliteAssetCatalog::open(&db_path).unwrap();
        let rows = catalog
            .list(&["live/%lyrics", "race/storyrace/text/%"])
            .unwrap();

        // 按文件名升序，atlas行不匹配
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].file_name, "live/musicscores/m1001/m1001_lyrics");
        assert_eq!(rows[1].hash, "bb");
    }
}
