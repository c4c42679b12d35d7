// ==========================================
// 设备数据集导入系统 - 项目文档仓储
// ==========================================
// 存储方式: 整个 Project 序列化为一份 JSON 文档，存于单行表
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::domain::project::Project;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

// ==========================================
// ProjectRepository Trait
// ==========================================
pub trait ProjectRepository: Send + Sync {
    /// 读取项目（库中尚无项目时返回 None）
    fn load(&self) -> RepositoryResult<Option<Project>>;

    /// 保存项目（整体替换）
    fn save(&self, project: &Project) -> RepositoryResult<()>;
}

// ==========================================
// SqliteProjectRepository
// ==========================================
pub struct SqliteProjectRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProjectRepository {
    /// 基于已有连接创建（负责建表）
    pub fn new(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        {
            let conn = repo.get_conn()?;
            configure_sqlite_connection(&conn)?;
            ensure_schema(&conn)?;
        }
        Ok(repo)
    }

    /// 打开项目库文件
    pub fn open<P: AsRef<Path>>(db_path: P) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path.as_ref()).map_err(|e| {
            RepositoryError::DatabaseConnectionError(format!(
                "{}: {}",
                db_path.as_ref().display(),
                e
            ))
        })?;
        Self::new(Arc::new(Mutex::new(conn)))
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl ProjectRepository for SqliteProjectRepository {
    fn load(&self) -> RepositoryResult<Option<Project>> {
        let conn = self.get_conn()?;
        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM project_document WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match document {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, project: &Project) -> RepositoryResult<()> {
        let document = serde_json::to_string(project)?;
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        tx.execute(
            r#"
            INSERT INTO project_document (id, name, mode, document, saved_at)
            VALUES (1, ?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
              name = excluded.name,
              mode = excluded.mode,
              document = excluded.document,
              saved_at = excluded.saved_at
            "#,
            params![
                project.metadata.name,
                project.mode().to_string(),
                document,
                Utc::now().to_rfc3339(),
            ],
        )?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tracing::debug!(project = %project.metadata.name, bytes = document.len(), "项目已保存");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{EntryKey, EquipmentEntry};
    use crate::domain::keys::CompositeKey;
    use crate::domain::registry::{DataTypeDescriptor, DataTypeRegistry};
    use crate::domain::types::DatasetSide;

    fn repo() -> SqliteProjectRepository {
        let conn = Connection::open_in_memory().unwrap();
        SqliteProjectRepository::new(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_load_empty_store() {
        assert!(repo().load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let registry = DataTypeRegistry::standard();
        let mut project = Project::new("Plant A", &registry);
        project
            .dataset_mut(DatasetSide::Old)
            .upsert(
                &DataTypeDescriptor::scenario_with_secondary("LVCBDuty"),
                EntryKey::Scenario(CompositeKey::with_secondary("CB-1", "SWGR-1", "Main-Min")),
                EquipmentEntry::new().with_field("Ip", "25.1"),
            )
            .unwrap();

        let repo = repo();
        repo.save(&project).unwrap();
        repo.save(&project).unwrap();

        let loaded = repo.load().unwrap().unwrap();
        assert_eq!(loaded, project);
    }

    #[test]
    fn test_corrupt_document_is_serialization_error() {
        let repo = repo();
        repo.get_conn()
            .unwrap()
            .execute(
                "INSERT INTO project_document (id, name, mode, document, saved_at) VALUES (1, 'x', 'STANDARD', '{', 'now')",
                [],
            )
            .unwrap();
        assert!(matches!(repo.load(), Err(RepositoryError::SerializationError(_))));
    }
}
