//! Cloud namespace repository: owners, directories, and files.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use homecloud_core::error::{AppError, ErrorKind, codes};
use homecloud_core::result::AppResult;
use homecloud_entity::cloud::{
    CloudFile, CreateDirectory, CreateFile, Directory, NodeKind, Owner,
};

use super::violated_constraint;
use crate::store::{CloudStore, NodeUpdate};

/// Repository for the per-user directory/file tree.
#[derive(Debug, Clone)]
pub struct CloudRepository {
    pool: PgPool,
}

impl CloudRepository {
    /// Create a new cloud repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a write failure, turning unique violations into `duplicate-object-name`.
fn write_error(e: sqlx::Error, what: &str, virtual_path: &str) -> AppError {
    match violated_constraint(&e) {
        Some(_) => AppError::validation(format!("'{virtual_path}' already exists"))
            .with_code(codes::DUPLICATE_OBJECT_NAME),
        None => AppError::with_source(ErrorKind::Database, format!("Failed to {what}"), e),
    }
}

fn file_missing(id: Uuid) -> AppError {
    AppError::not_found(format!("File {id} not found")).with_code(codes::FILE_DOES_NOT_EXIST)
}

#[async_trait]
impl CloudStore for CloudRepository {
    async fn create_owner(&self, owner: &Owner) -> AppResult<Owner> {
        sqlx::query_as::<_, Owner>(
            "INSERT INTO cloud_owners (user_id, username, root_path, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(owner.user_id)
        .bind(&owner.username)
        .bind(&owner.root_path)
        .bind(owner.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create cloud owner", e))
    }

    async fn find_owner(&self, user_id: Uuid) -> AppResult<Option<Owner>> {
        sqlx::query_as::<_, Owner>("SELECT * FROM cloud_owners WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find cloud owner", e))
    }

    async fn create_directory(&self, data: &CreateDirectory) -> AppResult<Directory> {
        sqlx::query_as::<_, Directory>(
            "INSERT INTO cloud_directories \
                (id, owner_id, parent_id, name, virtual_name, path, virtual_path) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(data.owner_id)
        .bind(data.parent_id)
        .bind(&data.name)
        .bind(&data.virtual_name)
        .bind(&data.path)
        .bind(&data.virtual_path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "create directory", &data.virtual_path))
    }

    async fn find_directory(&self, id: Uuid) -> AppResult<Option<Directory>> {
        sqlx::query_as::<_, Directory>("SELECT * FROM cloud_directories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find directory", e))
    }

    async fn find_directory_by_virtual_path(
        &self,
        owner_id: Uuid,
        virtual_path: &str,
    ) -> AppResult<Option<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM cloud_directories WHERE owner_id = $1 AND virtual_path = $2",
        )
        .bind(owner_id)
        .bind(virtual_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find directory by path", e)
        })
    }

    async fn list_child_directories(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM cloud_directories \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 \
             ORDER BY virtual_name ASC",
        )
        .bind(owner_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list directories", e))
    }

    async fn list_directories(&self, owner_id: Uuid) -> AppResult<Vec<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM cloud_directories WHERE owner_id = $1 ORDER BY virtual_path ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list directories", e))
    }

    async fn create_file(&self, data: &CreateFile) -> AppResult<CloudFile> {
        sqlx::query_as::<_, CloudFile>(
            "INSERT INTO cloud_files \
                (id, owner_id, parent_id, name, virtual_name, path, virtual_path, \
                 size_bytes, checksum) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(data.owner_id)
        .bind(data.parent_id)
        .bind(&data.name)
        .bind(&data.virtual_name)
        .bind(&data.path)
        .bind(&data.virtual_path)
        .bind(data.size_bytes)
        .bind(data.checksum.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "create file", &data.virtual_path))
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<CloudFile>> {
        sqlx::query_as::<_, CloudFile>("SELECT * FROM cloud_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    async fn find_file_by_virtual_path(
        &self,
        owner_id: Uuid,
        virtual_path: &str,
    ) -> AppResult<Option<CloudFile>> {
        sqlx::query_as::<_, CloudFile>(
            "SELECT * FROM cloud_files WHERE owner_id = $1 AND virtual_path = $2",
        )
        .bind(owner_id)
        .bind(virtual_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file by path", e))
    }

    async fn list_child_files(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<CloudFile>> {
        sqlx::query_as::<_, CloudFile>(
            "SELECT * FROM cloud_files \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 \
             ORDER BY virtual_name ASC",
        )
        .bind(owner_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }

    async fn list_files(&self, owner_id: Uuid) -> AppResult<Vec<CloudFile>> {
        sqlx::query_as::<_, CloudFile>(
            "SELECT * FROM cloud_files WHERE owner_id = $1 ORDER BY virtual_path ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }

    async fn update_nodes(&self, updates: &[NodeUpdate]) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        for update in updates {
            let sql = match update.kind {
                NodeKind::Directory => {
                    "UPDATE cloud_directories SET parent_id = $2, name = $3, virtual_name = $4, \
                     path = $5, virtual_path = $6, last_modified = NOW() WHERE id = $1"
                }
                NodeKind::File => {
                    "UPDATE cloud_files SET parent_id = $2, name = $3, virtual_name = $4, \
                     path = $5, virtual_path = $6, last_modified = NOW() WHERE id = $1"
                }
            };
            sqlx::query(sql)
                .bind(update.id)
                .bind(update.parent_id)
                .bind(&update.name)
                .bind(&update.virtual_name)
                .bind(&update.path)
                .bind(&update.virtual_path)
                .execute(&mut *tx)
                .await
                .map_err(|e| write_error(e, "update node", &update.virtual_path))?;
        }

        // Unique constraints are deferred, so collisions surface here.
        tx.commit().await.map_err(|e| {
            let hint = updates.first().map(|u| u.virtual_path.as_str()).unwrap_or("");
            write_error(e, "commit node updates", hint)
        })
    }

    async fn set_file_content(
        &self,
        id: Uuid,
        size_bytes: i64,
        checksum: &str,
        content_type: Option<&str>,
    ) -> AppResult<CloudFile> {
        sqlx::query_as::<_, CloudFile>(
            "UPDATE cloud_files SET uploaded = TRUE, size_bytes = $2, checksum = $3, \
             content_type = $4, last_modified = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(size_bytes)
        .bind(checksum)
        .bind(content_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record upload", e))?
        .ok_or_else(|| file_missing(id))
    }

    async fn clear_file_content(&self, id: Uuid) -> AppResult<CloudFile> {
        sqlx::query_as::<_, CloudFile>(
            "UPDATE cloud_files SET uploaded = FALSE, size_bytes = 0, checksum = NULL, \
             content_type = NULL, last_modified = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to clear content", e))?
        .ok_or_else(|| file_missing(id))
    }

    async fn delete_file(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM cloud_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete file", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_directory(&self, id: Uuid) -> AppResult<bool> {
        // Child directories and files go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM cloud_directories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete directory", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}
