//! In-process implementation of every store trait.
//!
//! Mirrors the PostgreSQL schema's constraints (case-insensitive unique
//! usernames and emails, per-owner unique paths, cascading deletes) so the
//! service layer behaves the same on either backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use homecloud_core::error::codes;
use homecloud_core::types::pagination::{PageRequest, PageResponse};
use homecloud_core::{AppError, AppResult};
use homecloud_entity::cloud::{
    CloudFile, CreateDirectory, CreateFile, Directory, NodeKind, Owner,
};
use homecloud_entity::user::{
    CreateUser, EmailHistory, EmailToken, PasswordResetToken, UpdateProfile, User,
};

use crate::store::{CloudStore, NodeUpdate, TokenStore, UserStore};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    email_tokens: HashMap<String, EmailToken>,
    reset_tokens: HashMap<String, PasswordResetToken>,
    email_history: Vec<EmailHistory>,
    owners: HashMap<Uuid, Owner>,
    directories: HashMap<Uuid, Directory>,
    files: HashMap<Uuid, CloudFile>,
}

impl State {
    fn user_mut(&mut self, id: Uuid) -> AppResult<&mut User> {
        self.users.get_mut(&id).ok_or_else(|| {
            AppError::not_found(format!("User {id} not found")).with_code(codes::USER_DOES_NOT_EXIST)
        })
    }

    fn email_in_use(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
    }

    /// Whether another node of the same table already uses `path` or `virtual_path`.
    fn node_clash(
        &self,
        kind: NodeKind,
        owner_id: Uuid,
        except: Option<Uuid>,
        path: &str,
        virtual_path: &str,
    ) -> bool {
        let clash = |id: Uuid, o: Uuid, p: &str, vp: &str| {
            Some(id) != except && o == owner_id && (p == path || vp == virtual_path)
        };
        match kind {
            NodeKind::Directory => self
                .directories
                .values()
                .any(|d| clash(d.id, d.owner_id, &d.path, &d.virtual_path)),
            NodeKind::File => self
                .files
                .values()
                .any(|f| clash(f.id, f.owner_id, &f.path, &f.virtual_path)),
        }
    }

    fn subtree_directories(&self, root: Uuid) -> Vec<Uuid> {
        let mut out = vec![root];
        let mut cursor = 0;
        while cursor < out.len() {
            let current = out[cursor];
            out.extend(
                self.directories
                    .values()
                    .filter(|d| d.parent_id == Some(current))
                    .map(|d| d.id),
            );
            cursor += 1;
        }
        out
    }
}

fn duplicate(virtual_path: &str) -> AppError {
    AppError::validation(format!("'{virtual_path}' already exists"))
        .with_code(codes::DUPLICATE_OBJECT_NAME)
}

fn sorted_by_name<T>(mut items: Vec<T>, key: impl Fn(&T) -> &str) -> Vec<T> {
    items.sort_by(|a, b| key(a).cmp(key(b)));
    items
}

/// Store holding all data in a single lock-protected state.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, data: &CreateUser) -> AppResult<User> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&data.username))
        {
            return Err(
                AppError::conflict(format!("Username '{}' is already taken", data.username))
                    .with_code(codes::USERNAME_TAKEN),
            );
        }
        if state.email_in_use(&data.email, None) {
            return Err(
                AppError::conflict(format!("Email '{}' is already registered", data.email))
                    .with_code(codes::EMAIL_TAKEN),
            );
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            username: data.username.clone(),
            email: data.email.clone(),
            email_validated: false,
            email_sent_at: None,
            password_hash: data.password_hash.clone(),
            nick: None,
            language: data.language.clone(),
            avatar_updated_at: None,
            role: data.role,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self, page: &PageRequest) -> AppResult<PageResponse<User>> {
        let state = self.state.read().await;
        let all = sorted_by_name(state.users.values().cloned().collect(), |u| u.username.as_str());
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(PageResponse::new(items, page.page, page.page_size, total))
    }

    async fn update_profile(&self, id: Uuid, data: &UpdateProfile) -> AppResult<User> {
        let mut state = self.state.write().await;
        let user = state.user_mut(id)?;
        if let Some(nick) = &data.nick {
            user.nick = (!nick.is_empty()).then(|| nick.clone());
        }
        if let Some(language) = &data.language {
            user.language = language.clone();
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        let user = state.user_mut(id)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn set_email(
        &self,
        id: Uuid,
        email: &str,
        validated: bool,
        sent_at: Option<DateTime<Utc>>,
    ) -> AppResult<User> {
        let mut state = self.state.write().await;
        if state.email_in_use(email, Some(id)) {
            return Err(AppError::conflict(format!("Email '{email}' is already registered"))
                .with_code(codes::EMAIL_TAKEN));
        }
        let user = state.user_mut(id)?;
        user.email = email.to_string();
        user.email_validated = validated;
        user.email_sent_at = sent_at;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn mark_email_validated(&self, id: Uuid) -> AppResult<()> {
        let mut state = self.state.write().await;
        let user = state.user_mut(id)?;
        user.email_validated = true;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn set_email_sent_at(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        self.state.write().await.user_mut(id)?.email_sent_at = Some(at);
        Ok(())
    }

    async fn set_avatar_updated_at(&self, id: Uuid, at: Option<DateTime<Utc>>) -> AppResult<()> {
        let mut state = self.state.write().await;
        let user = state.user_mut(id)?;
        user.avatar_updated_at = at;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn record_login(&self, id: Uuid) -> AppResult<()> {
        self.state.write().await.user_mut(id)?.last_login_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn save_email_token(&self, token: &EmailToken) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.email_tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_email_token(&self, token: &str) -> AppResult<Option<EmailToken>> {
        Ok(self.state.read().await.email_tokens.get(token).cloned())
    }

    async fn delete_email_tokens_for(&self, user_id: Uuid) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.email_tokens.retain(|_, t| t.user_id != user_id);
        Ok(())
    }

    async fn save_reset_token(&self, token: &PasswordResetToken) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.reset_tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> AppResult<Option<PasswordResetToken>> {
        Ok(self.state.read().await.reset_tokens.get(token).cloned())
    }

    async fn delete_reset_tokens_for(&self, user_id: Uuid) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.reset_tokens.retain(|_, t| t.user_id != user_id);
        Ok(())
    }

    async fn record_email(&self, user_id: Uuid, email: &str, activated: bool) -> AppResult<()> {
        let mut state = self.state.write().await;
        match state
            .email_history
            .iter_mut()
            .find(|h| h.user_id == user_id && h.email == email)
        {
            Some(entry) => entry.activated |= activated,
            None => state.email_history.push(EmailHistory {
                id: Uuid::now_v7(),
                user_id,
                email: email.to_string(),
                activated,
                created_at: Utc::now(),
            }),
        }
        Ok(())
    }

    async fn email_history(&self, user_id: Uuid) -> AppResult<Vec<EmailHistory>> {
        let state = self.state.read().await;
        Ok(state
            .email_history
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CloudStore for MemoryStore {
    async fn create_owner(&self, owner: &Owner) -> AppResult<Owner> {
        let mut state = self.state.write().await;
        if state.owners.contains_key(&owner.user_id) {
            return Err(AppError::conflict(format!(
                "User {} already owns a namespace",
                owner.user_id
            )));
        }
        state.owners.insert(owner.user_id, owner.clone());
        Ok(owner.clone())
    }

    async fn find_owner(&self, user_id: Uuid) -> AppResult<Option<Owner>> {
        Ok(self.state.read().await.owners.get(&user_id).cloned())
    }

    async fn create_directory(&self, data: &CreateDirectory) -> AppResult<Directory> {
        let mut state = self.state.write().await;
        let (path, virtual_path) = (&data.path, &data.virtual_path);
        if state.node_clash(NodeKind::Directory, data.owner_id, None, path, virtual_path) {
            return Err(duplicate(&data.virtual_path));
        }
        let now = Utc::now();
        let dir = Directory {
            id: Uuid::now_v7(),
            owner_id: data.owner_id,
            parent_id: data.parent_id,
            name: data.name.clone(),
            virtual_name: data.virtual_name.clone(),
            path: data.path.clone(),
            virtual_path: data.virtual_path.clone(),
            created_at: now,
            last_modified: now,
        };
        state.directories.insert(dir.id, dir.clone());
        Ok(dir)
    }

    async fn find_directory(&self, id: Uuid) -> AppResult<Option<Directory>> {
        Ok(self.state.read().await.directories.get(&id).cloned())
    }

    async fn find_directory_by_virtual_path(
        &self,
        owner_id: Uuid,
        virtual_path: &str,
    ) -> AppResult<Option<Directory>> {
        let state = self.state.read().await;
        Ok(state
            .directories
            .values()
            .find(|d| d.owner_id == owner_id && d.virtual_path == virtual_path)
            .cloned())
    }

    async fn list_child_directories(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<Directory>> {
        let state = self.state.read().await;
        let children = state
            .directories
            .values()
            .filter(|d| d.owner_id == owner_id && d.parent_id == parent_id)
            .cloned()
            .collect();
        Ok(sorted_by_name(children, |d| d.virtual_name.as_str()))
    }

    async fn list_directories(&self, owner_id: Uuid) -> AppResult<Vec<Directory>> {
        let state = self.state.read().await;
        let all = state
            .directories
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(sorted_by_name(all, |d| d.virtual_path.as_str()))
    }

    async fn create_file(&self, data: &CreateFile) -> AppResult<CloudFile> {
        let mut state = self.state.write().await;
        let (path, virtual_path) = (&data.path, &data.virtual_path);
        if state.node_clash(NodeKind::File, data.owner_id, None, path, virtual_path) {
            return Err(duplicate(&data.virtual_path));
        }
        let now = Utc::now();
        let file = CloudFile {
            id: Uuid::now_v7(),
            owner_id: data.owner_id,
            parent_id: data.parent_id,
            name: data.name.clone(),
            virtual_name: data.virtual_name.clone(),
            path: data.path.clone(),
            virtual_path: data.virtual_path.clone(),
            size_bytes: data.size_bytes,
            checksum: data.checksum.clone(),
            uploaded: false,
            content_type: None,
            created_at: now,
            last_modified: now,
        };
        state.files.insert(file.id, file.clone());
        Ok(file)
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<CloudFile>> {
        Ok(self.state.read().await.files.get(&id).cloned())
    }

    async fn find_file_by_virtual_path(
        &self,
        owner_id: Uuid,
        virtual_path: &str,
    ) -> AppResult<Option<CloudFile>> {
        let state = self.state.read().await;
        Ok(state
            .files
            .values()
            .find(|f| f.owner_id == owner_id && f.virtual_path == virtual_path)
            .cloned())
    }

    async fn list_child_files(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<CloudFile>> {
        let state = self.state.read().await;
        let children = state
            .files
            .values()
            .filter(|f| f.owner_id == owner_id && f.parent_id == parent_id)
            .cloned()
            .collect();
        Ok(sorted_by_name(children, |f| f.virtual_name.as_str()))
    }

    async fn list_files(&self, owner_id: Uuid) -> AppResult<Vec<CloudFile>> {
        let state = self.state.read().await;
        let all = state
            .files
            .values()
            .filter(|f| f.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(sorted_by_name(all, |f| f.virtual_path.as_str()))
    }

    async fn update_nodes(&self, updates: &[NodeUpdate]) -> AppResult<()> {
        let mut state = self.state.write().await;

        // Apply to a scratch copy, then swap in, so a clash leaves no partial state.
        let mut directories = state.directories.clone();
        let mut files = state.files.clone();
        let now = Utc::now();
        for update in updates {
            match update.kind {
                NodeKind::Directory => {
                    let dir = directories.get_mut(&update.id).ok_or_else(|| {
                        AppError::not_found(format!("Directory {} not found", update.id))
                            .with_code(codes::DIRECTORY_DOES_NOT_EXIST)
                    })?;
                    dir.parent_id = update.parent_id;
                    dir.name = update.name.clone();
                    dir.virtual_name = update.virtual_name.clone();
                    dir.path = update.path.clone();
                    dir.virtual_path = update.virtual_path.clone();
                    dir.last_modified = now;
                }
                NodeKind::File => {
                    let file = files.get_mut(&update.id).ok_or_else(|| {
                        AppError::not_found(format!("File {} not found", update.id))
                            .with_code(codes::FILE_DOES_NOT_EXIST)
                    })?;
                    file.parent_id = update.parent_id;
                    file.name = update.name.clone();
                    file.virtual_name = update.virtual_name.clone();
                    file.path = update.path.clone();
                    file.virtual_path = update.virtual_path.clone();
                    file.last_modified = now;
                }
            }
        }

        let scratch = State {
            directories,
            files,
            ..State::default()
        };
        for update in updates {
            let owner_id = match update.kind {
                NodeKind::Directory => scratch.directories.get(&update.id).map(|d| d.owner_id),
                NodeKind::File => scratch.files.get(&update.id).map(|f| f.owner_id),
            };
            if let Some(owner_id) = owner_id {
                let (path, virtual_path) = (&update.path, &update.virtual_path);
                if scratch.node_clash(update.kind, owner_id, Some(update.id), path, virtual_path) {
                    return Err(duplicate(&update.virtual_path));
                }
            }
        }

        state.directories = scratch.directories;
        state.files = scratch.files;
        Ok(())
    }

    async fn set_file_content(
        &self,
        id: Uuid,
        size_bytes: i64,
        checksum: &str,
        content_type: Option<&str>,
    ) -> AppResult<CloudFile> {
        let mut state = self.state.write().await;
        let file = state.files.get_mut(&id).ok_or_else(|| {
            AppError::not_found(format!("File {id} not found")).with_code(codes::FILE_DOES_NOT_EXIST)
        })?;
        file.uploaded = true;
        file.size_bytes = size_bytes;
        file.checksum = Some(checksum.to_string());
        file.content_type = content_type.map(str::to_string);
        file.last_modified = Utc::now();
        Ok(file.clone())
    }

    async fn clear_file_content(&self, id: Uuid) -> AppResult<CloudFile> {
        let mut state = self.state.write().await;
        let file = state.files.get_mut(&id).ok_or_else(|| {
            AppError::not_found(format!("File {id} not found")).with_code(codes::FILE_DOES_NOT_EXIST)
        })?;
        file.uploaded = false;
        file.size_bytes = 0;
        file.checksum = None;
        file.content_type = None;
        file.last_modified = Utc::now();
        Ok(file.clone())
    }

    async fn delete_file(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.state.write().await.files.remove(&id).is_some())
    }

    async fn delete_directory(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.state.write().await;
        if !state.directories.contains_key(&id) {
            return Ok(false);
        }
        let doomed = state.subtree_directories(id);
        state
            .files
            .retain(|_, f| f.parent_id.is_none_or(|p| !doomed.contains(&p)));
        for dir in doomed {
            state.directories.remove(&dir);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homecloud_entity::user::UserRole;

    fn new_user(name: &str) -> CreateUser {
        CreateUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "hash".to_string(),
            language: "en".to_string(),
            role: UserRole::User,
        }
    }

    fn new_dir(owner: Uuid, parent: Option<&Directory>, name: &str) -> CreateDirectory {
        let (path, virtual_path) = match parent {
            Some(p) => (format!("{}{name}/", p.path), format!("{}{name}/", p.virtual_path)),
            None => (format!("cloud/user/alice/{name}/"), format!("alice/{name}/")),
        };
        CreateDirectory {
            owner_id: owner,
            parent_id: parent.map(|p| p.id),
            name: name.to_string(),
            virtual_name: name.to_string(),
            path,
            virtual_path,
        }
    }

    fn new_file(owner: Uuid, parent: &Directory, name: &str) -> CreateFile {
        CreateFile {
            owner_id: owner,
            parent_id: Some(parent.id),
            name: name.to_string(),
            virtual_name: name.to_string(),
            path: format!("{}{name}", parent.path),
            virtual_path: format!("{}{name}", parent.virtual_path),
            size_bytes: 0,
            checksum: None,
        }
    }

    #[tokio::test]
    async fn test_usernames_and_emails_unique_case_insensitive() {
        let store = MemoryStore::new();
        store.create_user(&new_user("alice")).await.unwrap();
        let err = store.create_user(&new_user("ALICE")).await.unwrap_err();
        assert_eq!(err.code, codes::USERNAME_TAKEN);

        let mut other = new_user("bob");
        other.email = "Alice@Example.com".to_string();
        let err = store.create_user(&other).await.unwrap_err();
        assert_eq!(err.code, codes::EMAIL_TAKEN);
    }

    #[tokio::test]
    async fn test_list_users_paginates_by_username() {
        let store = MemoryStore::new();
        for name in ["carol", "alice", "bob"] {
            store.create_user(&new_user(name)).await.unwrap();
        }
        let page = store.list_users(&PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(page.total_items, 3);
        let names: Vec<&str> = page.items.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_duplicate_virtual_path_rejected() {
        let store = MemoryStore::new();
        let owner = Uuid::now_v7();
        let docs = store.create_directory(&new_dir(owner, None, "docs")).await.unwrap();
        store.create_file(&new_file(owner, &docs, "a.txt")).await.unwrap();
        let err = store.create_file(&new_file(owner, &docs, "a.txt")).await.unwrap_err();
        assert_eq!(err.code, codes::DUPLICATE_OBJECT_NAME);
    }

    #[tokio::test]
    async fn test_delete_directory_cascades() {
        let store = MemoryStore::new();
        let owner = Uuid::now_v7();
        let docs = store.create_directory(&new_dir(owner, None, "docs")).await.unwrap();
        let sub = store.create_directory(&new_dir(owner, Some(&docs), "sub")).await.unwrap();
        let music = store.create_directory(&new_dir(owner, None, "music")).await.unwrap();
        store.create_file(&new_file(owner, &sub, "deep.txt")).await.unwrap();
        let kept = store.create_file(&new_file(owner, &music, "song.ogg")).await.unwrap();

        assert!(store.delete_directory(docs.id).await.unwrap());
        assert!(store.find_directory(sub.id).await.unwrap().is_none());
        let remaining = store.list_files(owner).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, kept.id);
        assert!(!store.delete_directory(docs.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_nodes_is_all_or_nothing() {
        let store = MemoryStore::new();
        let owner = Uuid::now_v7();
        let docs = store.create_directory(&new_dir(owner, None, "docs")).await.unwrap();
        let music = store.create_directory(&new_dir(owner, None, "music")).await.unwrap();

        let rename_docs = NodeUpdate {
            id: docs.id,
            kind: NodeKind::Directory,
            parent_id: None,
            name: docs.name.clone(),
            virtual_name: "papers".to_string(),
            path: docs.path.clone(),
            virtual_path: "alice/papers/".to_string(),
        };
        let clash = NodeUpdate {
            id: music.id,
            kind: NodeKind::Directory,
            parent_id: None,
            name: music.name.clone(),
            virtual_name: "papers".to_string(),
            path: music.path.clone(),
            virtual_path: "alice/papers/".to_string(),
        };
        let err = store.update_nodes(&[rename_docs.clone(), clash]).await.unwrap_err();
        assert_eq!(err.code, codes::DUPLICATE_OBJECT_NAME);
        let unchanged = store.find_directory(docs.id).await.unwrap().unwrap();
        assert_eq!(unchanged.virtual_name, "docs");

        store.update_nodes(&[rename_docs]).await.unwrap();
        let renamed = store.find_directory(docs.id).await.unwrap().unwrap();
        assert_eq!(renamed.virtual_path, "alice/papers/");
    }

    #[tokio::test]
    async fn test_email_history_upserts() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        store.record_email(user, "a@b.c", false).await.unwrap();
        store.record_email(user, "a@b.c", true).await.unwrap();
        store.record_email(user, "a@b.c", false).await.unwrap();
        let history = store.email_history(user).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].activated);
    }
}
