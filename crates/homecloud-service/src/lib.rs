//! # homecloud-service
//!
//! Business logic for HomeCloud. Each service orchestrates the stores,
//! the storage manager, and the auth primitives to implement one group of
//! use cases. Dependencies are injected at construction time.

pub mod account;
pub mod cloud;
pub mod context;
pub mod mail;
pub mod services;

pub use account::{AccountService, AvatarService, AvatarSize, AvatarUrls, RegisterInput};
pub use cloud::{DirectoryService, FileService, TransferService};
pub use context::RequestContext;
pub use mail::{LogMailer, MailMessage, Mailer, MemoryMailer};
pub use services::Services;
