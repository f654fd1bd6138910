//! Common utilities and shared types for ideaboard.
//!
//! This crate provides foundational components used across all ideaboard crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Passwords**: Argon2 hashing via [`hash_password`] / [`verify_password`]
//! - **Tokens**: Signed access/refresh tokens via [`JwtManager`]
//! - **Storage**: Attachment storage backends
//!
//! # Example
//!
//! ```no_run
//! use ideaboard_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod password;
pub mod storage;
pub mod token;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use password::{hash_password, verify_password};
pub use storage::{LocalStorage, StorageBackend, StoredFile, attachment_key, file_extension};
pub use token::{Claims, JwtManager, TokenType};
