//! Business logic for the idea board.

pub mod page;
pub mod principal;
pub mod services;

pub use page::Page;
pub use principal::Principal;
pub use services::*;
