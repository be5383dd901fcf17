//! API Routes
//!
//! Route handlers organized by functionality.

pub mod execute;
pub mod health;
pub mod metadata;
pub mod saved;
