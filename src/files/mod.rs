//! # Acceso al Filesystem
//! src/files/mod.rs
//!
//! - `resolver`: mapea paths de request a rutas dentro del root
//! - `store`: registro append-only de formularios

pub mod resolver;
pub mod store;

pub use resolver::{resolve, PathResolver, ResolvedPath, SecurityError};
pub use store::SubmissionStore;
