//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! 1. `tcp`: escucha en un puerto y acepta conexiones
//! 2. `pool`: workers de tamaño fijo que atienden las conexiones
//! 3. `handler`: parsea, enruta y responde un request por conexión

pub mod handler;
pub mod pool;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use handler::ConnectionHandler;
pub use pool::WorkerPool;
pub use tcp::{RunningServer, Server};
