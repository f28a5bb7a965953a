//! # Secure Web Server
//! src/lib.rs
//!
//! Servidor HTTP concurrente que sirve archivos estáticos desde un
//! directorio raíz restringido y guarda los formularios recibidos por POST
//! en un registro append-only.
//!
//! ## Arquitectura
//!
//! - `http`: parsing de requests y escritura de responses
//! - `files`: resolución segura de paths y registro de envíos
//! - `server`: accept loop, pool de workers y manejo de cada conexión
//! - `events`: eventos operacionales y su destino (log)
//! - `config`: configuración por CLI y variables de entorno
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use std::sync::Arc;
//! use secure_web_server::config::Config;
//! use secure_web_server::events::LogSink;
//! use secure_web_server::server::Server;
//!
//! let config = Config::default();
//! let server = Server::bind(&config, Arc::new(LogSink)).expect("Error al iniciar servidor");
//! server.run().expect("Error en el accept loop");
//! ```

pub mod config;
pub mod events;
pub mod files;
pub mod http;
pub mod server;
