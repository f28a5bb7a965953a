//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Implementa el subconjunto de HTTP/1.1 que habla el servidor:
//!
//! - Parsing de la request line (y del body para POST)
//! - Construcción y escritura de responses
//! - Status codes 200, 403, 404 y 405
//!
//! Cada conexión atiende exactamente un request y luego se cierra. No hay
//! conexiones persistentes ni chunked transfer encoding.

pub mod request;   // Parsing de HTTP requests
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado HTTP

pub use request::{Method, ParseError, Readiness, Request};
pub use response::Response;
pub use status::StatusCode;
