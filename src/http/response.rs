//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Una respuesta se construye en el handler y se serializa una sola vez
//! sobre el socket.
//!
//! ## Formato
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/html\r\n
//! \r\n
//! <html>...
//! ```
//!
//! El único header que emitimos es `Content-Type`, y solo cuando la
//! respuesta tiene uno. La conexión se cierra después de cada respuesta,
//! así que el cliente delimita el body por el cierre del socket.

use super::StatusCode;
use std::io::{self, Write};

/// Respuesta HTTP completa
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Código de estado HTTP (200, 404, etc.)
    status: StatusCode,

    /// Valor del header `Content-Type`, si lo hay
    content_type: Option<String>,

    /// Cuerpo de la respuesta (puede ser vacío)
    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta sin `Content-Type` ni body
    ///
    /// # Ejemplo
    /// ```
    /// use secure_web_server::http::{Response, StatusCode};
    ///
    /// let response = Response::new(StatusCode::Ok);
    /// assert!(response.body().is_empty());
    /// ```
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// Establece el `Content-Type`
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Establece el cuerpo desde un string
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self
    }

    /// Establece el cuerpo desde bytes (archivos binarios)
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Respuesta de texto plano
    ///
    /// # Ejemplo
    /// ```
    /// use secure_web_server::http::{Response, StatusCode};
    ///
    /// let response = Response::text(StatusCode::Ok, "hola");
    /// assert_eq!(response.content_type(), Some("text/plain"));
    /// ```
    pub fn text(status: StatusCode, body: &str) -> Self {
        Self::new(status)
            .with_content_type("text/plain")
            .with_body(body)
    }

    /// Respuesta de error cuyo body es la reason phrase del código
    ///
    /// Usado para 403, 404 y 405.
    pub fn error(status: StatusCode) -> Self {
        Self::text(status, &status.to_string())
    }

    /// Convierte la respuesta a bytes listos para el socket
    ///
    /// - Status line: `HTTP/1.1 200 OK\r\n`
    /// - `Content-Type: ...\r\n` (solo si existe)
    /// - Línea vacía: `\r\n`
    /// - Body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(64 + self.body.len());

        let status_line = format!("HTTP/1.1 {}\r\n", self.status);
        result.extend_from_slice(status_line.as_bytes());

        if let Some(content_type) = &self.content_type {
            let header_line = format!("Content-Type: {}\r\n", content_type);
            result.extend_from_slice(header_line.as_bytes());
        }

        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);

        result
    }

    /// Escribe la respuesta completa en el stream
    ///
    /// El body se escribe entero, sin chunking. Cualquier error de I/O se
    /// devuelve al caller (normalmente el cliente ya se desconectó).
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()
    }

    /// Obtiene el código de estado de la respuesta
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Obtiene una referencia al body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
