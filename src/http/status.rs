//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! El servidor solo emite cuatro códigos:
//!
//! - **200 OK**: archivo servido o formulario recibido
//! - **403 Forbidden**: el path intenta salir del directorio raíz
//! - **404 Not Found**: archivo inexistente o directorio
//! - **405 Method Not Allowed**: método distinto de GET/POST

/// Códigos de estado que soporta nuestro servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK - La petición fue exitosa
    Ok = 200,

    /// 403 Forbidden - Path fuera del root
    Forbidden = 403,

    /// 404 Not Found - Recurso no encontrado
    NotFound = 404,

    /// 405 Method Not Allowed - Método no soportado
    MethodNotAllowed = 405,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use secure_web_server::http::StatusCode;
    /// assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
        }
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
