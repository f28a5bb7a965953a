//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Este módulo lee un request directamente desde el socket.
//!
//! ## Formato aceptado
//!
//! ```text
//! POST /form HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! \r\n
//! name=Ada
//! ```
//!
//! 1. **Request Line**: `METHOD /path [VERSION]`, terminada en CRLF o LF
//! 2. **Headers**: se leen y se descartan para todos los métodos, sin
//!    guardarlos en memoria
//! 3. **Body**: solo para POST, hasta `MAX_BODY_BYTES`
//!
//! La request line no puede pasar de `MAX_LINE_BYTES`.
//!
//! ## Limitación conocida
//!
//! No se interpreta `Content-Length`. El body de un POST es todo lo que
//! está disponible en el stream sin bloquear una vez leídos los headers.
//! Un cliente lento que envía el body en varios paquetes puede ver su body
//! truncado.

use std::io::{self, BufRead, BufReader, Read};
use std::net::TcpStream;

/// Largo máximo de la request line, incluido el terminador
pub const MAX_LINE_BYTES: usize = 16 * 1024;

/// Tamaño máximo del body de un POST
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Métodos HTTP
///
/// Cualquier método distinto de GET/POST se conserva como `OTHER`; el
/// rechazo (405) es una decisión de routing, no del parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un archivo
    GET,

    /// POST - Enviar un formulario
    POST,

    /// Cualquier otro token, ya en mayúsculas
    OTHER(String),
}

impl Method {
    /// Parsea un método HTTP sin distinguir mayúsculas
    fn from_token(token: &str) -> Self {
        let upper = token.to_ascii_uppercase();
        match upper.as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            _ => Method::OTHER(upper),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::OTHER(token) => token,
        }
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// El cliente cerró sin enviar nada (o solo una línea vacía)
    EmptyRequest,

    /// La request line no tiene al menos método y path
    InvalidRequestLine(String),

    /// La request line o el body superan su límite
    TooLarge(&'static str),

    /// Falló la lectura del stream
    Io(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::EmptyRequest => write!(f, "Empty request"),
            ParseError::InvalidRequestLine(line) => {
                write!(f, "Invalid request line format: {:?}", line)
            }
            ParseError::TooLarge(part) => write!(f, "Request {} too large", part),
            ParseError::Io(e) => write!(f, "I/O error while reading request: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        ParseError::Io(e.to_string())
    }
}

/// Fuente de bytes que sabe decir si hay datos listos sin bloquear
///
/// Es lo que usamos para delimitar el body de un POST.
pub trait Readiness {
    /// `true` si una lectura devolvería datos inmediatamente
    fn bytes_ready(&self) -> io::Result<bool>;
}

impl Readiness for TcpStream {
    fn bytes_ready(&self) -> io::Result<bool> {
        self.set_nonblocking(true)?;
        let mut probe = [0u8; 1];
        let ready = match self.peek(&mut probe) {
            // Ok(0) significa EOF: el cliente cerró su lado
            Ok(n) => Ok(n > 0),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e),
        };
        self.set_nonblocking(false)?;
        ready
    }
}

impl Readiness for [u8] {
    fn bytes_ready(&self) -> io::Result<bool> {
        Ok(!self.is_empty())
    }
}

impl<T: Readiness + ?Sized> Readiness for &T {
    fn bytes_ready(&self) -> io::Result<bool> {
        (**self).bytes_ready()
    }
}

/// Request parseado. Inmutable una vez construido.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Método HTTP
    method: Method,

    /// Path tal cual llegó (ej: "/index.html?x=1")
    path: String,

    /// Body crudo (vacío salvo en POST)
    body: Vec<u8>,
}

impl Request {
    /// Parsea un request desde un buffer en memoria
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use secure_web_server::http::{Method, Request};
    ///
    /// let request = Request::parse(b"get /index.html HTTP/1.1\r\n\r\n").unwrap();
    ///
    /// assert_eq!(request.method(), &Method::GET);
    /// assert_eq!(request.path(), "/index.html");
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let mut reader = BufReader::new(buffer);
        Self::read_from(&mut reader)
    }

    /// Lee y parsea un request desde un stream
    ///
    /// Consume la request line y los headers; el body solo para POST.
    pub fn read_from<S>(reader: &mut BufReader<S>) -> Result<Self, ParseError>
    where
        S: Read + Readiness,
    {
        // 1. Request line
        let line = match Self::read_line(reader)? {
            Some(line) => line,
            None => return Err(ParseError::EmptyRequest),
        };
        if line.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }
        let (method, path) = Self::parse_request_line(&line)?;

        // 2. Headers, para no dejar bytes sin leer en el socket
        Self::skip_headers(reader)?;

        // 3. Body solo para POST
        let body = if method == Method::POST {
            Self::read_available_body(reader)?
        } else {
            Vec::new()
        };

        Ok(Request { method, path, body })
    }

    /// Parsea la request line
    ///
    /// Formato: `METHOD PATH [VERSION]`. La versión no se valida.
    fn parse_request_line(line: &str) -> Result<(Method, String), ParseError> {
        let mut parts = line.split_whitespace();

        match (parts.next(), parts.next()) {
            (Some(method), Some(path)) => Ok((Method::from_token(method), path.to_string())),
            _ => Err(ParseError::InvalidRequestLine(line.to_string())),
        }
    }

    /// Lee una línea terminada en LF (con o sin CR)
    ///
    /// Retorna `None` si el stream terminó antes de leer un solo byte.
    fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, ParseError> {
        let mut raw = Vec::new();
        let read = reader
            .by_ref()
            .take(MAX_LINE_BYTES as u64)
            .read_until(b'\n', &mut raw)?;
        if read == 0 {
            return Ok(None);
        }
        if read == MAX_LINE_BYTES && !raw.ends_with(b"\n") {
            return Err(ParseError::TooLarge("line"));
        }

        if raw.ends_with(b"\n") {
            raw.pop();
            if raw.ends_with(b"\r") {
                raw.pop();
            }
        }

        Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
    }

    /// Descarta headers hasta la línea vacía o EOF
    fn skip_headers<R: BufRead>(reader: &mut R) -> Result<(), ParseError> {
        while let Some(false) = Self::discard_line(reader)? {}
        Ok(())
    }

    /// Consume una línea sin copiarla
    ///
    /// Retorna `Some(true)` si la línea estaba vacía (`\r\n` o `\n`),
    /// `Some(false)` si tenía contenido y `None` en EOF antes de leer nada.
    fn discard_line<R: BufRead>(reader: &mut R) -> Result<Option<bool>, ParseError> {
        let mut len = 0usize;
        let mut last_cr = false;

        loop {
            let chunk = reader.fill_buf()?;
            if chunk.is_empty() {
                return Ok(if len == 0 { None } else { Some(false) });
            }

            match chunk.iter().position(|&b| b == b'\n') {
                Some(i) => {
                    if i > 0 {
                        last_cr = chunk[i - 1] == b'\r';
                    }
                    let blank = len + i == 0 || (len + i == 1 && last_cr);
                    reader.consume(i + 1);
                    return Ok(Some(blank));
                }
                None => {
                    let read = chunk.len();
                    last_cr = chunk[read - 1] == b'\r';
                    len += read;
                    reader.consume(read);
                }
            }
        }
    }

    /// Lee el body mientras haya bytes disponibles sin bloquear
    fn read_available_body<S>(reader: &mut BufReader<S>) -> Result<Vec<u8>, ParseError>
    where
        S: Read + Readiness,
    {
        let mut body = Vec::new();

        loop {
            if reader.buffer().is_empty() && !reader.get_ref().bytes_ready()? {
                break;
            }

            let chunk = reader.fill_buf()?;
            if chunk.is_empty() {
                break;
            }
            let len = chunk.len();
            if body.len() + len > MAX_BODY_BYTES {
                return Err(ParseError::TooLarge("body"));
            }
            body.extend_from_slice(chunk);
            reader.consume(len);
        }

        Ok(body)
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Obtiene el path crudo del request
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene el body del request
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
