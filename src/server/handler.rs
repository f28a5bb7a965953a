//! # Manejo de una Conexión
//! src/server/handler.rs
//!
//! Cada conexión pasa por los estados:
//!
//! ```text
//! AwaitRequest → Routing → Responding → Closed
//! ```
//!
//! - **AwaitRequest**: si el request no se puede parsear (o el cliente
//!   cerró sin enviar nada) la conexión se cierra sin respuesta.
//! - **Routing**: `/` se convierte en `/index.html`, el path se resuelve
//!   contra el root (403 si escapa) y se despacha por método.
//! - **Responding**: se escribe la respuesta; si falla, se abandona.
//! - **Closed**: el socket se libera al salir de `handle`, pase lo que pase.

use crate::events::{EventSink, ServerEvent};
use crate::files::{PathResolver, ResolvedPath, SubmissionStore};
use crate::http::{Method, ParseError, Readiness, Request, Response, StatusCode};
use std::fs;
use std::io::{BufReader, Read};
use std::net::TcpStream;
use std::sync::Arc;

/// Archivo que se sirve para `/`
pub const INDEX_FILE: &str = "/index.html";

/// Body fijo de la respuesta a un POST
pub const ACKNOWLEDGEMENT: &str = "Form data saved successfully.";

/// Orquesta parse → resolve → (archivo | envío) → respuesta
pub struct ConnectionHandler {
    resolver: PathResolver,
    store: SubmissionStore,
    sink: Arc<dyn EventSink>,
}

impl ConnectionHandler {
    pub fn new(resolver: PathResolver, store: SubmissionStore, sink: Arc<dyn EventSink>) -> Self {
        Self {
            resolver,
            store,
            sink,
        }
    }

    /// Atiende una conexión completa
    ///
    /// Nunca propaga errores: todo lo que falla se reporta al sink. El
    /// stream se cierra al terminar la función.
    pub fn handle(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let response = {
            let mut reader = BufReader::new(&stream);
            self.respond(&mut reader, &peer)
        };

        if let Some(response) = response {
            let mut writer = &stream;
            if let Err(e) = response.write_to(&mut writer) {
                self.sink.report(ServerEvent::WriteFailed {
                    peer,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Lee el request y produce la respuesta, sin escribirla
    ///
    /// Retorna `None` cuando la conexión debe cerrarse sin responder.
    pub fn respond<S>(&self, reader: &mut BufReader<S>, peer: &str) -> Option<Response>
    where
        S: Read + Readiness,
    {
        match Request::read_from(reader) {
            Ok(request) => self.route(&request),
            Err(ParseError::EmptyRequest) => None,
            Err(e) => {
                self.sink.report(ServerEvent::ParseFailed {
                    peer: peer.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Decide la respuesta para un request ya parseado
    pub fn route(&self, request: &Request) -> Option<Response> {
        let path = routing_path(request.path());

        let resolved = match self.resolver.resolve(path) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.sink.report(ServerEvent::Forbidden {
                    path: request.path().to_string(),
                    reason: e.to_string(),
                });
                return Some(Response::error(StatusCode::Forbidden));
            }
        };

        match request.method() {
            Method::GET => self.serve_file(path, &resolved),
            Method::POST => Some(self.store_submission(request)),
            Method::OTHER(method) => {
                self.sink.report(ServerEvent::MethodRejected {
                    method: method.clone(),
                    path: request.path().to_string(),
                });
                Some(Response::error(StatusCode::MethodNotAllowed))
            }
        }
    }

    /// GET: 200 con el archivo, 404 si no existe o es un directorio
    fn serve_file(&self, path: &str, resolved: &ResolvedPath) -> Option<Response> {
        let real = match self.resolver.confine(resolved) {
            Ok(Some(real)) if real.is_file() => real,
            Ok(_) => {
                self.sink.report(ServerEvent::NotFound {
                    path: path.to_string(),
                });
                return Some(Response::error(StatusCode::NotFound));
            }
            Err(e) => {
                self.sink.report(ServerEvent::Forbidden {
                    path: path.to_string(),
                    reason: e.to_string(),
                });
                return Some(Response::error(StatusCode::Forbidden));
            }
        };

        match fs::read(&real) {
            Ok(bytes) => {
                let content_type = mime_guess::from_path(&resolved.absolute_path)
                    .first_or_octet_stream()
                    .to_string();

                self.sink.report(ServerEvent::Served {
                    path: path.to_string(),
                    content_type: content_type.clone(),
                    bytes: bytes.len(),
                });

                Some(
                    Response::new(StatusCode::Ok)
                        .with_content_type(&content_type)
                        .with_body_bytes(bytes),
                )
            }
            Err(e) => {
                // Error de lectura: se abandona la conexión
                self.sink.report(ServerEvent::ReadFailed {
                    path: path.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// POST: agrega el body al registro y responde 200 siempre
    ///
    /// Un fallo del store solo queda en el log; el cliente recibe el mismo
    /// acuse de recibo.
    fn store_submission(&self, request: &Request) -> Response {
        match self.store.append(request.body()) {
            Ok(()) => self.sink.report(ServerEvent::SubmissionStored {
                bytes: request.body().len(),
            }),
            Err(e) => self.sink.report(ServerEvent::SubmissionFailed {
                error: e.to_string(),
            }),
        }

        Response::text(StatusCode::Ok, ACKNOWLEDGEMENT)
    }
}

/// Path usado para el routing: sin query string y con `/` → `/index.html`
fn routing_path(raw: &str) -> &str {
    let path = raw.split_once('?').map_or(raw, |(path, _)| path);

    if path.is_empty() || path == "/" {
        INDEX_FILE
    } else {
        path
    }
}
