//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Un accept loop bloqueante que entrega cada conexión al `WorkerPool`.
//! Cada worker atiende una conexión de principio a fin.
//!
//! El `Server` es dueño del pool, del handler y del sink; no hay estado
//! global. `run` bloquea el thread actual; `start` corre el loop en un
//! thread aparte y devuelve un `RunningServer` que se puede detener.
//!
//! Las conexiones en curso quedan registradas en `Connections`, así `stop`
//! puede cerrarlas aunque el cliente nunca termine de mandar su request.

use crate::config::Config;
use crate::events::{EventSink, ServerEvent};
use crate::files::{PathResolver, SubmissionStore};
use crate::server::handler::ConnectionHandler;
use crate::server::pool::WorkerPool;
use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Sockets abiertos que están siendo atendidos por algún worker
#[derive(Clone, Default)]
struct Connections {
    inner: Arc<Mutex<ConnectionTable>>,
}

#[derive(Default)]
struct ConnectionTable {
    next_id: u64,
    open: HashMap<u64, TcpStream>,
    /// Una vez cerrada, la tabla no acepta más conexiones
    closed: bool,
}

impl Connections {
    fn table(&self) -> std::sync::MutexGuard<'_, ConnectionTable> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra un clon del socket. `None` si el servidor ya se está deteniendo.
    fn track(&self, stream: &TcpStream) -> io::Result<Option<u64>> {
        let mut table = self.table();
        if table.closed {
            return Ok(None);
        }

        let id = table.next_id;
        table.next_id += 1;
        table.open.insert(id, stream.try_clone()?);
        Ok(Some(id))
    }

    fn forget(&self, id: u64) {
        self.table().open.remove(&id);
    }

    /// Cierra todos los sockets en curso; los workers bloqueados leyendo
    /// reciben EOF
    fn close_all(&self) {
        let mut table = self.table();
        table.closed = true;
        for (_, stream) in table.open.drain() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Servidor HTTP con pool de workers
pub struct Server {
    listener: TcpListener,
    handler: Arc<ConnectionHandler>,
    pool: WorkerPool,
    sink: Arc<dyn EventSink>,
    running: Arc<AtomicBool>,
    connections: Connections,
    root: PathBuf,
}

impl Server {
    /// Canonicaliza el root, abre el socket e inicia los workers
    ///
    /// El root debe existir: crearlo es tarea de quien arranca el proceso.
    pub fn bind(config: &Config, sink: Arc<dyn EventSink>) -> io::Result<Self> {
        let resolver = PathResolver::new(&config.root)?;
        let root = resolver.root().to_path_buf();
        let store = SubmissionStore::new(&root);
        let handler = Arc::new(ConnectionHandler::new(resolver, store, Arc::clone(&sink)));

        let listener = TcpListener::bind(config.address())?;
        let pool = WorkerPool::new(config.workers, Arc::clone(&sink))?;

        Ok(Self {
            listener,
            handler,
            pool,
            sink,
            running: Arc::new(AtomicBool::new(true)),
            connections: Connections::default(),
            root,
        })
    }

    /// Dirección real en la que escucha (útil con puerto 0)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Bloquea hasta que un `RunningServer::stop` lo detenga.
    ///
    /// Ningún error de una conexión individual termina el loop.
    pub fn run(self) -> io::Result<()> {
        let address = self.local_addr()?;
        self.sink.report(ServerEvent::Started {
            address: address.to_string(),
            root: self.root.display().to_string(),
            workers: self.pool.size(),
        });

        for stream in self.listener.incoming() {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            match stream {
                Ok(stream) => self.dispatch(stream),
                Err(e) => self.sink.report(ServerEvent::AcceptFailed {
                    error: e.to_string(),
                }),
            }
        }

        // Al soltar el pool se espera a los workers
        drop(self.pool);
        self.sink.report(ServerEvent::Stopped);
        Ok(())
    }

    /// Corre `run` en un thread aparte
    pub fn start(self) -> io::Result<RunningServer> {
        let address = self.local_addr()?;
        let running = Arc::clone(&self.running);
        let connections = self.connections.clone();

        let thread = thread::Builder::new()
            .name("accept-loop".to_string())
            .spawn(move || self.run())?;

        Ok(RunningServer {
            address,
            running,
            connections,
            thread: Some(thread),
        })
    }

    /// Entrega la conexión al pool (bloquea si todos los workers están ocupados)
    fn dispatch(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        self.sink.report(ServerEvent::Accepted { peer });

        let id = match self.connections.track(&stream) {
            Ok(Some(id)) => id,
            Ok(None) => {
                let _ = stream.shutdown(Shutdown::Both);
                return;
            }
            Err(e) => {
                self.sink.report(ServerEvent::AcceptFailed {
                    error: e.to_string(),
                });
                return;
            }
        };

        let handler = Arc::clone(&self.handler);
        let connections = self.connections.clone();
        let job = move || {
            handler.handle(stream);
            connections.forget(id);
        };

        if let Err(e) = self.pool.execute(job) {
            self.connections.forget(id);
            self.sink.report(ServerEvent::AcceptFailed {
                error: e.to_string(),
            });
        }
    }
}

/// Servidor corriendo en background
pub struct RunningServer {
    address: SocketAddr,
    running: Arc<AtomicBool>,
    connections: Connections,
    thread: Option<JoinHandle<io::Result<()>>>,
}

impl RunningServer {
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Detiene el accept loop y espera a que terminen los workers
    ///
    /// Las conexiones en curso se cierran con `shutdown`: un cliente que
    /// nunca termina su request no puede dejar el `stop` colgado. Las
    /// respuestas que ya se estaban escribiendo pueden quedar cortadas.
    pub fn stop(mut self) -> io::Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> io::Result<()> {
        let thread = match self.thread.take() {
            Some(thread) => thread,
            None => return Ok(()),
        };

        self.running.store(false, Ordering::SeqCst);
        // Despertar al accept bloqueado con una conexión propia
        let _ = TcpStream::connect(self.address);
        self.connections.close_all();

        thread
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "accept loop panicked"))?
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("Error al detener el servidor: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use std::fs;
    use std::io::{Read, Write};
    use tempdir::TempDir;

    fn test_config(root: &std::path::Path) -> Config {
        Config {
            port: 0,
            root: root.to_path_buf(),
            workers: 2,
            ..Config::default()
        }
    }

    fn send(address: SocketAddr, raw: &[u8]) -> String {
        let mut client = TcpStream::connect(address).unwrap();
        client.write_all(raw).unwrap();
        client.shutdown(std::net::Shutdown::Write).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[test]
    fn test_bind_requires_existing_root() {
        let config = test_config(std::path::Path::new("/definitely/not/here"));
        let sink: Arc<dyn EventSink> = Arc::new(RecordingSink::new());
        assert!(Server::bind(&config, sink).is_err());
    }

    #[test]
    fn test_start_serve_and_stop() {
        let dir = TempDir::new("tcp").unwrap();
        fs::write(dir.path().join("index.html"), b"hello").unwrap();

        let sink = RecordingSink::new();
        let server = Server::bind(&test_config(dir.path()), Arc::new(sink.clone())).unwrap();
        let running = server.start().unwrap();

        let text = send(running.address(), b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(text, "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\nhello");

        running.stop().unwrap();

        let events = sink.events();
        assert!(matches!(events.first(), Some(ServerEvent::Started { workers: 2, .. })));
        assert_eq!(events.last(), Some(&ServerEvent::Stopped));
    }

    #[test]
    fn test_peer_closed_immediately_keeps_serving() {
        let dir = TempDir::new("tcp").unwrap();
        fs::write(dir.path().join("index.html"), b"ok").unwrap();

        let server = Server::bind(&test_config(dir.path()), Arc::new(RecordingSink::new())).unwrap();
        let running = server.start().unwrap();

        // Cliente que conecta y cierra sin mandar datos
        drop(TcpStream::connect(running.address()).unwrap());

        let text = send(running.address(), b"GET /index.html HTTP/1.1\r\n\r\n");
        assert!(text.starts_with("HTTP/1.1 200 OK"));

        running.stop().unwrap();
    }

    #[test]
    fn test_stop_with_idle_client_connected() {
        let dir = TempDir::new("tcp").unwrap();
        let config = Config {
            workers: 1,
            ..test_config(dir.path())
        };
        let server = Server::bind(&config, Arc::new(RecordingSink::new())).unwrap();
        let running = server.start().unwrap();

        // Cliente que conecta y se queda callado con el socket abierto
        let _idle = TcpStream::connect(running.address()).unwrap();
        thread::sleep(std::time::Duration::from_millis(100));

        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            tx.send(running.stop().is_ok()).unwrap();
        });

        let stopped = rx.recv_timeout(std::time::Duration::from_secs(5));
        assert_eq!(stopped, Ok(true));
    }

    #[test]
    fn test_connections_closed_table_rejects_new_streams() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let connections = Connections::default();

        assert!(connections.track(&client).unwrap().is_some());
        connections.close_all();
        assert!(connections.table().open.is_empty());
        assert_eq!(connections.track(&client).unwrap(), None);
    }

    #[test]
    fn test_parse_error_closes_without_response() {
        let dir = TempDir::new("tcp").unwrap();
        let server = Server::bind(&test_config(dir.path()), Arc::new(RecordingSink::new())).unwrap();
        let running = server.start().unwrap();

        let text = send(running.address(), b"\x00\x01garbage\r\n");
        assert!(text.is_empty());

        running.stop().unwrap();
    }
}
