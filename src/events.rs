//! # Eventos Operacionales
//! src/events.rs
//!
//! El núcleo del servidor no escribe logs directamente: reporta eventos a un
//! `EventSink` que recibe al construirse. En producción el sink es
//! `LogSink`, que los manda al facade `log` como una línea JSON; en los
//! tests se usa `RecordingSink` para inspeccionarlos.

use log::{debug, error, info, warn, Level};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

/// Algo que pasó en el servidor y que vale la pena registrar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    Started { address: String, root: String, workers: usize },
    Stopped,
    Accepted { peer: String },
    AcceptFailed { error: String },
    ParseFailed { peer: String, error: String },
    Forbidden { path: String, reason: String },
    Served { path: String, content_type: String, bytes: usize },
    NotFound { path: String },
    ReadFailed { path: String, error: String },
    MethodRejected { method: String, path: String },
    WriteFailed { peer: String, error: String },
    SubmissionStored { bytes: usize },
    SubmissionFailed { error: String },
    WorkerPanicked { worker: String, message: String },
}

impl ServerEvent {
    /// Nivel de log que corresponde a cada evento
    pub fn level(&self) -> Level {
        match self {
            ServerEvent::Started { .. } | ServerEvent::Stopped => Level::Info,
            ServerEvent::Served { .. } | ServerEvent::SubmissionStored { .. } => Level::Info,
            ServerEvent::Accepted { .. } => Level::Debug,
            ServerEvent::NotFound { .. }
            | ServerEvent::MethodRejected { .. }
            | ServerEvent::ParseFailed { .. }
            | ServerEvent::Forbidden { .. }
            | ServerEvent::WriteFailed { .. } => Level::Warn,
            ServerEvent::AcceptFailed { .. }
            | ServerEvent::ReadFailed { .. }
            | ServerEvent::SubmissionFailed { .. }
            | ServerEvent::WorkerPanicked { .. } => Level::Error,
        }
    }
}

/// Destino de los eventos operacionales
pub trait EventSink: Send + Sync {
    fn report(&self, event: ServerEvent);
}

/// Sink que escribe cada evento en el facade `log`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn report(&self, event: ServerEvent) {
        let line = serde_json::to_string(&event).unwrap_or_else(|_| format!("{:?}", event));

        match event.level() {
            Level::Error => error!("{}", line),
            Level::Warn => warn!("{}", line),
            Level::Info => info!("{}", line),
            Level::Debug | Level::Trace => debug!("{}", line),
        }
    }
}

/// Sink que guarda los eventos en memoria
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ServerEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copia de los eventos recibidos hasta ahora
    pub fn events(&self) -> Vec<ServerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for RecordingSink {
    fn report(&self, event: ServerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
