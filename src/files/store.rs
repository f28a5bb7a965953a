//! # Registro de Formularios
//! src/files/store.rs
//!
//! Agrega cada payload recibido por POST a `<root>/data/submissions.txt`,
//! una línea por envío. El archivo solo crece: nunca se reescribe ni se
//! borra nada.
//!
//! Todas las escrituras pasan por un único `Mutex`, así que dos workers
//! nunca intercalan bytes de envíos distintos.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Subdirectorio del root donde viven los datos
pub const DATA_DIR: &str = "data";

/// Nombre del archivo de envíos
pub const SUBMISSIONS_FILE: &str = "submissions.txt";

/// Log append-only de envíos
///
/// Los clones comparten la misma sección crítica.
#[derive(Debug, Clone)]
pub struct SubmissionStore {
    /// Ruta al archivo de envíos
    path: PathBuf,

    /// Serializa los appends
    lock: Arc<Mutex<()>>,
}

impl SubmissionStore {
    /// Store en `<root>/data/submissions.txt`
    pub fn new(root: &Path) -> Self {
        Self::with_path(root.join(DATA_DIR).join(SUBMISSIONS_FILE))
    }

    /// Store sobre un archivo arbitrario
    fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Agrega `payload` seguido de un `\n`
    ///
    /// Crea el directorio y el archivo si no existen. Los errores (disco
    /// lleno, permisos) se devuelven al caller.
    pub fn append(&self, payload: &[u8]) -> io::Result<()> {
        let mut record = Vec::with_capacity(payload.len() + 1);
        record.extend_from_slice(payload);
        record.push(b'\n');

        // Un panic en otro append no deja el archivo en un estado que
        // impida seguir agregando, así que ignoramos el poisoning
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.write_all(&record)?;
        file.flush()
    }
}
