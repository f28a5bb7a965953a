//! # Resolución Segura de Paths
//! src/files/resolver.rs
//!
//! Convierte el path de un request en una ruta absoluta dentro del root.
//!
//! ## Algoritmo
//!
//! 1. Rechazar paths con bytes nulos
//! 2. Quitar un único `/` inicial y unir con el root
//! 3. Normalizar de forma léxica (`.`, `..`, separadores repetidos) sin
//!    consultar el filesystem
//! 4. Exigir que el resultado quede estrictamente dentro del root,
//!    comparando por componentes (`/www-evil` no está dentro de `/www`)
//!
//! La normalización léxica no ve symlinks. Por eso `PathResolver::confine`
//! vuelve a comprobar el path canónico antes de servir un archivo.

use path_clean::PathClean;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Resultado de resolver un path de request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Ruta absoluta normalizada
    pub absolute_path: PathBuf,

    /// Siempre `true` para un `ResolvedPath` devuelto por `resolve`
    pub within_root: bool,
}

/// Intento de acceder fuera del root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// El path contiene un byte nulo
    NullByte,

    /// Tras normalizar, el path no queda dentro del root
    OutsideRoot(String),

    /// El path canónico (siguiendo symlinks) sale del root
    SymlinkEscape(String),
}

impl std::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityError::NullByte => write!(f, "Path contains a null byte"),
            SecurityError::OutsideRoot(p) => write!(f, "Path escapes the served root: {}", p),
            SecurityError::SymlinkEscape(p) => {
                write!(f, "Path resolves through a symlink outside the served root: {}", p)
            }
        }
    }
}

impl std::error::Error for SecurityError {}

/// Resuelve `request_path` contra `root` de forma puramente léxica
///
/// # Ejemplo
///
/// ```
/// use std::path::Path;
/// use secure_web_server::files::resolve;
///
/// let ok = resolve(Path::new("/www"), "/css/../index.html").unwrap();
/// assert_eq!(ok.absolute_path, Path::new("/www/index.html"));
///
/// assert!(resolve(Path::new("/www"), "/../etc/passwd").is_err());
/// ```
pub fn resolve(root: &Path, request_path: &str) -> Result<ResolvedPath, SecurityError> {
    if request_path.contains('\0') {
        return Err(SecurityError::NullByte);
    }

    let relative = request_path.strip_prefix('/').unwrap_or(request_path);
    let root = root.clean();
    let absolute_path = root.join(relative).clean();

    if absolute_path == root || !absolute_path.starts_with(&root) {
        return Err(SecurityError::OutsideRoot(request_path.to_string()));
    }

    Ok(ResolvedPath {
        absolute_path,
        within_root: true,
    })
}

/// Resolver ligado a un root canónico fijo
///
/// Se construye una vez al arrancar y se comparte entre workers; solo se
/// lee después de construido.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Crea el resolver canonicalizando el root (debe existir)
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            root: fs::canonicalize(root)?,
        })
    }

    /// Root canónico
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolución léxica contra este root
    pub fn resolve(&self, request_path: &str) -> Result<ResolvedPath, SecurityError> {
        resolve(&self.root, request_path)
    }

    /// Sigue symlinks y vuelve a verificar que el destino esté dentro del root
    ///
    /// Retorna `Ok(None)` si el destino no existe (o no se puede
    /// canonicalizar), y `Ok(Some(real))` con la ruta real si todo está bien.
    pub fn confine(&self, resolved: &ResolvedPath) -> Result<Option<PathBuf>, SecurityError> {
        let real = match fs::canonicalize(&resolved.absolute_path) {
            Ok(real) => real,
            Err(_) => return Ok(None),
        };

        if !real.starts_with(&self.root) {
            return Err(SecurityError::SymlinkEscape(
                resolved.absolute_path.display().to_string(),
            ));
        }

        Ok(Some(real))
    }
}
