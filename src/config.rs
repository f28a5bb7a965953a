//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración con soporte para argumentos CLI y variables de entorno.
//! El núcleo recibe estos valores al construirse y nunca los modifica.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./secure_web_server --port 8080 --root ./www --workers 10
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 WWW_ROOT=/srv/www LOG_FILE=server.log ./secure_web_server
//! ```

use clap::Parser;
use log::info;
use std::path::PathBuf;

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "secure_web_server")]
#[command(about = "Servidor HTTP concurrente de archivos estáticos con registro de formularios")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Directorio raíz que se sirve (los envíos van a `<root>/data`)
    #[arg(short, long, default_value = "./www", env = "WWW_ROOT")]
    pub root: PathBuf,

    /// Número de workers del pool de conexiones
    #[arg(short, long, default_value = "10", env = "WORKERS")]
    pub workers: usize,

    /// Archivo donde se agregan los logs (por defecto stderr)
    #[arg(long = "log-file", env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use secure_web_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("Workers must be >= 1".to_string());
        }
        if self.root.as_os_str().is_empty() {
            return Err("Root directory must not be empty".to_string());
        }
        Ok(())
    }

    /// Escribe un resumen de la configuración en el log
    pub fn log_summary(&self) {
        info!("Configuración:");
        info!("   Dirección:  {}", self.address());
        info!("   Root:       {}", self.root.display());
        info!("   Workers:    {}", self.workers);
        match &self.log_file {
            Some(path) => info!("   Log file:   {}", path.display()),
            None => info!("   Log file:   stderr"),
        }
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            root: PathBuf::from("./www"),
            workers: 10,
            log_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.root, PathBuf::from("./www"));
        assert_eq!(config.workers, 10);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_address_custom() {
        let mut config = Config::default();
        config.host = "0.0.0.0".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_validate_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_workers() {
        let mut config = Config::default();
        config.workers = 0;
        let result = config.validate();
        assert!(result.unwrap_err().contains("Workers"));
    }

    #[test]
    fn test_validate_empty_root() {
        let mut config = Config::default();
        config.root = PathBuf::new();
        assert!(config.validate().unwrap_err().contains("Root"));
    }

    #[test]
    fn test_parse_cli_flags() {
        let config = Config::try_parse_from([
            "secure_web_server",
            "--port",
            "9000",
            "--root",
            "/srv/www",
            "-w",
            "3",
            "--log-file",
            "server.log",
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.root, PathBuf::from("/srv/www"));
        assert_eq!(config.workers, 3);
        assert_eq!(config.log_file, Some(PathBuf::from("server.log")));
    }

    #[test]
    fn test_log_summary_does_not_panic() {
        Config::default().log_summary();
    }
}
