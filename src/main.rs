//! # Secure Web Server - Entry Point
//! src/main.rs
//!
//! Arranque del proceso: configuración, logging, directorios y servidor.

use log::{error, info};
use secure_web_server::config::Config;
use secure_web_server::events::LogSink;
use secure_web_server::files::store::DATA_DIR;
use secure_web_server::server::Server;
use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Arc;

fn main() {
    let config = Config::new();

    if let Err(e) = init_logging(&config) {
        eprintln!("No se pudo abrir el archivo de log: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = config.validate() {
        error!("Configuración inválida: {}", e);
        std::process::exit(1);
    }
    config.log_summary();

    // El servidor asume que el root existe; los envíos van a root/data
    if let Err(e) = fs::create_dir_all(config.root.join(DATA_DIR)) {
        error!("No se pudo crear {}: {}", config.root.display(), e);
        std::process::exit(1);
    }

    let server = match Server::bind(&config, Arc::new(LogSink)) {
        Ok(server) => server,
        Err(e) => {
            error!("Error al iniciar el servidor en {}: {}", config.address(), e);
            std::process::exit(1);
        }
    };

    info!("Servidor escuchando en {}", config.address());

    if let Err(e) = server.run() {
        error!("Error fatal: {}", e);
        std::process::exit(1);
    }
}

/// Inicializa `env_logger` (nivel `info` por defecto, `RUST_LOG` lo cambia)
///
/// Con `--log-file` los logs se agregan a ese archivo en vez de stderr.
fn init_logging(config: &Config) -> io::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if let Some(path) = &config.log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}
