//! # Pool de Workers
//! src/server/pool.rs
//!
//! Pool de tamaño fijo con workers de larga vida que se reutilizan entre
//! conexiones.
//!
//! Los jobs se entregan por un canal de rendezvous (capacidad 0): `execute`
//! solo retorna cuando un worker libre tomó el job. Si todos están ocupados,
//! `execute` bloquea, y con él el accept loop.
//!
//! Un panic dentro de un job se atrapa y se reporta; el worker sigue vivo.

use crate::events::{EventSink, ServerEvent};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Pool de workers con backpressure implícito
pub struct WorkerPool {
    workers: Vec<Worker>,
    sender: Option<SyncSender<Job>>,
}

struct Worker {
    name: String,
    thread: Option<JoinHandle<()>>,
}

impl WorkerPool {
    /// Crea el pool e inicia `size` workers
    pub fn new(size: usize, sink: Arc<dyn EventSink>) -> io::Result<Self> {
        if size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "worker pool needs at least one worker",
            ));
        }

        let (sender, receiver) = mpsc::sync_channel::<Job>(0);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            workers.push(Worker::spawn(
                format!("worker-{}", i),
                Arc::clone(&receiver),
                Arc::clone(&sink),
            )?);
        }

        Ok(Self {
            workers,
            sender: Some(sender),
        })
    }

    /// Entrega un job a un worker libre, bloqueando mientras no haya ninguno
    pub fn execute<F>(&self, job: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or_else(Self::closed)?;
        sender.send(Box::new(job)).map_err(|_| Self::closed())
    }

    /// Número de workers
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Cierra el canal y espera a que cada worker termine su job actual
    pub fn shutdown(&mut self) {
        drop(self.sender.take());

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    log::error!("{} terminó con panic", worker.name);
                }
            }
        }
    }

    fn closed() -> io::Error {
        io::Error::new(io::ErrorKind::BrokenPipe, "worker pool is shut down")
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Worker {
    fn spawn(
        name: String,
        receiver: Arc<Mutex<Receiver<Job>>>,
        sink: Arc<dyn EventSink>,
    ) -> io::Result<Self> {
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn({
                let name = name.clone();
                move || Self::run(name, receiver, sink)
            })?;

        Ok(Self {
            name,
            thread: Some(thread),
        })
    }

    /// Loop principal del worker
    fn run(name: String, receiver: Arc<Mutex<Receiver<Job>>>, sink: Arc<dyn EventSink>) {
        log::debug!("{} iniciado", name);

        loop {
            // El guard se suelta al salir del bloque, antes de ejecutar el job
            let message = {
                let guard = receiver.lock().unwrap_or_else(PoisonError::into_inner);
                guard.recv()
            };

            let job = match message {
                Ok(job) => job,
                // Canal cerrado: el pool se está apagando
                Err(_) => break,
            };

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                sink.report(ServerEvent::WorkerPanicked {
                    worker: name.clone(),
                    message: panic_message(payload.as_ref()),
                });
            }
        }

        log::debug!("{} detenido", name);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn pool(size: usize) -> (WorkerPool, RecordingSink) {
        let sink = RecordingSink::new();
        let pool = WorkerPool::new(size, Arc::new(sink.clone())).unwrap();
        (pool, sink)
    }

    #[test]
    fn test_pool_rejects_zero_workers() {
        let sink: Arc<dyn EventSink> = Arc::new(RecordingSink::new());
        assert!(WorkerPool::new(0, sink).is_err());
    }

    #[test]
    fn test_pool_runs_all_jobs() {
        let (mut pool, _) = pool(4);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_workers_are_reused() {
        let (mut pool, _) = pool(2);
        let (tx, rx) = channel();

        for _ in 0..20 {
            let tx = tx.clone();
            pool.execute(move || {
                let name = thread::current().name().unwrap_or("").to_string();
                tx.send(name).unwrap();
            })
            .unwrap();
        }
        pool.shutdown();
        drop(tx);

        let names: std::collections::HashSet<String> = rx.iter().collect();
        assert!(names.len() <= 2);
        assert!(names.iter().all(|n| n.starts_with("worker-")));
    }

    #[test]
    fn test_panic_does_not_kill_worker() {
        let (mut pool, sink) = pool(1);
        let counter = Arc::new(AtomicUsize::new(0));

        pool.execute(|| panic!("boom")).unwrap();
        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.shutdown();

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(
            sink.events(),
            vec![ServerEvent::WorkerPanicked {
                worker: "worker-0".to_string(),
                message: "boom".to_string(),
            }]
        );
    }

    #[test]
    fn test_execute_blocks_when_saturated() {
        let (pool, _) = pool(1);
        let pool = Arc::new(pool);
        let (release_tx, release_rx) = channel::<()>();

        // Ocupa al único worker
        pool.execute(move || {
            release_rx.recv().unwrap();
        })
        .unwrap();

        let (done_tx, done_rx) = channel();
        let submitter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                pool.execute(|| {}).unwrap();
                done_tx.send(()).unwrap();
            })
        };

        // Mientras el worker está ocupado, el segundo execute no retorna
        assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());

        release_tx.send(()).unwrap();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        submitter.join().unwrap();
    }

    #[test]
    fn test_execute_after_shutdown_fails() {
        let (mut pool, _) = pool(1);
        pool.shutdown();
        assert!(pool.execute(|| {}).is_err());
        assert_eq!(pool.size(), 1);
    }
}
