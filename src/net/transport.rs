//! Background delivery of `model` and `states` payloads.
//!
//! A [`Connection`] runs one worker thread per (re)connect. The worker sends
//! the model first and the states second over an mpsc channel; the viewer
//! drains it once per frame with [`Connection::poll`]. Reconnecting swaps the
//! receiver, so anything the previous worker still sends is dropped.

use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::{Result, SimviewError};
use crate::net::fetch;

/// Called from the worker after each event (e.g. to wake the UI).
pub type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationSource {
    /// JSON file holding `{"model": …, "states": …}`.
    File(PathBuf),
    /// Server exposing `GET <base>/model` and `GET <base>/states`.
    Http(Url),
}

impl SimulationSource {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            let url = Url::parse(s)
                .map_err(|e| SimviewError::Transport(format!("Invalid URL: {}", e)))?;
            Ok(SimulationSource::Http(url))
        } else {
            Ok(SimulationSource::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for SimulationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationSource::File(p) => write!(f, "{}", p.display()),
            SimulationSource::Http(u) => write!(f, "{}", u),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Model(Value),
    States(Value),
    Error(String),
}

pub struct Connection {
    source: SimulationSource,
    timeout: Duration,
    waker: Option<Waker>,
    rx: mpsc::Receiver<TransportEvent>,
}

impl Connection {
    /// Start fetching `source` on a worker thread.
    pub fn open(source: SimulationSource, timeout: Duration, waker: Option<Waker>) -> Self {
        let rx = spawn_worker(source.clone(), timeout, waker.clone());
        Self {
            source,
            timeout,
            waker,
            rx,
        }
    }

    pub fn source(&self) -> &SimulationSource {
        &self.source
    }

    /// Drop the current channel and fetch again from scratch.
    pub fn reconnect(&mut self) {
        log::info!("Reconnecting to {}", self.source);
        self.rx = spawn_worker(self.source.clone(), self.timeout, self.waker.clone());
    }

    /// Everything that has arrived since the last poll, in order.
    pub fn poll(&self) -> Vec<TransportEvent> {
        self.rx.try_iter().collect()
    }

    /// Block for the next event, up to `timeout`.
    pub fn wait(&self, timeout: Duration) -> Option<TransportEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}

fn spawn_worker(
    source: SimulationSource,
    timeout: Duration,
    waker: Option<Waker>,
) -> mpsc::Receiver<TransportEvent> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let send = |event: TransportEvent| {
            // receiver gone means a newer connection replaced this one
            let alive = tx.send(event).is_ok();
            if let Some(w) = &waker {
                w();
            }
            alive
        };
        let outcome = match &source {
            SimulationSource::File(path) => load_file(path, &send),
            SimulationSource::Http(base) => load_http(base, timeout, &send),
        };
        if let Err(e) = outcome {
            log::warn!("Loading {} failed: {}", source, e);
            send(TransportEvent::Error(e.to_string()));
        }
    });
    rx
}

fn load_file(path: &std::path::Path, send: &dyn Fn(TransportEvent) -> bool) -> Result<()> {
    let text = std::fs::read_to_string(path)?;
    let mut doc: Value = serde_json::from_str(&text)?;
    let model = doc
        .get_mut("model")
        .map(Value::take)
        .ok_or_else(|| SimviewError::Transport(format!("{}: no \"model\" key", path.display())))?;
    if !send(TransportEvent::Model(model)) {
        return Ok(());
    }
    match doc.get_mut("states").map(Value::take) {
        Some(states) => {
            send(TransportEvent::States(states));
        }
        None => log::warn!("{}: no \"states\" key, showing the model only", path.display()),
    }
    Ok(())
}

fn load_http(base: &Url, timeout: Duration, send: &dyn Fn(TransportEvent) -> bool) -> Result<()> {
    let client = fetch::client(timeout)?;

    let model = fetch::fetch_json(&client, &fetch::endpoint(base, "model")?)?;
    if !send(TransportEvent::Model(serde_json::from_str(&model.body)?)) {
        return Ok(());
    }

    let states = fetch::fetch_json(&client, &fetch::endpoint(base, "states")?)?;
    send(TransportEvent::States(serde_json::from_str(&states.body)?));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn parses_sources() {
        assert_eq!(
            SimulationSource::parse("run.json").unwrap(),
            SimulationSource::File(PathBuf::from("run.json"))
        );
        assert!(matches!(
            SimulationSource::parse("http://localhost:5000").unwrap(),
            SimulationSource::Http(_)
        ));
        assert!(SimulationSource::parse("http://").is_err());
    }

    #[test]
    fn file_source_sends_model_then_states() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, json!({"model": {"a": 1}, "states": [{"time": 0.0}]}).to_string()).unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let waker: Waker = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let conn = Connection::open(SimulationSource::File(path), WAIT, Some(waker));

        assert_eq!(conn.wait(WAIT), Some(TransportEvent::Model(json!({"a": 1}))));
        assert_eq!(
            conn.wait(WAIT),
            Some(TransportEvent::States(json!([{"time": 0.0}])))
        );
        // the waker runs right after each send
        let deadline = std::time::Instant::now() + WAIT;
        while hits.load(Ordering::SeqCst) < 2 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_file_reports_an_error_event() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(
            SimulationSource::File(dir.path().join("nope.json")),
            WAIT,
            None,
        );
        assert!(matches!(conn.wait(WAIT), Some(TransportEvent::Error(_))));
    }

    #[test]
    fn reconnect_fetches_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, json!({"model": 1}).to_string()).unwrap();
        let mut conn = Connection::open(SimulationSource::File(path), WAIT, None);
        assert_eq!(conn.wait(WAIT), Some(TransportEvent::Model(json!(1))));

        conn.reconnect();
        assert_eq!(conn.wait(WAIT), Some(TransportEvent::Model(json!(1))));
        // model-only file: nothing else follows
        assert_eq!(conn.wait(Duration::from_millis(100)), None);
        assert!(conn.poll().is_empty());
    }
}
