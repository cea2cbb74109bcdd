//! Shared fixtures for interceptor integration tests
//!
//! - Store builders with a valid optimizer config and API connection
//! - A one-shot HTTP server standing in for the optimizer service

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rabbit_bq_interceptor::dynamic_config::DEFAULT_CONFIG_KEY;
use rabbit_bq_interceptor::credentials::DEFAULT_CONNECTION_ID;
use rabbit_bq_interceptor::store::{Connection, MemoryStore};
use serde_json::{json, Value};

pub const API_KEY: &str = "rk-test-0123456789";

/// A valid dynamic optimizer config
pub fn valid_config() -> Value {
    json!({
        "default_pricing_mode": "on_demand",
        "reservation_ids": ["proj:US.reservation1", "proj:EU.reservation2"]
    })
}

/// The job configuration a caller submits
pub fn original_job() -> Value {
    json!({
        "query": {
            "query": "SELECT * FROM dataset.table",
            "useLegacySql": false
        }
    })
}

/// What the optimizer hands back
pub fn optimized_job() -> Value {
    json!({
        "query": {
            "query": "SELECT * FROM dataset.table",
            "useLegacySql": false
        },
        "reservation": "proj:US.reservation1"
    })
}

/// Store with a valid config and an API connection
pub fn ready_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.set_json_variable(DEFAULT_CONFIG_KEY, &valid_config());
    store.set_connection(DEFAULT_CONNECTION_ID, Connection::with_password(API_KEY));
    store
}

/// Store with an API connection but the given raw config text
pub fn store_with_raw_config(raw: &str) -> Arc<MemoryStore> {
    let store = ready_store();
    store.set_variable(DEFAULT_CONFIG_KEY, raw);
    store
}

/// One HTTP request as the server saw it
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

/// Serves exactly one request with a canned response
pub struct OneShotServer {
    pub base_url: String,
    handle: JoinHandle<CapturedRequest>,
}

impl OneShotServer {
    pub fn respond(status: u16, body: impl Into<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let body = body.into();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");

            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header line");
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((k, v)) = line.split_once(':') {
                    headers.push((k.trim().to_string(), v.trim().to_string()));
                }
            }

            let length = headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.parse::<usize>().ok())
                .unwrap_or(0);
            let mut buf = vec![0u8; length];
            reader.read_exact(&mut buf).expect("body");

            let mut stream = stream;
            let response = format!(
                "HTTP/1.1 {} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).expect("write response");
            stream.flush().expect("flush");

            CapturedRequest {
                request_line: request_line.trim_end().to_string(),
                headers,
                body: String::from_utf8_lossy(&buf).to_string(),
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            handle,
        }
    }

    /// Wait for the request to be served
    pub fn captured(self) -> CapturedRequest {
        self.handle.join().expect("server thread")
    }
}
