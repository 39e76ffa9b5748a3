//! Drives the `lsp-mux` binary over stdio.

use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdout, Command, Stdio};

/// A server-to-client notification seen while waiting for a response.
#[derive(Debug, Clone)]
pub(crate) struct CapturedNotification {
    pub method: String,
    pub params: Value,
}

pub(crate) struct LspClient {
    process: Child,
    reader: BufReader<ChildStdout>,
    notifications: Vec<CapturedNotification>,
}

impl LspClient {
    pub(crate) fn spawn() -> Self {
        let mut process = Command::new(env!("CARGO_BIN_EXE_lsp-mux"))
            .env_remove("LSP_MUX_SERVER_NAME")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn lsp-mux binary");

        let stdout = process.stdout.take().expect("Failed to capture stdout");

        Self {
            process,
            reader: BufReader::new(stdout),
            notifications: Vec::new(),
        }
    }

    pub(crate) fn notifications(&self) -> &[CapturedNotification] {
        &self.notifications
    }

    pub(crate) fn send(&mut self, message: &Value) {
        let body = serde_json::to_string(message).unwrap();
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        let stdin = self.process.stdin.as_mut().expect("stdin not captured");
        stdin.write_all(header.as_bytes()).unwrap();
        stdin.write_all(body.as_bytes()).unwrap();
        stdin.flush().unwrap();
    }

    fn read_message(&mut self) -> Value {
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            let bytes_read = self
                .reader
                .read_line(&mut line)
                .expect("Failed to read header");
            assert!(bytes_read != 0, "Server closed connection unexpectedly");

            if line == "\r\n" || line == "\n" {
                break;
            }

            if let Some(value) = line.to_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().expect("Invalid content length");
            }
        }

        let mut body = vec![0u8; content_length];
        self.reader
            .read_exact(&mut body)
            .expect("Failed to read body");

        serde_json::from_slice(&body).unwrap_or_else(|e| {
            panic!("Invalid JSON: {e} in: {:?}", String::from_utf8_lossy(&body))
        })
    }

    /// Reads until the response to `id`, recording notifications on the way.
    pub(crate) fn read_response(&mut self, id: i64) -> Value {
        loop {
            let message = self.read_message();

            if message.get("id").is_none() {
                if let Some(method) = message.get("method").and_then(Value::as_str) {
                    self.notifications.push(CapturedNotification {
                        method: method.to_string(),
                        params: message.get("params").cloned().unwrap_or(Value::Null),
                    });
                }
                continue;
            }

            if message.get("id") == Some(&json!(id)) {
                return message;
            }
        }
    }

    pub(crate) fn request(&mut self, id: i64, method: &str, params: Value) -> Value {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        }));
        self.read_response(id)
    }

    pub(crate) fn initialize_with(&mut self, params: Value) -> Value {
        let response = self.request(1, "initialize", params);

        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "initialized",
            "params": {}
        }));

        response
    }

    pub(crate) fn initialize(&mut self) -> Value {
        self.initialize_with(json!({
            "processId": null,
            "capabilities": {},
            "rootUri": "file:///tmp/project",
            "initializationOptions": {
                "aws": {
                    "clientInfo": {"name": "test-client"},
                    "awsClientCapabilities": {"window": {"notifications": true}}
                }
            }
        }))
    }

    pub(crate) fn shutdown(&mut self) -> Value {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": 999,
            "method": "shutdown"
        }));
        self.read_response(999)
    }
}

impl Drop for LspClient {
    fn drop(&mut self) {
        let _ = self.process.kill();
    }
}
