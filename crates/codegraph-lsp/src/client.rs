//! JSON-RPC stdio language-server client, grounded on
//! `api/services/lsp/lsp_client.py`'s `PyrightLSPClient` and
//! `typescript_lsp_client.py`'s TS analogue, unified behind one
//! language-parameterized client since both speak the same wire protocol.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::LspError;
use crate::wire;

/// Default per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);
/// `initialize` gets a longer budget — the server may still be cold-starting.
pub const INITIALIZE_TIMEOUT: Duration = Duration::from_secs(10);
/// Bound on draining the process during shutdown before a hard kill.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Which external language server to spawn. Both speak `Content-Length`
/// framed LSP JSON-RPC 2.0 over stdio; only the binary/args differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageServerKind {
    Pyright,
    TypeScript,
}

impl LanguageServerKind {
    #[must_use]
    pub const fn command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Pyright => ("pyright-langserver", &["--stdio"]),
            Self::TypeScript => ("typescript-language-server", &["--stdio"]),
        }
    }
}

/// LSP `languageId` values the spec enumerates for `textDocument/didOpen`.
#[must_use]
pub fn language_id(language: &str) -> &'static str {
    match language {
        "python" => "python",
        "typescript" => "typescript",
        "tsx" => "typescriptreact",
        "javascript" => "javascript",
        "jsx" => "javascriptreact",
        _ => "plaintext",
    }
}

type PendingMap = Arc<Mutex<HashMap<i64, oneshot::Sender<Value>>>>;

/// A running language-server subprocess plus the two background tasks that
/// drain its stdout (resolving pending requests) and stderr (preventing the
/// OS pipe-buffer deadlock.
pub struct LspClient {
    kind: LanguageServerKind,
    workspace_root: String,
    child: Mutex<Option<Child>>,
    stdin: Mutex<Option<tokio::process::ChildStdin>>,
    pending: PendingMap,
    next_id: AtomicI64,
    initialized: std::sync::atomic::AtomicBool,
    reader_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    stderr_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl LspClient {
    #[must_use]
    pub fn new(kind: LanguageServerKind, workspace_root: impl Into<String>) -> Self {
        Self {
            kind,
            workspace_root: workspace_root.into(),
            child: Mutex::new(None),
            stdin: Mutex::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicI64::new(0),
            initialized: std::sync::atomic::AtomicBool::new(false),
            reader_task: Mutex::new(None),
            stderr_task: Mutex::new(None),
        }
    }

    /// Spawn the subprocess and run the LSP initialize/initialized
    /// handshake.
    ///
    /// # Errors
    /// Returns [`LspError::InitializationFailed`] if the binary cannot be
    /// spawned or the server rejects `initialize`.
    pub async fn start(&self) -> Result<(), LspError> {
        if self.child.lock().await.is_some() {
            warn!("language server already running");
            return Ok(());
        }

        let (program, args) = self.kind.command();
        info!(program, "starting language server");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LspError::InitializationFailed(format!("{program}: {e}")))?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        *self.stdin.lock().await = Some(stdin);

        let pending = Arc::clone(&self.pending);
        self.reader_task.lock().await.replace(tokio::spawn(read_loop(BufReader::new(stdout), pending)));
        self.stderr_task.lock().await.replace(tokio::spawn(drain_stderr(BufReader::new(stderr))));

        *self.child.lock().await = Some(child);

        self.initialize().await?;
        Ok(())
    }

    async fn initialize(&self) -> Result<(), LspError> {
        let params = json!({
            "processId": Value::Null,
            "rootUri": format!("file://{}", self.workspace_root),
            "capabilities": {
                "textDocument": {
                    "hover": {"contentFormat": ["plaintext", "markdown"]},
                    "definition": {"linkSupport": false},
                    "documentSymbol": {"hierarchicalDocumentSymbolSupport": true},
                }
            },
            "initializationOptions": {},
            "workspaceFolders": Value::Null,
        });

        self.send_request("initialize", params, INITIALIZE_TIMEOUT).await?;
        self.send_notification("initialized", json!({})).await?;
        self.initialized.store(true, Ordering::SeqCst);
        info!("language server initialized");
        Ok(())
    }

    /// `textDocument/hover`. Returns `None` on a missing result, matching
    /// the failure policy: LSP failures never abort indexing.
    pub async fn hover(&self, path: &str, source: &str, line: u32, character: u32, language: &str) -> Option<String> {
        self.open_document(path, source, language).await;
        let params = json!({
            "textDocument": {"uri": format!("file://{path}")},
            "position": {"line": line, "character": character},
        });
        let result = self.send_request("textDocument/hover", params, REQUEST_TIMEOUT).await;
        self.close_document(path).await;

        let response = result.ok()?;
        let contents = response.get("contents")?;
        extract_hover_text(contents)
    }

    /// `textDocument/documentSymbol`.
    pub async fn get_document_symbols(&self, path: &str, source: &str, language: &str) -> Vec<Value> {
        self.open_document(path, source, language).await;
        let params = json!({"textDocument": {"uri": format!("file://{path}")}});
        let result = self.send_request("textDocument/documentSymbol", params, REQUEST_TIMEOUT).await;
        self.close_document(path).await;
        result.ok().and_then(|v| v.as_array().cloned()).unwrap_or_default()
    }

    /// `textDocument/definition`. Retained but not wired into call-graph
    /// resolution (see `DESIGN.md`'s Open Question resolution).
    pub async fn get_definition(&self, path: &str, source: &str, line: u32, character: u32, language: &str) -> Option<Value> {
        self.open_document(path, source, language).await;
        let params = json!({
            "textDocument": {"uri": format!("file://{path}")},
            "position": {"line": line, "character": character},
        });
        let result = self.send_request("textDocument/definition", params, REQUEST_TIMEOUT).await;
        self.close_document(path).await;
        result.ok()
    }

    async fn open_document(&self, path: &str, source: &str, language: &str) {
        let params = json!({
            "textDocument": {
                "uri": format!("file://{path}"),
                "languageId": language_id(language),
                "version": 1,
                "text": source,
            }
        });
        let _ = self.send_notification("textDocument/didOpen", params).await;
    }

    async fn close_document(&self, path: &str) {
        let params = json!({"textDocument": {"uri": format!("file://{path}")}});
        let _ = self.send_notification("textDocument/didClose", params).await;
    }

    async fn send_request(&self, method: &str, params: Value, request_timeout: Duration) -> Result<Value, LspError> {
        if !self.is_alive().await {
            return Err(LspError::ServerCrashed(self.exit_code().await));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let message = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        {
            let mut guard = self.stdin.lock().await;
            let Some(stdin) = guard.as_mut() else {
                return Err(LspError::NotRunning);
            };
            wire::write_message(stdin, &message).await.map_err(|e| LspError::Communication(e.to_string()))?;
        }

        match timeout(request_timeout, rx).await {
            Ok(Ok(response)) => {
                if let Some(error) = response.get("error") {
                    return Err(LspError::Communication(error.to_string()));
                }
                Ok(response.get("result").cloned().unwrap_or(Value::Null))
            }
            Ok(Err(_)) => Err(LspError::Communication("response channel dropped".into())),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                warn!(method, ?request_timeout, "LSP request timed out");
                Err(LspError::Timeout(request_timeout))
            }
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), LspError> {
        let message = json!({"jsonrpc": "2.0", "method": method, "params": params});
        let mut guard = self.stdin.lock().await;
        let Some(stdin) = guard.as_mut() else {
            return Ok(());
        };
        wire::write_message(stdin, &message).await.map_err(|e| LspError::Communication(e.to_string()))
    }

    /// `true` while the subprocess is running and has not exited.
    pub async fn is_alive(&self) -> bool {
        let mut guard = self.child.lock().await;
        match guard.as_mut() {
            None => false,
            Some(child) => matches!(child.try_wait(), Ok(None)),
        }
    }

    async fn exit_code(&self) -> Option<i32> {
        let mut guard = self.child.lock().await;
        guard.as_mut().and_then(|c| c.try_wait().ok().flatten()).and_then(|s| s.code())
    }

    /// Graceful `shutdown`/`exit`, then drain (never just `wait()` alone —
    /// the deadlock-avoidance invariant), killing on timeout.
    pub async fn shutdown(&self) {
        let _ = self.send_request("shutdown", Value::Null, REQUEST_TIMEOUT).await;
        let _ = self.send_notification("exit", json!({})).await;

        if let Some(mut child) = self.child.lock().await.take() {
            if let Some(mut stdin) = self.stdin.lock().await.take() {
                let _ = stdin.shutdown().await;
            }
            match timeout(SHUTDOWN_TIMEOUT, child.wait()).await {
                Ok(_) => debug!("language server exited cleanly"),
                Err(_) => {
                    warn!("language server shutdown timed out, killing");
                    let _ = child.kill().await;
                }
            }
        }

        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.lock().await.take() {
            task.abort();
        }
        self.initialized.store(false, Ordering::SeqCst);
    }
}

async fn read_loop<R: tokio::io::AsyncRead + Unpin>(mut reader: R, pending: PendingMap) {
    loop {
        match wire::read_message(&mut reader).await {
            Ok(Some(message)) => {
                let Some(id) = message.get("id").and_then(message_id) else {
                    if let Some(method) = message.get("method").and_then(Value::as_str) {
                        debug!(method, "LSP notification received");
                    }
                    continue;
                };
                if let Some(tx) = pending.lock().await.remove(&id) {
                    let _ = tx.send(message);
                }
            }
            Ok(None) => {
                info!("language server stdout closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "language server reader crashed");
                break;
            }
        }
    }
}

fn message_id(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Continuously drains stderr so a full OS pipe buffer never blocks the
/// server's writes.
async fn drain_stderr<R: tokio::io::AsyncRead + Unpin>(mut reader: R) {
    use tokio::io::AsyncReadExt;
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

fn extract_hover_text(contents: &Value) -> Option<String> {
    match contents {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("value").and_then(Value::as_str).map(str::to_string),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(map) => map.get("value").and_then(Value::as_str).map(str::to_string),
                    _ => None,
                })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("\n"))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_id_mapping() {
        assert_eq!(language_id("tsx"), "typescriptreact");
        assert_eq!(language_id("python"), "python");
        assert_eq!(language_id("unknown"), "plaintext");
    }

    #[test]
    fn hover_text_extraction_handles_all_shapes() {
        assert_eq!(extract_hover_text(&json!("plain")), Some("plain".to_string()));
        assert_eq!(extract_hover_text(&json!({"kind": "markdown", "value": "**bold**"})), Some("**bold**".to_string()));
        assert_eq!(
            extract_hover_text(&json!([{"value": "a"}, "b"])),
            Some("a\nb".to_string())
        );
        assert_eq!(extract_hover_text(&json!(null)), None);
    }
}
