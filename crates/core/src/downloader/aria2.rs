//! aria2 download engine backend (JSON-RPC 2.0 over HTTP).

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Aria2Config;

use super::{DownloadError, DownloadQueue, DownloadStatus, SubmitOptions};

/// Opaque request id sent with every RPC call.
const RPC_ID: &str = "bangumi";

/// How many waiting tasks to page through when enumerating file paths.
const WAITING_PAGE_SIZE: u64 = 100;

/// aria2 client implementation.
pub struct Aria2Client {
    client: Client,
    config: Aria2Config,
}

impl Aria2Client {
    /// Creates a new aria2 client.
    pub fn new(config: Aria2Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, config }
    }

    /// Performs one RPC call, returning the `result` payload.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, DownloadError> {
        let payload = build_payload(method, params, &self.config.secret);
        debug!(method = method, "aria2 rpc call");

        let response = self
            .client
            .post(&self.config.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DownloadError::Timeout
                } else if e.is_connect() {
                    DownloadError::ConnectionFailed(e.to_string())
                } else {
                    DownloadError::Protocol(e.to_string())
                }
            })?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| DownloadError::Protocol(format!("unreadable response: {e}")))?;

        // aria2 reports RPC failures both via HTTP status and the JSON
        // error member; the latter carries the useful message.
        if let Some(error) = body.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(DownloadError::Rpc(message.to_string()));
        }
        if !status.is_success() {
            return Err(DownloadError::Protocol(format!("HTTP {status}")));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| DownloadError::Protocol("response has no result member".to_string()))
    }
}

#[async_trait]
impl DownloadQueue for Aria2Client {
    fn name(&self) -> &str {
        "aria2"
    }

    async fn submit(&self, uri: &str, options: &SubmitOptions) -> Result<String, DownloadError> {
        let mut opts = serde_json::Map::new();
        if let Some(dir) = &options.download_dir {
            opts.insert("dir".to_string(), json!(dir));
        }

        let result = self
            .call("aria2.addUri", vec![json!([uri]), Value::Object(opts)])
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DownloadError::Protocol("addUri result is not a gid".to_string()))
    }

    async fn status(&self, gid: &str) -> Result<Option<DownloadStatus>, DownloadError> {
        match self.call("aria2.tellStatus", vec![json!(gid)]).await {
            Ok(result) => serde_json::from_value::<DownloadStatus>(result)
                .map(Some)
                .map_err(|e| DownloadError::Protocol(format!("malformed task status: {e}"))),
            // "GID <gid> is not found" means the engine dropped the task.
            Err(DownloadError::Rpc(message)) if message.contains("not found") => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn active_and_waiting_paths(&self) -> Result<HashSet<PathBuf>, DownloadError> {
        let mut paths = HashSet::new();

        let active = self.call("aria2.tellActive", vec![json!(["files"])]).await?;
        collect_task_paths(&active, &mut paths);

        let waiting = self
            .call(
                "aria2.tellWaiting",
                vec![json!(0), json!(WAITING_PAGE_SIZE), json!(["files"])],
            )
            .await?;
        collect_task_paths(&waiting, &mut paths);

        Ok(paths)
    }
}

/// Builds the JSON-RPC envelope, prepending the `token:<secret>`
/// parameter when a shared secret is configured.
fn build_payload(method: &str, params: Vec<Value>, secret: &str) -> Value {
    let mut params = params;
    if !secret.is_empty() {
        params.insert(0, json!(format!("token:{secret}")));
    }
    json!({
        "jsonrpc": "2.0",
        "id": RPC_ID,
        "method": method,
        "params": params,
    })
}

fn collect_task_paths(tasks: &Value, out: &mut HashSet<PathBuf>) {
    for task in tasks.as_array().into_iter().flatten() {
        for file in task
            .get("files")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            if let Some(path) = file.get("path").and_then(Value::as_str) {
                if !path.is_empty() {
                    out.insert(PathBuf::from(path));
                }
            }
        }
    }
}
