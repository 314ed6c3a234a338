//! MCP client session for the weather tool server.
//!
//! The session spawns the tool server as a child process and speaks MCP
//! with it over the child's stdin/stdout. One session exists per bot run and
//! every capability call goes through it.
//!
//! The channel carries one request at a time: `call()` holds the session
//! lock for the whole round trip, so concurrent callers queue up behind it.
//! `close()` takes the same lock, which lets an in-flight call finish (or
//! time out) before teardown starts.

use crate::config::ToolServerConfig;
use async_trait::async_trait;
use rmcp::ServiceExt;
use rmcp::model::{CallToolRequestParam, Content, RawContent, Tool};
use rmcp::service::{RoleClient, RunningService};
use serde_json::{Map, Value};
use skycast_common::{Result, SkycastError};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// A capability advertised by the tool server during discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

impl CapabilityDescriptor {
    pub fn from_tool(tool: &Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.as_ref().map(|d| d.to_string()),
            input_schema: Value::Object(tool.input_schema.as_ref().clone()),
        }
    }

    /// Names listed under `required` in the input schema.
    pub fn required_arguments(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Long-lived session to an out-of-process tool server.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Launch the server, run the handshake and discover its capabilities.
    async fn connect(&self) -> Result<()>;

    /// Invoke a capability and return its text content chunks in order.
    async fn call(&self, capability: &str, arguments: Map<String, Value>) -> Result<Vec<String>>;

    /// Close the channel, then reap the server. Later calls are no-ops.
    async fn close(&self) -> Result<()>;

    async fn is_connected(&self) -> bool;

    async fn capabilities(&self) -> Vec<CapabilityDescriptor>;
}

struct OpenSession {
    service: RunningService<RoleClient, ()>,
    child: Child,
    capabilities: Vec<CapabilityDescriptor>,
}

enum SessionState {
    Idle,
    Open(OpenSession),
    Closed,
}

/// [`ToolSession`] backed by a child process speaking MCP over stdio.
pub struct McpToolSession {
    config: ToolServerConfig,
    state: Mutex<SessionState>,
}

impl McpToolSession {
    pub fn new(config: ToolServerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(SessionState::Idle),
        }
    }

    fn spawn_child(&self) -> Result<Child> {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .envs(&self.config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit()) // server logs go to our stderr
            .kill_on_drop(true);

        cmd.spawn().map_err(|e| {
            SkycastError::Mcp(format!(
                "Failed to spawn tool server '{}': {}",
                self.config.command, e
            ))
        })
    }

    async fn handshake(
        child: &mut Child,
    ) -> Result<(RunningService<RoleClient, ()>, Vec<CapabilityDescriptor>)> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SkycastError::Mcp("Tool server stdout not captured".into()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SkycastError::Mcp("Tool server stdin not captured".into()))?;

        // () handles no server->client requests
        let service = ()
            .serve((stdout, stdin))
            .await
            .map_err(|e| SkycastError::Mcp(format!("MCP initialize failed: {e}")))?;

        let tools = match service.list_all_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                let _ = service.cancel().await;
                return Err(SkycastError::Mcp(format!("Failed to list tools: {e}")));
            }
        };

        let capabilities = tools.iter().map(CapabilityDescriptor::from_tool).collect();
        Ok((service, capabilities))
    }

    async fn teardown(&self, open: OpenSession) -> Result<()> {
        let OpenSession {
            service, mut child, ..
        } = open;
        let mut failures = Vec::new();

        // Dropping our end of stdin is what tells the server to exit.
        info!("Closing tool server channel");
        match service.cancel().await {
            Ok(reason) => debug!(?reason, "MCP channel closed"),
            Err(e) => failures.push(format!("channel close failed: {e}")),
        }

        match tokio::time::timeout(self.config.shutdown_grace(), child.wait()).await {
            Ok(Ok(status)) => info!(%status, "Tool server exited"),
            Ok(Err(e)) => {
                failures.push(format!("wait failed: {e}"));
                if let Err(e) = child.kill().await {
                    failures.push(format!("kill failed: {e}"));
                }
            }
            Err(_) => {
                warn!(
                    grace_ms = self.config.shutdown_grace_ms,
                    "Tool server did not exit in time, killing it"
                );
                if let Err(e) = child.kill().await {
                    failures.push(format!("kill failed: {e}"));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SkycastError::ChannelTeardown(failures.join("; ")))
        }
    }
}

#[async_trait]
impl ToolSession for McpToolSession {
    async fn connect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if matches!(*state, SessionState::Open(_)) {
            return Err(SkycastError::SessionAlreadyConnected);
        }

        info!(
            command = %self.config.command,
            args = ?self.config.args,
            "Connecting to weather tool server"
        );

        let mut child = self.spawn_child()?;
        let handshake =
            tokio::time::timeout(self.config.connect_timeout(), Self::handshake(&mut child)).await;

        let (service, capabilities) = match handshake {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                error!(error = %e, "Tool server handshake failed");
                reap_failed_child(&mut child).await;
                return Err(e);
            }
            Err(_) => {
                reap_failed_child(&mut child).await;
                return Err(SkycastError::Mcp(format!(
                    "Tool server handshake timed out after {}ms",
                    self.config.connect_timeout_ms
                )));
            }
        };

        info!(
            tools = ?capabilities.iter().map(|c: &CapabilityDescriptor| c.name.as_str()).collect::<Vec<_>>(),
            "Connected to weather tool server"
        );

        *state = SessionState::Open(OpenSession {
            service,
            child,
            capabilities,
        });
        Ok(())
    }

    async fn call(&self, capability: &str, arguments: Map<String, Value>) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let SessionState::Open(open) = &*state else {
            return Err(SkycastError::SessionNotConnected);
        };

        debug!(tool = %capability, "Calling tool");

        let request = CallToolRequestParam {
            name: capability.to_string().into(),
            arguments: Some(arguments),
        };

        let result =
            match tokio::time::timeout(self.config.call_timeout(), open.service.call_tool(request))
                .await
            {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    return Err(SkycastError::ToolInvocation(format!(
                        "{capability} failed: {e}"
                    )));
                }
                Err(_) => {
                    return Err(SkycastError::ToolInvocation(format!(
                        "{capability} timed out after {}ms",
                        self.config.call_timeout_ms
                    )));
                }
            };

        let chunks = text_chunks(&result.content);
        if result.is_error.unwrap_or(false) {
            let message = if chunks.is_empty() {
                format!("{capability} reported an error")
            } else {
                chunks.join("\n")
            };
            return Err(SkycastError::ToolInvocation(message));
        }

        Ok(chunks)
    }

    async fn close(&self) -> Result<()> {
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut *state, SessionState::Closed)
        };

        match previous {
            SessionState::Open(open) => self.teardown(open).await,
            SessionState::Idle | SessionState::Closed => {
                debug!("Tool session already closed");
                Ok(())
            }
        }
    }

    async fn is_connected(&self) -> bool {
        matches!(*self.state.lock().await, SessionState::Open(_))
    }

    async fn capabilities(&self) -> Vec<CapabilityDescriptor> {
        match &*self.state.lock().await {
            SessionState::Open(open) => open.capabilities.clone(),
            _ => Vec::new(),
        }
    }
}

/// Kill and wait for a child whose handshake did not complete.
async fn reap_failed_child(child: &mut Child) {
    match child.try_wait() {
        Ok(Some(status)) => debug!(%status, "Tool server already exited"),
        _ => {
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to kill tool server after failed handshake");
            }
        }
    }
}

/// Text chunks of an MCP content array, in order.
fn text_chunks(content: &[Content]) -> Vec<String> {
    content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(text) => Some(text.text.clone()),
            _ => None,
        })
        .collect()
}
