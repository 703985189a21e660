// src/api/rest.rs
// REST collaborators for session/memory browsing. Results are one-shot
// snapshots: nothing here is cached or subscribed, and every listing
// degrades to an empty set on failure.

use serde::Deserialize;
use tracing::warn;

/// One identity's aggregate session info, as served by `GET /api/sessions`
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSummary {
    pub user_id: String,
    pub session_count: u32,
    pub last_update: String,
}

/// A single stored session for an identity
#[derive(Debug, Clone, Deserialize)]
pub struct SessionDetail {
    pub id: String,
    pub user_id: String,
    pub app_name: String,
    pub create_time: String,
    pub update_time: String,
    #[serde(default)]
    pub message_count: u32,
}

/// A historical message event within a stored session
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub session_id: String,
    pub author: String,
    #[serde(default)]
    pub text: Option<String>,
    pub timestamp: String,
    #[serde(default)]
    pub is_tool_call: bool,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub is_tool_response: bool,
}

/// A long-term memory stored for an identity
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
struct SessionsResponse {
    sessions: Vec<SessionSummary>,
}

#[derive(Debug, Deserialize)]
struct SessionDetailsResponse {
    sessions: Vec<SessionDetail>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    messages: Vec<MessageRecord>,
}

#[derive(Debug, Deserialize)]
struct MemoriesResponse {
    memories: Vec<MemoryRecord>,
}

/// Client for the agent's HTTP API
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// List all known identities with their session counts
    pub async fn list_identities(&self) -> Vec<SessionSummary> {
        match self.fetch_identities().await {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!("Failed to list identities: {}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_identities(&self) -> anyhow::Result<Vec<SessionSummary>> {
        let url = format!("{}/api/sessions", self.base_url);
        let response: SessionsResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.sessions)
    }

    /// List the stored sessions for one identity
    pub async fn list_sessions(&self, identity: &str) -> Vec<SessionDetail> {
        match self.fetch_sessions(identity).await {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!("Failed to list sessions for {}: {}", identity, e);
                Vec::new()
            }
        }
    }

    async fn fetch_sessions(&self, identity: &str) -> anyhow::Result<Vec<SessionDetail>> {
        let url = format!("{}/api/sessions/{}", self.base_url, identity);
        let response: SessionDetailsResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.sessions)
    }

    /// List the messages within one stored session
    pub async fn list_messages(&self, identity: &str, session_id: &str) -> Vec<MessageRecord> {
        match self.fetch_messages(identity, session_id).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Failed to list messages for session {}: {}", session_id, e);
                Vec::new()
            }
        }
    }

    async fn fetch_messages(
        &self,
        identity: &str,
        session_id: &str,
    ) -> anyhow::Result<Vec<MessageRecord>> {
        let url = format!(
            "{}/api/sessions/{}/{}/messages",
            self.base_url, identity, session_id
        );
        let response: MessagesResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.messages)
    }

    /// Delete one stored session. Returns whether the server confirmed it.
    pub async fn delete_session(&self, identity: &str, session_id: &str) -> bool {
        let url = format!("{}/api/sessions/{}/{}", self.base_url, identity, session_id);
        match self.http.delete(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Failed to delete session {}: {}", session_id, e);
                false
            }
        }
    }

    /// List the long-term memories stored for one identity
    pub async fn list_memories(&self, identity: &str) -> Vec<MemoryRecord> {
        match self.fetch_memories(identity).await {
            Ok(memories) => memories,
            Err(e) => {
                warn!("Failed to list memories for {}: {}", identity, e);
                Vec::new()
            }
        }
    }

    async fn fetch_memories(&self, identity: &str) -> anyhow::Result<Vec<MemoryRecord>> {
        let url = format!("{}/api/memories/{}", self.base_url, identity);
        let response: MemoriesResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.memories)
    }

    /// Delete one stored memory. Returns whether the server confirmed it.
    pub async fn delete_memory(&self, identity: &str, memory_id: &str) -> bool {
        let url = format!("{}/api/memories/{}/{}", self.base_url, identity, memory_id);
        match self.http.delete(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Failed to delete memory {}: {}", memory_id, e);
                false
            }
        }
    }
}
