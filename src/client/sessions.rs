// src/client/sessions.rs - Session and message endpoints

use reqwest::Method;
use serde_json::{json, Value};

use super::DojoClient;
use crate::infra::errors::DojoError;
use crate::models::{
    ExportFormat, ExportedFile, Message, MessageAck, MessageQuery, SendOptions, Session,
    SessionConfig, SessionStats, ShareLink, ShareOptions,
};

impl DojoClient {
    pub async fn create_session(&self, config: &SessionConfig) -> Result<Session, DojoError> {
        self.post(&["sessions"], config).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session, DojoError> {
        self.get(&["sessions", session_id]).await
    }

    pub async fn get_sessions(&self) -> Result<Vec<Session>, DojoError> {
        self.get(&["sessions"]).await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), DojoError> {
        self.execute(Method::DELETE, &["sessions", session_id]).await
    }

    pub async fn share_session(
        &self,
        session_id: &str,
        options: &ShareOptions,
    ) -> Result<ShareLink, DojoError> {
        self.post(&["sessions", session_id, "share"], options).await
    }

    pub async fn import_session(
        &self,
        share_link: &str,
        password: Option<&str>,
    ) -> Result<Session, DojoError> {
        let body = json!({ "share_link": share_link, "password": password });
        self.post(&["sessions", "import"], &body).await
    }

    pub async fn duplicate_session(
        &self,
        session_id: &str,
        name: Option<&str>,
    ) -> Result<Session, DojoError> {
        self.post(&["sessions", session_id, "duplicate"], &json!({ "name": name }))
            .await
    }

    pub async fn export_session(
        &self,
        session_id: &str,
        format: ExportFormat,
    ) -> Result<ExportedFile, DojoError> {
        self.get_with(
            &["sessions", session_id, "export"],
            &[("format", format.as_str().to_string())],
        )
        .await
    }

    pub async fn get_session_stats(&self, session_id: &str) -> Result<SessionStats, DojoError> {
        self.get(&["sessions", session_id, "stats"]).await
    }

    // ─── Messages ───────────────────────────────────────────

    /// Buffered send; the reply arrives over the session's push feed.
    pub async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        options: &SendOptions,
    ) -> Result<MessageAck, DojoError> {
        let mut body =
            serde_json::to_value(options).map_err(|e| DojoError::Encode(e.to_string()))?;
        if let Value::Object(map) = &mut body {
            map.insert("content".into(), Value::String(content.to_string()));
        }
        self.post(&["sessions", session_id, "message"], &body).await
    }

    pub async fn get_session_messages(
        &self,
        session_id: &str,
        query: MessageQuery,
    ) -> Result<Vec<Message>, DojoError> {
        self.get_with(&["sessions", session_id, "messages"], &query.pairs())
            .await
    }

    pub async fn delete_message(&self, session_id: &str, message_id: &str) -> Result<(), DojoError> {
        self.execute(Method::DELETE, &["sessions", session_id, "messages", message_id])
            .await
    }

    pub async fn edit_message(
        &self,
        session_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<Message, DojoError> {
        self.put(
            &["sessions", session_id, "messages", message_id],
            &json!({ "content": content }),
        )
        .await
    }

    pub async fn regenerate_response(
        &self,
        session_id: &str,
        message_id: &str,
    ) -> Result<MessageAck, DojoError> {
        self.post_empty(&["sessions", session_id, "messages", message_id, "regenerate"])
            .await
    }
}
