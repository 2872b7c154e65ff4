use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_redis::{redis, redis::AsyncCommands, Config, Pool, Runtime};

use crate::domain::{ports::ConversationStore, Conversation, DomainError, Message};

mod keys {
    pub const SESSIONS: &str = "conversation:sessions";

    pub fn meta(session_id: &str) -> String {
        format!("conversation:{session_id}:meta")
    }

    pub fn messages(session_id: &str) -> String {
        format!("conversation:{session_id}:messages")
    }
}

/// Redis-backed conversation store.
///
/// Layout: a set of session ids, one meta hash per conversation
/// (created_at/updated_at as RFC 3339) and one list of JSON-encoded
/// messages. Every mutation runs as a single MULTI/EXEC pipeline, so each
/// message append is independently atomic.
pub struct RedisConversationStore {
    pool: Pool,
}

impl RedisConversationStore {
    pub fn connect(redis_url: &str) -> Result<Self, DomainError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, DomainError> {
        self.pool
            .get()
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))
    }
}

fn parse_timestamp(raw: Option<&String>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

#[async_trait]
impl ConversationStore for RedisConversationStore {
    async fn create(&self, session_id: &str) -> Result<(), DomainError> {
        let mut conn = self.conn().await?;

        let added: i64 = conn
            .sadd(keys::SESSIONS, session_id)
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        if added == 0 {
            return Err(DomainError::conflict(format!(
                "session {session_id} already exists"
            )));
        }

        let now = Utc::now().to_rfc3339();
        let _: () = redis::pipe()
            .atomic()
            .hset(keys::meta(session_id), "created_at", &now)
            .ignore()
            .hset(keys::meta(session_id), "updated_at", &now)
            .ignore()
            .query_async(&mut *conn)
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: &str,
        message: &Message,
    ) -> Result<(), DomainError> {
        let payload = serde_json::to_string(message)
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        let timestamp = message.timestamp.to_rfc3339();

        let mut conn = self.conn().await?;
        let _: () = redis::pipe()
            .atomic()
            .sadd(keys::SESSIONS, session_id)
            .ignore()
            .rpush(keys::messages(session_id), &payload)
            .ignore()
            .hset_nx(keys::meta(session_id), "created_at", &timestamp)
            .ignore()
            .hset(keys::meta(session_id), "updated_at", &timestamp)
            .ignore()
            .query_async(&mut *conn)
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<Conversation>, DomainError> {
        let mut conn = self.conn().await?;

        let exists: bool = conn
            .sismember(keys::SESSIONS, session_id)
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        if !exists {
            return Ok(None);
        }

        let raw: Vec<String> = conn
            .lrange(keys::messages(session_id), 0, -1)
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        let meta: std::collections::HashMap<String, String> = conn
            .hgetall(keys::meta(session_id))
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;

        let messages = raw
            .iter()
            .map(|json| serde_json::from_str::<Message>(json))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DomainError::persistence(format!("corrupt message record: {e}")))?;

        Ok(Some(Conversation {
            session_id: session_id.to_string(),
            messages,
            created_at: parse_timestamp(meta.get("created_at")),
            updated_at: parse_timestamp(meta.get("updated_at")),
        }))
    }

    async fn exists(&self, session_id: &str) -> Result<bool, DomainError> {
        let mut conn = self.conn().await?;
        conn.sismember(keys::SESSIONS, session_id)
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))
    }

    async fn rename(&self, old_id: &str, new_id: &str) -> Result<(), DomainError> {
        if self.exists(new_id).await? {
            return Err(DomainError::conflict(format!(
                "session {new_id} already exists"
            )));
        }
        let Some(conversation) = self.get(old_id).await? else {
            return Err(DomainError::not_found(format!("session {old_id}")));
        };

        // Rewrite under the new key and drop the old one in one transaction.
        let mut pipe = redis::pipe();
        pipe.atomic()
            .srem(keys::SESSIONS, old_id)
            .ignore()
            .del(&[keys::meta(old_id), keys::messages(old_id)])
            .ignore()
            .sadd(keys::SESSIONS, new_id)
            .ignore()
            .hset(
                keys::meta(new_id),
                "created_at",
                conversation.created_at.to_rfc3339(),
            )
            .ignore()
            .hset(
                keys::meta(new_id),
                "updated_at",
                conversation.updated_at.to_rfc3339(),
            )
            .ignore();
        for message in &conversation.messages {
            let payload = serde_json::to_string(message)
                .map_err(|e| DomainError::persistence(e.to_string()))?;
            pipe.rpush(keys::messages(new_id), payload).ignore();
        }

        let mut conn = self.conn().await?;
        let _: () = pipe
            .query_async(&mut *conn)
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool, DomainError> {
        let mut conn = self.conn().await?;

        let (removed,): (i64,) = redis::pipe()
            .atomic()
            .srem(keys::SESSIONS, session_id)
            .del(&[keys::meta(session_id), keys::messages(session_id)])
            .ignore()
            .query_async(&mut *conn)
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        Ok(removed > 0)
    }

    async fn list(&self) -> Result<Vec<String>, DomainError> {
        let mut conn = self.conn().await?;
        conn.smembers(keys::SESSIONS)
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))
    }
}
