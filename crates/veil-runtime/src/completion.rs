use async_trait::async_trait;

/// Text completion service used for SQL generation and result summaries.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String>;
}
