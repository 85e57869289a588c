use async_trait::async_trait;

use super::model::Turn;

/// Generative reply backend: one system instruction, optional prior turns,
/// one prompt in, one piece of text out.
#[async_trait]
pub trait ReplyGenerator {
    async fn generate(
        &self,
        instruction: &str,
        history: &[Turn],
        prompt: &str,
    ) -> super::Result<String>;
}
