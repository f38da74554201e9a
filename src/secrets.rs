use anyhow::Context;
use axum::async_trait;

/// Resolves a configuration value that is either a literal or a
/// reference into a secret store. Resolution happens once, at startup.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn resolve(&self, id_or_literal: &str) -> anyhow::Result<String>;
}

/// AWS Secrets Manager backed resolver. Values that look like a
/// Secrets Manager ARN are fetched; anything else passes through
/// unchanged, so plain env values keep working in local dev.
pub struct SecretsManagerResolver {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerResolver {
    pub async fn new() -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_secretsmanager::Client::new(&aws_config),
        }
    }
}

#[async_trait]
impl SecretResolver for SecretsManagerResolver {
    async fn resolve(&self, id_or_literal: &str) -> anyhow::Result<String> {
        if !id_or_literal.starts_with("arn:aws:secretsmanager:") {
            return Ok(id_or_literal.to_string());
        }

        let resp = self
            .client
            .get_secret_value()
            .secret_id(id_or_literal)
            .send()
            .await
            .with_context(|| format!("fetch secret {id_or_literal}"))?;

        resp.secret_string()
            .map(str::to_string)
            .with_context(|| format!("secret {id_or_literal} has no string value"))
    }
}

/// Passthrough resolver for tests and environments without a vault.
pub struct LiteralResolver;

#[async_trait]
impl SecretResolver for LiteralResolver {
    async fn resolve(&self, id_or_literal: &str) -> anyhow::Result<String> {
        Ok(id_or_literal.to_string())
    }
}
