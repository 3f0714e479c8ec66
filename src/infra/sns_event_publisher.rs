use crate::domain::{EventPublisher, WithdrawalEvent};
use aws_config::BehaviorVersion;
use aws_sdk_sns::{config::Region, error::SdkError, operation::publish::PublishError, Client};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnsConfig {
    #[serde(default = "default_region")]
    region: String,
    topic_arn: String,
    /// Override for the SNS endpoint, e.g. LocalStack.
    #[serde(default)]
    endpoint_url: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Publishes withdrawal events as JSON messages to a fixed SNS topic.
#[derive(Debug, Clone)]
pub struct SnsEventPublisher {
    client: Client,
    topic_arn: String,
}

impl SnsEventPublisher {
    /// Create a publisher with credentials from the default AWS provider chain.
    pub async fn new(config: SnsConfig) -> Self {
        let SnsConfig {
            region,
            topic_arn,
            endpoint_url,
        } = config;

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));
        if let Some(endpoint_url) = endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;

        Self {
            client: Client::new(&sdk_config),
            topic_arn,
        }
    }
}

impl EventPublisher for SnsEventPublisher {
    type Error = SnsPublishError;

    #[instrument(skip(self))]
    async fn publish(&self, event: &WithdrawalEvent) -> Result<(), Self::Error> {
        let message = serde_json::to_string(event)?;

        let output = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .message(message)
            .send()
            .await
            .map_err(Box::new)?;

        debug!(message_id = output.message_id(), "published to SNS");
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SnsPublishError {
    #[error("cannot serialize withdrawal event")]
    Serialize(#[from] serde_json::Error),

    #[error("cannot publish to SNS topic")]
    Publish(#[from] Box<SdkError<PublishError>>),
}
