use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{DeleteMessageBatchRequestEntry, QueueAttributeName};
use tracing::debug;

use crate::config::{ConfigSource, QueueConfig};
use crate::message::RawMessage;
use crate::queue::{QueueClient, QueueError};

/// [`QueueClient`] backed by Amazon SQS.
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    visibility_timeout_secs: i32,
}

impl SqsQueue {
    pub async fn connect(config: &QueueConfig, visibility_timeout_secs: i32) -> Self {
        let loader = aws_config::defaults(BehaviorVersion::latest());
        let loader = match &config.aws_config_source {
            ConfigSource::Env => loader,
            ConfigSource::SharedProfile(profile) => loader.profile_name(profile),
        };
        let sdk_config = loader.load().await;
        debug!(queue_url = %config.queue_url, source = %config.aws_config_source, "sqs client ready");

        Self {
            client: Client::new(&sdk_config),
            queue_url: config.queue_url.clone(),
            visibility_timeout_secs,
        }
    }
}

#[async_trait]
impl QueueClient for SqsQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait_seconds: i32,
    ) -> Result<Vec<RawMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_seconds)
            .visibility_timeout(self.visibility_timeout_secs)
            .send()
            .await
            .map_err(|err| QueueError::Receive(DisplayErrorContext(&err).to_string()))?;

        Ok(output
            .messages()
            .iter()
            .map(|message| RawMessage {
                id: message.message_id().map(str::to_string),
                body: message.body().map(str::to_string),
                receipt_handle: message.receipt_handle().map(str::to_string),
            })
            .collect())
    }

    async fn delete_batch(&self, receipt_handles: Vec<String>) -> Result<(), QueueError> {
        let total = receipt_handles.len();
        let entries = receipt_handles
            .into_iter()
            .enumerate()
            .map(|(idx, handle)| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(idx.to_string())
                    .receipt_handle(handle)
                    .build()
                    .map_err(|err| QueueError::Delete(err.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|err| QueueError::Delete(DisplayErrorContext(&err).to_string()))?;

        let failed = output.failed();
        if failed.is_empty() {
            return Ok(());
        }

        let details = failed
            .iter()
            .map(|entry| format!("{}: {}", entry.id(), entry.message().unwrap_or(entry.code())))
            .collect::<Vec<_>>()
            .join("; ");
        Err(QueueError::PartialDelete {
            failed: failed.len(),
            total,
            details,
        })
    }

    async fn approximate_count(&self) -> Result<i64, QueueError> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(&self.queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await
            .map_err(|err| QueueError::Attributes(DisplayErrorContext(&err).to_string()))?;

        let raw = output
            .attributes()
            .and_then(|attrs| attrs.get(&QueueAttributeName::ApproximateNumberOfMessages))
            .cloned()
            .unwrap_or_default();
        raw.trim()
            .parse::<i64>()
            .map_err(|_| QueueError::CountUnparseable(raw))
    }
}
