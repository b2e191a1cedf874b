use crate::errors::DevOpsError;
use crate::types::devops::Ticket;
use async_trait::async_trait;
use futures_util::future::join_all;
use std::collections::HashMap;

/// Source of ticket details keyed by ticket reference.
#[async_trait]
pub trait TicketProvider: Send + Sync {
    /// `Ok(None)` when the key is unknown to the tracker.
    async fn fetch_ticket(&self, key: &str) -> Result<Option<Ticket>, DevOpsError>;
}

/// Fetches every key in fixed-size batches.
///
/// Each batch runs concurrently and fully settles before the next starts.
/// Failures and unknown keys are simply absent from the returned map.
pub async fn fetch_tickets_batched(
    provider: &dyn TicketProvider,
    keys: &[String],
    batch_size: usize,
) -> HashMap<String, Ticket> {
    let mut tickets = HashMap::with_capacity(keys.len());

    for batch in keys.chunks(batch_size.max(1)) {
        let results = join_all(batch.iter().map(|key| provider.fetch_ticket(key))).await;
        for (key, result) in batch.iter().zip(results) {
            match result {
                Ok(Some(ticket)) => {
                    tickets.insert(key.clone(), ticket);
                }
                Ok(None) => tracing::info!("Ticket {} not found in tracker", key),
                Err(e) => tracing::warn!("Failed to fetch ticket {}: {}", key, e),
            }
        }
    }

    tickets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records concurrency and call order.
    #[derive(Default)]
    struct RecordingProvider {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TicketProvider for RecordingProvider {
        async fn fetch_ticket(&self, key: &str) -> Result<Option<Ticket>, DevOpsError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(key.to_string());
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match key {
                "MISS-1" => Ok(None),
                "FAIL-1" => Err(DevOpsError::AuthenticationError),
                _ => Ok(Some(Ticket {
                    key: key.to_string(),
                    title: format!("Title {}", key),
                    description: String::new(),
                    status: None,
                    issue_type: None,
                    priority: None,
                    labels: Vec::new(),
                })),
            }
        }
    }

    #[tokio::test]
    async fn test_batches_bound_concurrency_and_preserve_batch_order() {
        let provider = RecordingProvider::default();
        let keys: Vec<String> = (1..=12).map(|i| format!("K-{}", i)).collect();

        let tickets = fetch_tickets_batched(&provider, &keys, 5).await;

        assert_eq!(tickets.len(), 12);
        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 5);
        let calls = provider.calls.lock().unwrap().clone();
        let batch_of = |key: &str| keys.iter().position(|k| k == key).unwrap() / 5;
        assert!(calls.windows(2).all(|w| batch_of(&w[0]) <= batch_of(&w[1])));
    }

    #[tokio::test]
    async fn test_missing_and_failed_keys_are_skipped() {
        let provider = RecordingProvider::default();
        let keys = vec!["OK-1".to_string(), "MISS-1".to_string(), "FAIL-1".to_string()];
        let tickets = fetch_tickets_batched(&provider, &keys, 5).await;
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets["OK-1"].title, "Title OK-1");
    }
}
