pub mod broadcast;
pub mod engine;
pub mod error;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use courier_types::models::UserId;

    use crate::transport::{DeliveryError, Transport};

    /// In-memory transport double: records every attempt, succeeds unless
    /// the target id has been marked as failing.
    #[derive(Default)]
    pub struct RecordingTransport {
        pub attempts: Mutex<Vec<UserId>>,
        pub sent: Mutex<Vec<(UserId, String)>>,
        pub failing: Mutex<HashSet<UserId>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_for(&self, id: UserId) {
            self.failing.lock().unwrap().insert(id);
        }

        pub fn sent_to(&self, id: UserId) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(target, _)| *target == id)
                .map(|(_, text)| text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn deliver(&self, target: UserId, text: &str) -> Result<(), DeliveryError> {
            self.attempts.lock().unwrap().push(target);
            if self.failing.lock().unwrap().contains(&target) {
                return Err(DeliveryError("simulated outage".into()));
            }
            self.sent.lock().unwrap().push((target, text.to_owned()));
            Ok(())
        }
    }
}
