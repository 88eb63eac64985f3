//! Chat platform and alert sink fakes.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rsm_alert::{AlertError, AlertSink};
use rsm_publish::{ChatPublisher, PublishError, StatusCard};

fn locked<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Chat platform holding the current card of every message it created.
///
/// Message ids start at 1000 and increase by one per create.
pub struct FakeChat {
    next_id: AtomicU64,
    messages: Mutex<BTreeMap<u64, StatusCard>>,
    creates: Mutex<Vec<u64>>,
    edit_attempts: Mutex<BTreeMap<u64, u32>>,
    edit_script: Mutex<BTreeMap<u64, VecDeque<PublishError>>>,
    create_script: Mutex<VecDeque<PublishError>>,
}

impl Default for FakeChat {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            messages: Mutex::default(),
            creates: Mutex::default(),
            edit_attempts: Mutex::default(),
            edit_script: Mutex::default(),
            create_script: Mutex::default(),
        }
    }
}

impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue errors for the next edits of `message_id`; afterwards edits
    /// succeed again.
    pub fn fail_edits(&self, message_id: u64, errors: Vec<PublishError>) {
        locked(&self.edit_script).insert(message_id, errors.into_iter().collect());
    }

    /// Queue errors for the next creates.
    pub fn fail_creates(&self, errors: Vec<PublishError>) {
        locked(&self.create_script).extend(errors);
    }

    /// Ids of created messages, in creation order.
    pub fn created(&self) -> Vec<u64> {
        locked(&self.creates).clone()
    }

    pub fn edit_attempts(&self, message_id: u64) -> u32 {
        locked(&self.edit_attempts)
            .get(&message_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_edit_attempts(&self) -> u32 {
        locked(&self.edit_attempts).values().sum()
    }

    /// Current card of a message.
    pub fn card(&self, message_id: u64) -> Option<StatusCard> {
        locked(&self.messages).get(&message_id).cloned()
    }

    /// Current title of a message.
    pub fn title(&self, message_id: u64) -> Option<String> {
        self.card(message_id).map(|c| c.title)
    }
}

#[async_trait::async_trait]
impl ChatPublisher for FakeChat {
    async fn create_message(&self, _channel_id: u64, card: &StatusCard) -> Result<u64, PublishError> {
        if let Some(err) = locked(&self.create_script).pop_front() {
            return Err(err);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        locked(&self.messages).insert(id, card.clone());
        locked(&self.creates).push(id);
        Ok(id)
    }

    async fn edit_message(
        &self,
        _channel_id: u64,
        message_id: u64,
        card: &StatusCard,
    ) -> Result<(), PublishError> {
        *locked(&self.edit_attempts).entry(message_id).or_insert(0) += 1;

        let scripted = locked(&self.edit_script)
            .get_mut(&message_id)
            .and_then(VecDeque::pop_front);
        if let Some(err) = scripted {
            return Err(err);
        }

        let mut messages = locked(&self.messages);
        match messages.get_mut(&message_id) {
            Some(current) => {
                *current = card.clone();
                Ok(())
            }
            None => Err(PublishError::Permanent("Unknown Message".to_string())),
        }
    }
}

/// Alert sink recording every notification.
#[derive(Default)]
pub struct FakeAlertSink {
    sent: Mutex<Vec<String>>,
    failing: Mutex<bool>,
}

impl FakeAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *locked(&self.failing) = failing;
    }

    pub fn sent(&self) -> Vec<String> {
        locked(&self.sent).clone()
    }
}

#[async_trait::async_trait]
impl AlertSink for FakeAlertSink {
    async fn notify(&self, text: &str) -> Result<(), AlertError> {
        if *locked(&self.failing) {
            return Err(AlertError::Delivery("sink offline".to_string()));
        }
        locked(&self.sent).push(text.to_string());
        Ok(())
    }
}
