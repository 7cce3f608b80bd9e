use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use courier_core::{update, Conversation, Effect, Msg};
use courier_engine::PreferenceStore;

/// Conversation state per chat.
///
/// A chat's state is seeded from the preference store the first time it
/// writes. The lock is only held while `update` runs.
pub struct Sessions {
    conversations: Mutex<HashMap<i64, Conversation>>,
    prefs: Arc<dyn PreferenceStore>,
    sender_address: Option<String>,
}

impl Sessions {
    pub fn new(prefs: Arc<dyn PreferenceStore>, sender_address: Option<String>) -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
            prefs,
            sender_address,
        }
    }

    pub fn dispatch(&self, chat_id: i64, msg: Msg) -> Vec<Effect> {
        let mut conversations = match self.conversations.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let state = match conversations.remove(&chat_id) {
            Some(state) => state,
            None => self.seed(chat_id),
        };
        let (next, effects) = update(state, msg);
        conversations.insert(chat_id, next);
        effects
    }

    fn seed(&self, chat_id: i64) -> Conversation {
        let prefs = self.prefs.get_preferences(chat_id);
        let conversation = Conversation::with_preferences(prefs.kindle_email, prefs.preserve_image_links);
        match &self.sender_address {
            Some(sender) => conversation.with_sender_address(sender.clone()),
            None => conversation,
        }
    }

    pub fn snapshot(&self, chat_id: i64) -> Option<Conversation> {
        self.conversations
            .lock()
            .ok()
            .and_then(|conversations| conversations.get(&chat_id).cloned())
    }
}
