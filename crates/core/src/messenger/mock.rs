//! Test doubles for the messaging and membership ports.
//!
//! Kept in the library (not behind `cfg(test)`) so downstream crates can
//! exercise the workflows without a live messaging connection.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::messenger::messenger_model::ListingCard;
use crate::messenger::messenger_traits::{
    DeliveryError, DeliveryResult, MembershipProviderTrait, MessengerTrait,
};

/// A single recorded call against [`MockMessenger`].
#[derive(Debug, Clone, PartialEq)]
pub enum MessengerCall {
    PostMessage {
        channel_id: i64,
        card: ListingCard,
    },
    CreateThread {
        channel_id: i64,
        message_id: i64,
        name: String,
    },
    AddParticipant {
        thread_id: i64,
        user_id: i64,
    },
    EditMessage {
        channel_id: i64,
        message_id: i64,
        card: ListingCard,
    },
    RenameThread {
        thread_id: i64,
        name: String,
    },
    CloseThread {
        thread_id: i64,
    },
    SendDirect {
        user_id: i64,
        text: String,
    },
    SendChannel {
        channel_id: i64,
        text: String,
    },
}

#[derive(Debug)]
struct MockMessengerState {
    calls: Vec<MessengerCall>,
    next_message_id: i64,
    next_thread_id: i64,
    unreachable_users: HashSet<i64>,
    fail_channel_sends: bool,
    fail_mirror_updates: bool,
}

/// Mock messenger: records calls and hands out sequential ids.
#[derive(Clone)]
pub struct MockMessenger {
    state: Arc<Mutex<MockMessengerState>>,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockMessengerState {
                calls: Vec::new(),
                next_message_id: 1000,
                next_thread_id: 5000,
                unreachable_users: HashSet::new(),
                fail_channel_sends: false,
                fail_mirror_updates: false,
            })),
        }
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<MessengerCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Direct-message texts delivered to one user.
    pub fn direct_messages_to(&self, user_id: i64) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter_map(|call| match call {
                MessengerCall::SendDirect { user_id: to, text } if *to == user_id => {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Makes future `send_direct` calls to this user fail.
    pub fn mark_unreachable(&self, user_id: i64) {
        self.state.lock().unwrap().unreachable_users.insert(user_id);
    }

    /// Makes future `send_channel` calls fail.
    pub fn fail_channel_sends(&self) {
        self.state.lock().unwrap().fail_channel_sends = true;
    }

    /// Makes future message-edit and thread calls fail, simulating an
    /// external outage after a committed edit.
    pub fn fail_mirror_updates(&self) {
        self.state.lock().unwrap().fail_mirror_updates = true;
    }
}

impl Default for MockMessenger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessengerTrait for MockMessenger {
    async fn post_message(&self, channel_id: i64, card: &ListingCard) -> DeliveryResult<i64> {
        let mut state = self.state.lock().unwrap();
        state.next_message_id += 1;
        let message_id = state.next_message_id;
        state.calls.push(MessengerCall::PostMessage {
            channel_id,
            card: card.clone(),
        });
        Ok(message_id)
    }

    async fn create_thread(
        &self,
        channel_id: i64,
        message_id: i64,
        name: &str,
    ) -> DeliveryResult<i64> {
        let mut state = self.state.lock().unwrap();
        state.next_thread_id += 1;
        let thread_id = state.next_thread_id;
        state.calls.push(MessengerCall::CreateThread {
            channel_id,
            message_id,
            name: name.to_string(),
        });
        Ok(thread_id)
    }

    async fn add_participant(&self, thread_id: i64, user_id: i64) -> DeliveryResult<()> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(MessengerCall::AddParticipant { thread_id, user_id });
        Ok(())
    }

    async fn edit_message(
        &self,
        channel_id: i64,
        message_id: i64,
        card: &ListingCard,
    ) -> DeliveryResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_mirror_updates {
            return Err(DeliveryError::ChannelUnavailable(channel_id));
        }
        state.calls.push(MessengerCall::EditMessage {
            channel_id,
            message_id,
            card: card.clone(),
        });
        Ok(())
    }

    async fn rename_thread(&self, thread_id: i64, name: &str) -> DeliveryResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_mirror_updates {
            return Err(DeliveryError::ThreadUnavailable(thread_id));
        }
        state.calls.push(MessengerCall::RenameThread {
            thread_id,
            name: name.to_string(),
        });
        Ok(())
    }

    async fn close_thread(&self, thread_id: i64) -> DeliveryResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_mirror_updates {
            return Err(DeliveryError::ThreadUnavailable(thread_id));
        }
        state.calls.push(MessengerCall::CloseThread { thread_id });
        Ok(())
    }

    async fn send_direct(&self, user_id: i64, text: &str) -> DeliveryResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable_users.contains(&user_id) {
            return Err(DeliveryError::RecipientUnreachable(user_id));
        }
        state.calls.push(MessengerCall::SendDirect {
            user_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_channel(&self, channel_id: i64, text: &str) -> DeliveryResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_channel_sends {
            return Err(DeliveryError::ChannelUnavailable(channel_id));
        }
        state.calls.push(MessengerCall::SendChannel {
            channel_id,
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Mock membership provider backed by a fixed member set.
#[derive(Clone, Default)]
pub struct MockMembershipProvider {
    members: Arc<Mutex<HashSet<i64>>>,
}

impl MockMembershipProvider {
    pub fn new(members: impl IntoIterator<Item = i64>) -> Self {
        Self {
            members: Arc::new(Mutex::new(members.into_iter().collect())),
        }
    }

    pub fn remove(&self, user_id: i64) {
        self.members.lock().unwrap().remove(&user_id);
    }
}

#[async_trait]
impl MembershipProviderTrait for MockMembershipProvider {
    async fn current_members(&self, _guild_id: i64) -> DeliveryResult<HashSet<i64>> {
        Ok(self.members.lock().unwrap().clone())
    }
}
