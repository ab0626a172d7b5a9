//! Change feed trigger source.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, error, info, warn};

use super::automation_model::{SubscriptionState, TriggerSourceKind};
use super::automation_traits::{CascadeTrigger, TriggerSource};
use crate::errors::{AutomationError, Result};
use crate::store::{ChangeFeedTrait, ChangeStream, Collection, WatchOptions};

/// Observable state of every change feed subscription.
#[derive(Clone, Default)]
pub struct SubscriptionBoard {
    states: Arc<RwLock<HashMap<Collection, SubscriptionState>>>,
}

impl SubscriptionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, collection: Collection) -> SubscriptionState {
        self.states
            .read()
            .ok()
            .and_then(|states| states.get(&collection).copied())
            .unwrap_or(SubscriptionState::Idle)
    }

    /// Moves `collection` to `next`. Terminal states are never left.
    pub fn transition(&self, collection: Collection, next: SubscriptionState) {
        match self.states.write() {
            Ok(mut states) => {
                let current = states
                    .get(&collection)
                    .copied()
                    .unwrap_or(SubscriptionState::Idle);
                if current.is_terminal() {
                    debug!(
                        "Subscription on {} is {:?}, ignoring {:?}",
                        collection, current, next
                    );
                    return;
                }
                states.insert(collection, next);
            }
            Err(e) => warn!("Subscription board poisoned: {}", e),
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, SubscriptionState> {
        self.states
            .read()
            .map(|states| {
                states
                    .iter()
                    .map(|(collection, state)| (collection.to_string(), *state))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Delivers documents from one live subscription per watched collection.
///
/// A subscription that errors or closes stays down; there is no reconnect.
pub struct ChangeFeedTriggerSource {
    feed: Arc<dyn ChangeFeedTrait>,
    board: SubscriptionBoard,
}

impl ChangeFeedTriggerSource {
    pub fn new(feed: Arc<dyn ChangeFeedTrait>, board: SubscriptionBoard) -> Self {
        Self { feed, board }
    }
}

#[async_trait]
impl TriggerSource for ChangeFeedTriggerSource {
    fn kind(&self) -> TriggerSourceKind {
        TriggerSourceKind::ChangeFeed
    }

    async fn start(&self, dispatcher: Arc<dyn CascadeTrigger>) -> Result<Vec<Collection>> {
        let mut attached = Vec::new();
        for collection in Collection::ALL {
            self.board.transition(collection, SubscriptionState::Idle);
            match self.feed.watch(collection, WatchOptions::for_cascades()) {
                Ok(stream) => {
                    self.board
                        .transition(collection, SubscriptionState::Subscribed);
                    tokio::spawn(run_subscription(
                        collection,
                        stream,
                        dispatcher.clone(),
                        self.board.clone(),
                    ));
                    attached.push(collection);
                }
                Err(e) => {
                    error!("Change feed subscription on {} failed: {}", collection, e);
                    self.board.transition(collection, SubscriptionState::Error);
                }
            }
        }

        if attached.is_empty() {
            return Err(AutomationError::SubscriptionFailed {
                collection: "*".to_string(),
                reason: "no collection could be watched".to_string(),
            }
            .into());
        }
        info!("Change feed attached to {:?}", attached);
        Ok(attached)
    }
}

async fn run_subscription(
    collection: Collection,
    mut stream: ChangeStream,
    dispatcher: Arc<dyn CascadeTrigger>,
    board: SubscriptionBoard,
) {
    while let Some(item) = stream.next().await {
        match item {
            Ok(event) => {
                let Some(document) = event.full_document else {
                    debug!(
                        "{:?} on {} {} carried no document, ignoring",
                        event.operation, collection, event.document_id
                    );
                    continue;
                };
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher.trigger(document).await;
                });
            }
            Err(e) => {
                error!("Change feed on {} failed: {}", collection, e);
                board.transition(collection, SubscriptionState::Error);
                return;
            }
        }
    }
    info!("Change feed on {} closed", collection);
    board.transition(collection, SubscriptionState::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::MockCascadeTrigger;
    use crate::leads::{LeadRepositoryTrait, NewLead};
    use crate::store::InMemoryStore;
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[test]
    fn test_board_terminal_states_stick() {
        let board = SubscriptionBoard::new();
        assert_eq!(board.state(Collection::Leads), SubscriptionState::Idle);

        board.transition(Collection::Leads, SubscriptionState::Subscribed);
        board.transition(Collection::Leads, SubscriptionState::Error);
        board.transition(Collection::Leads, SubscriptionState::Subscribed);

        assert_eq!(board.state(Collection::Leads), SubscriptionState::Error);
        assert_eq!(
            board.snapshot().get("leads"),
            Some(&SubscriptionState::Error)
        );
    }

    #[tokio::test]
    async fn test_start_fails_without_replication() {
        let store = Arc::new(InMemoryStore::standalone());
        let board = SubscriptionBoard::new();
        let source = ChangeFeedTriggerSource::new(store, board.clone());

        let result = source.start(Arc::new(MockCascadeTrigger::new())).await;

        assert!(result.is_err());
        assert_eq!(board.state(Collection::Orders), SubscriptionState::Error);
    }

    #[tokio::test]
    async fn test_events_reach_dispatcher() {
        let store = Arc::new(InMemoryStore::replica_set());
        let board = SubscriptionBoard::new();
        let source = ChangeFeedTriggerSource::new(store.clone(), board.clone());
        let mock = MockCascadeTrigger::new();

        let attached = source.start(Arc::new(mock.clone())).await.unwrap();
        assert_eq!(attached.len(), 4);

        LeadRepositoryTrait::create(
            store.as_ref(),
            NewLead {
                name: "Ada".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        settle().await;

        assert_eq!(mock.len(), 1);
        assert_eq!(board.state(Collection::Leads), SubscriptionState::Subscribed);
    }

    #[tokio::test]
    async fn test_fault_ends_only_that_subscription() {
        let store = Arc::new(InMemoryStore::replica_set());
        let board = SubscriptionBoard::new();
        let source = ChangeFeedTriggerSource::new(store.clone(), board.clone());
        source
            .start(Arc::new(MockCascadeTrigger::new()))
            .await
            .unwrap();

        store.inject_feed_fault(Collection::Quotes, "cursor killed");
        store.close_feed(Collection::Orders);
        settle().await;

        assert_eq!(board.state(Collection::Quotes), SubscriptionState::Error);
        assert_eq!(board.state(Collection::Orders), SubscriptionState::Closed);
        assert_eq!(board.state(Collection::Leads), SubscriptionState::Subscribed);
    }
}
