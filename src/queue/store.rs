//! Pending Queue Module
//!
//! Durable FIFO of pending actions. Every mutation rewrites the persisted
//! list, so an interrupted process never drops accepted work.
//!
//! Actions handed to a drain stay "in flight" and remain part of the
//! persisted list until they complete, fail or are handed back; a crash
//! mid-drain therefore replays them on the next start.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{OfflineError, Result};
use crate::queue::{ActionIntent, PendingAction};
use crate::storage::Storage;

// == Storage Keys ==
pub const PENDING_ACTIONS_KEY: &str = "pending_actions";
pub const DEAD_LETTER_KEY: &str = "dead_letter_actions";
pub const COMPLETED_KEY: &str = "completed_actions";

/// Completed ids remembered for idempotent replay.
pub const COMPLETED_LEDGER_CAPACITY: usize = 1024;

/// What happened to an action that failed to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    Requeued,
    DeadLettered,
}

// == Pending Queue ==
#[derive(Debug)]
pub struct PendingQueue {
    /// Waiting actions, oldest first
    queued: VecDeque<PendingAction>,
    /// Actions handed to the current drain
    in_flight: Vec<PendingAction>,
    /// Actions that exhausted their attempts or failed permanently
    dead_letters: Vec<PendingAction>,
    /// Ids of completed actions, oldest first, bounded
    completed: VecDeque<String>,
    completed_index: HashSet<String>,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    /// Failed attempts before an action is dead-lettered
    max_attempts: u32,
    last_id: u64,
}

impl PendingQueue {
    // == Constructor ==
    /// Restores the queue from `storage`.
    ///
    /// Unreadable persisted state is logged and treated as empty rather than
    /// refusing to start.
    pub fn load(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, max_attempts: u32) -> Self {
        let queued: VecDeque<PendingAction> = load_json(storage.as_ref(), PENDING_ACTIONS_KEY);
        let dead_letters: Vec<PendingAction> = load_json(storage.as_ref(), DEAD_LETTER_KEY);
        let completed: VecDeque<String> = load_json(storage.as_ref(), COMPLETED_KEY);

        let last_id = queued
            .iter()
            .chain(dead_letters.iter())
            .filter_map(|a| a.id.parse::<u64>().ok())
            .chain(completed.iter().filter_map(|id| id.parse::<u64>().ok()))
            .max()
            .unwrap_or(0);

        if !queued.is_empty() {
            info!("Restored {} pending actions", queued.len());
        }

        let completed_index = completed.iter().cloned().collect();
        Self {
            queued,
            in_flight: Vec::new(),
            dead_letters,
            completed,
            completed_index,
            storage,
            clock,
            max_attempts: max_attempts.max(1),
            last_id,
        }
    }

    // == Enqueue ==
    /// Accepts an intent, assigns its id and timestamp, and persists.
    ///
    /// If persisting fails the action is still queued for this process and
    /// `OfflineError::NotDurable` reports its id.
    pub fn enqueue(&mut self, intent: ActionIntent) -> Result<PendingAction> {
        let now = self.clock.now_ms();
        let id = self.next_id(now);
        let action = PendingAction::new(id.to_string(), intent, now);

        debug!("Queued action {} ({})", action.id, action.action_type);
        self.queued.push_back(action.clone());

        self.persist_pending().map_err(|e| OfflineError::NotDurable {
            id: action.id.clone(),
            reason: e.to_string(),
        })?;
        Ok(action)
    }

    /// Unix ms, bumped past the previous id when the clock has not moved.
    fn next_id(&mut self, now: u64) -> u64 {
        let id = now.max(self.last_id + 1);
        self.last_id = id;
        id
    }

    // == Drain Support ==
    /// Hands every queued action to a drain, oldest first, and clears the
    /// queue. The actions stay persisted until they are resolved.
    pub fn begin_drain(&mut self) -> Vec<PendingAction> {
        let snapshot: Vec<PendingAction> = self.queued.drain(..).collect();
        self.in_flight.extend(snapshot.iter().cloned());
        snapshot
    }

    /// Marks an in-flight action as done.
    pub fn complete(&mut self, id: &str) -> Result<()> {
        self.take_in_flight(id);
        self.remember_completed(id);
        self.persist_pending()?;
        self.persist(COMPLETED_KEY, &self.completed)
    }

    /// Drops an in-flight action whose id already completed.
    pub fn skip_duplicate(&mut self, id: &str) -> Result<()> {
        self.take_in_flight(id);
        self.persist_pending()
    }

    /// Records a failed attempt. The action goes to the back of the queue,
    /// behind anything enqueued while it was in flight, or to the
    /// dead-letter list once it has used up its attempts.
    pub fn fail(&mut self, id: &str, reason: &str) -> Result<FailureOutcome> {
        let Some(mut action) = self.take_in_flight(id) else {
            return Err(OfflineError::Internal(format!(
                "action {} is not in flight",
                id
            )));
        };
        action.attempts += 1;
        action.last_error = Some(reason.to_string());

        if action.attempts >= self.max_attempts {
            warn!(
                "Action {} ({}) dead-lettered after {} attempts: {}",
                action.id, action.action_type, action.attempts, reason
            );
            self.dead_letters.push(action);
            self.persist_pending()?;
            self.persist(DEAD_LETTER_KEY, &self.dead_letters)?;
            return Ok(FailureOutcome::DeadLettered);
        }

        warn!(
            "Action {} ({}) failed, requeued (attempt {}/{}): {}",
            action.id, action.action_type, action.attempts, self.max_attempts, reason
        );
        self.queued.push_back(action);
        self.persist_pending()?;
        Ok(FailureOutcome::Requeued)
    }

    /// Moves an in-flight action straight to the dead-letter list.
    pub fn dead_letter(&mut self, id: &str, reason: &str) -> Result<()> {
        let Some(mut action) = self.take_in_flight(id) else {
            return Err(OfflineError::Internal(format!(
                "action {} is not in flight",
                id
            )));
        };
        warn!(
            "Action {} ({}) dead-lettered: {}",
            action.id, action.action_type, reason
        );
        action.attempts += 1;
        action.last_error = Some(reason.to_string());
        self.dead_letters.push(action);
        self.persist_pending()?;
        self.persist(DEAD_LETTER_KEY, &self.dead_letters)
    }

    /// Returns unattempted in-flight actions to the front of the queue in
    /// their original order. Used when a drain is cancelled.
    pub fn restore_front(&mut self, ids: &[String]) -> Result<()> {
        let restored: Vec<PendingAction> =
            ids.iter().filter_map(|id| self.take_in_flight(id)).collect();
        for action in restored.into_iter().rev() {
            self.queued.push_front(action);
        }
        self.persist_pending()
    }

    // == Queries ==
    pub fn is_completed(&self, id: &str) -> bool {
        self.completed_index.contains(id)
    }

    /// In-flight and queued actions, in persisted order.
    pub fn pending(&self) -> Vec<PendingAction> {
        self.in_flight
            .iter()
            .chain(self.queued.iter())
            .cloned()
            .collect()
    }

    pub fn dead_letters(&self) -> &[PendingAction] {
        &self.dead_letters
    }

    /// Number of actions not yet resolved (queued plus in flight).
    pub fn len(&self) -> usize {
        self.queued.len() + self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of actions waiting for the next drain.
    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    // == Internals ==
    fn take_in_flight(&mut self, id: &str) -> Option<PendingAction> {
        let pos = self.in_flight.iter().position(|a| a.id == id)?;
        Some(self.in_flight.remove(pos))
    }

    fn remember_completed(&mut self, id: &str) {
        if !self.completed_index.insert(id.to_string()) {
            return;
        }
        self.completed.push_back(id.to_string());
        while self.completed.len() > COMPLETED_LEDGER_CAPACITY {
            if let Some(evicted) = self.completed.pop_front() {
                self.completed_index.remove(&evicted);
            }
        }
    }

    fn persist_pending(&self) -> Result<()> {
        self.persist(PENDING_ACTIONS_KEY, &self.pending())
    }

    fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.storage.set(key, &json).map_err(|e| {
            warn!("Could not persist '{}': {}", key, e);
            e
        })
    }
}

fn load_json<T: DeserializeOwned + Default>(storage: &dyn Storage, key: &str) -> T {
    match storage.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Persisted '{}' is unreadable, starting empty: {}", key, e);
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            warn!("Could not load '{}', starting empty: {}", key, e);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::queue::ActionType;
    use crate::storage::MemoryStorage;
    use serde_json::{json, Value};

    fn setup(max_attempts: u32) -> (PendingQueue, Arc<MemoryStorage>, Arc<ManualClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let queue = PendingQueue::load(storage.clone(), clock.clone(), max_attempts);
        (queue, storage, clock)
    }

    fn intent(n: u32) -> ActionIntent {
        ActionIntent::new(ActionType::UpdateInventory, json!({ "n": n }))
    }

    fn persisted_ids(storage: &MemoryStorage) -> Vec<String> {
        let raw = storage.get(PENDING_ACTIONS_KEY).unwrap().unwrap();
        let actions: Vec<PendingAction> = serde_json::from_str(&raw).unwrap();
        actions.into_iter().map(|a| a.id).collect()
    }

    #[test]
    fn test_enqueue_assigns_increasing_ids() {
        let (mut queue, _, clock) = setup(5);

        let a = queue.enqueue(intent(1)).unwrap();
        let b = queue.enqueue(intent(2)).unwrap();
        clock.advance(std::time::Duration::from_millis(50));
        let c = queue.enqueue(intent(3)).unwrap();

        assert_eq!(a.id, "1000");
        assert_eq!(b.id, "1001");
        assert_eq!(c.id, "1050");
        assert_eq!(a.enqueued_at, 1_000);
    }

    #[test]
    fn test_enqueue_persists_full_list() {
        let (mut queue, storage, _) = setup(5);
        queue.enqueue(intent(1)).unwrap();
        queue.enqueue(intent(2)).unwrap();

        assert_eq!(persisted_ids(&storage), vec!["1000", "1001"]);
    }

    #[test]
    fn test_reload_restores_queue_and_ids() {
        let (mut queue, storage, clock) = setup(5);
        let accepted = queue.enqueue(intent(1)).unwrap();
        drop(queue);

        let mut restarted = PendingQueue::load(storage, clock, 5);
        assert_eq!(restarted.pending(), vec![accepted]);

        // The clock did not move; the next id must still be fresh
        let next = restarted.enqueue(intent(2)).unwrap();
        assert_eq!(next.id, "1001");
    }

    #[test]
    fn test_corrupt_state_loads_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(PENDING_ACTIONS_KEY, "[{oops").unwrap();
        let queue = PendingQueue::load(storage, Arc::new(ManualClock::new(0)), 5);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_without_durability() {
        let storage = Arc::new(MemoryStorage::with_quota(1));
        let mut queue = PendingQueue::load(storage, Arc::new(ManualClock::new(7)), 5);

        let result = queue.enqueue(intent(1));
        match result {
            Err(OfflineError::NotDurable { id, .. }) => assert_eq!(id, "7"),
            other => panic!("expected NotDurable, got {:?}", other),
        }
        // Still accepted for this process
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_in_flight_stays_persisted() {
        let (mut queue, storage, _) = setup(5);
        queue.enqueue(intent(1)).unwrap();
        queue.enqueue(intent(2)).unwrap();

        let snapshot = queue.begin_drain();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(queue.queued_len(), 0);
        assert_eq!(persisted_ids(&storage), vec!["1000", "1001"]);

        queue.complete("1000").unwrap();
        assert_eq!(persisted_ids(&storage), vec!["1001"]);
        assert!(queue.is_completed("1000"));
    }

    #[test]
    fn test_failed_action_goes_behind_new_arrivals() {
        let (mut queue, _, _) = setup(5);
        queue.enqueue(intent(1)).unwrap();
        queue.begin_drain();

        let late = queue.enqueue(intent(2)).unwrap();
        let outcome = queue.fail("1000", "network down").unwrap();

        assert_eq!(outcome, FailureOutcome::Requeued);
        let order: Vec<String> = queue.pending().into_iter().map(|a| a.id).collect();
        assert_eq!(order, vec![late.id, "1000".to_string()]);

        let requeued = queue.pending().pop().unwrap();
        assert_eq!(requeued.attempts, 1);
        assert_eq!(requeued.last_error.as_deref(), Some("network down"));
    }

    #[test]
    fn test_dead_letter_after_max_attempts() {
        let (mut queue, storage, _) = setup(2);
        queue.enqueue(intent(1)).unwrap();

        queue.begin_drain();
        assert_eq!(queue.fail("1000", "e1").unwrap(), FailureOutcome::Requeued);
        queue.begin_drain();
        assert_eq!(queue.fail("1000", "e2").unwrap(), FailureOutcome::DeadLettered);

        assert!(queue.is_empty());
        assert_eq!(queue.dead_letters().len(), 1);
        let raw = storage.get(DEAD_LETTER_KEY).unwrap().unwrap();
        let dead: Vec<PendingAction> = serde_json::from_str(&raw).unwrap();
        assert_eq!(dead[0].attempts, 2);
    }

    #[test]
    fn test_permanent_failure_dead_letters_immediately() {
        let (mut queue, _, _) = setup(5);
        queue.enqueue(intent(1)).unwrap();
        queue.begin_drain();

        queue.dead_letter("1000", "no handler").unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.dead_letters()[0].last_error.as_deref(), Some("no handler"));
    }

    #[test]
    fn test_restore_front_keeps_order() {
        let (mut queue, _, _) = setup(5);
        for n in 0..3 {
            queue.enqueue(intent(n)).unwrap();
        }
        let snapshot = queue.begin_drain();
        let late = queue.enqueue(intent(9)).unwrap();

        queue.complete(&snapshot[0].id).unwrap();
        let rest: Vec<String> = snapshot[1..].iter().map(|a| a.id.clone()).collect();
        queue.restore_front(&rest).unwrap();

        let order: Vec<String> = queue.pending().into_iter().map(|a| a.id).collect();
        assert_eq!(order, vec!["1001".to_string(), "1002".to_string(), late.id]);
    }

    #[test]
    fn test_completed_ledger_is_bounded_and_persisted() {
        let (mut queue, storage, _) = setup(5);
        for n in 0..(COMPLETED_LEDGER_CAPACITY as u32 + 10) {
            queue.enqueue(intent(n)).unwrap();
        }
        for action in queue.begin_drain() {
            queue.complete(&action.id).unwrap();
        }

        assert!(!queue.is_completed("1000"));
        assert!(queue.is_completed(&(1000 + COMPLETED_LEDGER_CAPACITY as u64 + 9).to_string()));

        let raw = storage.get(COMPLETED_KEY).unwrap().unwrap();
        let ids: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(ids.len(), COMPLETED_LEDGER_CAPACITY);
    }
}
