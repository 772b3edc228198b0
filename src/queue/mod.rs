//! Queue Module
//!
//! Durable FIFO of mutating intents captured while offline, replayed on
//! reconnect with at-least-once delivery.
//!
//! Per action: `Queued -> Executing -> Completed | Queued (retry) | DeadLettered`.

mod action;
mod dispatcher;
mod drain;
mod store;

pub use action::{ActionIntent, ActionType, PendingAction};
pub use dispatcher::{ActionHandler, Dispatcher, ExecutionError, LoggingHandler};
pub use drain::{drain_queue, DrainReport};
pub use store::{
    FailureOutcome, PendingQueue, COMPLETED_KEY, COMPLETED_LEDGER_CAPACITY, DEAD_LETTER_KEY,
    PENDING_ACTIONS_KEY,
};
