//! Command dispatcher
//!
//! Routes incoming commands to the appropriate handler.
//! This module provides loose coupling between the server and command implementations.

use crate::commands::{wrong_arity, CommandContext, CommandRegistry, Session};
use crate::protocol::{DecodedCommand, RespValue};
use crate::replication::ReplicationManager;
use crate::store::KeyValueStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Command dispatcher
///
/// Looks up the handler for a decoded request, validates its arity, runs it,
/// and forwards successful writes to the followers.
///
/// Writes are applied and queued for the followers under one lock, so every
/// follower receives them in the order the store applied them.
pub struct Dispatcher {
    /// Command registry
    registry: CommandRegistry,

    store: Arc<KeyValueStore>,

    replication: Arc<ReplicationManager>,

    write_order: Mutex<()>,
}

impl Dispatcher {
    /// Create a new dispatcher
    pub fn new(store: Arc<KeyValueStore>, replication: Arc<ReplicationManager>) -> Self {
        Dispatcher {
            registry: CommandRegistry::new(),
            store,
            replication,
            write_order: Mutex::new(()),
        }
    }

    /// Dispatch a command on behalf of `session`
    pub fn dispatch(&self, command: &DecodedCommand, session: &Session) -> RespValue {
        debug!("Dispatching command: {}", command);

        // Look up the command
        let handler = match self.registry.get(&command.name) {
            Some(handler) => handler,
            None => {
                warn!("Unknown command: {}", command.name);
                return RespValue::error(format!("ERR unknown command '{}'", command.name));
            }
        };

        // Validate argument count
        let argc = command.args.len();
        if argc < handler.min_args() || handler.max_args().is_some_and(|max| argc > max) {
            return wrong_arity(&command.name);
        }

        let ctx = CommandContext::new(&self.store, &self.replication, session);
        if !handler.is_write() {
            return handler.execute(&ctx, &command.args);
        }

        // Apply and queue as one step
        let _order = self.write_order.lock();
        let reply = handler.execute(&ctx, &command.args);
        if !reply.is_error() {
            self.replication.propagate(&command.raw);
        }

        reply
    }

    /// Shared store
    pub fn store(&self) -> &Arc<KeyValueStore> {
        &self.store
    }

    /// Shared replication state
    pub fn replication(&self) -> &Arc<ReplicationManager> {
        &self.replication
    }
}
