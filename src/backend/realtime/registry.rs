/**
 * Connection Registry
 *
 * Process-wide routing tables for live connections:
 *
 * - `by_identity`: nickname → the user's current connection
 * - `by_group`: group id → (user id → subscribed connection)
 * - `subscriptions`: connection id → groups that connection joined
 *
 * `subscriptions` is the reverse index that makes eviction exact: a
 * connection is removed from every group it joined without scanning all
 * groups. It also doubles as the "is this connection registered" set, so a
 * subscribe racing with an eviction cannot leave a stale group entry behind.
 *
 * All tables sit behind one `Mutex`. Readers take snapshots (`Vec<Arc<_>>`)
 * and release the lock before any socket write.
 */
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::connection::{Connection, ConnectionId};
use crate::shared::{GroupId, UserId};

#[derive(Debug, Default)]
struct RoutingTables {
    by_identity: HashMap<String, Arc<Connection>>,
    by_group: HashMap<GroupId, HashMap<UserId, Arc<Connection>>>,
    subscriptions: HashMap<ConnectionId, HashSet<GroupId>>,
}

/// Shared registry of live connections
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    tables: Arc<Mutex<RoutingTables>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, RoutingTables> {
        // Every mutation completes before its guard drops; poisoning carries no torn state.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a connection under its nickname
    ///
    /// # Returns
    /// The connection it displaced, if the user was already connected. The
    /// caller is expected to close it.
    pub fn register(&self, connection: Arc<Connection>) -> Option<Arc<Connection>> {
        let mut tables = self.tables();
        tables.subscriptions.entry(connection.id()).or_default();
        let previous = tables
            .by_identity
            .insert(connection.nickname().to_string(), connection.clone());
        previous.filter(|prev| prev.id() != connection.id())
    }

    /// Current connection of a nickname
    pub fn lookup_by_identity(&self, nickname: &str) -> Option<Arc<Connection>> {
        self.tables().by_identity.get(nickname).cloned()
    }

    /// Current connection of a user id
    pub fn lookup_by_user(&self, user_id: UserId) -> Option<Arc<Connection>> {
        self.tables()
            .by_identity
            .values()
            .find(|conn| conn.user_id() == user_id)
            .cloned()
    }

    /// Add a registered connection to a group channel
    ///
    /// # Returns
    /// `false` if the connection is no longer the user's current one (evicted
    /// or superseded); the subscription is not recorded in that case.
    /// Subscribing twice is a no-op that returns `true`.
    pub fn subscribe(&self, connection: &Arc<Connection>, group_id: GroupId) -> bool {
        let mut guard = self.tables();
        let tables = &mut *guard;
        let is_current = tables
            .by_identity
            .get(connection.nickname())
            .is_some_and(|current| current.id() == connection.id());
        if !is_current {
            return false;
        }
        let Some(groups) = tables.subscriptions.get_mut(&connection.id()) else {
            return false;
        };
        groups.insert(group_id);
        tables
            .by_group
            .entry(group_id)
            .or_default()
            .insert(connection.user_id(), connection.clone());
        true
    }

    /// Remove a connection from a group channel
    ///
    /// # Returns
    /// Whether the connection was subscribed
    pub fn unsubscribe(&self, connection: &Connection, group_id: GroupId) -> bool {
        let mut guard = self.tables();
        let tables = &mut *guard;
        let was_subscribed = tables
            .subscriptions
            .get_mut(&connection.id())
            .is_some_and(|groups| groups.remove(&group_id));
        remove_member(&mut tables.by_group, group_id, connection);
        was_subscribed
    }

    /// Whether this exact connection is subscribed to the group
    pub fn is_subscribed(&self, connection: &Connection, group_id: GroupId) -> bool {
        self.tables()
            .by_group
            .get(&group_id)
            .and_then(|members| members.get(&connection.user_id()))
            .is_some_and(|member| member.id() == connection.id())
    }

    /// Remove a connection from every table
    ///
    /// Only entries that still point at this exact connection are removed, so
    /// evicting a superseded connection leaves its replacement untouched.
    /// Evicting twice is harmless.
    ///
    /// # Returns
    /// Whether anything was removed
    pub fn evict(&self, connection: &Connection) -> bool {
        let mut guard = self.tables();
        let tables = &mut *guard;
        let mut removed = false;

        if tables
            .by_identity
            .get(connection.nickname())
            .is_some_and(|current| current.id() == connection.id())
        {
            tables.by_identity.remove(connection.nickname());
            removed = true;
        }

        if let Some(groups) = tables.subscriptions.remove(&connection.id()) {
            removed = true;
            for group_id in groups {
                remove_member(&mut tables.by_group, group_id, connection);
            }
        }

        removed
    }

    /// Snapshot of a group's subscribed connections
    pub fn group_members(&self, group_id: GroupId) -> Vec<Arc<Connection>> {
        self.tables()
            .by_group
            .get(&group_id)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Sorted user ids subscribed to a group
    pub fn subscribers(&self, group_id: GroupId) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self
            .tables()
            .by_group
            .get(&group_id)
            .map(|members| members.keys().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Sorted groups a connection joined
    pub fn groups_of(&self, connection: &Connection) -> Vec<GroupId> {
        let mut groups: Vec<GroupId> = self
            .tables()
            .subscriptions
            .get(&connection.id())
            .map(|groups| groups.iter().copied().collect())
            .unwrap_or_default();
        groups.sort_unstable();
        groups
    }

    /// Snapshot of every registered connection
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.tables().by_identity.values().cloned().collect()
    }

    /// Sorted nicknames of everyone online
    pub fn online_nicknames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables().by_identity.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn connection_count(&self) -> usize {
        self.tables().by_identity.len()
    }

    /// Number of groups with at least one subscriber
    pub fn group_count(&self) -> usize {
        self.tables().by_group.len()
    }
}

/// Drop `connection` from one group, removing the group once it is empty
fn remove_member(
    by_group: &mut HashMap<GroupId, HashMap<UserId, Arc<Connection>>>,
    group_id: GroupId,
    connection: &Connection,
) {
    let Some(members) = by_group.get_mut(&group_id) else {
        return;
    };
    if members
        .get(&connection.user_id())
        .is_some_and(|member| member.id() == connection.id())
    {
        members.remove(&connection.user_id());
    }
    if members.is_empty() {
        by_group.remove(&group_id);
    }
}
