//! Property-based tests for the connection registry
//!
//! Random sequences of register/subscribe/unsubscribe/evict are applied to
//! both the registry and a simple model; the routing tables must agree with
//! the model after every step.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use proptest::prelude::*;
use socialnet::backend::realtime::{Connection, ConnectionId, ConnectionRegistry};
use socialnet::shared::{GroupId, UserId};
use tokio::sync::mpsc;

const USERS: UserId = 4;
const GROUPS: GroupId = 3;

#[derive(Debug, Clone)]
enum Op {
    /// Open a new connection for a user; the previous one stays alive until evicted
    Connect(UserId),
    /// Subscribe on the user's newest connection
    Subscribe(UserId, GroupId),
    /// Subscribe on an older connection whose socket has not been torn down yet
    SubscribeStale(UserId, GroupId),
    Unsubscribe(UserId, GroupId),
    /// Evict the user's most recent connection
    EvictLatest(UserId),
    /// Evict the user's oldest connection
    EvictOldest(UserId),
}

fn op() -> impl Strategy<Value = Op> {
    let user = 1..=USERS;
    let group = 1..=GROUPS;
    prop_oneof![
        user.clone().prop_map(Op::Connect),
        (user.clone(), group.clone()).prop_map(|(u, g)| Op::Subscribe(u, g)),
        (user.clone(), group.clone()).prop_map(|(u, g)| Op::SubscribeStale(u, g)),
        (user.clone(), group).prop_map(|(u, g)| Op::Unsubscribe(u, g)),
        user.clone().prop_map(Op::EvictLatest),
        user.prop_map(Op::EvictOldest),
    ]
}

fn nickname(user_id: UserId) -> String {
    format!("user{}", user_id)
}

#[derive(Default)]
struct Model {
    /// Every connection ever opened per user, oldest first
    opened: BTreeMap<UserId, Vec<Arc<Connection>>>,
    /// Currently registered connection per user
    current: BTreeMap<UserId, Arc<Connection>>,
    /// Groups joined by each connection that has not been evicted
    joined: BTreeMap<ConnectionId, BTreeSet<GroupId>>,
    /// Group → user id → connection id routed to
    groups: BTreeMap<GroupId, BTreeMap<UserId, ConnectionId>>,
}

impl Model {
    fn remove_member(&mut self, group_id: GroupId, connection: &Connection) {
        if let Some(members) = self.groups.get_mut(&group_id) {
            if members.get(&connection.user_id()) == Some(&connection.id()) {
                members.remove(&connection.user_id());
            }
            if members.is_empty() {
                self.groups.remove(&group_id);
            }
        }
    }

    fn is_current(&self, connection: &Connection) -> bool {
        self.current
            .get(&connection.user_id())
            .is_some_and(|current| current.id() == connection.id())
    }

    fn subscribe(&mut self, registry: &ConnectionRegistry, connection: Arc<Connection>, group_id: GroupId) {
        let expected = self.is_current(&connection);
        assert_eq!(
            registry.subscribe(&connection, group_id),
            expected,
            "subscribe of connection {} to group {}",
            connection.id(),
            group_id
        );
        if expected {
            self.joined.entry(connection.id()).or_default().insert(group_id);
            self.groups
                .entry(group_id)
                .or_default()
                .insert(connection.user_id(), connection.id());
        }
    }

    fn evict(&mut self, registry: &ConnectionRegistry, connection: Arc<Connection>) {
        registry.evict(&connection);
        if self.is_current(&connection) {
            self.current.remove(&connection.user_id());
        }
        if let Some(groups) = self.joined.remove(&connection.id()) {
            for group_id in groups {
                self.remove_member(group_id, &connection);
            }
        }
    }

    fn apply(&mut self, registry: &ConnectionRegistry, op: Op) {
        match op {
            Op::Connect(user_id) => {
                let (tx, _rx) = mpsc::channel(1);
                let connection = Connection::new(user_id, nickname(user_id), tx);
                let displaced = registry.register(connection.clone());
                let expected = self.current.insert(user_id, connection.clone());
                assert_eq!(displaced.map(|c| c.id()), expected.map(|c| c.id()));
                self.joined.insert(connection.id(), BTreeSet::new());
                self.opened.entry(user_id).or_default().push(connection);
            }
            Op::Subscribe(user_id, group_id) => {
                if let Some(connection) = self.opened.get(&user_id).and_then(|c| c.last()).cloned() {
                    self.subscribe(registry, connection, group_id);
                }
            }
            Op::SubscribeStale(user_id, group_id) => {
                let stale = self
                    .opened
                    .get(&user_id)
                    .filter(|c| c.len() >= 2)
                    .map(|c| c[c.len() - 2].clone());
                if let Some(connection) = stale {
                    self.subscribe(registry, connection, group_id);
                }
            }
            Op::Unsubscribe(user_id, group_id) => {
                if let Some(connection) = self.current.get(&user_id).cloned() {
                    let expected = self
                        .joined
                        .get_mut(&connection.id())
                        .is_some_and(|groups| groups.remove(&group_id));
                    self.remove_member(group_id, &connection);
                    assert_eq!(registry.unsubscribe(&connection, group_id), expected);
                }
            }
            Op::EvictLatest(user_id) => {
                if let Some(connection) = self.opened.get(&user_id).and_then(|c| c.last()).cloned() {
                    self.evict(registry, connection);
                }
            }
            Op::EvictOldest(user_id) => {
                if let Some(connection) = self.opened.get(&user_id).and_then(|c| c.first()).cloned() {
                    self.evict(registry, connection);
                }
            }
        }
    }

    fn check(&self, registry: &ConnectionRegistry) {
        let mut expected_names: Vec<String> = self.current.keys().map(|id| nickname(*id)).collect();
        expected_names.sort();
        assert_eq!(registry.online_nicknames(), expected_names);

        for user_id in 1..=USERS {
            let actual = registry.lookup_by_identity(&nickname(user_id)).map(|c| c.id());
            let expected = self.current.get(&user_id).map(|c| c.id());
            assert_eq!(actual, expected, "identity entry for user {}", user_id);
        }

        assert_eq!(registry.group_count(), self.groups.len(), "empty groups must be pruned");
        for group_id in 1..=GROUPS {
            let expected: Vec<UserId> = self
                .groups
                .get(&group_id)
                .map(|members| members.keys().copied().collect())
                .unwrap_or_default();
            assert_eq!(registry.subscribers(group_id), expected, "group {}", group_id);

            let mut routed: Vec<ConnectionId> =
                registry.group_members(group_id).iter().map(|c| c.id()).collect();
            routed.sort_unstable();
            let mut expected_routes: Vec<ConnectionId> = self
                .groups
                .get(&group_id)
                .map(|members| members.values().copied().collect())
                .unwrap_or_default();
            expected_routes.sort_unstable();
            assert_eq!(routed, expected_routes, "routes of group {}", group_id);
        }

        // The current connection is routed for exactly the groups it joined
        for connection in self.current.values() {
            let joined = self.joined.get(&connection.id()).cloned().unwrap_or_default();
            for group_id in 1..=GROUPS {
                assert_eq!(
                    registry.is_subscribed(connection, group_id),
                    joined.contains(&group_id),
                    "connection {} in group {}",
                    connection.id(),
                    group_id
                );
            }
            assert_eq!(registry.groups_of(connection), joined.into_iter().collect::<Vec<_>>());
        }
    }
}

proptest! {
    #[test]
    fn test_registry_matches_model(ops in prop::collection::vec(op(), 1..60)) {
        let registry = ConnectionRegistry::new();
        let mut model = Model::default();
        for op in ops {
            model.apply(&registry, op);
            model.check(&registry);
        }
    }

    #[test]
    fn test_evict_is_idempotent(subscriptions in prop::collection::vec(1..=GROUPS, 0..6)) {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let connection = Connection::new(1, "user1", tx);
        registry.register(connection.clone());
        for group_id in &subscriptions {
            registry.subscribe(&connection, *group_id);
        }

        prop_assert!(registry.evict(&connection));
        prop_assert!(!registry.evict(&connection));
        prop_assert_eq!(registry.connection_count(), 0);
        prop_assert_eq!(registry.group_count(), 0);
    }
}
