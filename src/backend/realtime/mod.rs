//! Real-time Connection Core
//!
//! Everything between an authenticated WebSocket and the rest of the
//! system: who is connected, which group channels they listen to, how
//! inbound frames are routed and how outbound frames reach a socket.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs        - Module exports and documentation
//! ├── connection.rs - Connection handle (id, identity, outbound queue)
//! ├── registry.rs   - byIdentity / byGroup routing tables
//! ├── delivery.rs   - Delivery to nicknames, users, groups, everyone
//! ├── dispatcher.rs - Inbound frame routing (chat, subscribe, group_chat)
//! └── socket.rs     - Upgrade endpoint, read loop, writer task
//! ```
//!
//! # Ordering
//!
//! - Frames from one connection are dispatched one at a time, in order
//! - Every chat message is stored before it is delivered
//! - A reconnecting user's backlog is queued before the connection is
//!   registered, so it precedes any live traffic

pub mod connection;
pub mod registry;
pub mod delivery;
pub mod dispatcher;
pub mod socket;

pub use connection::{Connection, ConnectionId};
pub use delivery::DeliveryEngine;
pub use dispatcher::{DispatchOutcome, Dispatcher, DropReason};
pub use registry::ConnectionRegistry;
pub use socket::ws_upgrade;
