//! Session registry
//!
//! The registry holds at most one outbound session per peer. The broadcast
//! loop fans frames out to every registered session.
//!
//! # Architecture
//!
//! ```text
//!                        PeerTable (one lock)
//!                   ┌──────────────────────────┐
//!                   │ sessions: SessionRegistry│
//!                   │   PeerId -> Session {    │
//!                   │     outbound: mpsc::Tx   │
//!                   │   }                      │
//!                   │ targets: HashSet<PeerId> │
//!                   └────────────┬─────────────┘
//!                                │ snapshot()
//!          ┌─────────────────────┼─────────────────────┐
//!          ▼                     ▼                     ▼
//!     push(frame)           push(frame)           push(frame)
//!          │                     │                     │
//!     writer task           writer task           writer task ──► stream
//! ```
//!
//! # Zero-Copy Fan-out
//!
//! Frames are `bytes::Bytes`, so every session's queue shares the same pixel
//! allocation; pushing a frame to N peers clones a reference count N times.

pub mod entry;
pub mod store;
pub mod table;

pub use entry::Session;
pub use store::SessionRegistry;
pub use table::{ClosedPeer, PeerTable};
