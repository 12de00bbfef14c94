//! framemesh: peer-to-peer raw frame streaming
//!
//! Every node periodically captures a fixed-size RGBA frame and pushes it to
//! every peer it has dialed. Frames received from peers are rendered into one
//! render target per peer. Frames travel as raw bytes with no header; the
//! receiver splits the stream by the agreed frame size.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framemesh::media::{MemorySink, TestPatternSource};
//! use framemesh::protocol::constants::PROTOCOL_ID;
//! use framemesh::transport::MemoryNetwork;
//! use framemesh::{Node, NodeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let network = MemoryNetwork::new();
//!     let transport = network.join("QmNode", &[PROTOCOL_ID]);
//!
//!     let node = Node::new(NodeConfig::default(), transport, Arc::new(MemorySink::new()));
//!     node.run(TestPatternSource::new(7)).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod media;
pub mod node;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod stats;
pub mod transport;

pub use error::{Error, FrameError, Result, TransportError};
pub use media::{FrameBuffer, FrameGeometry, FrameSink, FrameSource};
pub use node::{Node, NodeConfig};
pub use protocol::PeerId;
pub use transport::{Transport, TransportEvent};
