//! # Armature Fetch Testing
//!
//! Test support for [`armature_fetch`] clients: a [`MockTransport`] that
//! replays scripted replies in order and records every request it receives.
//!
//! ```rust
//! use armature_fetch::{Client, SharedDefaults};
//! use armature_fetch_testing::{MockReply, MockTransport};
//!
//! # async fn run() -> armature_fetch::Result<()> {
//! let transport = MockTransport::new().reply(MockReply::json(200, &serde_json::json!({"ok": true})));
//! let client = Client::builder()
//!     .transport(transport.clone())
//!     .global_defaults(SharedDefaults::new())
//!     .build()?;
//!
//! client.get("https://api.example/health", None).await?;
//! assert_eq!(transport.requests().len(), 1);
//! # Ok(())
//! # }
//! ```

mod mock;

pub use mock::{MockReply, MockTransport};
