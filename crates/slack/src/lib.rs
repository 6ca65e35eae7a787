//! Slack Integration - Block Kit state codec and thread plumbing
//!
//! This crate owns everything that touches Slack's message surface:
//! - **Block Kit** (`blocks`) - typed block model with serde to/from wire JSON
//! - **Codec** (`codec`) - encode/decode a rota assignment into/out of blocks
//! - **Thread Reader** (`thread`) - recover assignment + edit request from a thread
//! - **Message Writer** (`writer`) - post/update full-replacement renders
//! - **Messenger** (`messenger`) - narrow transport trait + Web API client (`api`)
//! - **Events** (`events`) - inbound Events API / interactivity payload parsing
//! - **Signature** (`signature`) - `v0=` request-signing verification
//!
//! # Architecture
//!
//! ```text
//! Slack webhook → events → (thread reader → reorder engine → writer)
//!                        → (progress toggle → writer)
//!                   ↑ codec: the message IS the thread's state record
//! ```
//!
//! The rendered message doubles as the state store for attendee ordering:
//! every write is a full-replacement render, and every read re-parses the
//! live blocks. Nothing in this crate mutates message history in place.

pub mod api;
pub mod blocks;
pub mod codec;
pub mod events;
pub mod messenger;
pub mod signature;
pub mod thread;
pub mod writer;
