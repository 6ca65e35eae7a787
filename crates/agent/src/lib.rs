//! LLM-backed reordering for rotabot.
//!
//! `llm` defines the provider-agnostic client trait, `provider` is the HTTP
//! implementation behind it, and `reorder` turns a human edit request plus
//! the current assignment into a repaired
//! [`rotabot_core::assignment::UserTagsAssignment`].

pub mod llm;
pub mod provider;
pub mod reorder;
