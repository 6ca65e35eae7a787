//! Core Domain - rota assignments, mentions, and external collaborator traits
//!
//! This crate holds the domain model shared by the rest of rotabot:
//! - **Mentions** (`mention`) - canonical `<@USERID>` form and normalization
//! - **Assignments** (`assignment`) - ordered online/offline call lists
//! - **Slots** (`slot`) - upcoming 1on1 slots and their completion sets
//! - **Users** (`user`) - workspace member profiles and huddle links
//! - **Config** (`config`) - TOML + environment configuration loading
//!
//! # Invariants owned here
//!
//! - Every mention the system renders matches `<@U[A-Z0-9]+>` exactly.
//! - A user appears in at most one of an assignment's two sequences; repair
//!   of untrusted input keeps the first occurrence (online scanned first).
//! - Sequence order is the attendee call order and is never reshuffled by
//!   normalization.
//!
//! Persistence itself lives behind the `SlotRepository` / `UserRepository`
//! traits; this crate never talks to storage or the network.

pub mod assignment;
pub mod config;
pub mod mention;
pub mod repository;
pub mod slot;
pub mod user;
