//! Client-side synchronization core for the Colloquy chat workbench.
//!
//! Keeps local conversation state consistent with a remote agent API under
//! optimistic updates, background polling, and partial failure, and resolves
//! free-text document mentions into canonical object keys. Presentation and
//! transport configuration live in the embedding application.

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(unsafe_code)] // Le code unsafe est interdit
#![deny(missing_docs)] // Tout élément public doit être documenté
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option

// Clippy pour stricte discipline
#![deny(clippy::unwrap_used)] // Interdit unwrap()
#![deny(clippy::expect_used)] // Interdit expect()
#![deny(clippy::panic)] // Interdit panic!()
#![deny(clippy::print_stdout)] // Interdit println!() en production
#![deny(clippy::todo)] // Interdit les TODO dans le code
#![deny(clippy::unimplemented)] // Interdit les fonctions non implémentées

/// Remote agent API contract, wire payloads, and the HTTP transport.
pub mod api;
/// Versioned in-memory cache for remote-backed collections.
pub mod cache;
/// Errors, configuration, identifiers, and domain types.
pub mod core;
/// Orchestration facade exposed to the presentation layer.
pub mod engine;
/// Document-mention resolution over text drafts.
pub mod mention;
/// Optimistic mutation pipeline for state-changing operations.
pub mod mutation;
/// Background polling and transition notification.
pub mod poll;
