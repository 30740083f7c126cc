//! Shopfront Core - shared types and state containers.
//!
//! This crate provides the pieces of the storefront that carry real logic:
//! - [`cart`] - the in-memory shopping cart for the running session
//! - [`session`] - the authenticated identity and its durability
//! - [`storage`] - the durable key-value storage contract the session persists to
//! - [`types`] - newtype wrappers for type-safe IDs, prices and emails
//!
//! # Architecture
//!
//! The core crate performs no network or filesystem I/O. Durable storage is a
//! trait implemented by the storefront crate (file-backed) and by
//! [`storage::MemoryStorage`] here. State containers publish every change over
//! a `tokio::sync::watch` channel so a presentation layer can subscribe instead
//! of polling.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod session;
pub mod storage;
pub mod types;

pub use cart::{CartLineItem, CartState, CartStore};
pub use session::{SessionError, SessionState, SessionStore, UserIdentity};
pub use storage::{DurableStorage, MemoryStorage, StorageError};
pub use types::*;
