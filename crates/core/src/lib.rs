//! Atelier Core - Shared types library.
//!
//! This crate provides common types used across all Atelier components:
//! - `storefront` - Public site (catalog, blog, cart, checkout)
//! - `admin` - Content, order and newsletter management console
//! - `cli` - Command-line tools for operating on the item store
//!
//! # Architecture
//!
//! Every domain object lives in one external item store as an untyped
//! key-value record discriminated by its `type` field. This crate gives those
//! records typed views ([`Record`]) and owns the cart arithmetic shared by the
//! storefront and admin.
//!
//! With the `client` feature enabled it also provides the HTTP clients for the
//! item store ([`store::ItemStoreClient`]) and the mail endpoint
//! ([`mail::MailClient`]). Without it the crate does no I/O.
//!
//! # Modules
//!
//! - [`types`] - Item envelope, typed records, ids, prices, emails, statuses
//! - [`cart`] - Cart lines, totals and guest/server reconciliation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

#[cfg(feature = "client")]
pub mod mail;
#[cfg(feature = "client")]
pub mod store;

pub use types::*;
