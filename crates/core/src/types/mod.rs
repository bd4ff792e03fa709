//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! typed views over item store records.

pub mod email;
pub mod id;
pub mod item;
pub mod price;
pub mod records;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use item::{Item, ItemType, ItemTypeError, Record, RecordError};
pub use price::{CurrencyCode, Price, PriceError};
pub use records::*;
pub use status::OrderStatus;
