//! Core types for Storehouse.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{MoneyError, discounted_unit_price, validate_discount, validate_price};
pub use status::*;
