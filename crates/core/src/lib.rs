//! Storehouse Core - Shared domain library.
//!
//! This crate provides the types and business rules used across all Storehouse
//! components:
//! - `api` - REST backend persisting to `PostgreSQL`
//! - `client` - Typed HTTP client for storefront and admin frontends
//! - `cli` - Command-line tools for migrations and catalog management
//!
//! # Architecture
//!
//! The core crate contains only types, pure functions and ports (traits) - no
//! database access and no HTTP clients. Everything here can be unit tested
//! without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, email, money helpers, status enums
//! - [`product`] - Catalog product model and draft validation
//! - [`order`] - Persisted order model and order-creation payloads
//! - [`account`] - Address-book entries
//! - [`content`] - Contact messages and admin docs
//! - [`cart`] - Client-held cart and totals
//! - [`checkout`] - Four-stage checkout flow
//! - [`lifecycle`] - Order status and payment-status transition rules
//! - [`analytics`] - Dashboard time buckets with zero-fill
//! - [`inventory`] - Stock threshold reporting

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod analytics;
pub mod cart;
pub mod checkout;
pub mod content;
pub mod inventory;
pub mod lifecycle;
pub mod order;
pub mod product;
pub mod types;

pub use types::*;
