//! Core types and trait definitions for Aula's teaching-slot allocator.
//!
//! This crate holds the domain model, the pure availability and claim-delta
//! logic, the [`store::SlotStore`] abstraction, and the [`Allocator`] service
//! that drives a store. It has no HTTP or database dependencies.

// Native `async fn` in traits; the store trait spells out `Send` futures.
#![allow(async_fn_in_trait)]

pub mod allocator;
pub mod assignment;
pub mod availability;
pub mod catalog;
pub mod error;
pub mod legacy;
pub mod store;

pub use allocator::Allocator;
pub use error::{Classify, Error, ErrorKind, Result};
