//! # Repository Layer
//!
//! Typed access to the document collections. Each repository owns one
//! collection's shape and hides the raw JSON handling from callers.
//!
//! - [`product`] - catalog reads (`products/{id}`)
//! - [`transaction`] - completed transaction log (append + list)
//! - [`user`] - user records and credential verification

pub mod product;
pub mod transaction;
pub mod user;
