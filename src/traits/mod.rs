//! Trait definitions for CIMI operations.
//!
//! [`Authn`] covers the session lifecycle and [`Cimi`] the resource
//! operations. [`blocking::CimiClient`](crate::blocking::CimiClient) mirrors
//! both with synchronous methods.

mod authn;
mod cimi;

pub use authn::Authn;
pub use cimi::Cimi;
