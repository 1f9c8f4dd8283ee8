//! A provisioning plugin for virtual machine scale sets.
//!
//! The crate maps a declarative configuration tree ([`value::Block`]) onto the
//! request and response bodies of a remote compute management API
//! ([`model`]) and drives the create, read, update and delete lifecycle of a
//! scale set against it ([`lifecycle`]).
//!
//! The remote API itself is behind the [`client::ScaleSetsClient`] trait, so
//! the crate has no opinion on transport or authentication.
pub mod cli;
pub mod client;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod mapper;
pub mod model;
pub mod operation;
pub mod schema;
pub mod value;
