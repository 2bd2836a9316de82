//! Delegation of approval authority
//!
//! A delegation lets a manager hand their approval rights to another user.
//! Delegations are one-hop and unidirectional: the delegate of X is not the
//! delegate of X's delegates.

pub mod registry;

pub use registry::{DelegationRegistry, DeleteOutcome};
