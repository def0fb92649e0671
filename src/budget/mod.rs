//! # Thread budget accounting.
//!
//! Components that share an executor lease the worker threads they need from
//! the [`Ledger`] before doing any work. A lease that would overflow a pool with
//! known capacity is rejected up front, so an under-provisioned server fails at
//! startup instead of deadlocking later.

mod ledger;

pub use ledger::Ledger;
