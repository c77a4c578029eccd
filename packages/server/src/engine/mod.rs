//! The composition and propagation engine.
//!
//! Every function here takes a connection or transaction from the caller so
//! handlers decide the transaction boundaries; the few operations that must
//! be atomic on their own (`attach`, `detach`, `rollback`, `append_committed`) open
//! their own transaction.

pub mod attach;
pub mod cascade;
pub mod error;
pub mod impact;
pub mod ledger;
pub mod link;
pub mod lookup;
pub mod recompute;
pub mod rollback;

pub use error::EngineError;
