//! Production implementations of the [`crate::traits`] abstractions.
//!
//! [`AlloyContractCaller`] talks to a real node through an Alloy provider and
//! [`TokioClock`] sleeps on the Tokio timer. Tests use the fakes in
//! [`crate::testing`] instead.

mod alloy;
mod tokio_clock;

pub use self::alloy::AlloyContractCaller;
pub use self::tokio_clock::TokioClock;
