//! Cooperative cancellation for phase-wide timeouts.

mod token;

pub use token::CancellationToken;
