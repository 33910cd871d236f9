//! Wager module turning a stake into a randomized balance mutation.
//!
//! A wager draws a signed outcome uniformly from `[-stake, 2 * stake)`. A
//! negative outcome is settled as a withdrawal tagged `bet-lose`, anything
//! else as a deposit tagged `bet-won`, so the loss is capped at the stake while
//! the upside reaches twice the stake.

pub mod models;
pub mod outcome;
pub mod resolver;

pub use models::{WagerOutcome, WagerResult};
pub use outcome::{FixedOutcome, OutcomeSource, UniformOutcome, check_outcome, draw_outcome};
pub use resolver::WagerResolver;
