//! Staged publishing of dataset snapshots
//!
//! [`StagingPublisher`] drives one publish through
//! [`PublishState`]: clear the staging scope, load the new rows, run the move
//! operation, commit. Outcomes are a [`PublishReport`] or a
//! [`PublishFailure`] naming the state that was reached.

pub mod locks;
pub mod publisher;
pub mod report;
pub mod state;

pub use locks::DatasetLocks;
pub use publisher::{PublishPlan, StagingPublisher};
pub use report::{FailureSummary, PublishError, PublishFailure, PublishReport};
pub use state::PublishState;
