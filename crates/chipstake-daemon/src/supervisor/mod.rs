mod cancellation;
mod follower;

pub use cancellation::{CancelHandle, CancellationToken};
pub use follower::{EventFollower, FollowerExit, DEFAULT_FOLLOW_BATCH, DEFAULT_FOLLOW_CAPACITY};
