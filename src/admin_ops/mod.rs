// Inner modules
mod election;
mod reassignment;
mod router;

// Exports
pub use election::{ElectionTracker, PreferredReplicaElection};
pub use reassignment::{ReassignPartitions, ReassignmentTracker};
pub use router::init;
