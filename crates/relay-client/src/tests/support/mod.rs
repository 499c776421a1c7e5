//! Shared fixtures for the client test suites.

mod fake_replica;
mod recording;

pub use fake_replica::{FakeReplica, Reply, unreachable_endpoint};
pub use recording::{NeverShutdown, RecordingStats, ScriptedSource};
