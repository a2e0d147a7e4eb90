// Corpus lifecycle: validate raw postings, build the artifact set, persist and
// reload it as one versioned unit.
// Builds are CPU-bound and run inside tokio::task::spawn_blocking.

pub mod builder;
pub mod handlers;
pub mod normalize;
pub mod versioning;
