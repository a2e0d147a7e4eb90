// Matching engine: TF-IDF features, k-means clusters, cosine ranking.
// Models are immutable once fitted; queries run against a shared `MatchIndex`.

pub mod cluster_model;
pub mod digest;
pub mod feature_model;
pub mod handlers;
pub mod index;
pub mod ranker;
pub mod snapshot;
pub mod sparse;

pub use index::MatchIndex;
pub use snapshot::SnapshotHandle;
