//! In-memory stand-ins for every collaborator the engine reaches through a trait.
//!
//! Each nullable behaves deterministically and exposes knobs for tests: the
//! store can fail reads or commits on demand and replay a racing writer's batch,
//! the catalog can go offline, the uploader can reject images. Nothing here
//! touches the filesystem or network.

pub mod catalog;
pub mod clock;
pub mod random;
pub mod store;
pub mod uploader;

pub use catalog::NullCatalog;
pub use clock::NullClock;
pub use random::NullRandom;
pub use store::NullStore;
pub use uploader::NullUploader;
