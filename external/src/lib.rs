//! Interfaces to the engine's external collaborators.
//!
//! The engine never talks to the task catalog, the media host, the system clock,
//! or a random number generator directly. Each sits behind a trait here so the
//! real implementation can be swapped for a nullable in tests.

pub mod catalog;
pub mod clock;
pub mod evidence;
pub mod random;

pub use catalog::{CatalogError, StaticCatalog, TaskCatalog};
pub use clock::{Clock, SystemClock};
pub use evidence::{EvidenceUploader, UploadError};
pub use random::{RandomSource, ThreadRandom};
