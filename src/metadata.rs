//! Side-car metadata cache and container routing.

mod routing;
mod store;

pub use routing::SourceRouter;
pub use store::MetadataStore;
