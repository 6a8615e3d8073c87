pub mod api;
pub mod digest;
pub mod models;
pub mod reference;

// Re-export main model types for convenience
pub use api::{ErrorCode, ErrorInfo, ErrorResponse, TagList};
pub use digest::{DigestError, OciDigest};
pub use models::{Descriptor, ImageManifest, media_types};
pub use reference::{Reference, ReferenceError};
