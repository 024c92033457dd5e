//! Object store gateway: typed bucket access and request-scoped artifacts

pub mod artifact;
pub mod fs;
pub mod key;
pub mod s3;
pub mod traits;

pub use artifact::{ScratchSpace, TransientArtifact};
pub use fs::FsObjectStore;
pub use key::{check_key_segment, normalize_key};
pub use s3::S3ObjectStore;
pub use traits::{Bucket, ObjectStore};
