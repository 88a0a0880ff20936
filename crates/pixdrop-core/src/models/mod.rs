pub mod files;
pub mod policy;
pub mod transform;
pub mod upload;

pub use files::{AppliedTransform, DerivedFile, StagedFile};
pub use policy::ValidationPolicy;
pub use transform::{DecodeLimits, OutputEncoding, TransformSpec};
pub use upload::UploadItem;
