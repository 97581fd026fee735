mod content_range;
mod error;
mod head;
mod operation;

pub use content_range::ContentRange;
pub use error::HeaderParseError;
pub use head::Head;
pub use operation::{CompleteUploadRequest, Operation, UploadedPart};

/// Header names owned by the transfer protocol.
pub mod headers {
    pub const DIGEST: &str = "digest";
    pub const FUSION_AUTHORIZATION: &str = "fusion-authorization";

    pub const DISTRIBUTION_FROM_DATE: &str = "x-jpmc-distribution-from-date";
    pub const DISTRIBUTION_TO_DATE: &str = "x-jpmc-distribution-to-date";
    pub const DISTRIBUTION_CREATED_DATE: &str = "x-jpmc-distribution-created-date";

    pub const VERSION_ID: &str = "x-jpmc-version-id";
    pub const CHECKSUM: &str = "x-jpmc-checksum-sha256";
    pub const PARTS_COUNT: &str = "x-jpmc-mp-parts-count";
}
