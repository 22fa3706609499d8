//! Object storage adapter for any S3-compatible endpoint.

mod key;
mod sniff;
mod uploader;

pub use key::object_key;
pub use sniff::{sniff_content_type, SNIFF_LEN};
pub use uploader::S3Uploader;
