//! facewatch-remote — HTTP adapters for the collaborators the session drives.
//!
//! A snapshot URL as the frame source, a detector service that runs the face
//! models out of process, and the analytics server's upload and
//! confirmed-name endpoints.

mod client;
pub mod detector;
pub mod exchange;
pub mod source;
pub mod upload;

pub use client::build_client;
pub use detector::HttpDetector;
pub use exchange::HttpNameExchange;
pub use source::HttpFrameSource;
pub use upload::HttpUploadSink;
