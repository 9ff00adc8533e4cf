mod dicomweb;
mod frame_source;
mod multipart;

pub use dicomweb::{DicomWebFrameSource, DEFAULT_FETCH_TIMEOUT, FRAME_ACCEPT};
pub use frame_source::FrameSource;
pub use multipart::{boundary, extract_frame, first_part, LEGACY_MULTIPART_HEADER_LEN};
