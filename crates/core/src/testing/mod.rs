//! Test doubles for the pipeline's external collaborators.
//!
//! Used by the crate's own tests and by integration tests of dependent
//! crates; every mock records the calls it receives and supports error
//! injection.

mod mock_downloader;
mod mock_feed;
mod mock_transport;
mod mock_uploader;

pub use mock_downloader::{MockDownloadQueue, RecordedSubmit};
pub use mock_feed::MockFeedSource;
pub use mock_transport::MockTransport;
pub use mock_uploader::MockStorageSink;

pub mod fixtures {
    //! Small torrent buffers for scanner and codec tests.

    use crate::bencode::{encode, Value};

    /// A minimal single-file torrent descriptor.
    pub fn torrent(name: &str, announce: Option<&str>) -> Vec<u8> {
        let info = Value::Dict(vec![
            (b"length".to_vec(), Value::Int(1)),
            (b"name".to_vec(), Value::Bytes(name.as_bytes().to_vec())),
        ]);
        let mut top = Vec::new();
        if let Some(announce) = announce {
            top.push((
                b"announce".to_vec(),
                Value::Bytes(announce.as_bytes().to_vec()),
            ));
        }
        top.push((b"info".to_vec(), info));
        encode(&Value::Dict(top))
    }
}
