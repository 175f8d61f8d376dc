pub mod config;
pub mod error;
pub mod logging;

pub mod chunker;
pub mod downloader;
pub mod fetch;
pub mod fetch_head;
pub mod filebox;
pub mod mime;
pub mod qr;
pub mod registry;
pub mod retry;
pub mod segmenter;
pub mod storage;
pub mod stream;
pub mod url_model;

pub use config::FileBoxConfig;
pub use error::{FileBoxError, Result};
pub use fetch::Headers;
pub use filebox::{FileBox, FileBoxKind, FileBoxOptions, Metadata};
pub use registry::{BlobRegistry, RegistryOptions};
pub use stream::ByteStream;
