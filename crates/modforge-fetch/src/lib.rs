pub mod cache;
pub mod http;
pub mod request;

pub use cache::{DownloadCache, OfflineFetcher, DOWNLOAD_DIR_NAME};
pub use http::HttpFetcher;
pub use request::{fetch_dependency, FetchError, FetchRequest, Fetcher};
