use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use modforge_core::config::DependencyConfig;
use modforge_fetch::{
    fetch_dependency, DownloadCache, FetchError, FetchRequest, Fetcher, HttpFetcher,
};

/// Answers a single request with `status` and `body`, then returns the
/// request line it saw.
fn serve_once(status: &'static str, body: &'static [u8]) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let address = listener.local_addr().expect("addr");
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        let mut request_line = String::new();
        reader.read_line(&mut request_line).expect("request line");
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("header");
            if line == "\r\n" || line.is_empty() {
                break;
            }
        }
        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        )
        .expect("write head");
        stream.write_all(body).expect("write body");
        request_line.trim().to_string()
    });
    (format!("http://{}", address), handle)
}

#[test]
fn downloads_into_cache_then_reuses_it() {
    let (base, server) = serve_once("200 OK", b"tarball bytes");
    let dir = tempfile::tempdir().expect("temp dir");
    let cache = DownloadCache::in_output_dir(dir.path());
    let fetcher = HttpFetcher::new(cache.clone()).expect("client");
    let request = FetchRequest {
        url: format!("{}/L-Sherry/Localize-me/tarball/abc", base),
        filename: "Localize-me-abc.tgz".to_string(),
    };

    let path = fetcher.fetch(&request).expect("download");
    assert_eq!(path, dir.path().join("download").join("Localize-me-abc.tgz"));
    assert_eq!(fs::read(&path).expect("read"), b"tarball bytes");
    assert_eq!(
        server.join().expect("server"),
        "GET /L-Sherry/Localize-me/tarball/abc HTTP/1.1"
    );

    // The server is gone; a second fetch must come from the cache.
    let again = fetcher.fetch(&request).expect("cached");
    assert_eq!(again, path);
    assert_eq!(fs::read_dir(cache.dir()).expect("read dir").count(), 1);
}

#[test]
fn error_status_leaves_no_cached_file() {
    let (base, server) = serve_once("404 Not Found", b"missing");
    let dir = tempfile::tempdir().expect("temp dir");
    let cache = DownloadCache::in_output_dir(dir.path());
    let fetcher = HttpFetcher::new(cache.clone()).expect("client");
    let dependency = DependencyConfig {
        name: "ultimate-ui".to_string(),
        url: format!("{}/archive/ultimate-ui.tgz", base),
        filename: None,
        prefix: "assets/mods".to_string(),
        strip_components: 0,
    };

    let error = fetch_dependency(&fetcher, &dependency).expect_err("404");
    server.join().expect("server");
    assert!(matches!(error, FetchError::Status { status: 404, .. }));
    assert!(cache.lookup("ultimate-ui.tgz").expect("lookup").is_none());
    if cache.dir().exists() {
        assert_eq!(fs::read_dir(cache.dir()).expect("read dir").count(), 0);
    }
}
