use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use crate::error::FetchError;

// ---------------------------------------------------------------------------
// Transport – how remote bytes are obtained
// ---------------------------------------------------------------------------

/// Fetches the body of an `http(s)` URL.
pub trait Transport {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking reqwest client. One request per call, no retry.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Transport {
                url: String::new(),
                source,
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().map_err(transport)?.to_vec())
    }
}

pub fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

// ---------------------------------------------------------------------------
// SourceCache – explicit, invalidatable cache over fetched sources
// ---------------------------------------------------------------------------

/// Maps a source (URL or path) to its bytes for a time-to-live.
///
/// Nothing is refreshed behind the caller's back: an entry lives until its
/// TTL lapses or [`SourceCache::invalidate_all`] is called.
pub struct SourceCache<T: Transport = HttpTransport> {
    transport: T,
    entries: Cache<String, Arc<Vec<u8>>>,
}

impl<T: Transport> SourceCache<T> {
    pub fn new(transport: T, ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(32)
            .time_to_live(ttl)
            .build();
        Self { transport, entries }
    }

    /// Return cached bytes for `source`, fetching them on a miss.
    ///
    /// Sources without an `http(s)://` scheme are read from the local disk.
    pub fn fetch(&self, source: &str) -> Result<Arc<Vec<u8>>, FetchError> {
        if let Some(hit) = self.entries.get(source) {
            log::debug!("cache hit for {source}");
            return Ok(hit);
        }

        log::info!("fetching {source}");
        let bytes = if is_remote(source) {
            self.transport.get(source)?
        } else {
            std::fs::read(source).map_err(|e| FetchError::Io {
                path: source.to_string(),
                source: e,
            })?
        };
        let bytes = Arc::new(bytes);
        self.entries.insert(source.to_string(), Arc::clone(&bytes));
        Ok(bytes)
    }

    pub fn invalidate(&self, source: &str) {
        self.entries.invalidate(source);
    }

    /// Drop every cached source; the next fetch goes to the network.
    pub fn invalidate_all(&self) {
        log::info!("clearing source cache");
        self.entries.invalidate_all();
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Write;

    struct CountingTransport {
        calls: Cell<usize>,
        status: Option<u16>,
    }

    impl CountingTransport {
        fn ok() -> Self {
            Self { calls: Cell::new(0), status: None }
        }
    }

    impl Transport for CountingTransport {
        fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.set(self.calls.get() + 1);
            match self.status {
                Some(status) => Err(FetchError::Status { url: url.to_string(), status }),
                None => Ok(format!("body of {url} #{}", self.calls.get()).into_bytes()),
            }
        }
    }

    const URL: &str = "https://example.org/events.xlsx";

    #[test]
    fn second_fetch_is_served_from_cache() {
        let cache = SourceCache::new(CountingTransport::ok(), Duration::from_secs(3600));
        let a = cache.fetch(URL).unwrap();
        let b = cache.fetch(URL).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.transport.calls.get(), 1);
    }

    #[test]
    fn invalidate_all_forces_a_refetch() {
        let cache = SourceCache::new(CountingTransport::ok(), Duration::from_secs(3600));
        cache.fetch(URL).unwrap();
        cache.invalidate_all();
        let again = cache.fetch(URL).unwrap();
        assert_eq!(cache.transport.calls.get(), 2);
        assert_eq!(again.as_slice(), format!("body of {URL} #2").as_bytes());
    }

    #[test]
    fn expired_entries_are_refetched() {
        let cache = SourceCache::new(CountingTransport::ok(), Duration::from_millis(20));
        cache.fetch(URL).unwrap();
        std::thread::sleep(Duration::from_millis(60));
        cache.fetch(URL).unwrap();
        assert_eq!(cache.transport.calls.get(), 2);
    }

    #[test]
    fn failed_status_is_not_cached() {
        let transport = CountingTransport { calls: Cell::new(0), status: Some(404) };
        let cache = SourceCache::new(transport, Duration::from_secs(3600));
        let err = cache.fetch(URL).unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(!cache.contains(URL));
        assert!(cache.fetch(URL).is_err());
        assert_eq!(cache.transport.calls.get(), 2);
    }

    #[test]
    fn local_paths_bypass_the_transport() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Event ID\n1\n").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let cache = SourceCache::new(CountingTransport::ok(), Duration::from_secs(3600));
        assert_eq!(cache.fetch(&path).unwrap().as_slice(), b"Event ID\n1\n");
        assert_eq!(cache.transport.calls.get(), 0);
    }
}
