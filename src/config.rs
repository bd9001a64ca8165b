use std::env;
use std::time::Duration;
use url::Url;

/// Default upstream page carrying the playlist
pub const DEFAULT_PLAYLIST_URL: &str = "http://www.konstantinkuehn.com/playlist/";

/// Upper bound for any seconds setting (one year)
pub const MAX_SECS: u64 = 365 * 24 * 60 * 60;

/// Lifetimes of the three cached values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheTtls {
    /// Last origin ETag (short: forces an unconditional fetch now and then)
    pub etag: Duration,
    /// Last parsed origin document
    pub document: Duration,
    /// Last extracted track list
    pub playlist: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            etag: Duration::from_secs(5 * 60),
            document: Duration::from_secs(60 * 60),
            playlist: Duration::from_secs(60 * 60),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Upstream page to scrape
    pub playlist_url: String,
    /// Timeout for a single origin request
    pub fetch_timeout: Duration,
    pub cache_ttls: CacheTtls,
    /// Interval of the expired-entry purge task (`None` disables it)
    pub purge_interval: Option<Duration>,
    /// Install the Prometheus recorder and serve `/metrics`
    pub metrics_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            playlist_url: DEFAULT_PLAYLIST_URL.to_string(),
            fetch_timeout: Duration::from_secs(10),
            cache_ttls: CacheTtls::default(),
            purge_interval: Some(Duration::from_secs(60)),
            metrics_enabled: true,
        }
    }
}

/// Parse a seconds value, falling back to `default` when unset.
/// Values above [`MAX_SECS`] are rejected.
fn secs_var(name: &str, default: u64) -> Result<Duration, Box<dyn std::error::Error>> {
    match env::var(name) {
        Ok(value) => {
            let secs: u64 = value
                .trim()
                .parse()
                .map_err(|e| format!("{} must be a number of seconds: {}", name, e))?;
            if secs > MAX_SECS {
                return Err(format!(
                    "{} must be at most {} seconds, got {}",
                    name, MAX_SECS, secs
                )
                .into());
            }
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

impl Config {
    /// Load configuration from environment variables.
    /// Every variable is optional; unparsable values are an error.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = Config::default();

        let host = env::var("RING_PWA_HOST").unwrap_or(defaults.host);

        let port = match env::var("RING_PWA_PORT") {
            Ok(port) => port
                .trim()
                .parse::<u16>()
                .map_err(|e| format!("RING_PWA_PORT must be a port number: {}", e))?,
            Err(_) => defaults.port,
        };

        // Playlist URL: must be an absolute http(s) URL
        let playlist_url = env::var("PLAYLIST_URL").unwrap_or(defaults.playlist_url);
        let parsed = Url::parse(&playlist_url)
            .map_err(|e| format!("PLAYLIST_URL '{}' is not a valid URL: {}", playlist_url, e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!(
                "PLAYLIST_URL scheme '{}' not allowed, only http/https",
                parsed.scheme()
            )
            .into());
        }

        let fetch_timeout = secs_var("FETCH_TIMEOUT_SECS", defaults.fetch_timeout.as_secs())?;

        let cache_ttls = CacheTtls {
            etag: secs_var("ETAG_TTL_SECS", defaults.cache_ttls.etag.as_secs())?,
            document: secs_var("DOCUMENT_TTL_SECS", defaults.cache_ttls.document.as_secs())?,
            playlist: secs_var("PLAYLIST_TTL_SECS", defaults.cache_ttls.playlist.as_secs())?,
        };

        // 0 disables the purge task
        let purge_interval = Some(secs_var("CACHE_PURGE_INTERVAL_SECS", 60)?)
            .filter(|interval| !interval.is_zero());

        let metrics_enabled = env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Config {
            host,
            port,
            playlist_url,
            fetch_timeout,
            cache_ttls,
            purge_interval,
            metrics_enabled,
        })
    }

    /// `host:port` string for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
