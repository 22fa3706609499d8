use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::{errors::Error, Result};

/// Default accent color for status cards (`#B37C7A`).
pub const DEFAULT_EMBED_COLOR: u32 = 11_762_810;

/// How often an in-flight upload refreshes its status card.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Uploads larger than one part go through multipart upload.
pub const DEFAULT_PART_SIZE_MB: u64 = 8;
/// S3 rejects non-final parts below 5 MiB.
const MIN_PART_SIZE_MB: u64 = 5;

/// Chat platform the bot connects to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatPlatform {
    Discord,
    Telegram,
}

impl FromStr for ChatPlatform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "discord" => Ok(Self::Discord),
            "telegram" => Ok(Self::Telegram),
            other => Err(Error::Config(format!(
                "MIE_PLATFORM must be `discord` or `telegram`, got `{other}`"
            ))),
        }
    }
}

impl fmt::Display for ChatPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discord => f.write_str("discord"),
            Self::Telegram => f.write_str("telegram"),
        }
    }
}

/// S3-compatible object storage settings.
#[derive(Clone)]
pub struct StorageConfig {
    pub key_id: String,
    pub application_key: String,
    pub bucket_name: String,
    pub path_prefix: String,
    pub endpoint: String,
    pub region: String,
    pub part_size: u64,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("key_id", &self.key_id)
            .field("application_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .field("path_prefix", &self.path_prefix)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("part_size", &self.part_size)
            .finish()
    }
}

/// Typed configuration, loaded once at startup and read-only afterwards.
#[derive(Clone)]
pub struct Config {
    pub debug: bool,
    /// Parsed for compatibility with existing deployments; nothing listens on it.
    pub port: u16,
    pub platform: ChatPlatform,
    pub bot_token: String,

    pub storage: StorageConfig,
    /// Public base URL the uploaded object keys are appended to.
    pub host_url: String,

    // Downloader
    pub ytdl_path: PathBuf,
    pub instagram_proxy_url: Option<String>,
    pub temp_dir: PathBuf,

    pub embed_color: u32,
    pub progress_interval: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("debug", &self.debug)
            .field("port", &self.port)
            .field("platform", &self.platform)
            .field("bot_token", &"<redacted>")
            .field("storage", &self.storage)
            .field("host_url", &self.host_url)
            .field("ytdl_path", &self.ytdl_path)
            .field("instagram_proxy_url", &self.instagram_proxy_url)
            .field("temp_dir", &self.temp_dir)
            .field("embed_color", &self.embed_color)
            .field("progress_interval", &self.progress_interval)
            .finish()
    }
}

impl Config {
    /// Load from the process environment, after merging `app.env` and `.env`
    /// from the working directory (existing variables win).
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new("app.env"));
        load_dotenv_if_present(Path::new(".env"));

        let cfg = Self::from_source(|key| env::var(key).ok())?;
        fs::create_dir_all(&cfg.temp_dir)?;
        Ok(cfg)
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                Error::Config(format!("{key} environment variable is required"))
            })
        };

        let debug = get("MIE_DEBUG").map(|v| parse_bool(&v)).unwrap_or(false);
        let port = match get("PORT") {
            Some(v) => parse_num::<u16>("PORT", &v)?,
            None => 8000,
        };
        let platform = match get("MIE_PLATFORM") {
            Some(v) => v.parse()?,
            None => ChatPlatform::Discord,
        };
        let bot_token = required("MIE_TOKEN")?;

        let part_size_mb = match get("B2_PART_SIZE_MB") {
            Some(v) => parse_num::<u64>("B2_PART_SIZE_MB", &v)?,
            None => DEFAULT_PART_SIZE_MB,
        };
        if part_size_mb < MIN_PART_SIZE_MB {
            return Err(Error::Config(format!(
                "B2_PART_SIZE_MB must be at least {MIN_PART_SIZE_MB}, got {part_size_mb}"
            )));
        }

        let storage = StorageConfig {
            key_id: required("B2_APPLICATION_KEY_ID")?,
            application_key: required("B2_APPLICATION_KEY")?,
            bucket_name: required("B2_BUCKET_NAME")?,
            path_prefix: get("B2_BUCKET_PATH_PREFIX").unwrap_or_default(),
            endpoint: required("B2_ENDPOINT")?,
            region: get("B2_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            part_size: part_size_mb * 1024 * 1024,
        };
        let host_url = required("HOST_URL")?;

        let ytdl_path = PathBuf::from(get("YTDL_PATH").unwrap_or_else(|| "yt-dlp".to_string()));
        let instagram_proxy_url = get("INSTAGRAM_PROXY_URL");
        let temp_dir = PathBuf::from(get("TEMP_DIR").unwrap_or_else(|| "/tmp".to_string()));

        let embed_color = match get("EMBED_COLOR") {
            Some(v) => parse_color(&v)?,
            None => DEFAULT_EMBED_COLOR,
        };
        let progress_interval = match get("PROGRESS_INTERVAL_MS") {
            Some(v) => match parse_num::<u64>("PROGRESS_INTERVAL_MS", &v)? {
                0 => {
                    return Err(Error::Config(
                        "PROGRESS_INTERVAL_MS must be greater than zero".to_string(),
                    ))
                }
                ms => Duration::from_millis(ms),
            },
            None => DEFAULT_PROGRESS_INTERVAL,
        };

        Ok(Self {
            debug,
            port,
            platform,
            bot_token,
            storage,
            host_url,
            ytdl_path,
            instagram_proxy_url,
            temp_dir,
            embed_color,
            progress_interval,
        })
    }

    /// Public URL for an uploaded object key. Exactly one `/` separates
    /// the host from the key, whatever `HOST_URL` ends with.
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.host_url.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_num<T: FromStr>(key: &str, s: &str) -> Result<T> {
    s.trim()
        .parse::<T>()
        .map_err(|_| Error::Config(format!("{key} is not a valid number: `{s}`")))
}

/// Accepts decimal (`11762810`) or hex (`#B37C7A`, `0xB37C7A`).
fn parse_color(s: &str) -> Result<u32> {
    let s = s.trim();
    let hex = s
        .strip_prefix('#')
        .or_else(|| s.strip_prefix("0x"))
        .or_else(|| s.strip_prefix("0X"));
    let parsed = match hex {
        Some(h) => u32::from_str_radix(h, 16).ok(),
        None => s.parse::<u32>().ok(),
    };
    match parsed {
        Some(c) if c <= 0xFF_FFFF => Ok(c),
        _ => Err(Error::Config(format!("EMBED_COLOR is not a valid color: `{s}`"))),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("MIE_TOKEN", "token"),
            ("B2_APPLICATION_KEY_ID", "key-id"),
            ("B2_APPLICATION_KEY", "secret"),
            ("B2_BUCKET_NAME", "bucket"),
            ("B2_ENDPOINT", "https://s3.us-west-004.backblazeb2.com"),
            ("HOST_URL", "https://cdn.example.com/"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_source(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let cfg = load(&base_env()).unwrap();
        assert!(!cfg.debug);
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.platform, ChatPlatform::Discord);
        assert_eq!(cfg.ytdl_path, PathBuf::from("yt-dlp"));
        assert_eq!(cfg.temp_dir, PathBuf::from("/tmp"));
        assert_eq!(cfg.embed_color, DEFAULT_EMBED_COLOR);
        assert_eq!(cfg.storage.path_prefix, "");
        assert_eq!(cfg.storage.region, "us-east-1");
        assert!(cfg.instagram_proxy_url.is_none());
        assert_eq!(cfg.progress_interval, DEFAULT_PROGRESS_INTERVAL);
        assert_eq!(cfg.storage.part_size, 8 * 1024 * 1024);
    }

    #[test]
    fn missing_required_var_is_a_config_error() {
        let mut env = base_env();
        env.remove("B2_BUCKET_NAME");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("B2_BUCKET_NAME")));

        // Blank counts as missing.
        let mut env = base_env();
        env.insert("MIE_TOKEN", "  ");
        assert!(load(&env).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let mut env = base_env();
        env.insert("MIE_DEBUG", "yes");
        env.insert("PORT", "9000");
        env.insert("MIE_PLATFORM", "Telegram");
        env.insert("EMBED_COLOR", "#ff0000");
        env.insert("B2_BUCKET_PATH_PREFIX", "videos");
        env.insert("TEMP_DIR", "/var/tmp/mie");
        env.insert("PROGRESS_INTERVAL_MS", "1500");
        env.insert("B2_PART_SIZE_MB", "16");
        let cfg = load(&env).unwrap();
        assert!(cfg.debug);
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.platform, ChatPlatform::Telegram);
        assert_eq!(cfg.embed_color, 0xFF0000);
        assert_eq!(cfg.storage.path_prefix, "videos");
        assert_eq!(cfg.temp_dir, PathBuf::from("/var/tmp/mie"));
        assert_eq!(cfg.progress_interval, Duration::from_millis(1500));
        assert_eq!(cfg.storage.part_size, 16 * 1024 * 1024);
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut env = base_env();
        env.insert("PORT", "eighty");
        assert!(load(&env).is_err());

        let mut env = base_env();
        env.insert("MIE_PLATFORM", "irc");
        assert!(load(&env).is_err());

        let mut env = base_env();
        env.insert("B2_PART_SIZE_MB", "4");
        assert!(matches!(load(&env), Err(Error::Config(ref m)) if m.contains("B2_PART_SIZE_MB")));

        let mut env = base_env();
        env.insert("PROGRESS_INTERVAL_MS", "0");
        assert!(load(&env).is_err());

        assert!(parse_color("0x1000000").is_err());
        assert_eq!(parse_color("11762810").unwrap(), DEFAULT_EMBED_COLOR);
    }

    #[test]
    fn public_url_concatenates_host_and_key() {
        let cfg = load(&base_env()).unwrap();
        assert_eq!(
            cfg.public_url("videos/20240101-abc.mp4"),
            "https://cdn.example.com/videos/20240101-abc.mp4"
        );
    }

    #[test]
    fn public_url_inserts_slash_when_host_lacks_one() {
        let mut env = base_env();
        env.insert("HOST_URL", "https://cdn.example.com");
        let cfg = load(&env).unwrap();
        // Empty path prefix: the key is the bare file name.
        assert_eq!(
            cfg.public_url("20240101-abc.mp4"),
            "https://cdn.example.com/20240101-abc.mp4"
        );
        assert_eq!(
            cfg.public_url("/20240101-abc.mp4"),
            "https://cdn.example.com/20240101-abc.mp4"
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let cfg = load(&base_env()).unwrap();
        let out = format!("{cfg:?}");
        assert!(!out.contains("secret"));
        assert!(!out.contains("\"token\""));
    }

    #[test]
    fn dotenv_lines_are_parsed() {
        let parsed = parse_dotenv(
            "# comment\nMIE_TOKEN=\"abc\"\n\nexport HOST_URL='https://x/'\nBROKEN\n=novalue\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("MIE_TOKEN".to_string(), "abc".to_string()),
                ("HOST_URL".to_string(), "https://x/".to_string()),
            ]
        );
    }
}
