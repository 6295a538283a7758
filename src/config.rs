use crate::DEFAULT_MAX_SIZE;

/// Environment variable read by [ImageCacheConfig::from_env].
pub const MAX_SIZE_ENV_VAR: &str = "PAGEVIEW_CACHE_MAX_SIZE";

#[derive(Clone, Debug, derive_builder::Builder)]
pub struct ImageCacheConfig {
    /// Size in bytes above which inserting an image purges the cache.
    #[builder(default = "DEFAULT_MAX_SIZE")]
    pub max_size: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid cache size {value:?}: {reason}")]
    InvalidMaxSize { value: String, reason: String },
    #[error(transparent)]
    Builder(#[from] ImageCacheConfigBuilderError),
}

impl Default for ImageCacheConfig {
    fn default() -> ImageCacheConfig {
        ImageCacheConfig {
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl ImageCacheConfig {
    /// Build a config from the environment, falling back to defaults for anything unset.
    ///
    /// `PAGEVIEW_CACHE_MAX_SIZE` is a byte count, optionally suffixed with `K`, `M` or `G` (powers of 1024).
    pub fn from_env() -> Result<ImageCacheConfig, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [ImageCacheConfig::from_env], but reading variables through `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ImageCacheConfig, ConfigError> {
        let mut builder = ImageCacheConfigBuilder::default();
        if let Some(value) = lookup(MAX_SIZE_ENV_VAR) {
            builder.max_size(parse_size(&value)?);
        }
        Ok(builder.build()?)
    }
}

fn parse_size(value: &str) -> Result<u64, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidMaxSize {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    let (digits, shift) = match trimmed.chars().last() {
        Some('k') | Some('K') => (&trimmed[..trimmed.len() - 1], 10),
        Some('m') | Some('M') => (&trimmed[..trimmed.len() - 1], 20),
        Some('g') | Some('G') => (&trimmed[..trimmed.len() - 1], 30),
        _ => (trimmed, 0),
    };

    let count: u64 = digits
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(&e.to_string()))?;
    count
        .checked_mul(1u64 << shift)
        .ok_or_else(|| invalid("size overflows 64 bits"))
}
