use anyhow::Result;

use crate::cache::EmbedCache;
use crate::config::Config;

/// Print the cache location, entry count, and configuration it serves.
pub fn run_cache_info(config: &Config) -> Result<()> {
    let path = &config.embedding.cache_path;

    println!("cache info");
    println!("  path: {}", path.display());

    if !path.exists() {
        println!("  entries: 0 (no cache file yet)");
        return Ok(());
    }

    let cache = EmbedCache::open(path, false)?;
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    println!("  entries: {}", cache.len());
    println!("  size: {} bytes", size);
    println!(
        "  provider: {} model: {} dims: {}",
        config.embedding.provider,
        config.embedding.model.as_deref().unwrap_or("-"),
        config
            .embedding
            .dims
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    Ok(())
}

/// Delete the cache file. The next hybrid search repopulates it from
/// scratch, exactly like a `--reindex` run.
pub fn run_cache_clear(config: &Config) -> Result<()> {
    let path = &config.embedding.cache_path;

    if path.exists() {
        std::fs::remove_file(path)?;
        println!("cache clear");
        println!("  removed {}", path.display());
    } else {
        println!("cache clear");
        println!("  nothing to remove");
    }

    Ok(())
}
