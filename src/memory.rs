use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::chunk::chunk_markdown;
use crate::config::Config;
use crate::models::Chunk;

/// Load and chunk the memory corpus: the fixed top-level memory file
/// plus every markdown note under the memory directory, in path order.
///
/// Missing files and directories are fine — the corpus may not exist
/// yet. Unreadable files are skipped with a warning rather than
/// aborting the search.
pub fn load_memory_chunks(config: &Config) -> Result<Vec<Chunk>> {
    let chunking = &config.chunking;
    let mut chunks = Vec::new();

    let memory_file = &config.corpus.memory_file;
    if memory_file.is_file() {
        match std::fs::read_to_string(memory_file) {
            Ok(text) => {
                let path = memory_file.to_string_lossy().to_string();
                chunks.extend(chunk_markdown(
                    &path,
                    &text,
                    chunking.max_chars,
                    chunking.min_chars,
                ));
            }
            Err(e) => eprintln!("Warning: skipping {}: {}", memory_file.display(), e),
        }
    }

    let memory_dir = &config.corpus.memory_dir;
    if memory_dir.is_dir() {
        let include = markdown_globset()?;
        let mut paths: Vec<_> = WalkDir::new(memory_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                let rel = path.strip_prefix(memory_dir).unwrap_or(path);
                include.is_match(rel)
            })
            .collect();

        // Deterministic ordering
        paths.sort();

        for path in paths {
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    let display = path.to_string_lossy().to_string();
                    chunks.extend(chunk_markdown(
                        &display,
                        &text,
                        chunking.max_chars,
                        chunking.min_chars,
                    ));
                }
                Err(e) => eprintln!("Warning: skipping {}: {}", path.display(), e),
            }
        }
    }

    Ok(chunks)
}

fn markdown_globset() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    builder.add(Glob::new("**/*.md")?);
    Ok(builder.build()?)
}
