//! Corpus builders.
//!
//! Batch pipelines that walk source roots, extract and chunk each file,
//! embed the chunks, and persist them into a freshly created collection.
//! Each build fully replaces the prior index (destructive rebuild). A single
//! file's failure never aborts the batch: it is logged, counted, and the
//! walk continues.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tracing::{info, warn};

use crate::chunk::{build_chunks, build_doc_chunks};
use crate::embedder::Embedder;
use crate::extract::language_of;
use crate::store::Store;

/// Code file extensions to index (Java and XML first-class).
pub const CODE_EXTENSIONS: [&str; 15] = [
    "java", "xml", "py", "js", "ts", "jsx", "tsx", "go", "rs", "cpp", "c", "cs", "rb", "php",
    "sql",
];

/// Documentation file extensions.
pub const DOC_EXTENSIONS: [&str; 2] = ["md", "mdx"];

/// Directory names skipped during walks.
pub const DEFAULT_EXCLUDE_DIRS: [&str; 8] = [
    "node_modules",
    "venv",
    ".venv",
    "__pycache__",
    ".git",
    "dist",
    "build",
    "target",
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub files: usize,
    pub chunks: usize,
    pub failed: usize,
}

/// Build the code corpus from the given source roots.
pub async fn build_code_index(
    paths: &[PathBuf],
    exclude_dirs: &[String],
    store: &mut Store,
    embedder: &dyn Embedder,
) -> Result<IndexReport> {
    let files = walk_files(paths, exclude_dirs, &CODE_EXTENSIONS);
    info!("Indexing {} code files", files.len());

    let mut report = IndexReport::default();
    let bar = progress_bar(files.len());

    for path in files {
        bar.inc(1);
        match index_code_file(&path, store, embedder).await {
            Ok(chunk_count) if chunk_count > 0 => {
                report.files += 1;
                report.chunks += chunk_count;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Error processing {}: {e:#}", path.display());
                report.failed += 1;
            }
        }
    }

    bar.finish_and_clear();
    info!(
        "Code index built: {} files, {} chunks, {} failed",
        report.files, report.chunks, report.failed
    );
    Ok(report)
}

/// Build the documentation corpus from the given roots.
pub async fn build_docs_index(
    paths: &[PathBuf],
    store: &mut Store,
    embedder: &dyn Embedder,
) -> Result<IndexReport> {
    let exclude: Vec<String> = DEFAULT_EXCLUDE_DIRS.iter().map(|d| d.to_string()).collect();
    let files = walk_files(paths, &exclude, &DOC_EXTENSIONS);
    info!("Indexing {} documentation files", files.len());

    let mut report = IndexReport::default();
    let bar = progress_bar(files.len());

    for path in files {
        bar.inc(1);
        match index_doc_file(&path, store, embedder).await {
            Ok(chunk_count) if chunk_count > 0 => {
                report.files += 1;
                report.chunks += chunk_count;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Error processing {}: {e:#}", path.display());
                report.failed += 1;
            }
        }
    }

    bar.finish_and_clear();
    info!(
        "Docs index built: {} files, {} chunks, {} failed",
        report.files, report.chunks, report.failed
    );
    Ok(report)
}

async fn index_code_file(
    path: &Path,
    store: &mut Store,
    embedder: &dyn Embedder,
) -> Result<usize> {
    let source = normalize_path(path);
    let code = read_lossy(path)?;
    if code.trim().is_empty() {
        return Ok(0);
    }

    let chunks = build_chunks(&source, &code);
    if chunks.is_empty() {
        return Ok(0);
    }

    let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let vectors = embedder.embed_batch(&texts).await?;

    store.upsert_document(&source, &language_of(&source), &chunks, &vectors)?;
    Ok(chunks.len())
}

async fn index_doc_file(path: &Path, store: &mut Store, embedder: &dyn Embedder) -> Result<usize> {
    let source = normalize_path(path);
    let raw = read_lossy(path)?;

    let text = clean_mdx(&raw);
    if text.is_empty() {
        return Ok(0);
    }

    let chunks = build_doc_chunks(&source, &text);
    if chunks.is_empty() {
        return Ok(0);
    }

    let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let vectors = embedder.embed_batch(&texts).await?;

    store.upsert_document(&source, &language_of(&source), &chunks, &vectors)?;
    Ok(chunks.len())
}

/// Strip JSX/HTML tags from MDX content and collapse whitespace.
#[must_use]
pub fn clean_mdx(text: &str) -> String {
    let tag_re = match Regex::new(r"<[^>\n]+>") {
        Ok(re) => re,
        Err(_) => return text.trim().to_string(),
    };
    let ws_re = match Regex::new(r"\s+") {
        Ok(re) => re,
        Err(_) => return text.trim().to_string(),
    };

    let without_tags = tag_re.replace_all(text, " ");
    ws_re.replace_all(&without_tags, " ").trim().to_string()
}

/// Walk the given roots, honoring the exclude list, collecting files whose
/// extension is in `extensions`.
fn walk_files(paths: &[PathBuf], exclude_dirs: &[String], extensions: &[&str]) -> Vec<PathBuf> {
    let exclude: HashSet<String> = exclude_dirs.iter().cloned().collect();
    let mut files = Vec::new();

    for base in paths {
        if !base.exists() {
            warn!("Path not found: {}", base.display());
            continue;
        }

        let exclude = exclude.clone();
        let walker = WalkBuilder::new(base)
            .hidden(false)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                if !is_dir {
                    return true;
                }
                entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !exclude.contains(name))
            })
            .build();

        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            let ext = path
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| s.to_ascii_lowercase())
                .unwrap_or_default();
            if extensions.contains(&ext.as_str()) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files
}

fn normalize_path(path: &Path) -> String {
    // Store consistent forward-slash paths as unique document keys.
    path.to_string_lossy().replace('\\', "/")
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
    {
        bar.set_style(style);
    }
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::mock::MockEmbedder;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_build_code_index() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("A.java"),
            "public class A {\n    public void run() {}\n}\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not code").unwrap();

        let mut store = Store::open_in_memory(384).unwrap();
        let embedder = MockEmbedder::default();
        let exclude: Vec<String> = DEFAULT_EXCLUDE_DIRS.iter().map(|d| d.to_string()).collect();

        let report = build_code_index(
            &[dir.path().to_path_buf()],
            &exclude,
            &mut store,
            &embedder,
        )
        .await
        .unwrap();

        assert_eq!(report.files, 1, "only the .java file is indexed");
        assert_eq!(report.failed, 0);
        assert!(report.chunks >= 3, "summary + methods + info + code chunks");
        assert_eq!(store.count().unwrap(), report.chunks);
    }

    #[tokio::test]
    async fn test_excluded_dirs_are_skipped() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("Generated.java"), "public class Generated {}\n").unwrap();
        fs::write(dir.path().join("Real.java"), "public class Real {}\n").unwrap();

        let mut store = Store::open_in_memory(384).unwrap();
        let embedder = MockEmbedder::default();
        let exclude: Vec<String> = DEFAULT_EXCLUDE_DIRS.iter().map(|d| d.to_string()).collect();

        let report = build_code_index(
            &[dir.path().to_path_buf()],
            &exclude,
            &mut store,
            &embedder,
        )
        .await
        .unwrap();

        assert_eq!(report.files, 1);
        let listed = store.list(100).unwrap();
        assert!(listed.iter().all(|c| !c.source.contains("Generated")));
    }

    #[tokio::test]
    async fn test_empty_files_are_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("empty.py"), "   \n").unwrap();

        let mut store = Store::open_in_memory(384).unwrap();
        let embedder = MockEmbedder::default();

        let report =
            build_code_index(&[dir.path().to_path_buf()], &[], &mut store, &embedder)
                .await
                .unwrap();
        assert_eq!(report.files, 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_root_is_not_fatal() {
        let mut store = Store::open_in_memory(384).unwrap();
        let embedder = MockEmbedder::default();

        let report = build_code_index(
            &[PathBuf::from("/does/not/exist")],
            &[],
            &mut store,
            &embedder,
        )
        .await
        .unwrap();
        assert_eq!(report, IndexReport::default());
    }

    #[tokio::test]
    async fn test_build_docs_index_cleans_mdx() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("intro.mdx"),
            "<Hero title=\"Welcome\"> # Getting Started\n\nInstall <Code>cargo</Code> first.",
        )
        .unwrap();

        let mut store = Store::open_in_memory(384).unwrap();
        let embedder = MockEmbedder::default();

        let report = build_docs_index(&[dir.path().to_path_buf()], &mut store, &embedder)
            .await
            .unwrap();
        assert_eq!(report.files, 1);

        let listed = store.list(10).unwrap();
        assert!(listed[0].content.contains("Getting Started"));
        assert!(!listed[0].content.contains("<Hero"), "JSX tags are stripped");
    }

    #[test]
    fn test_clean_mdx() {
        let cleaned = clean_mdx("<Callout>  Keep   this\n\ntext </Callout>");
        assert_eq!(cleaned, "Keep this text");
    }

    #[test]
    fn test_walk_files_extension_filter() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.java"), "x").unwrap();
        fs::write(dir.path().join("b.JAVA"), "x").unwrap();
        fs::write(dir.path().join("c.md"), "x").unwrap();

        let files = walk_files(&[dir.path().to_path_buf()], &[], &CODE_EXTENSIONS);
        assert_eq!(files.len(), 2, "extension match is case-insensitive");
    }
}
