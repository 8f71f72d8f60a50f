//! Managed output directory for generated files.
//!
//! Every file the assistant extracts from a reply lands under one root
//! directory. The store owns that root for the life of the process: it is
//! created (and permission-hardened) up front, with a silent relocation to
//! the system temp dir when the preferred location is not writable. No
//! index is kept on the side; the directory listing is the record.

use crate::scanner::{self, CodeSegment};
use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Subdirectory of the system temp dir used when the preferred output
/// location cannot be created.
const FALLBACK_NAMESPACE: &str = "codescribe";

/// Quoted `"name.ext"` / `'name.ext'` in a user request.
static QUOTED_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([^"']+\.\w+)["']"#).expect("quoted name regex"));

/// `called name.ext` / `named name.ext` in a user request.
static CALLED_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:called|named)\s+(\S+\.\w+)").expect("called name regex"));

/// A failed write of a single extracted segment.
///
/// Directory provisioning recovers internally; only the write itself is a
/// hard failure, and it carries the path it was aimed at.
#[derive(Debug, Error)]
#[error("failed to write {}: {}", .path.display(), .source)]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// The managed root directory plus the logic that names files into it.
pub struct FileStore {
    output_dir: PathBuf,
}

impl FileStore {
    /// Open the store, creating `dir` if needed.
    ///
    /// When `dir` cannot be created or permission-hardened, the store
    /// silently relocates to `<temp>/codescribe/<dir>` so a writable root
    /// always exists before the first write.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let preferred = dir.as_ref().to_path_buf();
        let output_dir = match provision(&preferred) {
            Ok(()) => preferred,
            Err(err) if err.kind() == ErrorKind::PermissionDenied => {
                let fallback = std::env::temp_dir().join(FALLBACK_NAMESPACE).join(&preferred);
                fs::create_dir_all(&fallback).with_context(|| {
                    format!("failed to create fallback directory {}", fallback.display())
                })?;
                debug!(
                    preferred = %preferred.display(),
                    fallback = %fallback.display(),
                    "output directory not writable, relocated to temp"
                );
                fallback
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to create output directory {}", preferred.display())
                })
            }
        };
        Ok(Self { output_dir })
    }

    /// The root directory files are written under.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Extract every fenced block from `response` and persist each one.
    ///
    /// Returns the written paths in segment order; an empty vec means the
    /// reply contained no code. The batch halts at the first segment that
    /// fails to write, propagating its error; files already written in the
    /// same batch stay on disk.
    pub fn process_response(&self, response: &str, request: &str) -> Result<Vec<PathBuf>> {
        let segments = scanner::extract(response);
        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let mut saved = Vec::with_capacity(segments.len());
        for segment in &segments {
            saved.push(self.save(segment, request)?);
        }
        Ok(saved)
    }

    /// Persist one segment and return the path it was written to.
    ///
    /// Filename priority: the segment's own hint, then a name mined from
    /// the user request, then a synthesized `generated_<n><ext>`.
    pub fn save(&self, segment: &CodeSegment, request: &str) -> Result<PathBuf> {
        let path = match segment
            .filename_hint
            .clone()
            .or_else(|| filename_from_request(request))
        {
            Some(name) => self.output_dir.join(name),
            None => self.next_generated_path(&segment.language),
        };

        let path = self.ensure_parent(path)?;
        let content = normalize_newlines(&segment.content);
        fs::write(&path, content).map_err(|source| WriteError {
            path: path.clone(),
            source,
        })?;
        mark_executable(&path);

        debug!(path = %path.display(), language = %segment.language, "wrote segment");
        Ok(path)
    }

    /// Smallest unused `generated_<n><ext>` in the output root.
    ///
    /// Sequential probing from 1 keeps the numbering deterministic and
    /// refills gaps left by deleted files. The probe is unbounded; a
    /// directory dense enough to make that matter is outside anything the
    /// assistant itself produces.
    fn next_generated_path(&self, language: &str) -> PathBuf {
        let ext = extension_for(language);
        let mut counter: u64 = 1;
        loop {
            let candidate = self.output_dir.join(format!("generated_{counter}{ext}"));
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Create the parent directory for `path`, relocating to the temp
    /// fallback on a permission error. Only permission errors recover;
    /// anything else is surfaced.
    fn ensure_parent(&self, path: PathBuf) -> Result<PathBuf> {
        let Some(parent) = path.parent() else {
            return Ok(path);
        };
        match fs::create_dir_all(parent) {
            Ok(()) => Ok(path),
            Err(err) if err.kind() == ErrorKind::PermissionDenied => {
                let relative = path
                    .strip_prefix(&self.output_dir)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| path.clone());
                let fallback = std::env::temp_dir().join(FALLBACK_NAMESPACE).join(relative);
                if let Some(fallback_parent) = fallback.parent() {
                    fs::create_dir_all(fallback_parent).with_context(|| {
                        format!(
                            "failed to create fallback directory {}",
                            fallback_parent.display()
                        )
                    })?;
                }
                debug!(
                    from = %path.display(),
                    to = %fallback.display(),
                    "target directory not writable, relocated to temp"
                );
                Ok(fallback)
            }
            Err(err) => Err(err).with_context(|| {
                format!("failed to create directory {}", parent.display())
            }),
        }
    }

    /// All regular files currently under the output root, sorted by path.
    pub fn list(&self) -> Vec<PathBuf> {
        if !self.output_dir.exists() {
            return Vec::new();
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&self.output_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files
    }

    /// Delete every regular file under the output root, leaving the
    /// directory structure in place. Returns the number removed.
    pub fn clear(&self) -> Result<usize> {
        if !self.output_dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in WalkDir::new(&self.output_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if entry.file_type().is_file() {
                fs::remove_file(entry.path())
                    .with_context(|| format!("failed to remove {}", entry.path().display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Create `dir` and widen its permissions so other local tooling can read
/// the generated files. The chmod is skipped on non-Unix targets.
fn provision(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o775))?;
    }
    Ok(())
}

/// Mine a filename out of the user's request text.
///
/// Quoted names win over `called`/`named` phrasing; both require a
/// dot-extension so prose in quotes does not get mistaken for a filename.
fn filename_from_request(request: &str) -> Option<String> {
    if let Some(caps) = QUOTED_NAME_RE.captures(request) {
        return Some(caps[1].to_string());
    }
    CALLED_NAME_RE.captures(request).map(|caps| caps[1].to_string())
}

/// File extension (with the dot) for a fence language tag. Unknown tags
/// and untagged blocks land on `.txt`.
pub fn extension_for(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "python" => ".py",
        "javascript" => ".js",
        "typescript" => ".ts",
        "html" => ".html",
        "css" => ".css",
        "java" => ".java",
        "cpp" => ".cpp",
        "c" => ".c",
        "rust" => ".rs",
        "go" => ".go",
        "ruby" => ".rb",
        "php" => ".php",
        "swift" => ".swift",
        "kotlin" => ".kt",
        "sql" => ".sql",
        "json" => ".json",
        "xml" => ".xml",
        "yaml" => ".yaml",
        "markdown" => ".md",
        "text" => ".txt",
        "shell" => ".sh",
        "bash" => ".sh",
        "powershell" => ".ps1",
        "batch" => ".bat",
        _ => ".txt",
    }
}

/// Collapse CRLF to LF so written files read the same on every platform.
fn normalize_newlines(content: &str) -> String {
    content.replace("\r\n", "\n")
}

/// Mark shell scripts executable. Best effort: a chmod failure never
/// fails the write that produced the file.
fn mark_executable(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let is_shell = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("sh") | Some("bash")
        );
        if is_shell {
            if let Err(err) = fs::set_permissions(path, fs::Permissions::from_mode(0o755)) {
                debug!(path = %path.display(), error = %err, "could not mark script executable");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}
