//! Planner invocation: argument vector plus a per-request result path.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use glide_core::{planner_args, RoutePlanRequest};

use crate::config::Config;

const MAX_STEM_LEN: usize = 40;
const DEFAULT_STEM: &str = "plan";

/// Hands out result-artifact paths that are never reused within the process.
///
/// Uniqueness comes from a process-wide sequence number combined with a
/// random token, so concurrent identical requests never share a file and
/// paths stay distinct across restarts sharing one directory.
#[derive(Debug)]
pub struct ArtifactAllocator {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl ArtifactAllocator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let dir = if dir.is_absolute() {
            dir
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&dir))
                .unwrap_or(dir)
        };
        Self {
            dir,
            sequence: AtomicU64::new(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a fresh artifact path. `hint` only contributes a sanitized stem.
    pub fn allocate(&self, hint: Option<&str>) -> PathBuf {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let stem = hint
            .map(sanitize_stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| DEFAULT_STEM.to_string());
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.dir.join(format!("{}-{:06}-{}.json", stem, seq, &token[..12]))
    }
}

/// Reduce a client-supplied name to `[A-Za-z0-9_-]`, dropping any directory
/// components and extension.
pub fn sanitize_stem(hint: &str) -> String {
    let name = Path::new(hint)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_STEM_LEN)
        .collect()
}

/// Everything needed to start one planner run.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub workdir: Option<PathBuf>,
    pub artifact: PathBuf,
}

impl Invocation {
    /// Build the invocation for a validated request and create the artifact
    /// directory if needed. No process is started here.
    ///
    /// The artifact is named after the request's `outfile` hint, falling back
    /// to `fallback_stem` (the request id).
    pub async fn prepare(
        config: &Config,
        allocator: &ArtifactAllocator,
        request: &RoutePlanRequest,
        fallback_stem: &str,
    ) -> io::Result<Self> {
        let artifact = allocator.allocate(Some(request.outfile.as_deref().unwrap_or(fallback_stem)));
        if let Some(parent) = artifact.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut args: Vec<OsString> = Vec::new();
        if let Some(script) = &config.planner_script {
            args.push(script.as_os_str().to_owned());
        }
        args.extend(planner_args(request, &artifact));

        Ok(Self {
            program: config.planner_program.clone(),
            args,
            workdir: config.planner_workdir.clone(),
            artifact,
        })
    }

    /// Human-readable command line for logs. Never executed.
    pub fn display_command(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}
