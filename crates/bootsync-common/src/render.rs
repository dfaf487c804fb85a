//! Template rendering for generated daemon configuration.
//!
//! Templates are Jinja-style text (rendered with `minijinja`). Output is
//! written to a temporary file next to the target and renamed into place,
//! so a reader never sees a half-written configuration.

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use minijinja::Environment;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::{BootSyncError, BootSyncResult};

/// Renders a template with a context and writes the result.
pub trait Renderer: Send + Sync {
    /// Renders `template` with `context` and writes it to `output`.
    ///
    /// Fails if the template is invalid or the output path is not writable.
    fn render(&self, template: &str, context: &Value, output: &Path) -> BootSyncResult<()>;
}

/// `minijinja`-backed renderer with atomic file replacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Renders `template` to a string.
    pub fn render_to_string(
        &self,
        template: &str,
        context: &Value,
        output: &Path,
    ) -> BootSyncResult<String> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);

        env.render_str(template, context)
            .map_err(|e| BootSyncError::render(output, e.to_string()))
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, template: &str, context: &Value, output: &Path) -> BootSyncResult<()> {
        let text = self.render_to_string(template, context, output)?;
        write_atomic(output, text.as_bytes())?;
        tracing::info!(path = %output.display(), bytes = text.len(), "Wrote configuration");
        Ok(())
    }
}

/// Reads a template file, mapping any failure to [`BootSyncError::TemplateRead`].
pub fn read_template(path: &Path) -> BootSyncResult<String> {
    fs::read_to_string(path).map_err(|e| BootSyncError::template_read(path, e))
}

/// Mode for files that did not exist before the first write.
const NEW_FILE_MODE: u32 = 0o644;

/// Replaces `path` with `contents` via write-then-rename in the same directory.
///
/// The replacement keeps the permissions of the file it replaces, or gets
/// mode `0o644` when there was none.
pub fn write_atomic(path: &Path, contents: &[u8]) -> BootSyncResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp =
        NamedTempFile::new_in(dir).map_err(|e| BootSyncError::render(path, e.to_string()))?;
    let permissions = match fs::metadata(path) {
        Ok(meta) => meta.permissions(),
        Err(_) => fs::Permissions::from_mode(NEW_FILE_MODE),
    };
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().set_permissions(permissions))
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| BootSyncError::render(path, e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| BootSyncError::render(path, e.error.to_string()))?;
    Ok(())
}
