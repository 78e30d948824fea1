//! Template cache
//!
//! Page templates are compiled once at startup into a Tera instance
//! mapping template name to compiled template. Any parse failure is
//! returned as an error, which the caller treats as startup-fatal. The
//! cache is read-only after construction and safe for concurrent reads.

use anyhow::{Context as AnyhowContext, Result};
use std::fs;
use std::path::Path;
use tera::{Context, Tera};

/// Template cache error types
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Templates directory not found
    #[error("Templates directory not found: {0}")]
    DirectoryNotFound(String),

    /// Template compile or render error
    #[error("Template error: {0}")]
    TemplateError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Compiled page templates, built once at startup
pub struct TemplateCache {
    tera: Tera,
}

impl TemplateCache {
    /// Compile every `.html` file under `path` into the cache.
    ///
    /// Template names are paths relative to `path` with forward slashes,
    /// e.g. `home.html`. Base templates are added first so inheritance
    /// resolves regardless of directory order.
    pub fn new(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(TemplateError::DirectoryNotFound(path.display().to_string()).into());
        }

        let mut templates: Vec<(String, String)> = Vec::new();
        collect_templates_from_dir(path, path, &mut templates)?;

        templates.sort_by(|a, b| {
            let a_is_base = a.0 == "base.html" || a.0.ends_with("/base.html");
            let b_is_base = b.0 == "base.html" || b.0.ends_with("/base.html");
            b_is_base.cmp(&a_is_base)
        });

        let mut tera = Tera::default();
        for (name, content) in templates {
            tera.add_raw_template(&name, &content).map_err(|e| {
                TemplateError::TemplateError(format!("Failed to add template {}: {}", name, e))
            })?;
        }

        tera.build_inheritance_chains().map_err(|e| {
            TemplateError::TemplateError(format!("Failed to build template inheritance: {}", e))
        })?;

        Ok(Self { tera })
    }

    /// Render a cached template with the given context.
    ///
    /// Rendering a name that was never compiled is an error.
    pub fn render(&self, name: &str, context: &Context) -> Result<String> {
        self.tera
            .render(name, context)
            .map_err(|e| TemplateError::TemplateError(format!("{}: {}", name, source_chain(&e))).into())
    }

    /// Names of all compiled templates
    pub fn template_names(&self) -> Vec<&str> {
        self.tera.get_template_names().collect()
    }
}

/// Collect templates from a directory recursively
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    for entry in fs::read_dir(current_path)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path.strip_prefix(base_path).map_err(|_| {
                TemplateError::TemplateError("Failed to get relative path".to_string())
            })?;

            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;

            templates.push((template_name, content));
        }
    }

    Ok(())
}

/// Flatten a Tera error and its sources into one message
fn source_chain(e: &tera::Error) -> String {
    use std::error::Error as StdError;

    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(err) = source {
        message.push_str(": ");
        message.push_str(&err.to_string());
        source = err.source();
    }
    message
}
