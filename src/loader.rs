//! File-level entry point: read a template file, infer its identity from
//! the path, and run the core parse.

use std::fs;
use std::path::Path;

use crate::content_type::ContentType;
use crate::error::Result;
use crate::model::{TemplateMeta, TemplateModel};
use crate::options::Options;

/// Parse a single template file.
///
/// The content type comes from the trailing extension, the modification
/// time from file metadata; the package name is left empty. Use
/// [`parse_file_with_root`] when the generated type's package should follow
/// the directory layout.
pub fn parse_file(path: impl AsRef<Path>, options: Options) -> Result<TemplateModel> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)?;
    let meta = meta_for(path, String::new())?;
    crate::parse(&source, meta, options)
}

/// Parse a template file under a template root directory; the directories
/// between the root and the file become the package name
/// (`views/user/page.ori.html` under `views` → package `user`).
pub fn parse_file_with_root(
    root: impl AsRef<Path>,
    path: impl AsRef<Path>,
    options: Options,
) -> Result<TemplateModel> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)?;
    let package_name = package_for(root.as_ref(), path);
    let meta = meta_for(path, package_name)?;
    crate::parse(&source, meta, options)
}

fn meta_for(path: &Path, package_name: String) -> Result<TemplateMeta> {
    let template_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();

    let mut meta = TemplateMeta::new(package_name, template_name, ContentType::from_extension(extension));
    meta.path = path.display().to_string();
    meta.modified_at = fs::metadata(path)?.modified().ok();
    Ok(meta)
}

fn package_for(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts: Vec<&str> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    parts.pop(); // the file name itself
    parts.join(".")
}
