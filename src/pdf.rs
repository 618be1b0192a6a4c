//! Thin layer over lopdf: open a pristine document, list the named images on
//! each page, and persist the result.

use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::Command;

use lopdf::{Dictionary, Document, Object, ObjectId, SaveOptions};
use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::error::{CompressError, Result};

/// Load a fresh copy of the document from disk.
pub fn open(path: &Path) -> Result<Document> {
    let doc = Document::load(path).map_err(|source| CompressError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    if doc.is_encrypted() {
        // lopdf already tried the empty password while loading.
        warn!(
            "{} is still encrypted; images may fail to decode",
            path.display()
        );
    }

    Ok(doc)
}

/// An image XObject as seen from one page's resource table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub name: Vec<u8>,
    pub id: ObjectId,
}

impl PageImage {
    pub fn display_name(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

/// Resources for a page, following `/Parent` for inherited entries.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut visited = HashSet::new();
    let mut current = page_id;
    loop {
        if !visited.insert(current) {
            return None;
        }
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(resources) = dict.get(b"Resources") {
            return resolve_dict(doc, resources);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
}

/// Snapshot of the image XObjects named in a page's resources, in table order.
pub fn page_images(doc: &Document, page_id: ObjectId) -> Vec<PageImage> {
    let Some(xobjects) = page_resources(doc, page_id)
        .and_then(|res| res.get(b"XObject").ok())
        .and_then(|x| resolve_dict(doc, x))
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, obj)| {
            let id = obj.as_reference().ok()?;
            let Ok(Object::Stream(stream)) = doc.get_object(id) else {
                return None;
            };
            let is_image = stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .map(|n| n == b"Image")
                .unwrap_or(false);
            is_image.then(|| PageImage {
                name: name.clone(),
                id,
            })
        })
        .collect()
}

/// How the document is written back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveSettings {
    /// Flate-compress streams that carry no filter yet.
    pub compress_streams: bool,
    /// Pack objects into object streams with a cross-reference stream.
    pub object_streams: bool,
    /// Drop objects no longer reachable from the trailer (old soft masks etc).
    pub prune_unused: bool,
    /// Linearize the written file with `qpdf`.
    pub linearize: bool,
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            compress_streams: true,
            object_streams: true,
            prune_unused: true,
            linearize: false,
        }
    }
}

/// Write `doc` to `output`, replacing whatever is there.
///
/// The file is written next to `output` first and renamed into place once
/// complete.
pub fn save(doc: &mut Document, output: &Path, settings: &SaveSettings) -> Result<()> {
    if settings.prune_unused {
        let pruned = doc.prune_objects();
        debug!("Pruned {} unreachable objects", pruned.len());
    }
    if settings.compress_streams {
        doc.compress();
    }

    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp =
        NamedTempFile::new_in(dir).map_err(|e| CompressError::persistence(output, e))?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        let saved = if settings.object_streams {
            let options = SaveOptions::builder()
                .use_object_streams(true)
                .use_xref_streams(true)
                .build();
            doc.save_with_options(&mut writer, options)
        } else {
            doc.save_to(&mut writer)
        };
        saved.map_err(|e| CompressError::persistence(output, e))?;
        writer
            .flush()
            .map_err(|e| CompressError::persistence(output, e))?;
    }

    if settings.linearize {
        linearize_in_place(tmp.path())?;
    }

    tmp.persist(output)
        .map_err(|e| CompressError::persistence(output, e.error))?;
    Ok(())
}

/// Rewrite `path` as a linearized PDF using the `qpdf` CLI.
fn linearize_in_place(path: &Path) -> Result<()> {
    let result = Command::new("qpdf")
        .arg("--linearize")
        .arg("--replace-input")
        .arg(path)
        .output()
        .map_err(|e| CompressError::Linearize(format!("failed to execute qpdf: {e}")))?;

    // Exit code 3 means success with warnings.
    match result.status.code() {
        Some(0) | Some(3) => Ok(()),
        code => Err(CompressError::Linearize(format!(
            "qpdf failed (exit code {}): {}",
            code.map_or_else(|| "unknown".to_string(), |c| c.to_string()),
            String::from_utf8_lossy(&result.stderr).trim()
        ))),
    }
}
