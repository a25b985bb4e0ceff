//! Draft text and staged attachments for the message composer.
//!
//! Staging is purely local: files are validated and read up front, image-like
//! files get a temp-file preview handle, and nothing touches the network until
//! the discussion submits. The staged set survives a failed submit untouched.

use bytes::Bytes;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;
use tempfile::NamedTempFile;

use crate::api::OutgoingFile;
use crate::error::ClientError;

/// One file selected locally but not yet submitted.
#[derive(Debug)]
pub struct StagedAttachment {
    pub id: u64,
    pub name: String,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub mime: String,
    pub data: Bytes,
    preview: Option<NamedTempFile>,
}

impl StagedAttachment {
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }

    /// Local preview handle; `None` for non-image files, which render as a
    /// plain icon instead.
    pub fn preview_path(&self) -> Option<&Path> {
        self.preview.as_ref().map(|f| f.path())
    }

    pub fn outgoing(&self) -> OutgoingFile {
        OutgoingFile {
            name: self.name.clone(),
            mime: self.mime.clone(),
            data: self.data.clone(),
        }
    }
}

pub struct Composer {
    draft: String,
    staged: Vec<StagedAttachment>,
    next_id: u64,
    max_bytes: u64,
}

impl Composer {
    pub fn new(max_attachment_mb: u64) -> Self {
        Self {
            draft: String::new(),
            staged: Vec::new(),
            next_id: 1,
            max_bytes: max_attachment_mb * 1024 * 1024,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn staged(&self) -> &[StagedAttachment] {
        &self.staged
    }

    /// True when there is nothing to send: blank draft and no staged files.
    pub fn is_empty(&self) -> bool {
        self.draft.trim().is_empty() && self.staged.is_empty()
    }

    /// Reads a local file into the staged set.
    pub fn stage_file(&mut self, path: &Path) -> Result<u64, ClientError> {
        let metadata = fs::metadata(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::validation("attachment needs a file name"))?
            .to_string();
        let data = Bytes::from(fs::read(path)?);
        self.stage_bytes(&name, metadata.modified().ok(), data)
    }

    /// Stages in-memory content. Re-staging the same `(name, size, modified)`
    /// key returns the already-staged id instead of duplicating the file.
    pub fn stage_bytes(
        &mut self,
        name: &str,
        modified: Option<SystemTime>,
        data: Bytes,
    ) -> Result<u64, ClientError> {
        if name.is_empty() {
            return Err(ClientError::validation("attachment needs a file name"));
        }
        let size = data.len() as u64;
        if size > self.max_bytes {
            return Err(ClientError::validation(format!(
                "{name} is larger than the {} MB attachment limit",
                self.max_bytes / (1024 * 1024)
            )));
        }

        if let Some(existing) = self
            .staged
            .iter()
            .find(|s| s.name == name && s.size == size && s.modified == modified)
        {
            log::debug!("attachment {name} already staged");
            return Ok(existing.id);
        }

        let mime = mime_guess::from_path(name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        let preview = if mime.starts_with("image/") {
            Some(write_preview(&data)?)
        } else {
            None
        };

        let id = self.next_id;
        self.next_id += 1;
        self.staged.push(StagedAttachment {
            id,
            name: name.to_string(),
            size,
            modified,
            mime,
            data,
            preview,
        });
        Ok(id)
    }

    /// Removes one staged attachment; dropping it releases the preview file.
    pub fn unstage(&mut self, id: u64) -> bool {
        let before = self.staged.len();
        self.staged.retain(|s| s.id != id);
        self.staged.len() != before
    }

    pub fn outgoing(&self) -> Vec<OutgoingFile> {
        self.staged.iter().map(StagedAttachment::outgoing).collect()
    }

    /// Drops draft text and every staged file (with their preview handles).
    pub fn clear(&mut self) {
        self.draft.clear();
        self.staged.clear();
    }
}

fn write_preview(data: &Bytes) -> Result<NamedTempFile, ClientError> {
    let mut file = NamedTempFile::new()?;
    file.write_all(data)?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer() -> Composer {
        Composer::new(1)
    }

    #[test]
    fn staging_same_file_twice_is_a_no_op() {
        let mut c = composer();
        let modified = Some(SystemTime::UNIX_EPOCH);
        let first = c
            .stage_bytes("notes.txt", modified, Bytes::from_static(b"hello"))
            .unwrap();
        let second = c
            .stage_bytes("notes.txt", modified, Bytes::from_static(b"hello"))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(c.staged().len(), 1);
    }

    #[test]
    fn oversized_attachment_is_rejected_locally() {
        let mut c = composer();
        let big = Bytes::from(vec![0u8; 2 * 1024 * 1024]);
        match c.stage_bytes("huge.bin", None, big) {
            Err(ClientError::Validation(msg)) => assert!(msg.contains("huge.bin")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(c.staged().is_empty());
    }

    #[test]
    fn image_files_get_a_preview_handle_and_release_it_on_unstage() {
        let mut c = composer();
        let id = c
            .stage_bytes("photo.png", None, Bytes::from_static(b"\x89PNG"))
            .unwrap();

        let preview = c.staged()[0]
            .preview_path()
            .expect("image should have a preview")
            .to_path_buf();
        assert!(preview.exists());
        assert!(c.staged()[0].is_image());

        assert!(c.unstage(id));
        assert!(!preview.exists());
    }

    #[test]
    fn plain_files_have_no_preview() {
        let mut c = composer();
        c.stage_bytes("notes.txt", None, Bytes::from_static(b"hello"))
            .unwrap();
        assert!(c.staged()[0].preview_path().is_none());
    }

    #[test]
    fn clear_drops_draft_and_staged_files() {
        let mut c = composer();
        c.set_draft("wip");
        c.stage_bytes("photo.png", None, Bytes::from_static(b"\x89PNG"))
            .unwrap();
        let preview = c.staged()[0].preview_path().unwrap().to_path_buf();

        c.clear();
        assert!(c.is_empty());
        assert!(!preview.exists());
    }

    #[test]
    fn empty_means_blank_draft_and_nothing_staged() {
        let mut c = composer();
        assert!(c.is_empty());
        c.set_draft("   ");
        assert!(c.is_empty());
        c.set_draft("hi");
        assert!(!c.is_empty());
    }
}
