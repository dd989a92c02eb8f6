//! File formats the cutting workflow writes.

pub mod gltf;

pub use gltf::part_to_glb;

/// A serialized part, ready to be offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedPart {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Host collaborator that hands exported bytes to the user (browser download,
/// file dialog, ...).
pub trait DownloadSink {
    fn offer(&mut self, part: &ExportedPart);
}

impl<F: FnMut(&ExportedPart)> DownloadSink for F {
    fn offer(&mut self, part: &ExportedPart) {
        self(part)
    }
}
