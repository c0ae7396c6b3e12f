//! Mirrored media asset.

/// A remote asset and its copy in owned storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// URL on the tracker's image host
    pub source_url: String,

    /// Storage key derived from the source path
    pub key: String,

    /// URL under which the stored copy is served
    pub public_url: String,
}
