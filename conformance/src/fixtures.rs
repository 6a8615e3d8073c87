use ocimodel::{Descriptor, ImageManifest, OciDigest, media_types};

/// Content pushed by the blob scenarios
pub const BLOB_CONTENT: &[u8] = b"blob content";

pub const LAYER_CONTENT: &[u8] = b"layer content";
pub const MORE_LAYER_CONTENT: &[u8] = b"more layer content";

/// Tag that no scenario ever pushes
pub const NON_EXISTENT_TAG: &str = "non-existent-tag";

/// Digest of content that no scenario ever pushes
pub fn non_existent_digest() -> OciDigest {
    OciDigest::sha256("non-existent")
}

/// Manifest with an empty config and two layers.
///
/// Registries only get to see the descriptors; none of the referenced blobs are uploaded.
pub fn image_manifest() -> ImageManifest {
    ImageManifest {
        schema_version: 2,
        media_type: media_types::IMAGE_MANIFEST.to_string(),
        config: Descriptor::for_content(media_types::IMAGE_CONFIG, b""),
        layers: vec![
            Descriptor::for_content(media_types::IMAGE_LAYER_TAR_GZIP, LAYER_CONTENT),
            Descriptor::for_content(media_types::IMAGE_LAYER_TAR_GZIP, MORE_LAYER_CONTENT),
        ],
    }
}
