use serde::{Deserialize, Serialize};

use crate::digest::OciDigest;

/// Media types used by image manifests and their content
pub mod media_types {
    pub const IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
    pub const IMAGE_CONFIG: &str = "application/vnd.oci.image.config.v1+json";
    pub const IMAGE_LAYER_TAR_GZIP: &str = "application/vnd.oci.image.layer.v1.tar+gzip";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Represents a descriptor for a content blob in an OCI registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Digest of the referenced content
    pub digest: OciDigest,
    /// Media type of the referenced content
    pub media_type: String,
    /// Size of the referenced content in bytes
    pub size: u64,
    /// Optional inline copy of the content, base64 encoded on the wire
    #[serde(default, skip_serializing_if = "Option::is_none", with = "inline_data")]
    pub data: Option<Vec<u8>>,
}

impl Descriptor {
    /// Describe `content` without embedding it
    pub fn for_content(media_type: impl Into<String>, content: impl AsRef<[u8]>) -> Self {
        let content = content.as_ref();
        Self {
            digest: OciDigest::sha256(content),
            media_type: media_type.into(),
            size: content.len() as u64,
            data: None,
        }
    }
}

/// Represents an OCI image manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    /// Schema version of the manifest
    pub schema_version: u32,
    /// Media type of the manifest
    pub media_type: String,
    /// Descriptor for the config blob
    pub config: Descriptor,
    /// Descriptors for the layer blobs
    pub layers: Vec<Descriptor>,
}

impl ImageManifest {
    /// The exact bytes that get uploaded; digest and Content-Length derive from these.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

mod inline_data {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match data {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}
