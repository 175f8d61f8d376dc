//! Portable JSON form of a handle.
//!
//! ```json
//! {"name":"a.txt","metadata":{},"type":"buffer","base64":"aGk="}
//! {"name":"b.zip","metadata":{},"type":"url","url":"https://…","headers":{}}
//! ```

use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{FileBox, Metadata, Payload};
use crate::error::{FileBoxError, Result};
use crate::fetch::Headers;
use crate::registry::BlobRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedFileBox {
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(flatten)]
    pub payload: SerializedPayload,
}

/// Exactly one self-contained payload, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SerializedPayload {
    Buffer {
        base64: String,
    },
    Base64 {
        base64: String,
    },
    Url {
        url: String,
        #[serde(default, skip_serializing_if = "Headers::is_empty")]
        headers: Headers,
    },
    QrCode {
        #[serde(rename = "qrCode")]
        qr_code: String,
    },
    Uuid {
        uuid: Uuid,
    },
}

impl FileBox {
    /// The portable record of this handle.
    ///
    /// Stream and local-file handles are bound to this process and fail with
    /// `NotSerializable`.
    pub fn to_serialized(&self) -> Result<SerializedFileBox> {
        let engine = base64::engine::general_purpose::STANDARD;
        let payload = match &self.payload {
            Payload::Buffer(b) => SerializedPayload::Buffer {
                base64: engine.encode(b),
            },
            Payload::Base64(b) => SerializedPayload::Base64 {
                base64: engine.encode(b),
            },
            Payload::RemoteUrl { url, headers } => SerializedPayload::Url {
                url: url.clone(),
                headers: headers.clone(),
            },
            Payload::QrPayload(value) => SerializedPayload::QrCode {
                qr_code: value.clone(),
            },
            Payload::RegisteredBlob { uuid, .. } => SerializedPayload::Uuid { uuid: *uuid },
            Payload::Stream(_) => return Err(FileBoxError::NotSerializable("Stream")),
            Payload::LocalFile(_) => return Err(FileBoxError::NotSerializable("LocalFile")),
        };
        Ok(SerializedFileBox {
            name: self.name().to_string(),
            metadata: self.metadata().clone(),
            payload,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_serialized()?)?)
    }

    /// Rebuild a handle. `registry` is required for `uuid` records.
    pub fn from_serialized(
        record: SerializedFileBox,
        registry: Option<Arc<BlobRegistry>>,
    ) -> Result<FileBox> {
        let SerializedFileBox {
            name,
            metadata,
            payload,
        } = record;

        let fb = match payload {
            SerializedPayload::Buffer { base64 } => {
                FileBox::from_buffer(super::decode_base64(&base64)?, name)
            }
            SerializedPayload::Base64 { base64 } => FileBox::from_base64(&base64, name)?,
            SerializedPayload::Url { url, headers } => {
                FileBox::from_url(&url, headers)?.with_name(&name)
            }
            SerializedPayload::QrCode { qr_code } => FileBox::from_qr_code(qr_code)?.with_name(&name),
            SerializedPayload::Uuid { uuid } => {
                let registry = registry.ok_or_else(|| {
                    FileBoxError::config("a blob registry is required to restore a uuid handle")
                })?;
                FileBox::from_uuid(uuid, name, registry)
            }
        };

        if !metadata.is_empty() {
            fb.set_metadata(metadata)?;
        }
        Ok(fb)
    }

    pub fn from_json(json: &str, registry: Option<Arc<BlobRegistry>>) -> Result<FileBox> {
        let record: SerializedFileBox = serde_json::from_str(json)?;
        Self::from_serialized(record, registry)
    }
}
