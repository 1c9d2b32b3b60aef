//! Serde model for S3 object-created notifications and object key decoding.

use percent_encoding::percent_decode_str;
use serde::Deserialize;

/// An S3 event notification carrying one or more object records.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

/// One object record within an S3 event.
#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    pub key: String,
}

/// Decode an object key from an event notification.
///
/// S3 encodes keys the way HTML forms do: spaces arrive as literal `+` and
/// everything else is percent-encoded.
pub fn decode_object_key(raw: &str) -> String {
    let plus_as_space = raw.replace('+', " ");
    percent_decode_str(&plus_as_space)
        .decode_utf8_lossy()
        .into_owned()
}
