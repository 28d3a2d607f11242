//! Pipe domain types

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Pipe definition
///
/// A named pipeline made of segments. Loaded from a definition file, stored in
/// the catalog unchanged, and cloned whenever it is dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    pub header: PipeHeader,
    pub body: PipeBody,
}

/// Pipe header
///
/// Only `name` is interpreted; any other header fields are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeHeader {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Pipe body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeBody {
    pub segments: Vec<Segment>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// One stage of a pipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub header: SegmentHeader,
    pub body: SegmentBody,
}

/// Segment header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentHeader {
    pub segment_number: i64,
    /// Logical service name, used for service discovery
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Segment body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Network target of a segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl Endpoint {
    pub const DEFAULT_METHOD: &'static str = "POST";

    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            method: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// HTTP method to use, falling back to POST
    pub fn method_or_default(&self) -> &str {
        self.method.as_deref().unwrap_or(Self::DEFAULT_METHOD)
    }
}

/// Data injected into the entry segment of a pipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub header: PayloadHeader,
    pub body: PayloadBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadHeader {
    pub data_type: DataType,
    pub seq_number: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadBody {
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_info: Option<JsonValue>,
}

/// Encoding of `PayloadBody::data`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
    Base64,
}

impl Payload {
    /// Builds a text payload with sequence number 0
    pub fn text(
        data: impl Into<String>,
        mime_type: Option<String>,
        info: Option<JsonValue>,
    ) -> Self {
        Self {
            header: PayloadHeader {
                data_type: DataType::Text,
                seq_number: 0,
            },
            body: PayloadBody {
                data: data.into(),
                data_mime_type: mime_type,
                data_info: info,
            },
        }
    }

    /// Builds a base64 payload with sequence number 0 from raw bytes
    pub fn binary(data: &[u8], mime_type: Option<String>, info: Option<JsonValue>) -> Self {
        Self {
            header: PayloadHeader {
                data_type: DataType::Base64,
                seq_number: 0,
            },
            body: PayloadBody {
                data: base64::engine::general_purpose::STANDARD.encode(data),
                data_mime_type: mime_type,
                data_info: info,
            },
        }
    }
}

impl Pipe {
    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn segments(&self) -> &[Segment] {
        &self.body.segments
    }

    /// The segment with the lowest segment number, i.e. the dispatch target
    pub fn entry_segment(&self) -> Option<&Segment> {
        self.body
            .segments
            .iter()
            .min_by_key(|segment| segment.header.segment_number)
    }

    pub fn entry_segment_mut(&mut self) -> Option<&mut Segment> {
        self.body
            .segments
            .iter_mut()
            .min_by_key(|segment| segment.header.segment_number)
    }

    /// Attaches a payload to the entry segment, replacing any existing one
    ///
    /// Returns `false` when the pipe has no segments.
    pub fn attach_payload(&mut self, payload: Payload) -> bool {
        match self.entry_segment_mut() {
            Some(segment) => {
                segment.body.payload = Some(payload);
                true
            }
            None => false,
        }
    }
}

impl Segment {
    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn number(&self) -> i64 {
        self.header.segment_number
    }
}
