//! Payload types decoded by the dispatcher.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// An embedded JSON document kept exactly as received.
///
/// The bytes are never re-encoded, so whitespace and key order survive a
/// decode/encode cycle.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawDocument(Box<RawValue>);

impl RawDocument {
    /// Wraps a JSON text, validating it.
    pub fn from_json(json: impl Into<String>) -> serde_json::Result<Self> {
        RawValue::from_string(json.into()).map(Self)
    }

    /// Gets the document text.
    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    /// Gets the document bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.get().as_bytes()
    }

    /// Decodes the document into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(self.0.get())
    }
}

impl PartialEq for RawDocument {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for RawDocument {}

impl fmt::Debug for RawDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawDocument").field(&self.as_str()).finish()
    }
}

/// An artifact attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// Repository the attestation belongs to.
    pub repository_id: i64,
    /// Sigstore bundle, kept verbatim.
    pub bundle: RawDocument,
}

/// Attestations listed for a subject digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationsResponse {
    /// The attestations.
    pub attestations: Vec<Attestation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bundle_bytes_preserved() {
        let body = r#"{
            "attestations": [
                {"repository_id": 1, "bundle": {"mediaType":  "application/vnd.dev.sigstore.bundle+json;version=0.2", "z": 1, "a": [ 1,2 ]}},
                {"repository_id": 2, "bundle": {}}
            ]
        }"#;

        let parsed: AttestationsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.attestations.len(), 2);
        assert_eq!(
            parsed.attestations[0].bundle.as_bytes(),
            br#"{"mediaType":  "application/vnd.dev.sigstore.bundle+json;version=0.2", "z": 1, "a": [ 1,2 ]}"#
        );
        assert_eq!(parsed.attestations[1].bundle.as_bytes(), b"{}");
    }

    #[test]
    fn test_bundle_reencodes_verbatim() {
        let doc = RawDocument::from_json(r#"{ "b": 2,  "a": 1 }"#).unwrap();
        let attestation = Attestation {
            repository_id: 7,
            bundle: doc.clone(),
        };

        let encoded = serde_json::to_string(&attestation).unwrap();
        assert_eq!(encoded, r#"{"repository_id":7,"bundle":{ "b": 2,  "a": 1 }}"#);

        let decoded: Attestation = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.bundle, doc);
    }

    #[test]
    fn test_bundle_decode() {
        #[derive(Deserialize)]
        struct Bundle {
            #[serde(rename = "mediaType")]
            media_type: String,
        }

        let doc = RawDocument::from_json(r#"{"mediaType":"x"}"#).unwrap();
        let bundle: Bundle = doc.decode().unwrap();
        assert_eq!(bundle.media_type, "x");
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(RawDocument::from_json("{not json").is_err());
    }
}
