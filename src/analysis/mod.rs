// src/analysis/mod.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::file::Document;

pub mod request;
pub mod result;

pub use request::{AnalysisError, AnalysisFlow, TransportTargets};
pub use result::{ResultView, Sentiment};

/// Wire payload for the analysis service. Built once per submission and
/// reused unmodified across every transport attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub document_content: String,
    pub metadata: RequestMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    pub name: String,
    pub upload_time: DateTime<Utc>,
    pub file_type: String,
    pub file_size: u64,
}

impl AnalysisRequest {
    pub fn from_document(document: &Document) -> Self {
        Self {
            document_content: document.content.clone(),
            metadata: RequestMetadata {
                name: document.name.clone(),
                upload_time: document.uploaded_at,
                file_type: document.mime_type.clone(),
                file_size: document.size_bytes,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_camel_case_wire_names() {
        let document = Document {
            content: "hello".to_string(),
            name: "notes.txt".to_string(),
            mime_type: "text/plain".to_string(),
            size_bytes: 5,
            uploaded_at: Utc::now(),
        };

        let payload = AnalysisRequest::from_document(&document);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["documentContent"], "hello");
        assert_eq!(json["metadata"]["name"], "notes.txt");
        assert_eq!(json["metadata"]["fileType"], "text/plain");
        assert_eq!(json["metadata"]["fileSize"], 5);
        assert!(json["metadata"]["uploadTime"].is_string());
    }
}
