use serde::{Deserialize, Serialize};

/// A multipart upload session, as returned by the initiate call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: String,
}

/// The server's acknowledgement of one uploaded part.  Echoed back verbatim, in part order,
/// when the upload is completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedPart {
    pub part_number: u32,
    pub part_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_checksum: Option<String>,
}

/// Body of the complete call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteUploadRequest {
    pub parts: Vec<UploadedPart>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let op: Operation = serde_json::from_str(r#"{"operationId": "op-17"}"#).unwrap();
        assert_eq!(op.operation_id, "op-17");

        let part: UploadedPart =
            serde_json::from_str(r#"{"partNumber": 2, "partIdentifier": "etag-2", "partChecksum": "abc="}"#).unwrap();
        assert_eq!(part.part_number, 2);
        assert_eq!(part.part_checksum.as_deref(), Some("abc="));

        let body = serde_json::to_value(CompleteUploadRequest { parts: vec![part] }).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"parts": [{"partNumber": 2, "partIdentifier": "etag-2", "partChecksum": "abc="}]})
        );
    }

    #[test]
    fn test_part_checksum_is_optional() {
        let part: UploadedPart = serde_json::from_str(r#"{"partNumber": 1, "partIdentifier": "p1"}"#).unwrap();
        assert!(part.part_checksum.is_none());
        assert_eq!(serde_json::to_string(&part).unwrap(), r#"{"partNumber":1,"partIdentifier":"p1"}"#);
    }
}
