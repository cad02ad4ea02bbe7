//! Wire Types
//!
//! Request and response shapes shared with the backend. Field names
//! follow the backend's camelCase convention; unknown fields in
//! responses are ignored so a newer backend stays compatible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{ClientError, ClientResult};

// ============================================
// Auth
// ============================================

/// Registration form fields
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProfile {
    pub name: String,
    pub roll_no: String,
    pub email: String,
    pub password: String,
}

/// Login form fields
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Token issued on successful login or registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

// ============================================
// Out-pass requests
// ============================================

/// Lifecycle state of an out-pass request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassStatus {
    Pending,
    Approved,
    Rejected,
}

impl PassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassStatus::Pending => "PENDING",
            PassStatus::Approved => "APPROVED",
            PassStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A new out-pass request before submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutPassDraft {
    pub reason: String,
    pub date_out: String,
    pub return_time: String,
}

impl OutPassDraft {
    /// Reject blank fields before any request goes out
    pub fn validate(&self) -> ClientResult<()> {
        if self.reason.trim().is_empty()
            || self.date_out.trim().is_empty()
            || self.return_time.trim().is_empty()
        {
            return Err(ClientError::Validation(
                "All fields are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// An out-pass request as reported by the backend
///
/// `qr_code_data_url` is only present once the request is APPROVED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutPassRequest {
    pub id: String,
    pub reason: String,
    pub date_out: String,
    pub return_time: String,
    pub status: PassStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code_data_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl OutPassRequest {
    /// Default filename for a downloaded QR image
    pub fn qr_filename(&self) -> String {
        format!("outpass-{}.png", self.id)
    }

    /// Decode the QR data URL into PNG bytes, if one is attached
    pub fn qr_png(&self) -> ClientResult<Option<Vec<u8>>> {
        match &self.qr_code_data_url {
            None => Ok(None),
            Some(url) => decode_png_data_url(url).map(Some),
        }
    }
}

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

fn decode_png_data_url(url: &str) -> ClientResult<Vec<u8>> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let encoded = url
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or_else(|| ClientError::Decode("not a PNG data URL".to_string()))?;

    STANDARD
        .decode(encoded)
        .map_err(|e| ClientError::Decode(e.to_string()))
}

// ============================================
// Misc
// ============================================

/// Backend root banner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiStatus {
    pub message: String,
}

/// FastAPI-style error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_validation_rejects_blank_fields() {
        let draft = OutPassDraft {
            reason: "Medical".to_string(),
            date_out: "  ".to_string(),
            return_time: "2024-05-01T18:00".to_string(),
        };
        let err = draft.validate().unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(err.to_string(), "All fields are required");
    }

    #[test]
    fn test_draft_validation_accepts_complete_draft() {
        let draft = OutPassDraft {
            reason: "Medical".to_string(),
            date_out: "2024-05-01T09:00".to_string(),
            return_time: "2024-05-01T18:00".to_string(),
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let json = r#"{
            "id": "abc123",
            "reason": "Medical",
            "dateOut": "2024-05-01T09:00",
            "returnTime": "2024-05-01T18:00",
            "status": "PENDING",
            "extraField": "ignored"
        }"#;
        let req: OutPassRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.id, "abc123");
        assert_eq!(req.date_out, "2024-05-01T09:00");
        assert_eq!(req.status, PassStatus::Pending);
        assert!(req.qr_code_data_url.is_none());
    }

    #[test]
    fn test_status_uses_screaming_case() {
        let json = serde_json::to_string(&PassStatus::Approved).unwrap();
        assert_eq!(json, "\"APPROVED\"");
        let status: PassStatus = serde_json::from_str("\"REJECTED\"").unwrap();
        assert_eq!(status, PassStatus::Rejected);
    }

    #[test]
    fn test_register_profile_serializes_roll_no() {
        let profile = RegisterProfile {
            name: "Asha Rao".to_string(),
            roll_no: "22H51A0501".to_string(),
            email: "asha@hitam.org".to_string(),
            password: "pw".to_string(),
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("\"rollNo\":\"22H51A0501\""));
    }

    #[test]
    fn test_qr_filename() {
        let req = OutPassRequest {
            id: "42f1".to_string(),
            reason: "Medical".to_string(),
            date_out: "2024-05-01T09:00".to_string(),
            return_time: "2024-05-01T18:00".to_string(),
            status: PassStatus::Approved,
            qr_code_data_url: None,
            created_at: None,
        };
        assert_eq!(req.qr_filename(), "outpass-42f1.png");
    }

    #[test]
    fn test_qr_png_decodes_data_url() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        let png_magic = [0x89u8, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        let url = format!("data:image/png;base64,{}", STANDARD.encode(png_magic));

        let req = OutPassRequest {
            id: "42f1".to_string(),
            reason: "Medical".to_string(),
            date_out: "2024-05-01T09:00".to_string(),
            return_time: "2024-05-01T18:00".to_string(),
            status: PassStatus::Approved,
            qr_code_data_url: Some(url),
            created_at: None,
        };
        let bytes = req.qr_png().unwrap().unwrap();
        assert_eq!(&bytes, &png_magic);
    }

    #[test]
    fn test_qr_png_rejects_other_data_urls() {
        let req = OutPassRequest {
            id: "42f1".to_string(),
            reason: "Medical".to_string(),
            date_out: "2024-05-01T09:00".to_string(),
            return_time: "2024-05-01T18:00".to_string(),
            status: PassStatus::Approved,
            qr_code_data_url: Some("data:image/jpeg;base64,AAAA".to_string()),
            created_at: None,
        };
        assert!(matches!(req.qr_png(), Err(ClientError::Decode(_))));
    }
}
