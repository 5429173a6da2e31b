//! Agent and sub-agent request types

use fairlist_storage::RecipientUpdate;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Request to create an agent or sub-agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CreateRecipientRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile_number: String,
}

impl CreateRecipientRequest {
    /// Trimmed copy, failing if any field is blank. Emails are compared
    /// lowercased.
    pub fn normalized(&self) -> ApiResult<Self> {
        let name = self.name.trim();
        let email = self.email.trim();
        let mobile_number = self.mobile_number.trim();
        if name.is_empty() || email.is_empty() || mobile_number.is_empty() {
            return Err(ApiError::validation_failed(
                "Please provide all required fields",
            ));
        }
        Ok(Self {
            name: name.to_string(),
            email: email.to_lowercase(),
            mobile_number: mobile_number.to_string(),
        })
    }
}

/// Partial update for an agent or sub-agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecipientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
}

impl UpdateRecipientRequest {
    /// Blank fields are treated as absent.
    pub fn into_update(self) -> RecipientUpdate {
        fn present(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        RecipientUpdate {
            name: present(self.name),
            email: present(self.email).map(|e| e.to_lowercase()),
            mobile_number: present(self.mobile_number),
            is_active: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_requires_every_field() {
        let req = CreateRecipientRequest {
            name: "Ann".into(),
            email: " ".into(),
            mobile_number: "1".into(),
        };
        let err = req.normalized().unwrap_err();
        assert_eq!(err.message, "Please provide all required fields");
    }

    #[test]
    fn test_create_request_normalizes() {
        let req: CreateRecipientRequest = serde_json::from_value(serde_json::json!({
            "name": " Ann ", "email": "Ann@X.io", "mobileNumber": "+1 555"
        }))
        .unwrap();
        let req = req.normalized().unwrap();
        assert_eq!(req.name, "Ann");
        assert_eq!(req.email, "ann@x.io");
        assert_eq!(req.mobile_number, "+1 555");
    }

    #[test]
    fn test_update_ignores_blank_fields() {
        let update = UpdateRecipientRequest {
            name: Some("  ".into()),
            email: Some("NEW@x.io".into()),
            mobile_number: None,
        }
        .into_update();
        assert_eq!(update.name, None);
        assert_eq!(update.email.as_deref(), Some("new@x.io"));
        assert_eq!(update.is_active, None);
    }
}
