use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Request verifikasi magic link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MagicLinkVerifyRequest {
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CustomerInfo {
    #[serde(default, alias = "phoneNumber", alias = "customer_phone")]
    pub phone: Option<String>,
}

// Session yang diberikan backend setelah magic link valid
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionGrant {
    #[serde(rename = "sessionToken", alias = "session_token", alias = "token")]
    pub session_token: String,
    #[serde(default)]
    pub customer: Option<CustomerInfo>,
}

impl SessionGrant {
    pub fn phone(&self) -> Option<&str> {
        self.customer
            .as_ref()
            .and_then(|c| c.phone.as_deref())
            .filter(|p| !p.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_grant_parsing() {
        let grant: SessionGrant = serde_json::from_str(
            r#"{"sessionToken":"tok-1","customer":{"phone":"081234567890"}}"#,
        )
        .unwrap();
        assert_eq!(grant.session_token, "tok-1");
        assert_eq!(grant.phone(), Some("081234567890"));

        let grant: SessionGrant = serde_json::from_str(r#"{"sessionToken":"tok-2"}"#).unwrap();
        assert_eq!(grant.phone(), None);
    }
}
