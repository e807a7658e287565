//! End-user claims (OIDC Core §5.1).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Postal address claim (OIDC Core §5.1.1).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressClaim {
    /// Full mailing address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    /// Street address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    /// City or locality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    /// State, province or region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Zip or postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Country name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Standard claims. Unset claims are omitted from ID tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardClaim {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// `YYYY-MM-DD` or `YYYY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<String>,
    /// IANA time zone name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoneinfo: Option<String>,
    /// BCP 47 language tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// E.164 phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressClaim>,
    /// Last profile update (epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// Claims known about one end user of one issuer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserClaimSet {
    /// Standard claims.
    #[serde(default)]
    pub standard_claim: StandardClaim,
    /// Deployment-specific claims.
    #[serde(default)]
    pub custom_claim: Map<String, Value>,
}

impl UserClaimSet {
    /// Creates a claim set with standard claims only.
    #[must_use]
    pub fn new(standard_claim: StandardClaim) -> Self {
        Self {
            standard_claim,
            custom_claim: Map::new(),
        }
    }

    /// Adds a custom claim.
    #[must_use]
    pub fn with_custom_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_claim.insert(name.into(), value.into());
        self
    }

    /// Flattens the standard and custom claims into one JSON object.
    ///
    /// Standard claims win over custom claims of the same name.
    #[must_use]
    pub fn to_claims(&self) -> Map<String, Value> {
        let mut claims = self.custom_claim.clone();
        if let Ok(Value::Object(standard)) = serde_json::to_value(&self.standard_claim) {
            claims.extend(standard);
        }
        claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_claims_are_omitted() {
        let claims = StandardClaim {
            email: Some("alice@example.com".to_string()),
            email_verified: Some(true),
            ..StandardClaim::default()
        };

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "email": "alice@example.com",
                "email_verified": true,
            })
        );
    }

    #[test]
    fn test_to_claims_merges_custom_claims() {
        let set = UserClaimSet::new(StandardClaim {
            name: Some("Alice".to_string()),
            address: Some(AddressClaim {
                country: Some("JP".to_string()),
                ..AddressClaim::default()
            }),
            ..StandardClaim::default()
        })
        .with_custom_claim("department", "research")
        .with_custom_claim("name", "ignored");

        let claims = set.to_claims();
        assert_eq!(claims["name"], "Alice");
        assert_eq!(claims["department"], "research");
        assert_eq!(claims["address"]["country"], "JP");
    }
}
