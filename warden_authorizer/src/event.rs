//! Wire types for the API gateway's custom authorizer contract

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// The policy language version the gateway expects
pub const POLICY_VERSION: &str = "2012-10-17";

/// The only action an authorizer statement grants or denies
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// A token authorization request
///
/// The `Debug` implementation redacts the authorization token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerRequest {
    /// The authorizer type, `TOKEN` for bearer token authorizers
    #[serde(rename = "type", default)]
    pub kind: String,

    /// The raw value of the request's authorization header
    #[serde(default)]
    pub authorization_token: String,

    /// The ARN of the method being invoked
    #[serde(default)]
    pub method_arn: String,
}

impl AuthorizerRequest {
    /// A `TOKEN` request carrying `authorization_token` for `method_arn`
    pub fn token(authorization_token: impl Into<String>, method_arn: impl Into<String>) -> Self {
        Self {
            kind: "TOKEN".to_owned(),
            authorization_token: authorization_token.into(),
            method_arn: method_arn.into(),
        }
    }
}

impl fmt::Debug for AuthorizerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.authorization_token.is_empty() {
            ""
        } else {
            "***"
        };

        f.debug_struct("AuthorizerRequest")
            .field("kind", &self.kind)
            .field("authorization_token", &token)
            .field("method_arn", &self.method_arn)
            .finish()
    }
}

/// Whether a statement grants or withholds access
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Access is granted
    Allow,
    /// Access is withheld
    Deny,
}

impl Effect {
    /// The effect as it appears on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value in the auxiliary context passed downstream of the authorizer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// A string value
    String(String),
    /// A numeric value
    Number(i64),
    /// A boolean value
    Boolean(bool),
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for ContextValue {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// The auxiliary context attached to every response
pub type Context = BTreeMap<String, ContextValue>;

/// A single policy statement
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// The actions covered, always `execute-api:Invoke`
    pub action: Vec<String>,
    /// Whether the actions are allowed
    pub effect: Effect,
    /// The method ARN patterns covered
    pub resource: Vec<String>,
}

/// The IAM policy document embedded in a response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// The policy language version
    pub version: String,
    /// The statements of the policy
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// A document holding one invoke statement over `resources`
    pub fn invoke(effect: Effect, resources: Vec<String>) -> Self {
        Self {
            version: POLICY_VERSION.to_owned(),
            statement: vec![Statement {
                action: vec![INVOKE_ACTION.to_owned()],
                effect,
                resource: resources,
            }],
        }
    }
}

/// A token authorization response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    /// The principal the request is attributed to
    pub principal_id: String,

    /// The policy to apply; absent in a context-only response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_document: Option<PolicyDocument>,

    /// Auxiliary values passed to the integration
    #[serde(default)]
    pub context: Context,
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use serde_json::json;

    use super::*;

    #[test]
    fn request_uses_gateway_field_names() -> Result<()> {
        let request: AuthorizerRequest = serde_json::from_value(json!({
            "type": "TOKEN",
            "authorizationToken": "Bearer abc.def.ghi",
            "methodArn": "arn:aws:execute-api:us-east-1:123456789012:api/prod/GET/orders",
        }))?;

        assert_eq!(request.kind, "TOKEN");
        assert_eq!(request.authorization_token, "Bearer abc.def.ghi");
        assert!(request.method_arn.ends_with("/GET/orders"));
        Ok(())
    }

    #[test]
    fn request_debug_redacts_token() {
        let request = AuthorizerRequest::token("Bearer secret.token.value", "arn:x");
        let debug = format!("{request:?}");

        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
        assert!(debug.contains("arn:x"));
    }

    #[test]
    fn response_serializes_with_document() -> Result<()> {
        let response = AuthorizerResponse {
            principal_id: "user".to_owned(),
            policy_document: Some(PolicyDocument::invoke(Effect::Allow, vec!["*".to_owned()])),
            context: [
                ("stringKey".to_owned(), ContextValue::from("stringval")),
                ("numberKey".to_owned(), ContextValue::from(123)),
                ("booleanKey".to_owned(), ContextValue::from(true)),
            ]
            .into_iter()
            .collect(),
        };

        assert_eq!(
            serde_json::to_value(&response)?,
            json!({
                "principalId": "user",
                "policyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Action": ["execute-api:Invoke"],
                        "Effect": "Allow",
                        "Resource": ["*"],
                    }],
                },
                "context": {
                    "stringKey": "stringval",
                    "numberKey": 123,
                    "booleanKey": true,
                },
            })
        );
        Ok(())
    }

    #[test]
    fn context_only_response_omits_document() -> Result<()> {
        let response = AuthorizerResponse {
            principal_id: "user".to_owned(),
            policy_document: None,
            context: Context::new(),
        };

        assert_eq!(
            serde_json::to_value(&response)?,
            json!({"principalId": "user", "context": {}})
        );
        Ok(())
    }
}
