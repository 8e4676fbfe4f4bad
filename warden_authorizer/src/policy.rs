//! Turning validation outcomes into gateway policies

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use warden_oauth2::{ScopeToken, ValidatedClaims};

use crate::{
    event::{AuthorizerResponse, Context, ContextValue, Effect, PolicyDocument},
    AuthorizerError,
};

/// The resource pattern matching every method under the caller's API
pub const WILDCARD_RESOURCE: &str = "*";

/// The principal attributed to requests when none is derived from the token
pub const DEFAULT_PRINCIPAL: &str = "user";

/// The auxiliary context attached to every decision by default
#[must_use]
pub fn default_context() -> Context {
    [
        ("stringKey", ContextValue::from("stringval")),
        ("numberKey", ContextValue::from(123)),
        ("booleanKey", ContextValue::from(true)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v))
    .collect()
}

/// The policy statement of a decision
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyStatement {
    effect: Effect,
    resources: Vec<String>,
}

impl PolicyStatement {
    /// Whether the statement grants access
    #[must_use]
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// The resource patterns covered
    #[must_use]
    pub fn resources(&self) -> &[String] {
        &self.resources
    }
}

/// A decision on an authorization request
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct PolicyDecision {
    principal_id: String,
    statement: Option<PolicyStatement>,
    context: Context,
}

impl PolicyDecision {
    /// Constructs a decision, embedding a policy only when both an effect
    /// and at least one resource are given
    ///
    /// Without either, the decision carries only the principal and context.
    pub fn new(
        principal_id: impl Into<String>,
        effect: Option<Effect>,
        resources: Vec<String>,
        context: Context,
    ) -> Self {
        let statement = match effect {
            Some(effect) if !resources.is_empty() => Some(PolicyStatement { effect, resources }),
            _ => None,
        };

        Self {
            principal_id: principal_id.into(),
            statement,
            context,
        }
    }

    /// Allows invocation of every resource
    pub fn allow_all(principal_id: impl Into<String>, context: Context) -> Self {
        Self::new(
            principal_id,
            Some(Effect::Allow),
            vec![WILDCARD_RESOURCE.to_owned()],
            context,
        )
    }

    /// Denies invocation of every resource
    pub fn deny_all(principal_id: impl Into<String>, context: Context) -> Self {
        Self::new(
            principal_id,
            Some(Effect::Deny),
            vec![WILDCARD_RESOURCE.to_owned()],
            context,
        )
    }

    /// The principal the request is attributed to
    #[must_use]
    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    /// The embedded statement, absent in a context-only decision
    #[must_use]
    pub fn statement(&self) -> Option<&PolicyStatement> {
        self.statement.as_ref()
    }

    /// The effect of the embedded statement
    #[must_use]
    pub fn effect(&self) -> Option<Effect> {
        self.statement.as_ref().map(PolicyStatement::effect)
    }

    /// Whether the decision grants access
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.effect() == Some(Effect::Allow)
    }

    /// The auxiliary context
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl From<PolicyDecision> for AuthorizerResponse {
    fn from(decision: PolicyDecision) -> Self {
        Self {
            principal_id: decision.principal_id,
            policy_document: decision
                .statement
                .map(|s| PolicyDocument::invoke(s.effect, s.resources)),
            context: decision.context,
        }
    }
}

/// How a validated token maps to a principal and the resources it may
/// invoke
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum PolicyStrategy {
    /// Every valid token is attributed to one principal and may invoke
    /// every resource
    CoarseWildcard {
        /// The principal attributed to every request
        principal: String,
    },

    /// The principal is the token subject, and each granted scope token
    /// unlocks a set of resources
    ///
    /// A token whose scope unlocks nothing is denied.
    RoleBased {
        /// The principal used when the token has no subject, and for
        /// denials
        fallback_principal: String,
        /// The resource patterns unlocked by each scope token
        roles: BTreeMap<ScopeToken, Vec<String>>,
    },
}

impl Default for PolicyStrategy {
    fn default() -> Self {
        Self::CoarseWildcard {
            principal: DEFAULT_PRINCIPAL.to_owned(),
        }
    }
}

impl PolicyStrategy {
    fn principal_for(&self, claims: Option<&ValidatedClaims>) -> String {
        match self {
            Self::CoarseWildcard { principal } => principal.clone(),
            Self::RoleBased {
                fallback_principal, ..
            } => claims
                .and_then(ValidatedClaims::subject)
                .map_or_else(|| fallback_principal.clone(), |s| s.as_str().to_owned()),
        }
    }
}

/// Produces policy decisions from validation outcomes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyEngine {
    strategy: PolicyStrategy,
    context: Context,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(PolicyStrategy::default())
    }
}

impl PolicyEngine {
    /// An engine applying `strategy` with the default context
    pub fn new(strategy: PolicyStrategy) -> Self {
        Self {
            strategy,
            context: default_context(),
        }
    }

    /// Replaces the context attached to every decision
    #[must_use]
    pub fn with_context(self, context: Context) -> Self {
        Self { context, ..self }
    }

    /// The strategy in use
    pub fn strategy(&self) -> &PolicyStrategy {
        &self.strategy
    }

    /// Decides on a validation outcome
    ///
    /// A failed validation is always denied over every resource. The
    /// failure reason is not reflected in the decision.
    pub fn decide(&self, outcome: Result<&ValidatedClaims, &AuthorizerError>) -> PolicyDecision {
        let claims = match outcome {
            Ok(claims) => claims,
            Err(_) => {
                return PolicyDecision::deny_all(
                    self.strategy.principal_for(None),
                    self.context.clone(),
                )
            }
        };

        let principal = self.strategy.principal_for(Some(claims));

        match &self.strategy {
            PolicyStrategy::CoarseWildcard { .. } => {
                PolicyDecision::allow_all(principal, self.context.clone())
            }
            PolicyStrategy::RoleBased { roles, .. } => {
                let resources: BTreeSet<&str> = claims
                    .scope()
                    .iter()
                    .filter_map(|token| roles.get(token))
                    .flatten()
                    .map(String::as_str)
                    .collect();

                if resources.is_empty() {
                    tracing::debug!(
                        scope = %claims.scope(),
                        "granted scope unlocks no resources"
                    );
                    return PolicyDecision::deny_all(principal, self.context.clone());
                }

                PolicyDecision::new(
                    principal,
                    Some(Effect::Allow),
                    resources.into_iter().map(str::to_owned).collect(),
                    self.context.clone(),
                )
            }
        }
    }
}
