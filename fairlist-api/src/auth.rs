//! Authentication and Authorization
//!
//! Bearer JWT verification for the two caller roles. Tokens are issued
//! elsewhere; `generate_jwt_token` exists for tooling and tests. Time claims
//! are checked against an injected [`JwtClock`] rather than by `jsonwebtoken`
//! so tests stay deterministic.

use crate::error::{ApiError, ApiResult};
use fairlist_core::{EntityId, UploaderKind, UploaderRef};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// CLOCK ABSTRACTION
// ============================================================================

/// Source of "now" for JWT time validation.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// JWT SECRET
// ============================================================================

/// JWT signing secret that never shows up in logs.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Wrap a secret. Empty secrets are rejected.
    pub fn new(secret: String) -> ApiResult<Self> {
        if secret.trim().is_empty() {
            return Err(ApiError::missing_field("jwt_secret"));
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value (only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }

    fn insecure_default() -> Self {
        Self(SecretString::new(INSECURE_DEFAULT_SECRET.to_string().into()))
    }
}

impl fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Secret for signing and verification
    pub jwt_secret: JwtSecret,

    /// JWT algorithm (default: HS256)
    pub jwt_algorithm: Algorithm,

    /// Lifetime of issued tokens in seconds (default: 1 day)
    pub jwt_expiration_secs: i64,

    /// Clock skew tolerance in seconds (default: 60)
    pub jwt_clock_skew_secs: i64,

    /// Deployment environment name, lowercased
    pub environment: String,

    /// Clock for JWT time validation (injected for testing)
    pub clock: Arc<dyn JwtClock>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("environment", &self.environment)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: JwtSecret::insecure_default(),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 86400,
            jwt_clock_skew_secs: 60,
            environment: "development".to_string(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `FAIRLIST_JWT_SECRET`: JWT signing secret
    /// - `FAIRLIST_JWT_ALGORITHM`: `HS256` | `HS384` | `HS512` (default: HS256)
    /// - `FAIRLIST_JWT_EXPIRATION_SECS`: Token lifetime (default: 86400)
    /// - `FAIRLIST_JWT_CLOCK_SKEW_SECS`: Clock skew tolerance (default: 60)
    /// - `FAIRLIST_ENVIRONMENT`: `development` | `production` (default: development)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let jwt_secret = std::env::var("FAIRLIST_JWT_SECRET")
            .ok()
            .and_then(|s| JwtSecret::new(s).ok())
            .unwrap_or(defaults.jwt_secret);

        let jwt_algorithm = std::env::var("FAIRLIST_JWT_ALGORITHM")
            .ok()
            .and_then(|s| parse_hmac_algorithm(&s))
            .unwrap_or(defaults.jwt_algorithm);

        Self {
            jwt_secret,
            jwt_algorithm,
            jwt_expiration_secs: std::env::var("FAIRLIST_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_expiration_secs),
            jwt_clock_skew_secs: std::env::var("FAIRLIST_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_clock_skew_secs),
            environment: std::env::var("FAIRLIST_ENVIRONMENT")
                .map(|s| s.trim().to_lowercase())
                .unwrap_or(defaults.environment),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production" || self.environment == "prod"
    }

    /// Refuse to start in production with a weak secret. Development only warns.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        let is_production = self.is_production();

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::invalid_input(
                    "Cannot start server in production with insecure JWT secret. \
                     Set FAIRLIST_JWT_SECRET to a secure value.",
                ));
            }
            tracing::warn!(
                "Using insecure default JWT secret. Set FAIRLIST_JWT_SECRET before deploying."
            );
        } else if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "JWT secret is too short for production use ({} chars). \
                     It must be at least 32 characters long.",
                    self.jwt_secret.len()
                )));
            }
            tracing::warn!(
                chars = self.jwt_secret.len(),
                "JWT secret is short; use at least 32 characters in production"
            );
        }

        Ok(())
    }
}

/// Only HMAC algorithms make sense with a shared secret.
fn parse_hmac_algorithm(value: &str) -> Option<Algorithm> {
    match Algorithm::from_str(value.trim()).ok()? {
        alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) => Some(alg),
        _ => None,
    }
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

/// Caller role carried in the `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Agent => "agent",
        }
    }

    /// Uploads record the role verbatim as the uploader discriminator.
    pub fn uploader_kind(&self) -> UploaderKind {
        match self {
            Role::Admin => UploaderKind::Admin,
            Role::Agent => UploaderKind::Agent,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (admin or agent id)
    pub sub: EntityId,

    pub role: Role,

    #[serde(default)]
    pub email: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn new(sub: EntityId, role: Role, expiration_secs: i64, clock: &dyn JwtClock) -> Self {
        let now = clock.now_epoch_secs();
        Self {
            sub,
            role,
            email: None,
            iat: now,
            exp: now + expiration_secs,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn is_expired(&self, clock: &dyn JwtClock) -> bool {
        self.exp < clock.now_epoch_secs()
    }
}

// ============================================================================
// AUTHENTICATION CONTEXT
// ============================================================================

/// Verified caller identity, injected into request extensions by the
/// auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: EntityId,
    pub role: Role,
    pub email: Option<String>,
}

impl AuthContext {
    pub fn new(user_id: EntityId, role: Role) -> Self {
        Self {
            user_id,
            role,
            email: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }

    /// The uploader reference stamped on entries this caller uploads.
    pub fn uploader(&self) -> UploaderRef {
        UploaderRef::new(self.role.uploader_kind(), self.user_id)
    }

    pub fn require_admin(&self) -> ApiResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Access denied. Admin only."))
        }
    }

    pub fn require_agent(&self) -> ApiResult<()> {
        if self.is_agent() {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "Access denied. This endpoint is for agents only.",
            ))
        }
    }
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            email: claims.email,
        }
    }
}

// ============================================================================
// AUTHENTICATION FUNCTIONS
// ============================================================================

fn validate_claim_times(now: i64, exp: i64, leeway_secs: i64) -> ApiResult<()> {
    if exp < now - leeway_secs {
        return Err(ApiError::token_expired());
    }
    Ok(())
}

/// Validate a JWT token and extract claims.
///
/// `jsonwebtoken` checks the signature only; expiry is checked here against
/// the configured clock.
pub fn validate_jwt_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = std::collections::HashSet::from(["exp".to_string()]);

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidToken => {
                ApiError::invalid_token("Token is invalid")
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
        })?;

    let claims = token_data.claims;
    let now = config.clock.now_epoch_secs();
    if now < 0 {
        tracing::error!(timestamp = now, "System clock returned pre-epoch time");
        return Err(ApiError::internal_error("Server time configuration error"));
    }

    validate_claim_times(now, claims.exp, config.jwt_clock_skew_secs)?;
    Ok(claims)
}

/// Issue a token for a caller.
pub fn generate_jwt_token(
    config: &AuthConfig,
    user_id: EntityId,
    role: Role,
    email: Option<String>,
) -> ApiResult<String> {
    let mut claims = Claims::new(user_id, role, config.jwt_expiration_secs, &*config.clock);
    claims.email = email;

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// Authenticate an `Authorization` header value.
pub fn authenticate(config: &AuthConfig, auth_header: Option<&str>) -> ApiResult<AuthContext> {
    let header = auth_header
        .ok_or_else(|| ApiError::unauthorized("Authentication required: provide Authorization header"))?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::invalid_token("Authorization header must use Bearer scheme"))?;

    validate_jwt_token(config, token).map(AuthContext::from)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use fairlist_core::new_entity_id;

    /// 2024-01-01 00:00:00 UTC
    const VALID_NOW: i64 = 1704067200;
    /// 2030-01-01 00:00:00 UTC
    const FUTURE: i64 = 1893456000;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: JwtSecret::new("test_secret".to_string()).unwrap(),
            clock: Arc::new(FixedClock(VALID_NOW)),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_jwt_generation_and_validation() -> ApiResult<()> {
        let config = test_config();
        let user_id = new_entity_id();

        let token = generate_jwt_token(&config, user_id, Role::Agent, Some("a@x.io".into()))?;
        let claims = validate_jwt_token(&config, &token)?;

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Agent);
        assert_eq!(claims.email.as_deref(), Some("a@x.io"));
        assert!(!claims.is_expired(&FixedClock(VALID_NOW)));
        Ok(())
    }

    #[test]
    fn test_expired_token() -> ApiResult<()> {
        let mut config = test_config();
        let token = generate_jwt_token(&config, new_entity_id(), Role::Admin, None)?;

        config.clock = Arc::new(FixedClock(FUTURE));
        let err = validate_jwt_token(&config, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
        Ok(())
    }

    #[test]
    fn test_clock_skew_is_tolerated() -> ApiResult<()> {
        let mut config = test_config();
        config.jwt_expiration_secs = 10;
        let token = generate_jwt_token(&config, new_entity_id(), Role::Admin, None)?;

        config.clock = Arc::new(FixedClock(VALID_NOW + 10 + 30));
        assert!(validate_jwt_token(&config, &token).is_ok());
        Ok(())
    }

    #[test]
    fn test_wrong_secret_rejected() -> ApiResult<()> {
        let config = test_config();
        let token = generate_jwt_token(&config, new_entity_id(), Role::Admin, None)?;

        let other = AuthConfig {
            jwt_secret: JwtSecret::new("other_secret".to_string())?,
            ..test_config()
        };
        let err = validate_jwt_token(&other, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
        Ok(())
    }

    #[test]
    fn test_authenticate_header_forms() -> ApiResult<()> {
        let config = test_config();
        let user_id = new_entity_id();
        let token = generate_jwt_token(&config, user_id, Role::Admin, None)?;

        let ctx = authenticate(&config, Some(&format!("Bearer {}", token)))?;
        assert_eq!(ctx, AuthContext::new(user_id, Role::Admin));

        assert_eq!(
            authenticate(&config, None).unwrap_err().code,
            ErrorCode::Unauthorized
        );
        assert_eq!(
            authenticate(&config, Some(&format!("Basic {}", token)))
                .unwrap_err()
                .code,
            ErrorCode::InvalidToken
        );
        assert_eq!(
            authenticate(&config, Some("Bearer ")).unwrap_err().code,
            ErrorCode::InvalidToken
        );
        Ok(())
    }

    #[test]
    fn test_role_guards() {
        let admin = AuthContext::new(new_entity_id(), Role::Admin);
        let agent = AuthContext::new(new_entity_id(), Role::Agent);

        assert!(admin.require_admin().is_ok());
        assert!(agent.require_agent().is_ok());

        let err = agent.require_admin().unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(err.message, "Access denied. Admin only.");

        let err = admin.require_agent().unwrap_err();
        assert_eq!(err.message, "Access denied. This endpoint is for agents only.");
    }

    #[test]
    fn test_uploader_follows_role() {
        let id = new_entity_id();
        assert_eq!(
            AuthContext::new(id, Role::Admin).uploader(),
            UploaderRef::Admin(id)
        );
        assert_eq!(
            AuthContext::new(id, Role::Agent).uploader(),
            UploaderRef::Agent(id)
        );
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = JwtSecret::new("super-secret-value".to_string()).unwrap();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("REDACTED"));
        assert!(JwtSecret::new("   ".to_string()).is_err());
    }

    #[test]
    fn test_production_refuses_default_secret() {
        let config = AuthConfig {
            environment: "production".to_string(),
            ..AuthConfig::default()
        };
        assert!(config.validate_for_production().is_err());

        let short = AuthConfig {
            jwt_secret: JwtSecret::new("short".to_string()).unwrap(),
            environment: "production".to_string(),
            ..AuthConfig::default()
        };
        assert!(short.validate_for_production().is_err());

        assert!(AuthConfig::default().validate_for_production().is_ok());
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!(parse_hmac_algorithm("HS512"), Some(Algorithm::HS512));
        assert_eq!(parse_hmac_algorithm("RS256"), None);
        assert_eq!(parse_hmac_algorithm("nope"), None);
    }
}
