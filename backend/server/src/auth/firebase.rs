//! # Firebase
//!
//! ID tokens are RS256 JWTs signed by Google's `securetoken` keys. The key
//! set is cached for as long as its `Cache-Control: max-age` allows and is
//! refetched when a token names a key we have not seen.
//!
//! Custom claims go through the Identity Toolkit REST API, authorized with
//! an OAuth2 access token minted from the service account key (JWT bearer
//! grant). The access token is reused until shortly before it expires.
use std::{
    collections::HashMap,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
    jwk::JwkSet,
};
use reqwest::{Client, header::CACHE_CONTROL};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::{AuthError, AuthUser, ClaimsAdmin, TokenVerifier};

pub const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SCOPES: &str = "https://www.googleapis.com/auth/identitytoolkit https://www.googleapis.com/auth/firebase";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(60 * 60);
const LEEWAY_SECS: u64 = 60;
const MIN_KEY_REFRESH: Duration = Duration::from_secs(30);

/// The parts of a service account JSON key we need.
#[derive(Debug)]
pub struct ServiceAccount {
    pub project_id: Option<String>,
    pub client_email: String,
    pub private_key: SecretString,
    pub token_uri: String,
}

#[derive(Deserialize)]
struct RawServiceAccount {
    #[serde(default)]
    project_id: Option<String>,
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    scope: &'a str,
    iat: u64,
    exp: u64,
}

impl ServiceAccount {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawServiceAccount = serde_json::from_str(json)?;

        Ok(Self {
            project_id: raw.project_id,
            client_email: raw.client_email,
            private_key: SecretString::from(raw.private_key),
            token_uri: raw
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }

    /// Signed JWT exchanged for an access token at `token_uri`.
    fn assertion(&self, now: u64) -> Result<String, AuthError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            sub: &self.client_email,
            aud: &self.token_uri,
            scope: SCOPES,
            iat: now,
            exp: now + 3600,
        };

        let key = EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())
            .map_err(|e| AuthError::Provider(format!("service account key: {e}")))?;

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| AuthError::Provider(format!("signing assertion: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    iat: u64,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    admin: Option<bool>,
    #[serde(default)]
    auth_time: Option<u64>,
}

struct KeyCache {
    keys: HashMap<String, DecodingKey>,
    expires_at: Instant,
    refreshed_at: Option<Instant>,
}

impl KeyCache {
    /// Unknown key ids do not trigger another fetch this soon after the last.
    fn recently_refreshed(&self) -> bool {
        self.refreshed_at
            .is_some_and(|at| at.elapsed() < MIN_KEY_REFRESH)
    }
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct FirebaseAuth {
    project_id: String,
    http: Client,
    /// `None` pins the key set given at construction.
    jwks_url: Option<String>,
    identity_url: String,
    keys: RwLock<KeyCache>,
    service_account: Option<ServiceAccount>,
    access_token: Mutex<Option<CachedToken>>,
}

impl FirebaseAuth {
    pub fn new(project_id: &str, http: Client, service_account: Option<ServiceAccount>) -> Self {
        Self {
            project_id: project_id.to_string(),
            http,
            jwks_url: Some(JWKS_URL.to_string()),
            identity_url: IDENTITY_TOOLKIT_URL.to_string(),
            keys: RwLock::new(KeyCache {
                keys: HashMap::new(),
                expires_at: Instant::now(),
                refreshed_at: None,
            }),
            service_account,
            access_token: Mutex::new(None),
        }
    }

    /// Verifier with a fixed key set, never refreshed.
    pub fn with_static_keys(project_id: &str, keys: HashMap<String, DecodingKey>) -> Self {
        let mut auth = Self::new(project_id, Client::new(), None);
        auth.jwks_url = None;
        auth.keys = RwLock::new(KeyCache {
            keys,
            expires_at: Instant::now(),
            refreshed_at: None,
        });

        auth
    }

    pub fn with_jwks_url(mut self, url: &str) -> Self {
        self.jwks_url = Some(url.to_string());
        self
    }

    pub fn with_identity_url(mut self, url: &str) -> Self {
        self.identity_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn has_service_account(&self) -> bool {
        self.service_account.is_some()
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.keys.read().await;
            let fresh = self.jwks_url.is_none() || cache.expires_at > Instant::now();
            match cache.keys.get(kid) {
                Some(key) if fresh => return Ok(key.clone()),
                None if fresh && cache.recently_refreshed() => {
                    return Err(AuthError::InvalidToken(format!("unknown key id {kid}")));
                }
                _ => {}
            }
        }

        let Some(url) = &self.jwks_url else {
            return Err(AuthError::InvalidToken(format!("unknown key id {kid}")));
        };

        self.refresh_keys(url).await?;

        self.keys
            .read()
            .await
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown key id {kid}")))
    }

    async fn refresh_keys(&self, url: &str) -> Result<(), AuthError> {
        debug!("Refreshing Firebase signing keys");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AuthError::Provider(format!("fetching signing keys: {e}")))?;

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .and_then(max_age)
            .unwrap_or(DEFAULT_KEY_TTL);

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("decoding signing keys: {e}")))?;

        let keys: HashMap<String, DecodingKey> = set
            .keys
            .iter()
            .filter_map(|jwk| {
                let kid = jwk.common.key_id.clone()?;
                DecodingKey::from_jwk(jwk).ok().map(|key| (kid, key))
            })
            .collect();

        info!("Loaded {} Firebase signing keys", keys.len());

        let now = Instant::now();
        *self.keys.write().await = KeyCache {
            keys,
            expires_at: now + ttl,
            refreshed_at: Some(now),
        };

        Ok(())
    }

    async fn access_token(&self, account: &ServiceAccount) -> Result<String, AuthError> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.token.clone());
            }
        }

        let assertion = account.assertion(unix_now()?)?;

        let response = self
            .http
            .post(&account.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("token exchange: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!("token exchange {status}: {body}")));
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("token exchange: {e}")))?;

        *cached = Some(CachedToken {
            token: payload.access_token.clone(),
            expires_at: Instant::now()
                + Duration::from_secs(payload.expires_in.saturating_sub(LEEWAY_SECS)),
        });

        Ok(payload.access_token)
    }
}

#[async_trait]
impl TokenVerifier for FirebaseAuth {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let invalid = |e: jsonwebtoken::errors::Error| AuthError::InvalidToken(e.to_string());

        let header = decode_header(token).map_err(invalid)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("missing key id".to_string()))?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = LEEWAY_SECS;
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("{ISSUER_PREFIX}{}", self.project_id)]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        let claims = decode::<IdTokenClaims>(token, &key, &validation)
            .map_err(invalid)?
            .claims;

        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_string()));
        }

        let latest = unix_now()? + LEEWAY_SECS;
        if claims.iat > latest {
            return Err(AuthError::InvalidToken("issued in the future".to_string()));
        }
        if claims.auth_time.is_some_and(|auth_time| auth_time > latest) {
            return Err(AuthError::InvalidToken("auth_time in the future".to_string()));
        }

        Ok(AuthUser {
            uid: claims.sub,
            email: claims.email,
            admin: claims.admin.unwrap_or(false),
        })
    }
}

#[async_trait]
impl ClaimsAdmin for FirebaseAuth {
    async fn set_admin_claim(&self, uid: &str, admin: bool) -> Result<(), AuthError> {
        let account = self
            .service_account
            .as_ref()
            .ok_or(AuthError::NotConfigured)?;
        let token = self.access_token(account).await?;

        let url = format!(
            "{}/projects/{}/accounts:update",
            self.identity_url, self.project_id
        );
        let body = json!({
            "localId": uid,
            "customAttributes": json!({ "admin": admin }).to_string(),
        });

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("accounts:update: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.contains("USER_NOT_FOUND") {
                return Err(AuthError::UnknownUser(uid.to_string()));
            }
            return Err(AuthError::Provider(format!("accounts:update {status}: {body}")));
        }

        info!("Set admin={admin} for {uid}");
        Ok(())
    }
}

fn unix_now() -> Result<u64, AuthError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| AuthError::Provider(e.to_string()))
}

fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.parse().ok())
        .map(Duration::from_secs)
}
