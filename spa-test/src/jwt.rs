use std::sync::OnceLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Map, Value};

pub const DEFAULT_ISSUER: &str = "https://idp.test/realms/spa";
pub const DEFAULT_AUDIENCE: &str = "spa";
pub const DEFAULT_KID: &str = "test-key";

struct TestKey {
    encoding: EncodingKey,
    n: String,
    e: String,
    n_raw: Vec<u8>,
    e_raw: Vec<u8>,
}

/// One RSA-2048 key per test process; generation is slow in debug builds.
fn test_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 2048)
            .expect("failed to generate RSA test key");
        let pem = private
            .to_pkcs1_pem(LineEnding::LF)
            .expect("failed to encode RSA test key");
        let encoding =
            EncodingKey::from_rsa_pem(pem.as_bytes()).expect("invalid RSA test key PEM");
        let n_raw = private.n().to_bytes_be();
        let e_raw = private.e().to_bytes_be();
        TestKey {
            encoding,
            n: URL_SAFE_NO_PAD.encode(&n_raw),
            e: URL_SAFE_NO_PAD.encode(&e_raw),
            n_raw,
            e_raw,
        }
    })
}

/// RS256 token signer for tests, with a matching JWKS.
///
/// ```ignore
/// let jwt = TestJwt::new().with_issuer(provider.issuer());
/// let token = jwt.token();
/// let expired = jwt.claims().expires_in(-60).build();
/// ```
#[derive(Debug, Clone)]
pub struct TestJwt {
    issuer: String,
    audience: String,
    kid: String,
}

impl Default for TestJwt {
    fn default() -> Self {
        Self::new()
    }
}

impl TestJwt {
    pub fn new() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            kid: DEFAULT_KID.to_string(),
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = kid.into();
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// A valid token for `test-user` in group `admins`, expiring in an hour.
    pub fn token(&self) -> String {
        self.claims().build()
    }

    /// Start from the default valid claims.
    pub fn claims(&self) -> TokenBuilder<'_> {
        let now = get_current_timestamp() as i64;
        let mut claims = Map::new();
        claims.insert("iss".into(), json!(self.issuer));
        claims.insert("aud".into(), json!(self.audience));
        claims.insert("sub".into(), json!("0b8c4e2a-test-user"));
        claims.insert("iat".into(), json!(now));
        claims.insert("exp".into(), json!(now + 3600));
        claims.insert("preferred_username".into(), json!("test-user"));
        claims.insert("groups".into(), json!(["admins"]));
        TokenBuilder {
            jwt: self,
            claims,
            kid: Some(self.kid.clone()),
        }
    }

    /// JWKS document publishing the signing key under this signer's `kid`.
    pub fn jwks(&self) -> Value {
        let key = test_key();
        json!({
            "keys": [{
                "kid": self.kid,
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "n": key.n,
                "e": key.e,
            }]
        })
    }

    /// Verifying key for the signing key, for validators that skip JWKS.
    pub fn decoding_key(&self) -> DecodingKey {
        let key = test_key();
        DecodingKey::from_rsa_raw_components(&key.n_raw, &key.e_raw)
    }
}

/// Claim overrides for a single token.
pub struct TokenBuilder<'a> {
    jwt: &'a TestJwt,
    claims: Map<String, Value>,
    kid: Option<String>,
}

impl TokenBuilder<'_> {
    pub fn username(self, username: &str) -> Self {
        self.claim("preferred_username", username)
    }

    pub fn groups(self, groups: &[&str]) -> Self {
        self.claim("groups", json!(groups))
    }

    /// Set `exp` relative to now; negative values give an expired token.
    pub fn expires_in(self, secs: i64) -> Self {
        let now = get_current_timestamp() as i64;
        self.claim("exp", now + secs)
    }

    pub fn claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.claims.insert(name.to_string(), value.into());
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    pub fn kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    pub fn without_kid(mut self) -> Self {
        self.kid = None;
        self
    }

    /// Sign the claims with RS256.
    pub fn build(self) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.kid;
        encode(&header, &Value::Object(self.claims), &test_key().encoding)
            .unwrap_or_else(|e| panic!("failed to sign test token for {}: {e}", self.jwt.issuer))
    }
}
