use serde_json::{Map, Value};

use crate::error::SecurityError;

/// Claims of a validated token handed to authenticated actions.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    /// `preferred_username`.
    pub username: String,
    /// String entries of the `groups` claim.
    pub groups: Vec<String>,
    /// The full claim object.
    pub raw: Map<String, Value>,
}

impl TokenClaims {
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.raw.get(claim)
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

fn fail(msg: &str) -> SecurityError {
    SecurityError::Claim(msg.to_string())
}

fn numeric(claims: &Map<String, Value>, name: &str) -> Result<Option<f64>, SecurityError> {
    match claims.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| SecurityError::Claim(format!("invalid {name} claim"))),
    }
}

/// Check the claims of a signature-verified token, in order:
/// `exp`, `nbf`, `iat`, `iss`, `aud`, `preferred_username`, `groups`.
/// The first violation is returned.
///
/// Membership in `groups` is not checked, only its presence.
pub fn check_claims(
    claims: Value,
    issuer: &str,
    audience: &str,
    now: u64,
) -> Result<TokenClaims, SecurityError> {
    let Value::Object(raw) = claims else {
        return Err(fail("claims are not an object"));
    };
    let now = now as f64;

    match numeric(&raw, "exp")? {
        Some(exp) if now < exp => {}
        _ => return Err(fail("token has expired")),
    }
    if let Some(nbf) = numeric(&raw, "nbf")? {
        if now < nbf {
            return Err(fail("token is not yet valid"));
        }
    }
    if let Some(iat) = numeric(&raw, "iat")? {
        if now < iat {
            return Err(fail("token issued in the future"));
        }
    }

    if raw.get("iss").and_then(Value::as_str) != Some(issuer) {
        return Err(fail("invalid issuer"));
    }

    let audience_ok = match raw.get("aud") {
        Some(Value::String(aud)) => aud == audience,
        Some(Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(audience)),
        _ => false,
    };
    if !audience_ok {
        return Err(fail("invalid audience"));
    }

    let username = raw
        .get("preferred_username")
        .and_then(Value::as_str)
        .ok_or_else(|| fail("username not found"))?
        .to_string();

    let groups = raw
        .get("groups")
        .and_then(Value::as_array)
        .ok_or_else(|| fail("groups claim not found or invalid"))?
        .iter()
        .filter_map(|g| g.as_str().map(str::to_string))
        .collect();

    Ok(TokenClaims {
        username,
        groups,
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: u64 = 1_700_000_000;

    fn base() -> Value {
        json!({
            "iss": "https://idp",
            "aud": "spa",
            "exp": NOW + 60,
            "iat": NOW - 10,
            "preferred_username": "alice",
            "groups": ["admins", "dev"]
        })
    }

    fn check(claims: Value) -> Result<TokenClaims, SecurityError> {
        check_claims(claims, "https://idp", "spa", NOW)
    }

    fn message(claims: Value) -> String {
        check(claims).unwrap_err().to_string()
    }

    #[test]
    fn valid_claims() {
        let claims = check(base()).unwrap();
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.groups, vec!["admins", "dev"]);
        assert!(claims.in_group("admins"));
        assert_eq!(claims.get("iss"), Some(&json!("https://idp")));
    }

    #[test]
    fn missing_exp_is_expired() {
        let mut c = base();
        c.as_object_mut().unwrap().remove("exp");
        assert_eq!(message(c), "token has expired");
    }

    #[test]
    fn exp_equal_to_now_is_expired() {
        let mut c = base();
        c["exp"] = json!(NOW);
        assert_eq!(message(c), "token has expired");
    }

    #[test]
    fn nbf_in_future() {
        let mut c = base();
        c["nbf"] = json!(NOW + 5);
        assert_eq!(message(c), "token is not yet valid");
    }

    #[test]
    fn iat_in_future() {
        let mut c = base();
        c["iat"] = json!(NOW + 5);
        assert_eq!(message(c), "token issued in the future");
    }

    #[test]
    fn wrong_issuer() {
        let mut c = base();
        c["iss"] = json!("https://other");
        assert_eq!(message(c), "invalid issuer");
    }

    #[test]
    fn audience_list_contains() {
        let mut c = base();
        c["aud"] = json!(["account", "spa"]);
        assert!(check(c).is_ok());
    }

    #[test]
    fn wrong_audience() {
        let mut c = base();
        c["aud"] = json!(["account"]);
        assert_eq!(message(c), "invalid audience");
    }

    #[test]
    fn expiry_checked_before_audience() {
        let mut c = base();
        c["exp"] = json!(NOW - 1);
        c["aud"] = json!("other");
        assert_eq!(message(c), "token has expired");
    }

    #[test]
    fn missing_username() {
        let mut c = base();
        c.as_object_mut().unwrap().remove("preferred_username");
        assert_eq!(message(c), "username not found");
    }

    #[test]
    fn groups_must_be_a_list() {
        let mut c = base();
        c["groups"] = json!("admins");
        assert_eq!(message(c), "groups claim not found or invalid");
    }

    #[test]
    fn empty_groups_accepted() {
        let mut c = base();
        c["groups"] = json!([]);
        assert!(check(c).unwrap().groups.is_empty());
    }
}
