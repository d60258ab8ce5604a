//! Bearer-token verification.
//!
//! Gates run in a fixed order and stop at the first failure:
//! structure, expiry, issuer, subject, audience, signing key, algorithm,
//! signature. Claim checks run before any network I/O so that obviously bad
//! tokens never cause a JWKS fetch.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::keys::SigningKeyResolver;
use crate::config::AlgorithmPolicy;

/// Subject claim names, checked in order. `user_id` and `uid` are issued by
/// older tenants of the authorization server.
pub const SUBJECT_CLAIMS: [&str; 3] = ["sub", "user_id", "uid"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("missing subject")]
    MissingSubject,
    #[error("invalid audience")]
    InvalidAudience,
    #[error("signing key not found")]
    KeyNotFound,
    #[error("signature verification failed")]
    SignatureInvalid,
}

/// Identity established by a successfully verified token.
#[derive(Clone)]
pub struct VerifiedIdentity {
    pub token: String,
    pub issuer: String,
    pub subject: String,
    pub client_id: Option<String>,
    /// `None` when the token carries no scope claim at all.
    pub scopes: Option<Vec<String>>,
    pub claims: Map<String, Value>,
}

impl std::fmt::Debug for VerifiedIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the raw token
        f.debug_struct("VerifiedIdentity")
            .field("token", &fingerprint(&self.token))
            .field("issuer", &self.issuer)
            .field("subject", &self.subject)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawHeader {
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub kid: Option<String>,
}

/// A token split into its parts, nothing trusted yet.
pub(crate) struct UnverifiedToken<'a> {
    pub header: RawHeader,
    pub claims: Map<String, Value>,
    pub signing_input: &'a str,
    pub signature: &'a str,
}

/// Structural decode without signature verification.
///
/// The header is parsed leniently (a missing `alg` is not a decode error here;
/// the algorithm policy decides that later).
pub(crate) fn decode_unverified(token: &str) -> Result<UnverifiedToken<'_>, TokenError> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    let header: RawHeader = decode_segment(header)?;
    let claims: Map<String, Value> = decode_segment(payload)?;
    let signing_input = &token[..token.len() - signature.len() - 1];

    Ok(UnverifiedToken {
        header,
        claims,
        signing_input,
        signature,
    })
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

/// `exp` is enforced when present. A token without `exp` passes this gate.
pub(crate) fn check_expiry(claims: &Map<String, Value>, leeway: u64) -> Result<(), TokenError> {
    let Some(exp) = claims.get("exp") else {
        return Ok(());
    };
    let exp = exp
        .as_i64()
        .or_else(|| exp.as_f64().map(|v| v as i64))
        .ok_or(TokenError::Malformed)?;
    let now = Utc::now().timestamp();
    if exp.saturating_add(leeway as i64) < now {
        return Err(TokenError::Expired);
    }
    Ok(())
}

fn check_issuer(claims: &Map<String, Value>, expected: &str) -> Result<String, TokenError> {
    match claims.get("iss").and_then(Value::as_str) {
        Some(iss) if iss == expected => Ok(iss.to_string()),
        _ => Err(TokenError::InvalidIssuer),
    }
}

fn extract_subject(claims: &Map<String, Value>) -> Result<String, TokenError> {
    SUBJECT_CLAIMS
        .iter()
        .filter_map(|name| claims.get(*name))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .ok_or(TokenError::MissingSubject)
}

fn check_audience(claims: &Map<String, Value>, expected: &str) -> Result<(), TokenError> {
    let ok = match claims.get("aud") {
        Some(Value::String(aud)) => aud == expected,
        Some(Value::Array(auds)) => auds.iter().any(|v| v.as_str() == Some(expected)),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(TokenError::InvalidAudience)
    }
}

/// Scope collection from `scope`, falling back to `scopes`. Either may be a
/// space-delimited string or an array of strings.
pub(crate) fn extract_scopes(claims: &Map<String, Value>) -> Option<Vec<String>> {
    let value = claims.get("scope").or_else(|| claims.get("scopes"))?;
    match value {
        Value::String(s) => Some(s.split_whitespace().map(str::to_string).collect()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

/// Short, non-reversible token handle for log correlation.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest[..6].iter().map(|b| format!("{b:02x}")).collect()
}

pub struct TokenVerifier {
    issuer: String,
    audience: String,
    leeway_seconds: u64,
    algorithm_policy: AlgorithmPolicy,
    resolver: Arc<dyn SigningKeyResolver>,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("algorithm_policy", &self.algorithm_policy)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        leeway_seconds: u64,
        algorithm_policy: AlgorithmPolicy,
        resolver: Arc<dyn SigningKeyResolver>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            leeway_seconds,
            algorithm_policy,
            resolver,
        }
    }

    pub async fn verify(&self, token: &str) -> Result<VerifiedIdentity, TokenError> {
        let unverified = decode_unverified(token)?;
        let claims = &unverified.claims;

        check_expiry(claims, self.leeway_seconds)?;
        let issuer = check_issuer(claims, &self.issuer)?;
        let subject = extract_subject(claims)?;
        check_audience(claims, &self.audience)?;

        let kid = unverified
            .header
            .kid
            .as_deref()
            .ok_or(TokenError::KeyNotFound)?;
        let key = self.resolver.resolve(kid).await.map_err(|err| {
            tracing::warn!(kid, error = %err, "signing key resolution failed");
            TokenError::KeyNotFound
        })?;

        match unverified.header.alg.as_deref() {
            Some(alg) => {
                let alg = Algorithm::from_str(alg).map_err(|_| TokenError::Malformed)?;
                self.verify_with_header_alg(token, &key, alg)?;
            }
            None => match self.algorithm_policy {
                AlgorithmPolicy::DefaultRs256 => {
                    tracing::debug!(kid, "token header has no alg; verifying as RS256");
                    self.verify_detached(&unverified, &key, Algorithm::RS256)?;
                }
                AlgorithmPolicy::Strict => return Err(TokenError::Malformed),
            },
        }

        Ok(VerifiedIdentity {
            token: token.to_string(),
            issuer,
            subject,
            client_id: claims
                .get("client_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            scopes: extract_scopes(claims),
            claims: unverified.claims.clone(),
        })
    }

    fn verify_with_header_alg(
        &self,
        token: &str,
        key: &DecodingKey,
        alg: Algorithm,
    ) -> Result<(), TokenError> {
        let mut validation = Validation::new(alg);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.leeway = self.leeway_seconds;
        // `exp` presence is decided by the expiry gate above.
        validation.required_spec_claims = HashSet::new();

        jsonwebtoken::decode::<Value>(token, key, &validation)
            .map(|_| ())
            .map_err(|err| {
                tracing::debug!(error = %err, "jwt signature validation failed");
                TokenError::SignatureInvalid
            })
    }

    /// Signature check for headers without `alg`, which `jsonwebtoken::decode`
    /// cannot parse. Issuer and audience are re-checked afterwards.
    fn verify_detached(
        &self,
        unverified: &UnverifiedToken<'_>,
        key: &DecodingKey,
        alg: Algorithm,
    ) -> Result<(), TokenError> {
        let valid = jsonwebtoken::crypto::verify(
            unverified.signature,
            unverified.signing_input.as_bytes(),
            key,
            alg,
        )
        .unwrap_or(false);
        if !valid {
            return Err(TokenError::SignatureInvalid);
        }
        check_issuer(&unverified.claims, &self.issuer)
            .map_err(|_| TokenError::SignatureInvalid)?;
        check_audience(&unverified.claims, &self.audience)
            .map_err(|_| TokenError::SignatureInvalid)
    }
}
