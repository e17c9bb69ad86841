use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fixed secret taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
    ApiKey,
    AwsAccessKey,
    AwsSecretKey,
    PrivateKey,
    Password,
    Token,
    Certificate,
    DatabaseUrl,
    Jwt,
    BearerToken,
    BasicAuth,
    GenericSecret,
}

impl SecretType {
    pub fn as_str(self) -> &'static str {
        match self {
            SecretType::ApiKey => "api_key",
            SecretType::AwsAccessKey => "aws_access_key",
            SecretType::AwsSecretKey => "aws_secret_key",
            SecretType::PrivateKey => "private_key",
            SecretType::Password => "password",
            SecretType::Token => "token",
            SecretType::Certificate => "certificate",
            SecretType::DatabaseUrl => "database_url",
            SecretType::Jwt => "jwt",
            SecretType::BearerToken => "bearer_token",
            SecretType::BasicAuth => "basic_auth",
            SecretType::GenericSecret => "generic_secret",
        }
    }
}

pub(crate) struct RawMatch {
    pub start: usize,
    pub end: usize,
    pub secret_type: SecretType,
    pub pattern_id: &'static str,
}

/// Patterns are listed in priority order: earlier patterns win on overlap
/// with a later, broader pattern (e.g. `private_key`/`certificate` PEM
/// blocks are claimed before `generic_secret` could ever see them).
static PATTERNS: Lazy<Vec<(&'static str, SecretType, Regex)>> = Lazy::new(|| {
    vec![
        (
            "private_key_pem",
            SecretType::PrivateKey,
            Regex::new(r"-----BEGIN ((RSA|EC|OPENSSH|DSA) )?PRIVATE KEY-----[\s\S]+?-----END ((RSA|EC|OPENSSH|DSA) )?PRIVATE KEY-----").unwrap(),
        ),
        (
            "certificate_pem",
            SecretType::Certificate,
            Regex::new(r"-----BEGIN CERTIFICATE-----[\s\S]+?-----END CERTIFICATE-----").unwrap(),
        ),
        (
            "aws_access_key_id",
            SecretType::AwsAccessKey,
            Regex::new(r"AKIA[0-9A-Z]{16}").unwrap(),
        ),
        (
            "aws_secret_access_key",
            SecretType::AwsSecretKey,
            Regex::new(r#"(?i)aws_secret_access_key\s*[:=]\s*['"]?([A-Za-z0-9/+=]{40})['"]?"#).unwrap(),
        ),
        (
            "jwt",
            SecretType::Jwt,
            Regex::new(r"eyJ[A-Za-z0-9_-]{5,}\.[A-Za-z0-9_-]{5,}\.[A-Za-z0-9_-]{5,}").unwrap(),
        ),
        (
            "database_url",
            SecretType::DatabaseUrl,
            Regex::new(r"(?i)(postgres(ql)?|mysql|mongodb(\+srv)?|redis)://[^:\s]+:[^@\s]+@[^\s'\"]+").unwrap(),
        ),
        (
            "bearer_token",
            SecretType::BearerToken,
            Regex::new(r"(?i)bearer\s+([A-Za-z0-9\-_.]{8,})").unwrap(),
        ),
        (
            "basic_auth",
            SecretType::BasicAuth,
            Regex::new(r"(?i)basic\s+([A-Za-z0-9+/=]{8,})").unwrap(),
        ),
        (
            "api_key_assignment",
            SecretType::ApiKey,
            Regex::new(r#"(?i)(api[_-]?key)\s*[:=]\s*['"]?([A-Za-z0-9\-_.]{8,})['"]?"#).unwrap(),
        ),
        (
            "token_assignment",
            SecretType::Token,
            Regex::new(r#"(?i)(access|auth|api)[_-]?token\s*[:=]\s*['"]?([A-Za-z0-9\-_.]{8,})['"]?"#).unwrap(),
        ),
        (
            "password_assignment",
            SecretType::Password,
            Regex::new(r#"(?i)(password|passwd|pwd)\s*[:=]\s*['"]?([^\s'",]{4,})['"]?"#).unwrap(),
        ),
        (
            "generic_secret_assignment",
            SecretType::GenericSecret,
            Regex::new(r#"(?i)\bsecret\b\s*[:=]\s*['"]?([A-Za-z0-9\-_.]{8,})['"]?"#).unwrap(),
        ),
    ]
});

/// Finds every match across every pattern, sorted by start offset. Does not
/// resolve overlaps; `redact` owns that policy (first-priority, leftmost).
pub(crate) fn find_all(text: &str) -> Vec<RawMatch> {
    let mut out = Vec::new();
    for (pattern_id, secret_type, re) in PATTERNS.iter() {
        for m in re.find_iter(text) {
            out.push(RawMatch {
                start: m.start(),
                end: m.end(),
                secret_type: *secret_type,
                pattern_id,
            });
        }
    }
    out.sort_by_key(|m| (m.start, m.end.wrapping_sub(m.start)));
    out
}
