use serde::{Deserialize, Serialize};

/// One public key as published by the auth service.
///
/// `n` and `e` are base64url without padding. Retired keys stay in the
/// document so access tokens signed before a rotation keep verifying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicJwk {
    pub kid: String,
    pub kty: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub alg: String,
    pub n: String,
    pub e: String,
}

/// The JWKS document served at `/.well-known/jwks.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<PublicJwk>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_use_serializes_as_use() {
        let jwk = PublicJwk {
            kid: "k1".into(),
            kty: "RSA".into(),
            key_use: "sig".into(),
            alg: "RS256".into(),
            n: "AQAB".into(),
            e: "AQAB".into(),
        };
        let json = serde_json::to_value(&jwk).unwrap();
        assert_eq!(json["use"], "sig");
        assert!(json.get("key_use").is_none());
    }
}
