use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use clap::Parser;
use rsa::{
    RsaPrivateKey,
    pkcs1::DecodeRsaPrivateKey,
    pkcs1v15::SigningKey,
    pkcs8::DecodePrivateKey,
    signature::{SignatureEncoding, Signer},
    traits::PublicKeyParts,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate an RFC 7523 client assertion (RS256 JWT) for the LTI token endpoint.
///
/// - Builds the header (typ=JWT, alg=RS256, kid)
/// - Builds self-issued claims (iss = sub = client id, aud, iat, exp, jti)
/// - Signs "base64url(header).base64url(payload)" with RSASSA-PKCS1-v1_5 / SHA-256
/// - Optionally prints the tool's public JWKS for registration on the platform
#[derive(Parser, Debug)]
#[command(name = "assertion-gen", version, about)]
struct Args {
    /// Tool client id (iss and sub)
    #[arg(long)]
    client_id: String,

    /// Token endpoint URL used as aud (e.g. http://localhost:3000/api/v1/lti/token)
    #[arg(long)]
    aud: String,

    /// Path to the tool's RSA private key in PEM (PKCS#8 or PKCS#1)
    #[arg(long, value_name = "FILE")]
    private_pem: PathBuf,

    /// Key id placed in the header. Default: RFC 7638 thumbprint of the key.
    #[arg(long)]
    kid: Option<String>,

    /// Lifetime in seconds.
    #[arg(long, default_value_t = 300)]
    ttl: i64,

    /// Override iat (unix seconds). Default: now.
    #[arg(long)]
    iat: Option<i64>,

    /// Override jti. Default: random UUID v4.
    #[arg(long)]
    jti: Option<String>,

    /// Also print the public JWKS to register as the tool's key set
    #[arg(long, default_value_t = false)]
    jwks: bool,

    /// Print only the assertion (no extra lines)
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn b64url_json(value: &serde_json::Value) -> Result<String> {
    let s = serde_json::to_string(value).context("serialize json")?;
    Ok(URL_SAFE_NO_PAD.encode(s.as_bytes()))
}

fn now_unix() -> Result<i64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time")?
        .as_secs() as i64)
}

fn load_key(path: &PathBuf) -> Result<RsaPrivateKey> {
    let pem = fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    RsaPrivateKey::from_pkcs8_pem(&pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(&pem))
        .context("parse RSA private key PEM")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let private = load_key(&args.private_pem)?;
    let n = URL_SAFE_NO_PAD.encode(private.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(private.e().to_bytes_be());

    // RFC 7638: members {e,kty,n} in lexicographic order, no whitespace.
    let canonical = format!(r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#, e, n);
    let thumbprint = URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()));
    let kid = args.kid.clone().unwrap_or_else(|| thumbprint.clone());

    let iat = match args.iat {
        Some(iat) => iat,
        None => now_unix()?,
    };
    let jti = args.jti.unwrap_or_else(|| Uuid::new_v4().to_string());

    let header = serde_json::json!({
        "typ": "JWT",
        "alg": "RS256",
        "kid": kid,
    });
    let claims = serde_json::json!({
        "iss": args.client_id,
        "sub": args.client_id,
        "aud": args.aud,
        "iat": iat,
        "exp": iat + args.ttl,
        "jti": jti,
    });

    let signing_input = format!("{}.{}", b64url_json(&header)?, b64url_json(&claims)?);
    let signer = SigningKey::<Sha256>::new(private);
    let signature = signer.sign(signing_input.as_bytes());
    let assertion = format!(
        "{}.{}",
        signing_input,
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    );

    if args.quiet {
        println!("{}", assertion);
        return Ok(());
    }

    println!("client_assertion: {}", assertion);
    println!("kid: {}", kid);
    println!("iat: {}", iat);
    println!("exp: {}", iat + args.ttl);
    println!("jti: {}", jti);

    if args.jwks {
        let jwks = serde_json::json!({
            "keys": [{
                "kty": "RSA",
                "use": "sig",
                "alg": "RS256",
                "kid": kid,
                "n": n,
                "e": e,
            }]
        });
        println!("jwks: {}", serde_json::to_string_pretty(&jwks)?);
    }

    Ok(())
}
