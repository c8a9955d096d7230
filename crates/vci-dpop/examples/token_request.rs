//! DPoP proof for a credential issuer token request
//!
//! Generates a sender-constraining key, builds the proof a wallet attaches to
//! its token request, and checks it the way the authorization server would.
//!
//! Run with `RUST_LOG=debug` to see the builder's trace output.

use tracing_subscriber::EnvFilter;
use url::Url;
use vci_dpop::{
    DpopAlgorithm, DpopError, DpopKeyPair, DpopProof, DpopProofBuilder, Result, SigningAlgorithm,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("DPoP token request example");
    println!("==========================\n");

    println!("Step 1: Generate DPoP key pair");
    let key_pair = DpopKeyPair::generate(DpopAlgorithm::ES256)?;
    println!("   Algorithm:  {}", key_pair.algorithm);
    println!("   Thumbprint: {}\n", key_pair.thumbprint);

    println!("Step 2: Build proof for the token endpoint");
    let token_endpoint = Url::parse("https://issuer.example/token").map_err(|e| {
        DpopError::InvalidTargetUrl {
            reason: e.to_string(),
        }
    })?;
    let proof = DpopProofBuilder::new().build(
        &SigningAlgorithm::from(key_pair.algorithm),
        key_pair.jwk(),
        &key_pair,
        &token_endpoint,
    )?;
    println!("   htm: {}", proof.payload().htm);
    println!("   htu: {}", proof.payload().htu);
    println!("   jti: {}", proof.payload().jti);
    println!("   iat: {}\n", proof.payload().iat);

    println!("Step 3: HTTP request would include");
    println!("   POST {token_endpoint}");
    println!("   DPoP: {proof}");
    println!("   Content-Type: application/x-www-form-urlencoded\n");

    println!("Step 4: Server-side checks");
    let received = DpopProof::decode(proof.as_str())?;
    received.verify_signature()?;
    println!("   Signature verified");
    println!(
        "   Key binding matches: {}",
        received.thumbprint()? == key_pair.thumbprint
    );

    Ok(())
}
