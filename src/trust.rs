//! Trust policies: signing manifest text and verifying signed envelopes.
//!
//! A [`TrustPolicy`] turns manifest text into a persisted envelope and, on
//! verify, opens an envelope into its payload plus a validity verdict. The
//! real policy is backed by a keyring directory of Ed25519 key files:
//! `<name>.key` holds a hex-encoded secret key, `<name>.pub` the matching
//! hex-encoded public key. An envelope is valid only when some signature
//! cryptographically verifies AND that signer's fingerprint — the trailing 16
//! hex characters of its public key, the short-key-id convention — belongs to
//! the policy's acceptable identity set. A partially-valid envelope never
//! reports valid.

use crate::error::TrustError;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Number of trailing hex characters forming a key fingerprint.
const FINGERPRINT_LEN: usize = 16;

/// Name of the ambient default signing identity.
const DEFAULT_IDENTITY: &str = "default";

/// Result of opening a signed envelope.
#[derive(Debug)]
pub struct Opened {
    /// The wrapped manifest bytes.
    pub payload: Vec<u8>,
    /// Whether the envelope satisfies the policy's acceptance criterion.
    pub valid: bool,
    /// Human-readable signature status for the event stream.
    pub message: String,
}

/// Signing/verification identity, or the pass-through null policy.
pub trait TrustPolicy {
    /// Wrap manifest text in a signed envelope.
    fn sign(&self, text: &str) -> Result<Vec<u8>, TrustError>;

    /// Open an envelope into payload, validity, and a status message.
    fn open(&self, envelope: &[u8]) -> Result<Opened, TrustError>;

    /// Identity description carried on signature events.
    fn describe(&self) -> String;
}

/// Persisted envelope: the manifest text plus zero or more signatures.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    payload: String,
    #[serde(default)]
    signatures: Vec<EnvelopeSignature>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EnvelopeSignature {
    /// Hex-encoded Ed25519 public key of the signer.
    signer: String,
    /// Hex-encoded signature over the payload bytes.
    signature: String,
}

fn fingerprint(public_key_hex: &str) -> &str {
    let start = public_key_hex.len().saturating_sub(FINGERPRINT_LEN);
    &public_key_hex[start..]
}

/// Accept-everything policy: no cryptographic check is performed.
///
/// Selected when no signer or keyring is configured; the checksum tree still
/// functions in digest-only mode.
#[derive(Debug, Default)]
pub struct NullPolicy;

impl TrustPolicy for NullPolicy {
    fn sign(&self, text: &str) -> Result<Vec<u8>, TrustError> {
        let envelope = Envelope {
            payload: text.to_string(),
            signatures: Vec::new(),
        };
        serde_json::to_vec(&envelope)
            .map_err(|e| TrustError::MalformedEnvelope(e.to_string()))
    }

    fn open(&self, envelope: &[u8]) -> Result<Opened, TrustError> {
        // Accept enveloped and bare payloads alike so digest-only trees
        // interoperate with signed ones.
        let payload = match serde_json::from_slice::<Envelope>(envelope) {
            Ok(parsed) => parsed.payload.into_bytes(),
            Err(_) => envelope.to_vec(),
        };
        Ok(Opened {
            payload,
            valid: true,
            message: "not checked (no trust policy configured)".to_string(),
        })
    }

    fn describe(&self) -> String {
        "none (digests only)".to_string()
    }
}

/// Trust policy backed by a keyring directory of Ed25519 key files.
pub struct KeyringPolicy {
    keyring: PathBuf,
    selector: String,
    accepted: Mutex<Option<Vec<String>>>,
}

impl KeyringPolicy {
    /// Create a policy over `keyring`, selecting identities whose file stem
    /// contains `selector`. An empty selector selects every identity.
    pub fn new(keyring: PathBuf, selector: String) -> Self {
        Self {
            keyring,
            selector,
            accepted: Mutex::new(None),
        }
    }

    /// Generate a fresh identity `<name>.key` / `<name>.pub` in `keyring`.
    pub fn generate_identity(keyring: &Path, name: &str) -> Result<(), TrustError> {
        let mut rng = rand::rngs::OsRng;
        let signing = SigningKey::generate(&mut rng);
        fs::create_dir_all(keyring)?;
        fs::write(
            keyring.join(format!("{}.key", name)),
            hex::encode(signing.to_bytes()),
        )?;
        fs::write(
            keyring.join(format!("{}.pub", name)),
            hex::encode(signing.verifying_key().to_bytes()),
        )?;
        Ok(())
    }

    fn read_key_bytes(path: &Path) -> Result<[u8; 32], TrustError> {
        let text = fs::read_to_string(path)?;
        let bytes = hex::decode(text.trim()).map_err(|e| TrustError::MalformedKey {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        bytes.try_into().map_err(|_| TrustError::MalformedKey {
            path: path.to_path_buf(),
            reason: "expected 32 bytes".to_string(),
        })
    }

    /// Secret keys designated by the selector; the ambient default identity
    /// when no selector is configured.
    fn signing_keys(&self) -> Result<Vec<SigningKey>, TrustError> {
        let mut keys = Vec::new();
        if self.selector.is_empty() {
            let default = self.keyring.join(format!("{}.key", DEFAULT_IDENTITY));
            if default.is_file() {
                keys.push(SigningKey::from_bytes(&Self::read_key_bytes(&default)?));
            }
        } else {
            for entry in fs::read_dir(&self.keyring)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("key") {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if stem.contains(&self.selector) {
                    keys.push(SigningKey::from_bytes(&Self::read_key_bytes(&path)?));
                }
            }
        }
        if keys.is_empty() {
            let wanted = if self.selector.is_empty() {
                DEFAULT_IDENTITY.to_string()
            } else {
                self.selector.clone()
            };
            return Err(TrustError::NoSigningKey(wanted));
        }
        Ok(keys)
    }

    /// Fingerprints of acceptable identities, resolved lazily and cached.
    ///
    /// Acceptable identities are the well-formed public keys in the keyring
    /// whose file stem contains the selector; malformed key files are skipped.
    fn accepted_fingerprints(&self) -> Result<Vec<String>, TrustError> {
        let mut cache = self.accepted.lock();
        if let Some(fingerprints) = cache.as_ref() {
            return Ok(fingerprints.clone());
        }
        let mut fingerprints = Vec::new();
        for entry in fs::read_dir(&self.keyring)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("pub") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !self.selector.is_empty() && !stem.contains(&self.selector) {
                continue;
            }
            let bytes = match Self::read_key_bytes(&path) {
                Ok(b) => b,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping malformed public key");
                    continue;
                }
            };
            if VerifyingKey::from_bytes(&bytes).is_err() {
                debug!(path = %path.display(), "Skipping non-Ed25519 public key");
                continue;
            }
            fingerprints.push(fingerprint(&hex::encode(bytes)).to_string());
        }
        *cache = Some(fingerprints.clone());
        Ok(fingerprints)
    }
}

impl TrustPolicy for KeyringPolicy {
    fn sign(&self, text: &str) -> Result<Vec<u8>, TrustError> {
        let signatures = self
            .signing_keys()?
            .iter()
            .map(|key| EnvelopeSignature {
                signer: hex::encode(key.verifying_key().to_bytes()),
                signature: hex::encode(key.sign(text.as_bytes()).to_bytes()),
            })
            .collect();
        let envelope = Envelope {
            payload: text.to_string(),
            signatures,
        };
        serde_json::to_vec(&envelope)
            .map_err(|e| TrustError::MalformedEnvelope(e.to_string()))
    }

    fn open(&self, envelope: &[u8]) -> Result<Opened, TrustError> {
        let parsed = match serde_json::from_slice::<Envelope>(envelope) {
            Ok(parsed) => parsed,
            Err(e) => {
                // Not a signed envelope; surface the raw bytes so the caller
                // can still diff an unsigned manifest.
                return Ok(Opened {
                    payload: envelope.to_vec(),
                    valid: false,
                    message: format!("not a signed envelope: {}", e),
                });
            }
        };

        let accepted = self.accepted_fingerprints()?;
        let payload_bytes = parsed.payload.as_bytes();
        let mut verdict = (false, "no signature present".to_string());

        for sig in &parsed.signatures {
            let Ok(signer_bytes) = hex::decode(&sig.signer) else {
                verdict = (false, "malformed signer key".to_string());
                continue;
            };
            let Ok(signer_arr) = <[u8; 32]>::try_from(signer_bytes.as_slice()) else {
                verdict = (false, "malformed signer key".to_string());
                continue;
            };
            let Ok(verifying) = VerifyingKey::from_bytes(&signer_arr) else {
                verdict = (false, "malformed signer key".to_string());
                continue;
            };
            let Ok(sig_bytes) = hex::decode(&sig.signature) else {
                verdict = (false, "malformed signature".to_string());
                continue;
            };
            let Ok(signature) = Signature::from_slice(&sig_bytes) else {
                verdict = (false, "malformed signature".to_string());
                continue;
            };
            if verifying.verify_strict(payload_bytes, &signature).is_err() {
                verdict = (false, "bad signature".to_string());
                continue;
            }
            let signer_hex = hex::encode(signer_arr);
            let fp = fingerprint(&signer_hex);
            if accepted.iter().any(|a| a == fp) {
                verdict = (true, format!("good signature from {}", fp));
                break;
            }
            verdict = (false, format!("signature from untrusted key {}", fp));
        }

        Ok(Opened {
            payload: parsed.payload.into_bytes(),
            valid: verdict.0,
            message: verdict.1,
        })
    }

    fn describe(&self) -> String {
        if self.selector.is_empty() {
            format!("keyring {}", self.keyring.display())
        } else {
            format!("keyring {} ({})", self.keyring.display(), self.selector)
        }
    }
}
