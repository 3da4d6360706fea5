//! Signing keys and loading them from disk.
//!
//! Keys are read from the pair of files BIND and ldns produce: a `.key` file
//! holding the DNSKEY record in zone file format and a `.private` file in
//! the `Private-key-format: v1.x` format.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{error, fmt, fs, io};

use bytes::Bytes;
use data_encoding::BASE64;
use domain::base::iana::{Class, SecAlg};
#[cfg(test)]
use domain::base::iana::Rtype;
use domain::base::{ToName, Ttl};
use domain::zonefile::inplace::{Entry, ScannedRecordData, Zonefile};
use ring::rand::SystemRandom;
use ring::signature::{self, EcdsaKeyPair, Ed25519KeyPair, KeyPair};

use super::signer::SignError;
use crate::message::{Dnskey, Record, RecordData, StoredName};

/// The DNSKEY flags of a zone signing key.
pub const ZONE_KEY: u16 = 256;

/// The DNSKEY flags of a key signing key.
pub const SECURE_ENTRY_POINT: u16 = 257;

//------------ SigningKey ----------------------------------------------------

/// A private key together with its public DNSKEY data.
pub struct SigningKey {
    owner: StoredName,
    dnskey: Dnskey,
    key_tag: u16,
    inner: KeyInner,
}

enum KeyInner {
    Ecdsa {
        key: EcdsaKeyPair,
        rng: SystemRandom,
    },
    Ed25519(Ed25519KeyPair),

    /// Refuses to sign the RRsets of one type.
    #[cfg(test)]
    FailingFor(Rtype, Box<KeyInner>),
}

impl KeyInner {
    fn sign(&self, data: &[u8]) -> Result<Bytes, SignError> {
        match self {
            KeyInner::Ecdsa { key, rng } => key
                .sign(rng, data)
                .map(|sig| Bytes::copy_from_slice(sig.as_ref()))
                .map_err(|_| SignError::Crypto),
            KeyInner::Ed25519(key) => Ok(Bytes::copy_from_slice(key.sign(data).as_ref())),
            // Signed data starts with the type covered.
            #[cfg(test)]
            KeyInner::FailingFor(rtype, inner) => {
                if data.starts_with(&rtype.to_int().to_be_bytes()) {
                    Err(SignError::Crypto)
                } else {
                    inner.sign(data)
                }
            }
        }
    }
}

impl SigningKey {
    /// Creates a key from its raw private and public parts.
    ///
    /// For ECDSA, `private_key` is the big-endian scalar and `public_key`
    /// the concatenated coordinates as they appear in a DNSKEY record. For
    /// Ed25519, `private_key` is the seed. The parts must belong together.
    pub fn from_parts(
        owner: StoredName,
        flags: u16,
        algorithm: SecAlg,
        private_key: &[u8],
        public_key: &[u8],
    ) -> Result<Self, KeyError> {
        let ecdsa = if algorithm == SecAlg::ECDSAP256SHA256 {
            Some(&signature::ECDSA_P256_SHA256_FIXED_SIGNING)
        } else if algorithm == SecAlg::ECDSAP384SHA384 {
            Some(&signature::ECDSA_P384_SHA384_FIXED_SIGNING)
        } else {
            None
        };
        let inner = if let Some(alg) = ecdsa {
            let mut point = Vec::with_capacity(public_key.len() + 1);
            point.push(0x04);
            point.extend_from_slice(public_key);
            let rng = SystemRandom::new();
            let key = EcdsaKeyPair::from_private_key_and_public_key(alg, private_key, &point, &rng)
                .map_err(|err| KeyError::Rejected(err.to_string()))?;
            KeyInner::Ecdsa { key, rng }
        } else if algorithm == SecAlg::ED25519 {
            let key = Ed25519KeyPair::from_seed_and_public_key(private_key, public_key)
                .map_err(|err| KeyError::Rejected(err.to_string()))?;
            KeyInner::Ed25519(key)
        } else {
            return Err(KeyError::UnsupportedAlgorithm(algorithm));
        };
        Self::new(
            owner,
            flags,
            algorithm,
            Bytes::copy_from_slice(public_key),
            inner,
        )
    }

    /// Creates an Ed25519 key from a 32 octet seed.
    pub fn ed25519_from_seed(owner: StoredName, flags: u16, seed: &[u8]) -> Result<Self, KeyError> {
        let key = Ed25519KeyPair::from_seed_unchecked(seed)
            .map_err(|err| KeyError::Rejected(err.to_string()))?;
        let public_key = Bytes::copy_from_slice(key.public_key().as_ref());
        Self::new(
            owner,
            flags,
            SecAlg::ED25519,
            public_key,
            KeyInner::Ed25519(key),
        )
    }

    fn new(
        owner: StoredName,
        flags: u16,
        algorithm: SecAlg,
        public_key: Bytes,
        inner: KeyInner,
    ) -> Result<Self, KeyError> {
        let dnskey = Dnskey::new(flags, 3, algorithm, public_key)
            .map_err(|err| KeyError::Rejected(err.to_string()))?;
        Ok(SigningKey {
            owner,
            key_tag: dnskey.key_tag(),
            dnskey,
            inner,
        })
    }

    /// Makes every attempt to sign an RRset of type `rtype` fail.
    #[cfg(test)]
    pub(crate) fn failing_for(self, rtype: Rtype) -> Self {
        SigningKey {
            inner: KeyInner::FailingFor(rtype, Box::new(self.inner)),
            ..self
        }
    }

    /// Returns the owner of the key, which is the apex of the signed zone.
    pub fn owner(&self) -> &StoredName {
        &self.owner
    }

    pub fn algorithm(&self) -> SecAlg {
        self.dnskey.algorithm()
    }

    pub fn key_tag(&self) -> u16 {
        self.key_tag
    }

    pub fn dnskey(&self) -> &Dnskey {
        &self.dnskey
    }

    /// Returns the DNSKEY record for this key.
    pub fn dnskey_record(&self, ttl: Ttl) -> Record {
        Record::new(
            self.owner.clone(),
            Class::IN,
            ttl,
            RecordData::Dnskey(self.dnskey.clone()),
        )
    }

    /// Signs `data`, returning the signature as it goes into an RRSIG.
    pub fn sign(&self, data: &[u8]) -> Result<Bytes, SignError> {
        self.inner.sign(data)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("owner", &self.owner)
            .field("algorithm", &self.dnskey.algorithm())
            .field("key_tag", &self.key_tag)
            .finish()
    }
}

//------------ Loading -------------------------------------------------------

/// Loads a key pair from `<prefix>.key` and `<prefix>.private`.
pub fn load_key_pair(prefix: impl AsRef<Path>) -> Result<SigningKey, KeyError> {
    let prefix = prefix.as_ref();
    let public_path = with_extension(prefix, "key");
    let private_path = with_extension(prefix, "private");

    let mut file = fs::File::open(&public_path).map_err(|error| KeyError::Io {
        path: public_path.clone(),
        error,
    })?;
    let zonefile = Zonefile::load(&mut file).map_err(|error| KeyError::Io {
        path: public_path.clone(),
        error,
    })?;
    let (owner, public) = find_dnskey(zonefile).map_err(|reason| KeyError::Parse {
        path: public_path.clone(),
        reason,
    })?;

    let private = read(&private_path)?;
    let (algorithm, private_key) =
        parse_private_file(&private).map_err(|reason| KeyError::Parse {
            path: private_path.clone(),
            reason,
        })?;

    if algorithm != public.algorithm() {
        return Err(KeyError::AlgorithmMismatch {
            public: public.algorithm(),
            private: algorithm,
        });
    }

    SigningKey::from_parts(
        owner,
        public.flags(),
        public.algorithm(),
        &private_key,
        public.public_key(),
    )
}

/// Appends an extension without replacing anything that looks like one.
///
/// Key file names contain dots, as in `Kexample.com.+015+12345`.
fn with_extension(prefix: &Path, ext: &str) -> PathBuf {
    let mut path = prefix.as_os_str().to_owned();
    path.push(".");
    path.push(ext);
    path.into()
}

fn read(path: &Path) -> Result<String, KeyError> {
    fs::read_to_string(path).map_err(|error| KeyError::Io {
        path: path.into(),
        error,
    })
}

/// Returns the owner and data of the first DNSKEY record in a key file.
fn find_dnskey(zonefile: Zonefile) -> Result<(StoredName, Dnskey), String> {
    for entry in zonefile {
        let entry = entry.map_err(|err| err.to_string())?;
        let Entry::Record(record) = entry else {
            continue;
        };
        let ScannedRecordData::Dnskey(dnskey) = record.data() else {
            continue;
        };
        if dnskey.protocol() != 3 {
            return Err(format!("unexpected protocol {}", dnskey.protocol()));
        }
        return Ok((record.owner().to_vec(), dnskey.clone()));
    }
    Err("no DNSKEY record found".into())
}

/// Parses the algorithm and private key of a `.private` file.
fn parse_private_file(text: &str) -> Result<(SecAlg, Vec<u8>), String> {
    let mut algorithm = None;
    let mut private_key = None;
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Private-key-format" => {
                if !value.starts_with("v1.") {
                    return Err(format!("unsupported format '{value}'"));
                }
            }
            "Algorithm" => {
                let number = value.split_whitespace().next().unwrap_or_default();
                algorithm = Some(parse_algorithm(number)?);
            }
            "PrivateKey" => {
                let key = BASE64
                    .decode(value.as_bytes())
                    .map_err(|err| format!("invalid private key: {err}"))?;
                private_key = Some(key);
            }
            _ => {}
        }
    }
    Ok((
        algorithm.ok_or("missing Algorithm")?,
        private_key.ok_or("missing PrivateKey")?,
    ))
}

fn parse_algorithm(token: &str) -> Result<SecAlg, String> {
    SecAlg::from_str(token).map_err(|_| format!("unknown algorithm '{token}'"))
}

//------------ KeyError ------------------------------------------------------

/// A key pair couldn't be loaded.
#[derive(Debug)]
pub enum KeyError {
    Io { path: PathBuf, error: io::Error },
    Parse { path: PathBuf, reason: String },
    AlgorithmMismatch { public: SecAlg, private: SecAlg },
    UnsupportedAlgorithm(SecAlg),
    Rejected(String),
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyError::Io { path, error } => {
                write!(f, "failed to read '{}': {}", path.display(), error)
            }
            KeyError::Parse { path, reason } => {
                write!(f, "failed to parse '{}': {}", path.display(), reason)
            }
            KeyError::AlgorithmMismatch { public, private } => write!(
                f,
                "public key algorithm {} does not match private key algorithm {}",
                public, private
            ),
            KeyError::UnsupportedAlgorithm(alg) => {
                write!(f, "unsupported algorithm {}", alg)
            }
            KeyError::Rejected(reason) => write!(f, "key rejected: {}", reason),
        }
    }
}

impl error::Error for KeyError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            KeyError::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}

//============ Tests =========================================================
