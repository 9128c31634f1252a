//! Secure envelope: AES-256-CBC plus HMAC-SHA256 over the ciphertext.
//!
//! This layer is the system's actual confidentiality and integrity
//! boundary. The HMAC is verified in constant time before any
//! decryption is attempted.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

const BLOCK: usize = 16;

/// A sealed package: IV, ciphertext and authentication tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub iv: [u8; BLOCK],
    pub cipher: Vec<u8>,
    pub hmac: [u8; 32],
}

/// AES key: SHA-256 of the password, 32 bytes.
pub fn derive_key(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

/// PKCS#7: pad to the next block boundary with the padding length.
fn pad(data: &[u8]) -> Vec<u8> {
    let padding = BLOCK - (data.len() % BLOCK);
    let mut out = Vec::with_capacity(data.len() + padding);
    out.extend_from_slice(data);
    out.extend(std::iter::repeat_n(padding as u8, padding));
    out
}

/// Strip PKCS#7 padding; the trailing byte must name a length in 1..=16.
fn unpad(data: &[u8]) -> Result<&[u8]> {
    let padding = *data.last().ok_or(CoreError::InvalidPadding)? as usize;
    if padding < 1 || padding > BLOCK || padding > data.len() {
        return Err(CoreError::InvalidPadding);
    }
    Ok(&data[..data.len() - padding])
}

fn compute_hmac(key: &[u8; 32], cipher: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(cipher);
    mac.finalize().into_bytes().into()
}

/// Encrypt and authenticate a serialized package.
pub fn seal(plaintext: &[u8], password: &str, rng: &mut impl Rng) -> Envelope {
    let key = derive_key(password);
    let mut iv = [0u8; BLOCK];
    rng.fill(&mut iv[..]);

    let padded = pad(plaintext);
    let cipher = Aes256CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<NoPadding>(&padded);
    let hmac = compute_hmac(&key, &cipher);

    Envelope { iv, cipher, hmac }
}

/// Verify and decrypt an envelope.
///
/// The HMAC comparison happens first and in constant time; on mismatch
/// this fails fast as an integrity error without touching AES.
pub fn open(envelope: &Envelope, password: &str) -> Result<Vec<u8>> {
    let key = derive_key(password);

    let mut mac = HmacSha256::new_from_slice(&key).expect("hmac accepts any key length");
    mac.update(&envelope.cipher);
    mac.verify_slice(&envelope.hmac)
        .map_err(|_| CoreError::IntegrityFailure)?;

    if envelope.cipher.is_empty() || envelope.cipher.len() % BLOCK != 0 {
        return Err(CoreError::MalformedCiphertext);
    }

    let padded = Aes256CbcDec::new(&key.into(), &envelope.iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(&envelope.cipher)
        .map_err(|_| CoreError::MalformedCiphertext)?;

    unpad(&padded).map(<[u8]>::to_vec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn test_seal_open_round_trip() {
        let envelope = seal(b"the package bytes", "hunter2", &mut rng());
        let plain = open(&envelope, "hunter2").unwrap();
        assert_eq!(plain, b"the package bytes");
    }

    #[test]
    fn test_wrong_password_is_integrity_error() {
        let envelope = seal(b"secret", "hunter2", &mut rng());
        match open(&envelope, "hunter3") {
            Err(CoreError::IntegrityFailure) => {}
            other => panic!("expected IntegrityFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_plaintext() {
        let envelope = seal(b"", "k", &mut rng());
        assert_eq!(envelope.cipher.len(), BLOCK);
        assert_eq!(open(&envelope, "k").unwrap(), b"");
    }

    #[test]
    fn test_block_aligned_plaintext_gets_full_pad_block() {
        let envelope = seal(&[7u8; 32], "k", &mut rng());
        assert_eq!(envelope.cipher.len(), 48);
        assert_eq!(open(&envelope, "k").unwrap(), vec![7u8; 32]);
    }

    #[test]
    fn test_every_bit_flip_fails_hmac() {
        let envelope = seal(b"attack at dawn", "k", &mut rng());
        for byte in 0..envelope.cipher.len() {
            for bit in 0..8 {
                let mut tampered = envelope.clone();
                tampered.cipher[byte] ^= 1 << bit;
                match open(&tampered, "k") {
                    Err(CoreError::IntegrityFailure) => {}
                    other => panic!("flip {byte}:{bit} survived: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_tampered_hmac_rejected() {
        let mut envelope = seal(b"data", "k", &mut rng());
        envelope.hmac[0] ^= 0x01;
        assert!(matches!(open(&envelope, "k"), Err(CoreError::IntegrityFailure)));
    }

    #[test]
    fn test_unpad_rejects_out_of_range() {
        assert!(matches!(unpad(&[0u8; 16]), Err(CoreError::InvalidPadding)));
        let mut block = [0u8; 16];
        block[15] = 17;
        assert!(matches!(unpad(&block), Err(CoreError::InvalidPadding)));
    }

    #[test]
    fn test_distinct_ivs_give_distinct_ciphertexts() {
        let mut rng = rng();
        let a = seal(b"same bytes", "k", &mut rng);
        let b = seal(b"same bytes", "k", &mut rng);
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.cipher, b.cipher);
    }
}
