use std::fmt;

#[derive(Debug)]
pub enum CoreError {
    /// HMAC over the stored ciphertext did not verify — tampering or a
    /// wrong password. Decryption is never attempted after this.
    IntegrityFailure,
    /// CBC plaintext carried an out-of-range PKCS#7 padding byte.
    InvalidPadding,
    /// Ciphertext length is not a whole number of AES blocks.
    MalformedCiphertext,
    /// The decrypted package could not be parsed.
    MalformedPackage(String),
    /// The artifact's base64 fields could not be decoded.
    MalformedArtifact(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::IntegrityFailure => {
                write!(f, "HMAC verification failed: tampered data or wrong password")
            }
            CoreError::InvalidPadding => write!(f, "invalid padding in decrypted data"),
            CoreError::MalformedCiphertext => {
                write!(f, "ciphertext is not a multiple of the AES block size")
            }
            CoreError::MalformedPackage(msg) => write!(f, "malformed package: {msg}"),
            CoreError::MalformedArtifact(msg) => write!(f, "malformed artifact: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::MalformedPackage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
