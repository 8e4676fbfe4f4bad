//! JSON Web Signature verification ([RFC7515][])
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515

use std::error::Error as StdError;

/// Something that can check a JWS signature
pub trait Verifier {
    /// The algorithm identifiers this verifier understands
    type Algorithm: Copy;

    /// Why verification failed
    type Error: StdError + Send + Sync + 'static;

    /// Checks that `signature` is valid for `signed` under `alg`
    ///
    /// # Errors
    ///
    /// Fails if the signature does not match or the verifier refuses `alg`.
    fn verify(&self, alg: Self::Algorithm, signed: &[u8], signature: &[u8])
        -> Result<(), Self::Error>;
}

impl<V: Verifier + ?Sized> Verifier for &'_ V {
    type Algorithm = V::Algorithm;
    type Error = V::Error;

    fn verify(
        &self,
        alg: Self::Algorithm,
        signed: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        (**self).verify(alg, signed, signature)
    }
}
