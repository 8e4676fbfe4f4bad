use serde::{Deserialize, Serialize};

use crate::{jwa, jwk, Jwk};

/// The key set an issuer publishes (JWKS)
///
/// Entries this crate cannot use, such as non-RSA keys or unknown
/// algorithms, are dropped with a warning. The rest of the set still loads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    #[serde(deserialize_with = "deserialize_keys")]
    keys: Vec<Jwk>,
}

impl Jwks {
    /// Adds a key to the set
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    /// The usable keys, in document order
    #[must_use]
    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    /// The number of usable keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no usable keys remain
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The identifiers of the keys that carry one
    pub fn key_ids(&self) -> impl Iterator<Item = &jwk::KeyIdRef> + '_ {
        self.keys.iter().filter_map(Jwk::key_id)
    }

    /// The key best suited to verify `alg`, ignoring identifiers
    #[must_use]
    pub fn get_key(&self, alg: jwa::Algorithm) -> Option<&Jwk> {
        self.select(None, alg)
    }

    /// The key best suited to verify `alg` under `kid`
    ///
    /// Only keys published under exactly `kid` are considered.
    #[must_use]
    pub fn get_key_by_id(&self, kid: &jwk::KeyIdRef, alg: jwa::Algorithm) -> Option<&Jwk> {
        self.select(Some(kid), alg)
    }

    fn select(&self, kid: Option<&jwk::KeyIdRef>, alg: jwa::Algorithm) -> Option<&Jwk> {
        // reversed so the earliest key wins a tie
        self.keys
            .iter()
            .rev()
            .filter_map(|key| fitness(key, kid, alg).map(|score| (key, score)))
            .max_by_key(|&(_, score)| score)
            .map(|(key, _)| key)
    }
}

/// How specifically `key` claims to serve `alg` under `kid`
///
/// `None` when any declared attribute contradicts the request.
fn fitness(key: &Jwk, kid: Option<&jwk::KeyIdRef>, alg: jwa::Algorithm) -> Option<u8> {
    if !key.is_compatible(alg) {
        return None;
    }

    let by_id = match (kid, key.key_id()) {
        (Some(wanted), Some(found)) if wanted == found => 4,
        (Some(_), _) => return None,
        (None, _) => 0,
    };

    let by_alg = match key.algorithm() {
        Some(pinned) if pinned != alg => return None,
        Some(_) => 2,
        None => 0,
    };

    let by_use = match key.usage() {
        Some(usage) if usage != alg.to_usage() => return None,
        Some(_) => 1,
        None => 0,
    };

    Some(by_id + by_alg + by_use)
}

/// Unusable entries are logged and skipped
fn deserialize_keys<'de, D>(deserializer: D) -> Result<Vec<Jwk>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Usable(Jwk),
        Unusable {
            #[serde(default)]
            kid: Option<jwk::KeyId>,
            #[serde(default)]
            kty: Option<String>,
            #[serde(default)]
            alg: Option<String>,
        },
    }

    let entries = Vec::<Entry>::deserialize(deserializer)?;
    let usable = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match entry {
            Entry::Usable(key) => Some(key),
            Entry::Unusable { kid, kty, alg } => {
                tracing::warn!(
                    jwks.idx = index,
                    jwk.kid = ?kid,
                    jwk.kty = ?kty,
                    jwk.alg = ?alg,
                    "ignoring unusable JWK"
                );
                None
            }
        })
        .collect();

    Ok(usable)
}
