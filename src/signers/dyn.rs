//! Signing key abstraction.
//!
//! A signer abstracted over the underlying key material.
use alloy::{
    network::{FullSigner, TxSigner},
    primitives::{Address, Signature},
    signers::local::PrivateKeySigner,
};
use std::{fmt, ops::Deref, str::FromStr, sync::Arc};

/// A key able to authorize transfers from exactly one account.
#[derive(Clone)]
pub struct DynSigner(pub Arc<dyn FullSigner<Signature> + Send + Sync>);

impl fmt::Debug for DynSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DynSigner").field(&self.address()).finish()
    }
}

impl DynSigner {
    /// Load a hex encoded private key, with or without the `0x` prefix.
    pub fn from_signing_key(key: &str) -> eyre::Result<Self> {
        Ok(Self(Arc::new(PrivateKeySigner::from_str(key.trim())?)))
    }

    /// Loads an ordered key pool. The order of `keys` is kept.
    pub fn load_all<S: AsRef<str>>(keys: &[S]) -> eyre::Result<Vec<Self>> {
        keys.iter()
            .enumerate()
            .map(|(idx, key)| {
                Self::from_signing_key(key.as_ref())
                    .map_err(|err| eyre::eyre!("invalid signing key #{idx}: {err}"))
            })
            .collect()
    }

    /// Returns the address of the account this key signs for.
    pub fn address(&self) -> Address {
        TxSigner::address(&self.0)
    }
}

impl Deref for DynSigner {
    type Target = dyn FullSigner<Signature> + Send + Sync;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
