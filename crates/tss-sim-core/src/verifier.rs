//! Signature verification against stored results

use crate::sign::message_digest;
use crate::storage::ResultStore;
use crate::{Error, Result};
use tracing::{debug, info, instrument};

/// Verify the stored signature over `message`
///
/// Uses the public key of the first stored key share (in sort-key order) and
/// the converged signature of the last signing round. Missing or diverging
/// signature files are errors, not an invalid result.
#[instrument(skip(store))]
pub async fn verify(store: &ResultStore, message: &str) -> Result<bool> {
    let signature = store.load_any_signatures().await?;

    let shares = store.load_key_shares().await?;
    let (key, share) = shares
        .iter()
        .next()
        .ok_or(Error::NotEnoughShares {
            required: 1,
            available: 0,
        })?;
    let public_key = share.public_key_point()?;
    debug!(share = %key, public_key = %share.public_key, "verifying with stored public key");

    let digest = message_digest(message)?;
    let valid = signature.verify(&public_key, &digest)?;

    info!(valid, "signature verification finished");
    Ok(valid)
}
