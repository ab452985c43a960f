//! Thin recovery boundary the state processor calls at the top of
//! `ApplyTransaction`, before any state is touched (§4.6).

use rayon::prelude::*;
use shared_types::{Address, Transaction};

use crate::errors::{Result, SignatureError};

/// Recovers and validates the sender's signature over the transaction's
/// signing digest.
pub fn recover_sender(tx: &Transaction) -> Result<Address> {
    tx.recover_sender().map_err(SignatureError::InvalidSender)
}

/// Recovers and validates the paymaster's co-signature, if the transaction
/// names one. `None` means the transaction carries no sponsor.
pub fn recover_paymaster(tx: &Transaction) -> Option<Result<Address>> {
    tx.recover_paymaster()
        .map(|r| r.map_err(SignatureError::InvalidPaymaster))
}

/// Recovers every transaction's sender in parallel — used by the block
/// proposer to pre-verify a candidate batch before sequential application,
/// since signature recovery is the one part of `ApplyTransaction` with no
/// dependency on prior transactions in the same block.
pub fn batch_recover_senders(txs: &[Transaction]) -> Vec<Result<Address>> {
    txs.par_iter().map(recover_sender).collect()
}
