use palisade_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("signature freeze mismatch for target block #{target_height}")]
    SignatureFreezeMismatch { target_height: u64 },

    #[error("target block #{height} is missing from the chain")]
    MissingTargetBlock { height: u64 },

    #[error("finalized block #{height} has no signers")]
    NoSigners { height: u64 },

    #[error("amount arithmetic overflowed while distributing fees for block #{height}")]
    AmountOverflow { height: u64 },
}
