use terra_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("increment amount must be non-zero")]
    ZeroAmount,

    #[error("increment amount {0} exceeds the store's counter range")]
    AmountTooLarge(u64),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
