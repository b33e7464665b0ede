use thiserror::Error;
use uuid::Uuid;

use bidfit_db::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("supplier {id} cannot be analyzed: {reason}")]
    InvalidSupplier { id: Uuid, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
