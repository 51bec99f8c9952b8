use derive_more::{Display, Error, From};

use blackbox_utils::StorageError;

#[derive(Debug, Display, Error, From)]
pub enum Error {
    #[display("value rejected by the validator of '{parameter}'")]
    Validation { parameter: &'static str },
    #[display("timed out waiting for the lock of {target}")]
    LockTimeout { target: String },
    #[display("storage failure: {_0}")]
    #[from]
    Storage(StorageError),
    #[display("{entity} failed: {message}")]
    Driver { entity: String, message: String },
}

impl Error {
    pub(crate) fn driver(entity: impl Into<String>, err: anyhow::Error) -> Self {
        Error::Driver {
            entity: entity.into(),
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn lock_timeout(target: impl Into<String>) -> Self {
        Error::LockTimeout {
            target: target.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
