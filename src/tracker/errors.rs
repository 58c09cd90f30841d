use crate::error::ErrorKind;
use crate::path::PathError;
use crate::tracker::Stamp;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error(
        "file {} has not been read in this session; read it before writing to an existing file",
        path.display()
    )]
    NotRead { path: PathBuf },

    #[error(
        "file {} has been modified since it was last read\nLast modification: {modified}\nLast read: {last_observed}\n\nRead the file again to get the latest contents before modifying it",
        path.display()
    )]
    ExternallyModified {
        path: PathBuf,
        modified: Stamp,
        last_observed: Stamp,
    },

    #[error(transparent)]
    Path(#[from] PathError),
}

impl TrackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackError::NotRead { .. } => ErrorKind::NotRead,
            TrackError::ExternallyModified { .. } => ErrorKind::ExternallyModified,
            TrackError::Path(e) => e.kind(),
        }
    }
}
