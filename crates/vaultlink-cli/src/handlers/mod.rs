//! API request handlers

pub mod files;
pub mod health;
pub mod keys;
pub mod links;
pub mod share;

pub use files::*;
pub use health::*;
pub use keys::*;
pub use links::*;
pub use share::*;

use crate::error::{ApiError, ErrorCode};
use crate::state::UserSession;

pub(crate) fn require_read(session: &UserSession) -> Result<(), ApiError> {
    if session.can_read() {
        Ok(())
    } else {
        Err(ApiError::new(ErrorCode::AccessDenied, "Read access required"))
    }
}

pub(crate) fn require_write(session: &UserSession) -> Result<(), ApiError> {
    if session.can_write() {
        Ok(())
    } else {
        Err(ApiError::new(ErrorCode::AccessDenied, "Write access required"))
    }
}
