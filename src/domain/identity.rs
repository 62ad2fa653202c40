use crate::domain::profile::ProfileId;
use crate::error::{EngineError, Result};

/// Verified caller identity supplied by the authentication collaborator.
///
/// The operator capability is an explicit flag resolved at the authentication
/// boundary; the engine never derives privilege from identity attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: ProfileId,
    pub operator: bool,
}

impl Caller {
    pub fn user(user_id: ProfileId) -> Self {
        Self {
            user_id,
            operator: false,
        }
    }

    pub fn operator(user_id: ProfileId) -> Self {
        Self {
            user_id,
            operator: true,
        }
    }

    pub fn require_operator(&self) -> Result<()> {
        if self.operator {
            Ok(())
        } else {
            Err(EngineError::Forbidden(
                "operator capability required".into(),
            ))
        }
    }
}
