use crate::types::QuestId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Another quest is still in progress; the user must finish or cancel it.
    #[error("Quest {active} is already in progress")]
    AlreadyActive { active: QuestId },

    #[error("Quest {quest_id} is not available at this time")]
    QuestUnavailable { quest_id: QuestId },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<crate::store::StoreError> for CoreError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            other => CoreError::Internal(other.to_string()),
        }
    }
}
