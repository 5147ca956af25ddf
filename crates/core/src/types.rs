/// Quest identifiers are opaque strings assigned by the authoring console.
pub type QuestId = String;

/// Artefact identifiers are the payload encoded in an artefact's QR code.
pub type ArtefactId = String;

/// User identifiers are resolved from the account email by the user store.
pub type UserId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
