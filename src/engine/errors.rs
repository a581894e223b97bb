use thiserror::Error;

use crate::validation::UsernameError;

/// Errors that can arise while interacting with the sled-backed store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// The service actor stopped before the request could be answered.
    #[error("service unavailable")]
    ServiceUnavailable,
}

/// Closed error set for `register_user`.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Another user already claimed this username.
    #[error("username is already taken")]
    UsernameTaken,

    /// The calling identity already owns a user aggregate.
    #[error("identity is already registered")]
    AlreadyRegistered,

    /// The username failed validation before any state was touched.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Closed error set for registration-adjacent lookups, role selection, and the
/// quest lifecycle.
#[derive(Debug, Error)]
pub enum UserError {
    /// The calling identity owns no user aggregate.
    #[error("user not found")]
    UserNotFound,

    /// The requested role record does not exist for this user.
    #[error("role not found")]
    RoleNotFound,

    /// Quest completion requires an active role to receive the experience.
    #[error("no active role selected")]
    NoActiveRole,

    /// At most one quest may be on progress at a time.
    #[error("an active quest already exists")]
    ActiveQuestExists,

    /// The quest's stamina cost exceeds the current balance.
    #[error("not enough stamina")]
    NotEnoughStamina,

    /// No quest with that id belongs to the caller.
    #[error("quest not found")]
    QuestNotFound,

    /// The quest is already completed, failed, or past its deadline.
    #[error("quest is not on progress")]
    QuestNotInProgress,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Closed error set for the shop and inventory operations.
#[derive(Debug, Error)]
pub enum ShopError {
    /// The calling identity owns no user aggregate.
    #[error("user not found")]
    UserNotFound,

    /// No catalog entry with that id.
    #[error("skin not found")]
    SkinNotFound,

    /// The caller already owns an item for this skin.
    #[error("skin already owned")]
    AlreadyOwned,

    /// The skin's price exceeds the caller's coin balance.
    #[error("not enough coin")]
    NotEnoughCoin,

    /// No inventory item with that id belongs to the caller.
    #[error("inventory item not found")]
    InventoryNotFound,

    /// The caller lacks administrative rights.
    #[error("not an administrator")]
    NotAdmin,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl UserError {
    /// Map store-level "record not found" onto the user-facing variant; other
    /// store failures pass through untouched.
    pub(crate) fn from_lookup(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => UserError::UserNotFound,
            other => UserError::Store(other),
        }
    }
}

impl ShopError {
    pub(crate) fn from_lookup(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ShopError::UserNotFound,
            other => ShopError::Store(other),
        }
    }
}
