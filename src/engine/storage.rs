use std::path::{Path, PathBuf};

use sled::IVec;

use crate::engine::errors::StoreError;
use crate::engine::types::{
    SkinDraft, SkinRecord, UserRecord, SKIN_SCHEMA_VERSION, USER_SCHEMA_VERSION,
};

const TREE_PRIMARY: &str = "habitforge";
const TREE_CATALOG: &str = "habitforge_catalog";

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct HabitStoreBuilder {
    path: PathBuf,
    ensure_catalog_seed: bool,
}

impl HabitStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ensure_catalog_seed: true,
        }
    }

    /// Opt out of seeding the starter catalog during initialization (useful
    /// for targeted tests).
    pub fn without_catalog_seed(mut self) -> Self {
        self.ensure_catalog_seed = false;
        self
    }

    pub fn open(self) -> Result<HabitStore, StoreError> {
        HabitStore::open_with_options(self.path, self.ensure_catalog_seed)
    }
}

/// Sled-backed persistence for user aggregates and the skin catalog.
pub struct HabitStore {
    _db: sled::Db,
    primary: sled::Tree,
    catalog: sled::Tree,
}

impl HabitStore {
    /// Open (or create) the store rooted at `path`, seeding the starter skin
    /// catalog if it is empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open_with_options(path, true)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, seed_catalog: bool) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let primary = db.open_tree(TREE_PRIMARY)?;
        let catalog = db.open_tree(TREE_CATALOG)?;
        let store = Self {
            _db: db,
            primary,
            catalog,
        };

        if seed_catalog {
            store.seed_catalog_if_needed()?;
        }

        Ok(store)
    }

    fn user_key(principal: &str) -> Vec<u8> {
        format!("users:{}", principal).into_bytes()
    }

    fn username_key(username: &str) -> Vec<u8> {
        format!("usernames:{}", username.to_lowercase()).into_bytes()
    }

    fn skin_key(skin_id: u64) -> Vec<u8> {
        format!("skins:{:010}", skin_id).into_bytes()
    }

    fn seq_key(name: &str) -> Vec<u8> {
        format!("seq:{}", name).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, StoreError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Insert or update a user aggregate. Refreshes the last-action timestamp.
    pub fn put_user(&self, mut user: UserRecord) -> Result<(), StoreError> {
        user.schema_version = USER_SCHEMA_VERSION;
        user.touch();
        let key = Self::user_key(&user.principal);
        let bytes = Self::serialize(&user)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    /// Fetch a user aggregate by principal.
    pub fn get_user(&self, principal: &str) -> Result<UserRecord, StoreError> {
        let key = Self::user_key(principal);
        let Some(bytes) = self.primary.get(&key)? else {
            return Err(StoreError::NotFound(format!("user: {}", principal)));
        };
        let record: UserRecord = Self::deserialize(bytes)?;
        if record.schema_version != USER_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                entity: "user",
                expected: USER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Fetch a user aggregate by principal, mapping absence to `None`.
    pub fn find_user(&self, principal: &str) -> Result<Option<UserRecord>, StoreError> {
        match self.get_user(principal) {
            Ok(user) => Ok(Some(user)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Resolve a username (case-insensitive) to its owning aggregate.
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let Some(bytes) = self.primary.get(Self::username_key(username))? else {
            return Ok(None);
        };
        let principal = String::from_utf8_lossy(&bytes).to_string();
        self.find_user(&principal)
    }

    pub fn username_taken(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.primary.contains_key(Self::username_key(username))?)
    }

    /// Reserve a username for a principal in the unique index.
    pub fn index_username(&self, username: &str, principal: &str) -> Result<(), StoreError> {
        self.primary
            .insert(Self::username_key(username), principal.as_bytes())?;
        self.primary.flush()?;
        Ok(())
    }

    /// List all registered principals. Drives the expiry sweep and the
    /// leaderboard aggregation.
    pub fn list_principals(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for entry in self.primary.scan_prefix(b"users:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(principal) = text.strip_prefix("users:") {
                ids.push(principal.to_string());
            }
        }
        Ok(ids)
    }

    pub fn user_count(&self) -> Result<usize, StoreError> {
        Ok(self.primary.scan_prefix(b"users:").count())
    }

    /// Insert or update a catalog entry.
    pub fn put_skin(&self, mut skin: SkinRecord) -> Result<(), StoreError> {
        skin.schema_version = SKIN_SCHEMA_VERSION;
        let key = Self::skin_key(skin.id);
        let bytes = Self::serialize(&skin)?;
        self.catalog.insert(key, bytes)?;
        self.catalog.flush()?;
        Ok(())
    }

    pub fn get_skin(&self, skin_id: u64) -> Result<SkinRecord, StoreError> {
        let Some(bytes) = self.catalog.get(Self::skin_key(skin_id))? else {
            return Err(StoreError::NotFound(format!("skin: {}", skin_id)));
        };
        let record: SkinRecord = Self::deserialize(bytes)?;
        if record.schema_version != SKIN_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                entity: "skin",
                expected: SKIN_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn find_skin(&self, skin_id: u64) -> Result<Option<SkinRecord>, StoreError> {
        match self.get_skin(skin_id) {
            Ok(skin) => Ok(Some(skin)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// List the whole catalog in id order (the key encoding is zero-padded,
    /// so sled's key order is id order).
    pub fn list_skins(&self) -> Result<Vec<SkinRecord>, StoreError> {
        let mut skins = Vec::new();
        for entry in self.catalog.scan_prefix(b"skins:") {
            let (_, bytes) = entry?;
            skins.push(Self::deserialize(bytes)?);
        }
        Ok(skins)
    }

    pub fn skin_count(&self) -> Result<usize, StoreError> {
        Ok(self.catalog.scan_prefix(b"skins:").count())
    }

    fn next_id(&self, name: &str) -> Result<u64, StoreError> {
        let key = Self::seq_key(name);
        let next = match self.primary.get(&key)? {
            Some(bytes) => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes);
                u64::from_be_bytes(buf) + 1
            }
            None => 1,
        };
        self.primary.insert(key, &next.to_be_bytes())?;
        self.primary.flush()?;
        Ok(next)
    }

    pub fn next_quest_id(&self) -> Result<u64, StoreError> {
        self.next_id("quest")
    }

    pub fn next_skin_id(&self) -> Result<u64, StoreError> {
        self.next_id("skin")
    }

    pub fn next_inventory_id(&self) -> Result<u64, StoreError> {
        self.next_id("inventory")
    }

    /// Seed the starter skin catalog when none exists yet. Returns how many
    /// entries were inserted.
    pub fn seed_catalog_if_needed(&self) -> Result<usize, StoreError> {
        if self.catalog.scan_prefix(b"skins:").next().is_some() {
            return Ok(0);
        }
        let mut inserted = 0usize;
        for draft in starter_catalog() {
            let id = self.next_skin_id()?;
            self.put_skin(SkinRecord::new(id, draft))?;
            inserted += 1;
        }
        Ok(inserted)
    }
}

/// The default cosmetic catalog inserted on first open. Admins extend it at
/// runtime through `add_skin`.
pub fn starter_catalog() -> Vec<SkinDraft> {
    let entry = |name: &str, description: &str, image: &str, price: u64| SkinDraft {
        name: name.to_string(),
        description: description.to_string(),
        image_url: image.to_string(),
        price,
    };
    vec![
        entry(
            "Plain Tunic",
            "Simple traveler's garb for those just starting out.",
            "/skins/plain_tunic.png",
            50,
        ),
        entry(
            "Scholar's Robe",
            "A robe favored by those who grind the Literature track.",
            "/skins/scholars_robe.png",
            150,
        ),
        entry(
            "Track Jacket",
            "Breathable jacket for the habitually sporty.",
            "/skins/track_jacket.png",
            150,
        ),
        entry(
            "Painter's Smock",
            "Ink-stained and proud of it.",
            "/skins/painters_smock.png",
            200,
        ),
        entry(
            "Terminal Hoodie",
            "Glows faintly in the dark, like a cursor at 2am.",
            "/skins/terminal_hoodie.png",
            300,
        ),
        entry(
            "Wayfarer's Cloak",
            "For users who never log their habits from the same city twice.",
            "/skins/wayfarers_cloak.png",
            500,
        ),
    ]
}
