use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const USER_SCHEMA_VERSION: u8 = 1;
pub const SKIN_SCHEMA_VERSION: u8 = 1;

/// Opaque caller identity issued by the external identity provider. The
/// transport resolves it before a request reaches the engine; the engine only
/// uses it as the owner key of a user aggregate.
pub type PrincipalId = String;

/// The five fixed skill tracks a user can level up independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleCategory {
    Codes,
    Sports,
    Arts,
    Traveler,
    Literature,
}

impl RoleCategory {
    pub const ALL: [RoleCategory; 5] = [
        RoleCategory::Codes,
        RoleCategory::Sports,
        RoleCategory::Arts,
        RoleCategory::Traveler,
        RoleCategory::Literature,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RoleCategory::Codes => "Codes",
            RoleCategory::Sports => "Sports",
            RoleCategory::Arts => "Arts",
            RoleCategory::Traveler => "Traveler",
            RoleCategory::Literature => "Literature",
        }
    }

    /// Parse a category name (case-insensitive). Used by the CLI and tests.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "codes" => Some(RoleCategory::Codes),
            "sports" => Some(RoleCategory::Sports),
            "arts" => Some(RoleCategory::Arts),
            "traveler" => Some(RoleCategory::Traveler),
            "literature" => Some(RoleCategory::Literature),
            _ => None,
        }
    }
}

/// Quest lifecycle states. Transitions are one-way: `OnProgress` is the only
/// non-terminal state, and a quest never leaves `Completed` or `Failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    OnProgress,
    Completed,
    Failed,
}

/// Per-user, per-category progression state. Created lazily on first
/// selection; level and experience persist across re-selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleRecord {
    pub category: RoleCategory,
    pub level: u32,
    pub exp: u64,
    pub is_active: bool,
}

impl RoleRecord {
    pub fn new(category: RoleCategory) -> Self {
        Self {
            category,
            level: 1,
            exp: 0,
            is_active: false,
        }
    }
}

/// Client-supplied fields for a new quest (the AI suggestion service emits
/// this same shape; the engine only consumes it).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestDraft {
    pub title: String,
    pub description: String,
    pub stamina_cost: u64,
    pub coin_reward: u64,
    pub exp_reward: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestRecord {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub stamina_cost: u64,
    pub coin_reward: u64,
    pub exp_reward: u64,
    pub accepted_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub status: QuestStatus,
}

impl QuestRecord {
    pub fn new(id: u64, draft: QuestDraft, accepted_at: DateTime<Utc>, deadline: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            stamina_cost: draft.stamina_cost,
            coin_reward: draft.coin_reward,
            exp_reward: draft.exp_reward,
            accepted_at,
            deadline,
            status: QuestStatus::OnProgress,
        }
    }

    pub fn is_on_progress(&self) -> bool {
        self.status == QuestStatus::OnProgress
    }

    /// Pure deadline predicate, decoupled from stored status. Checked by the
    /// sweep and re-checked defensively by completion.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    pub fn mark_completed(&mut self) {
        self.status = QuestStatus::Completed;
    }

    pub fn mark_failed(&mut self) {
        self.status = QuestStatus::Failed;
    }
}

/// A catalog skin owned by a user. `is_active` marks the equipped appearance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryItem {
    pub id: u64,
    pub skin_id: u64,
    pub acquired_at: DateTime<Utc>,
    pub is_active: bool,
}

impl InventoryItem {
    pub fn new(id: u64, skin_id: u64, acquired_at: DateTime<Utc>) -> Self {
        Self {
            id,
            skin_id,
            acquired_at,
            is_active: false,
        }
    }
}

/// Admin-supplied fields for a new catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkinDraft {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price: u64,
}

/// Catalog entry for a purchasable cosmetic. Administered, never owned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkinRecord {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price: u64,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl SkinRecord {
    pub fn new(id: u64, draft: SkinDraft) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            image_url: draft.image_url,
            price: draft.price,
            created_at: Utc::now(),
            schema_version: SKIN_SCHEMA_VERSION,
        }
    }
}

/// The user aggregate. Roles, quest history, and inventory are stored inline
/// so every per-user operation is a single record round-trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub principal: PrincipalId,
    pub username: String,
    pub coin: u64,
    pub stamina: u64,
    /// Last time the stamina balance was credited by the lazy refill.
    pub stamina_updated_at: DateTime<Utc>,
    pub last_action_at: DateTime<Utc>,
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
    #[serde(default)]
    pub quests: Vec<QuestRecord>,
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl UserRecord {
    pub fn new(principal: &str, username: &str, stamina_max: u64) -> Self {
        let now = Utc::now();
        Self {
            principal: principal.to_string(),
            username: username.to_string(),
            coin: 0,
            stamina: stamina_max,
            stamina_updated_at: now,
            last_action_at: now,
            roles: Vec::new(),
            quests: Vec::new(),
            inventory: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: USER_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = now;
        self.last_action_at = now;
    }

    pub fn role(&self, category: RoleCategory) -> Option<&RoleRecord> {
        self.roles.iter().find(|r| r.category == category)
    }

    pub fn active_role(&self) -> Option<&RoleRecord> {
        self.roles.iter().find(|r| r.is_active)
    }

    pub fn active_role_mut(&mut self) -> Option<&mut RoleRecord> {
        self.roles.iter_mut().find(|r| r.is_active)
    }

    /// Activate the role for `category`, creating it at level 1 when absent
    /// and clearing the flag on every other role.
    pub fn activate_role(&mut self, category: RoleCategory) {
        if self.role(category).is_none() {
            self.roles.push(RoleRecord::new(category));
        }
        for role in &mut self.roles {
            role.is_active = role.category == category;
        }
    }

    pub fn quest(&self, quest_id: u64) -> Option<&QuestRecord> {
        self.quests.iter().find(|q| q.id == quest_id)
    }

    pub fn quest_mut(&mut self, quest_id: u64) -> Option<&mut QuestRecord> {
        self.quests.iter_mut().find(|q| q.id == quest_id)
    }

    pub fn active_quest(&self) -> Option<&QuestRecord> {
        self.quests.iter().find(|q| q.is_on_progress())
    }

    pub fn has_active_quest(&self) -> bool {
        self.active_quest().is_some()
    }

    pub fn owns_skin(&self, skin_id: u64) -> bool {
        self.inventory.iter().any(|item| item.skin_id == skin_id)
    }

    pub fn item(&self, inventory_id: u64) -> Option<&InventoryItem> {
        self.inventory.iter().find(|item| item.id == inventory_id)
    }

    pub fn active_item(&self) -> Option<&InventoryItem> {
        self.inventory.iter().find(|item| item.is_active)
    }

    /// Equip the item with `inventory_id` exclusively. Returns false when the
    /// user does not own such an item; nothing changes in that case.
    pub fn equip_item(&mut self, inventory_id: u64) -> bool {
        if self.item(inventory_id).is_none() {
            return false;
        }
        for item in &mut self.inventory {
            item.is_active = item.id == inventory_id;
        }
        true
    }
}

/// Full profile as returned to the dashboard: the aggregate plus its role list
/// and the currently equipped item, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub user: UserRecord,
    pub roles: Vec<RoleRecord>,
    pub active_inventory: Option<InventoryItem>,
}

/// Catalog partitioned for the caller: not-yet-owned vs already-owned skins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ShopView {
    pub available: Vec<SkinRecord>,
    pub owned: Vec<SkinRecord>,
}

/// Caller's quest log partitioned by status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct QuestHistory {
    pub on_progress: Vec<QuestRecord>,
    pub completed: Vec<QuestRecord>,
    pub failed: Vec<QuestRecord>,
}

/// An owned item joined with its catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryEntry {
    pub item: InventoryItem,
    pub skin: SkinRecord,
}

/// Derived leaderboard row. Never persisted; recomputed on demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub username: String,
    pub exp: u64,
    pub level: u32,
    pub skin: Option<SkinRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LeaderboardView {
    pub top: Vec<LeaderboardEntry>,
    /// The caller's own row and rank, present even when outside the top N.
    pub mine: Option<LeaderboardEntry>,
}

/// Stamina economy knobs: maximum replenishable capacity and the lazy refill
/// interval (one point per elapsed interval, capped at `max`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StaminaConfig {
    pub max: u64,
    pub regen_minutes: i64,
}

impl Default for StaminaConfig {
    fn default() -> Self {
        Self {
            max: 100,
            regen_minutes: 5,
        }
    }
}

/// Quest lifecycle knobs: the fixed acceptance-to-deadline window plus the
/// stamina economy gating acceptance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuestConfig {
    pub deadline_hours: i64,
    pub stamina: StaminaConfig,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            deadline_hours: 24,
            stamina: StaminaConfig::default(),
        }
    }
}
