//! Role selection and the leveling step function.
//!
//! Experience-to-level is a monotonic step function over fixed cumulative
//! thresholds. The same function backs quest payouts and client progress
//! bars, so both always agree on the current tier.

use crate::engine::errors::UserError;
use crate::engine::registry::require_user;
use crate::engine::storage::HabitStore;
use crate::engine::types::{RoleCategory, RoleRecord};

/// Cumulative experience at which each tier ends. Level 5 is the terminal,
/// unbounded tier.
pub const LEVEL_THRESHOLDS: [u64; 4] = [200, 500, 1500, 5000];

pub const MAX_LEVEL: u32 = LEVEL_THRESHOLDS.len() as u32 + 1;

/// Highest tier whose threshold the cumulative experience has reached.
/// 0 exp is level 1; exactly 200 is level 2; 199 stays level 1.
pub fn level_for_exp(exp: u64) -> u32 {
    let mut level = 1;
    for threshold in LEVEL_THRESHOLDS {
        if exp >= threshold {
            level += 1;
        }
    }
    level
}

/// Position within the current tier, for progress-bar rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierProgress {
    pub level: u32,
    /// Experience accumulated inside the current tier.
    pub exp_into_tier: u64,
    /// Width of the current tier; `None` for the terminal tier.
    pub tier_width: Option<u64>,
    /// 0.0–100.0; the terminal tier always reports 100.0.
    pub percent: f64,
}

pub fn tier_progress(exp: u64) -> TierProgress {
    let level = level_for_exp(exp);
    let lower = if level <= 1 {
        0
    } else {
        LEVEL_THRESHOLDS[(level - 2) as usize]
    };
    let upper = if level >= MAX_LEVEL {
        None
    } else {
        Some(LEVEL_THRESHOLDS[(level - 1) as usize])
    };
    let exp_into_tier = exp - lower;
    match upper {
        Some(upper) => {
            let width = upper - lower;
            TierProgress {
                level,
                exp_into_tier,
                tier_width: Some(width),
                percent: (exp_into_tier as f64 / width as f64) * 100.0,
            }
        }
        None => TierProgress {
            level,
            exp_into_tier,
            tier_width: None,
            percent: 100.0,
        },
    }
}

/// Credit experience to a role and recompute its level. The level never
/// decreases, even if thresholds were ever rebalanced downward.
pub(crate) fn award_experience(role: &mut RoleRecord, amount: u64) {
    role.exp = role.exp.saturating_add(amount);
    role.level = role.level.max(level_for_exp(role.exp));
}

/// Select (and lazily create) the role for `category`, deactivating every
/// other role of the caller.
pub fn choose_role(
    store: &HabitStore,
    principal: &str,
    category: RoleCategory,
) -> Result<(), UserError> {
    let mut user = require_user(store, principal)?;
    user.activate_role(category);
    store.put_user(user)?;
    Ok(())
}
