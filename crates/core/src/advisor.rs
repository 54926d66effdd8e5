//! Equipment advice seam.

use crate::state::{CharacterState, EquipSlot, ItemStack, Skill};

/// What the agent is about to spend its ticks on. Changing activity is what
/// triggers an equipment re-evaluation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activity {
    Combat,
    Gathering(Skill),
}

/// One slot swap: unequip the old code (if any), equip the new one from the
/// bank or inventory.
#[derive(Clone, Debug, PartialEq)]
pub struct GearSwap {
    pub slot: EquipSlot,
    pub unequip: Option<String>,
    pub equip: String,
}

/// Produces the ordered slot swaps worth performing before an activity.
///
/// Advice is best-effort: the agent logs and swallows swap failures rather
/// than aborting its tick.
pub trait EquipmentAdvisor: Send + Sync {
    fn plan_swaps(
        &self,
        state: &CharacterState,
        bank: &[ItemStack],
        activity: Activity,
    ) -> Vec<GearSwap>;
}
