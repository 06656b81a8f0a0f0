// Subset of the splatoon3.ink schedules payload that report building
// consumes. Field names mirror the upstream JSON (camelCase).

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulePayload {
    pub data: ScheduleData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleData {
    pub regular_schedules: NodeList<BattleNode>,
    pub bankara_schedules: NodeList<BattleNode>,
    #[serde(default)]
    pub fest_schedules: Option<NodeList<BattleNode>>,
    pub coop_grouping_schedule: CoopSchedules,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeList<T> {
    pub nodes: Vec<T>,
}

/// One two-hour battle rotation. Exactly one of the `*_match_setting(s)`
/// fields is populated depending on which schedule list the node came from;
/// during a Splatfest the regular/anarchy settings are null.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleNode {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    #[serde(default)]
    pub regular_match_setting: Option<MatchSetting>,
    #[serde(default)]
    pub bankara_match_settings: Option<Vec<MatchSetting>>,
    #[serde(default)]
    pub fest_match_settings: Option<Vec<MatchSetting>>,
}

impl BattleNode {
    pub fn covers(&self, now: DateTime<Tz>) -> bool {
        self.start_time <= now && now < self.end_time
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSetting {
    pub vs_stages: Vec<Stage>,
    pub vs_rule: Rule,
}

impl MatchSetting {
    pub fn stage_names(&self) -> String {
        self.vs_stages
            .iter()
            .map(|stage| stage.name.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stage {
    pub name: String,
    #[serde(default)]
    pub image: Option<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoopSchedules {
    pub regular_schedules: NodeList<CoopNode>,
}

/// One Salmon Run rotation (roughly 40 hours).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoopNode {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub setting: CoopSetting,
}

impl CoopNode {
    pub fn covers(&self, now: DateTime<Tz>) -> bool {
        self.start_time <= now && now < self.end_time
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoopSetting {
    pub coop_stage: Stage,
    pub weapons: Vec<Weapon>,
}

impl CoopSetting {
    pub fn weapon_names(&self) -> String {
        self.weapons
            .iter()
            .map(|weapon| weapon.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Weapon {
    pub name: String,
}
