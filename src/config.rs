//! Planner configuration.
//!
//! Every value has an explicit default; `PLANNER_*` environment variables
//! override them. A variable that is set but cannot be parsed is ignored and
//! the default stays in effect.

use chrono::NaiveDateTime;
use std::env;
use std::str::FromStr;

use crate::data::Constraints;
use crate::seating::AdjacencyRule;
use crate::timeslots::Horizon;

pub const DEFAULT_SLOT_MINUTES: i64 = 120;
pub const DEFAULT_BREAK_MINUTES: i64 = 30;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_LOG_FILTER: &str = "info";
const ANCHOR_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub slot_minutes: i64,
    pub break_minutes: i64,
    pub horizon: Horizon,
    pub constraints: Constraints,
    pub adjacency: AdjacencyRule,
    pub bind_addr: String,
    pub log_filter: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            slot_minutes: DEFAULT_SLOT_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
            horizon: Horizon::default(),
            constraints: Constraints::default(),
            adjacency: AdjacencyRule::default(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl PlannerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let anchor = lookup("PLANNER_ANCHOR")
            .and_then(|v| NaiveDateTime::parse_from_str(v.trim(), ANCHOR_FORMAT).ok())
            .unwrap_or(defaults.horizon.anchor);
        let row_width = parse_var(&lookup, "PLANNER_ROW_WIDTH")
            .filter(|w: &u32| *w > 0)
            .unwrap_or(crate::seating::DEFAULT_ROW_WIDTH);
        let adjacency = match lookup("PLANNER_ADJACENCY").as_deref().map(str::trim) {
            Some("geometric") => AdjacencyRule::Geometric,
            _ => AdjacencyRule::FixedWidth { row_width },
        };

        Self {
            slot_minutes: parse_var(&lookup, "PLANNER_SLOT_MINUTES")
                .unwrap_or(defaults.slot_minutes),
            break_minutes: parse_var(&lookup, "PLANNER_BREAK_MINUTES")
                .unwrap_or(defaults.break_minutes),
            horizon: Horizon {
                days: parse_var(&lookup, "PLANNER_DAYS").unwrap_or(defaults.horizon.days),
                slots_per_day: parse_var(&lookup, "PLANNER_SLOTS_PER_DAY")
                    .unwrap_or(defaults.horizon.slots_per_day),
                anchor,
            },
            constraints: Constraints {
                spacing_constraint: lookup("PLANNER_SPACING")
                    .and_then(|v| env_flag(&v))
                    .unwrap_or(defaults.constraints.spacing_constraint),
                ..defaults.constraints
            },
            adjacency,
            bind_addr: lookup("PLANNER_ADDR").unwrap_or(defaults.bind_addr),
            log_filter: lookup("PLANNER_LOG").unwrap_or(defaults.log_filter),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|v| v.trim().parse().ok())
}

fn env_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}
