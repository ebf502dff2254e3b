use serde::{Deserialize, Serialize};
use std::fmt;

use crate::prompt;

/// One named field collected from the traveller, in the order it is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    TravelDates,
    Duration,
    GroupInfo,
    Preferences,
    Budget,
}

impl Slot {
    pub const ORDER: [Slot; 5] = [
        Slot::TravelDates,
        Slot::Duration,
        Slot::GroupInfo,
        Slot::Preferences,
        Slot::Budget,
    ];

    /// The slot asked for after this one, `None` after the budget.
    pub fn next(self) -> Option<Slot> {
        let idx = Self::ORDER.iter().position(|s| *s == self)?;
        Self::ORDER.get(idx + 1).copied()
    }

    /// The question that asks the traveller for this slot.
    pub fn question(self) -> &'static str {
        match self {
            Slot::TravelDates => prompt::WELCOME_TEXT,
            Slot::Duration => prompt::DURATION_QUESTION,
            Slot::GroupInfo => prompt::GROUP_QUESTION,
            Slot::Preferences => prompt::PREFERENCES_QUESTION,
            Slot::Budget => prompt::BUDGET_QUESTION,
        }
    }
}

/// A slot value as the caller supplied it: a typed number or the raw message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotValue::Int(v) => write!(f, "{v}"),
            SlotValue::Float(v) => write!(f, "{v}"),
            SlotValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<String> for SlotValue {
    fn from(value: String) -> Self {
        SlotValue::Text(value)
    }
}

impl From<&str> for SlotValue {
    fn from(value: &str) -> Self {
        SlotValue::Text(value.to_string())
    }
}

/// Position of a session in the conversation, named by what it waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AwaitDates,
    AwaitDuration,
    AwaitGroup,
    AwaitPreferences,
    AwaitBudget,
    Generate,
    Done,
}

impl From<Slot> for Stage {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::TravelDates => Stage::AwaitDates,
            Slot::Duration => Stage::AwaitDuration,
            Slot::GroupInfo => Stage::AwaitGroup,
            Slot::Preferences => Stage::AwaitPreferences,
            Slot::Budget => Stage::AwaitBudget,
        }
    }
}

/// Conversation state for one traveller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSession {
    pub id: String,
    pub travel_dates: Option<String>,
    pub duration: Option<SlotValue>,
    pub group_info: Option<String>,
    pub preferences: Option<String>,
    pub budget: Option<SlotValue>,
    /// Every accepted user message, oldest first
    pub conversation_history: Vec<String>,
    /// Set once an itinerary has been generated and recorded
    #[serde(default)]
    pub completed: bool,
}

impl TripSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            travel_dates: None,
            duration: None,
            group_info: None,
            preferences: None,
            budget: None,
            conversation_history: Vec::new(),
            completed: false,
        }
    }

    pub fn is_filled(&self, slot: Slot) -> bool {
        match slot {
            Slot::TravelDates => self.travel_dates.is_some(),
            Slot::Duration => self.duration.is_some(),
            Slot::GroupInfo => self.group_info.is_some(),
            Slot::Preferences => self.preferences.is_some(),
            Slot::Budget => self.budget.is_some(),
        }
    }

    /// First slot in order that has no value yet.
    pub fn next_slot(&self) -> Option<Slot> {
        Slot::ORDER.into_iter().find(|slot| !self.is_filled(*slot))
    }

    pub fn stage(&self) -> Stage {
        if self.completed {
            return Stage::Done;
        }
        self.next_slot().map(Stage::from).unwrap_or(Stage::Generate)
    }

    /// Stores `value` into `slot`.
    ///
    /// Returns `false` and leaves the session untouched when `slot` is not the
    /// next unfilled one, so slots can only ever be filled in order.
    #[must_use]
    pub fn fill(&mut self, slot: Slot, value: SlotValue) -> bool {
        if self.next_slot() != Some(slot) {
            return false;
        }
        match slot {
            Slot::TravelDates => self.travel_dates = Some(value.to_string()),
            Slot::Duration => self.duration = Some(value),
            Slot::GroupInfo => self.group_info = Some(value.to_string()),
            Slot::Preferences => self.preferences = Some(value.to_string()),
            Slot::Budget => self.budget = Some(value),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_order_and_next() {
        assert_eq!(Slot::TravelDates.next(), Some(Slot::Duration));
        assert_eq!(Slot::Preferences.next(), Some(Slot::Budget));
        assert_eq!(Slot::Budget.next(), None);
    }

    #[test]
    fn test_fill_rejects_out_of_order() {
        let mut session = TripSession::new("s1");
        assert!(!session.fill(Slot::Budget, SlotValue::Float(500.0)));
        assert!(session.budget.is_none());

        assert!(session.fill(Slot::TravelDates, "March 3rd".into()));
        assert!(!session.fill(Slot::TravelDates, "April".into()));
        assert_eq!(session.travel_dates.as_deref(), Some("March 3rd"));
        assert_eq!(session.stage(), Stage::AwaitDuration);
    }

    #[test]
    fn test_stage_progression() {
        let mut session = TripSession::new("s1");
        assert_eq!(session.stage(), Stage::AwaitDates);
        assert!(session.fill(Slot::TravelDates, "next week".into()));
        assert!(session.fill(Slot::Duration, SlotValue::Int(4)));
        assert!(session.fill(Slot::GroupInfo, "couple".into()));
        assert_eq!(session.stage(), Stage::AwaitPreferences);
        assert!(session.fill(Slot::Preferences, "desert safari".into()));
        assert!(session.fill(Slot::Budget, "3000".into()));
        assert_eq!(session.stage(), Stage::Generate);
        session.completed = true;
        assert_eq!(session.stage(), Stage::Done);
    }

    #[test]
    fn test_slot_value_serde_is_untagged() {
        let values: Vec<SlotValue> = serde_json::from_str(r#"[5, 1500.5, "a week"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                SlotValue::Int(5),
                SlotValue::Float(1500.5),
                SlotValue::Text("a week".to_string())
            ]
        );
        assert_eq!(values[0].to_string(), "5");
        assert_eq!(values[2].to_string(), "a week");
    }
}
