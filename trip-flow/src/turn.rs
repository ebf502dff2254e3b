use serde::{Deserialize, Serialize};

use crate::itinerary::{HotelSuggestion, ItineraryDay, ParsedItinerary};
use crate::prompt;

/// One user message plus the optional typed fields a client form may send
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnInput {
    pub message: String,
    pub duration: Option<i64>,
    pub budget: Option<f64>,
}

impl TurnInput {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }
}

/// Payload returned to the client for every turn.
///
/// Conversational text travels as the single activity of a day-0 entry so a
/// client renders questions and itineraries through the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItineraryResponse {
    pub itinerary: Vec<ItineraryDay>,
    pub recommendations: Vec<String>,
    pub hotel_suggestion: Option<HotelSuggestion>,
}

impl ItineraryResponse {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            itinerary: vec![ItineraryDay {
                day: 0,
                activities: vec![message.into()],
            }],
            recommendations: Vec::new(),
            hotel_suggestion: None,
        }
    }

    /// The conversational text, if this is a day-0 message rather than an itinerary.
    pub fn message(&self) -> Option<&str> {
        match self.itinerary.as_slice() {
            [day] if day.day == 0 => day.activities.first().map(String::as_str),
            _ => None,
        }
    }
}

impl From<ParsedItinerary> for ItineraryResponse {
    fn from(parsed: ParsedItinerary) -> Self {
        Self {
            itinerary: parsed.days,
            recommendations: parsed.recommendations,
            hotel_suggestion: parsed.hotel,
        }
    }
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum TurnStatus {
    /// Control message answered with the welcome text; nothing stored
    Welcome,
    /// A slot was filled (or re-asked) and the next question sent
    WaitingForInput,
    /// The itinerary was generated, parsed and recorded
    Completed,
    /// The session already has an itinerary; nothing stored
    AlreadyComplete,
    /// Generation failed; the apology text was sent and the session left as it was
    Fallback(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub response: ItineraryResponse,
    pub status: TurnStatus,
}

impl TurnResult {
    pub fn welcome() -> Self {
        Self {
            response: ItineraryResponse::text(prompt::WELCOME_TEXT),
            status: TurnStatus::Welcome,
        }
    }

    pub fn waiting(question: &str) -> Self {
        Self {
            response: ItineraryResponse::text(question),
            status: TurnStatus::WaitingForInput,
        }
    }

    pub fn completed(parsed: ParsedItinerary) -> Self {
        Self {
            response: parsed.into(),
            status: TurnStatus::Completed,
        }
    }

    pub fn already_complete() -> Self {
        Self {
            response: ItineraryResponse::text(prompt::ALREADY_PLANNED_TEXT),
            status: TurnStatus::AlreadyComplete,
        }
    }

    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            response: ItineraryResponse::text(prompt::APOLOGY_TEXT),
            status: TurnStatus::Fallback(reason.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.status, TurnStatus::Fallback(_))
    }
}
