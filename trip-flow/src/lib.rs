pub mod analytics;
pub mod controller;
pub mod error;
pub mod itinerary;
pub mod llm;
pub mod parser;
pub mod prompt;
pub mod recorder;
pub mod session;
pub mod storage;
pub mod turn;

// Re-export commonly used types
pub use analytics::{AnalyticsSummary, GroupPattern, summarize};
pub use controller::TripController;
pub use error::{Result, TripError};
pub use itinerary::{HotelSuggestion, ItineraryActivity, ItineraryDay, ParsedItinerary};
#[cfg(feature = "rig")]
pub use llm::OpenRouterClient;
pub use llm::LlmClient;
pub use parser::parse_itinerary;
pub use recorder::{
    GeneratedItinerary, InMemoryInteractionRecorder, InteractionRecord, InteractionRecorder,
    SqliteInteractionRecorder, StoredInteraction,
};
pub use session::{Slot, SlotValue, Stage, TripSession};
pub use storage::{InMemorySessionStorage, SessionStorage};
pub use turn::{ItineraryResponse, TurnInput, TurnResult, TurnStatus};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct EchoFormatLlm;

    #[async_trait]
    impl LlmClient for EchoFormatLlm {
        async fn complete(&self, _preamble: &str, _prompt: &str) -> Result<String> {
            let activity = ItineraryActivity {
                time: "07:30 PM".to_string(),
                title: "Dhow dinner cruise".to_string(),
                description: "Dinner on Dubai Creek".to_string(),
                location: "Dubai Creek".to_string(),
                price: "AED 180 per person".to_string(),
            };
            Ok(format!(
                "Day 1:\n{}\n\nRecommendations:\n- Book ahead",
                activity.to_block()
            ))
        }
    }

    #[tokio::test]
    async fn test_end_to_end_with_sqlite_recorder() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let recorder = Arc::new(
            SqliteInteractionRecorder::connect("sqlite::memory:")
                .await
                .unwrap(),
        );
        let controller = TripController::new(storage, Arc::new(EchoFormatLlm), recorder.clone());

        for msg in ["2024-11-02", "2", "Solo Traveler", "Food Tours", "1500"] {
            controller
                .advance("trip-1", TurnInput::message(msg))
                .await
                .unwrap();
        }

        let stored = recorder.list(Some("trip-1")).await.unwrap();
        assert_eq!(stored.len(), 1);

        let day = &stored[0].record.generated_itinerary.itinerary[0];
        let activities = day.parsed_activities();
        assert_eq!(activities[0].title, "Dhow dinner cruise");
        assert_eq!(activities[0].price_aed(), Some(180));

        let summary = summarize(&stored);
        assert_eq!(summary.monthly_bookings["November"], 1);
        assert_eq!(summary.avg_budget_by_preference["Food Tours"], 1500.0);
    }
}
