//! Fixed conversation texts and rendering of the itinerary generation prompt.

use crate::{error::Result, session::TripSession};

/// Marker that flags a message as a control message from the client UI.
pub const SYSTEM_MARKER: &str = "SYSTEM:";

pub const WELCOME_TEXT: &str = "Ahlan wa sahlan! Welcome to Dubai Tourism. It is my honor to help you discover the wonders of our beloved city. When would you like to experience Dubai's magic?";

pub const DURATION_QUESTION: &str =
    "Thank you for choosing Dubai. How many days would you like to spend exploring our city?";

pub const GROUP_QUESTION: &str = "To ensure we create the perfect experience, may I know who will be joining you on this journey?";

pub const PREFERENCES_QUESTION: &str = "Dubai offers countless experiences, from traditional souks to modern marvels. What interests you most about our city?";

pub const BUDGET_QUESTION: &str = "To help tailor your experience perfectly, what budget range do you have in mind for your Dubai adventure?";

pub const APOLOGY_TEXT: &str = "I apologize, but I encountered an error processing your response. Please try again.";

pub const ALREADY_PLANNED_TEXT: &str = "Your Dubai itinerary is ready. To plan another trip, please start a new trip.";

pub const GUIDE_PREAMBLE: &str = r#"You are Dubai Tourism's official AI guide. When generating the final itinerary,
you MUST follow this EXACT format:

Hotel Suggestion:
- NAME: [Hotel Name]
- CATEGORY: [Luxury/Mid-range/Budget]
- LOCATION: [Area in Dubai]
- PRICE: AED XXX per night
- AMENITIES: [Key amenities]
- DESCRIPTION: [Brief description]
- RATING: [X/5 stars]

[Leave a blank line]

Day 1:
- TIME: 09:00 AM
- TITLE: Activity Name
- DESCRIPTION: Detailed description
- LOCATION: Specific location
- PRICE: AED XXX per person

[Leave a blank line between activities]

- TIME: 02:00 PM
- TITLE: Next Activity
- DESCRIPTION: Detailed description
- LOCATION: Specific location
- PRICE: AED XXX per person

[Continue for each day]

Recommendations:
- Weather Considerations: [weather details]
- Cultural Etiquette: [etiquette details]
- Transportation Tips: [transport details]
- Must-Try Experiences: [experience details]

IMPORTANT:
- Suggest hotel based on budget and preferences
- Use exact format with dashes and labels
- Leave blank line between sections
- Include all fields for each activity
- Use 12-hour time format (AM/PM)
- Include AED prices
"#;

pub fn is_system_message(message: &str) -> bool {
    message.starts_with(SYSTEM_MARKER)
}

/// Renders the user-side prompt for the final generation call from the whole session.
pub fn render_generation_prompt(session: &TripSession) -> Result<String> {
    let state = serde_json::to_string(session)?;
    let duration = session
        .duration
        .as_ref()
        .map(|d| d.to_string())
        .unwrap_or_default();
    let budget = session
        .budget
        .as_ref()
        .map(|b| b.to_string())
        .unwrap_or_default();

    Ok(format!(
        "Traveller details: {state}\n\
         Duration: {duration} days\n\
         Budget: {budget} USD\n\
         \n\
         Conversation so far:\n\
         {history}\n\
         \n\
         All details are collected. Generate the detailed itinerary with a hotel suggestion now.",
        history = session.conversation_history.join("\n"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Slot, SlotValue};

    #[test]
    fn test_system_marker() {
        assert!(is_system_message("SYSTEM: language=en"));
        assert!(!is_system_message("system: lowercase is a normal message"));
        assert!(!is_system_message(" SYSTEM: leading space"));
    }

    #[test]
    fn test_render_generation_prompt_embeds_state() {
        let mut session = TripSession::new("abc");
        assert!(session.fill(Slot::TravelDates, "2nd November".into()));
        assert!(session.fill(Slot::Duration, SlotValue::Int(3)));
        assert!(session.fill(Slot::GroupInfo, "family with 2 kids".into()));
        assert!(session.fill(Slot::Preferences, "Theme Parks".into()));
        assert!(session.fill(Slot::Budget, SlotValue::Float(2500.0)));
        session.conversation_history = vec!["2nd November".into(), "3".into()];

        let prompt = render_generation_prompt(&session).unwrap();
        assert!(prompt.contains("Duration: 3 days"));
        assert!(prompt.contains("Budget: 2500 USD"));
        assert!(prompt.contains("\"group_info\":\"family with 2 kids\""));
        assert!(prompt.contains("2nd November\n3"));
    }
}
