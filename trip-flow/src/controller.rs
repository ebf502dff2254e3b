//! TripController – loads a session, advances it by exactly **one** conversational step and
//! persists the result.
//!
//! The conversation is a fixed sequence of slots (travel dates, duration, group, preferences,
//! budget). Each turn stores the message into the next unfilled slot and answers with the
//! question for the slot after it. Filling the budget triggers generation: the whole session is
//! rendered into a prompt, sent to the [`LlmClient`], parsed, and recorded.
//!
//! Generation failures never surface as errors. They come back as
//! [`TurnStatus::Fallback`](crate::TurnStatus::Fallback) carrying the apology text, and the
//! session is not saved, so the traveller is asked for the budget again. `Err` is reserved for
//! session storage failures.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{
    error::Result,
    itinerary::ParsedItinerary,
    llm::LlmClient,
    parser::parse_itinerary,
    prompt::{self, GUIDE_PREAMBLE},
    recorder::{InteractionRecord, InteractionRecorder},
    session::{Slot, SlotValue, TripSession},
    storage::SessionStorage,
    turn::{TurnInput, TurnResult},
};

/// Drives trip sessions through the slot sequence
#[derive(Clone)]
pub struct TripController {
    storage: Arc<dyn SessionStorage>,
    llm: Arc<dyn LlmClient>,
    recorder: Arc<dyn InteractionRecorder>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl TripController {
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        llm: Arc<dyn LlmClient>,
        recorder: Arc<dyn InteractionRecorder>,
    ) -> Self {
        Self {
            storage,
            llm,
            recorder,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Advance `session_id` by one step with the given user input.
    pub async fn advance(&self, session_id: &str, input: TurnInput) -> Result<TurnResult> {
        if prompt::is_system_message(&input.message) {
            info!(session_id = %session_id, "Control message, answering with welcome");
            return Ok(TurnResult::welcome());
        }

        // Turns for the same session run one at a time.
        let lock = self.session_lock(session_id);
        let result = {
            let _guard = lock.lock().await;
            self.advance_locked(session_id, input).await
        };
        drop(lock);
        self.release_lock(session_id);
        result
    }

    async fn advance_locked(&self, session_id: &str, input: TurnInput) -> Result<TurnResult> {
        let mut session = match self.storage.get(session_id).await? {
            Some(session) => session,
            None => {
                info!(session_id = %session_id, "Creating new session");
                TripSession::new(session_id)
            }
        };

        if session.completed {
            info!(session_id = %session_id, "Session already has an itinerary");
            return Ok(TurnResult::already_complete());
        }

        let Some(slot) = session.next_slot() else {
            warn!(session_id = %session_id, "All slots filled without an itinerary, generating");
            let previous = session.clone();
            return self.generate(session, previous).await;
        };

        if input.message.trim().is_empty() {
            info!(session_id = %session_id, slot = ?slot, "Empty message, asking again");
            return Ok(TurnResult::waiting(slot.question()));
        }

        let previous = session.clone();
        let value = slot_value(slot, &input);
        session.conversation_history.push(input.message);
        let filled = session.fill(slot, value);
        debug_assert!(filled, "next_slot always accepts a fill");
        info!(session_id = %session_id, slot = ?slot, "Slot filled");

        match slot.next() {
            Some(next) => {
                self.storage.save(session).await?;
                Ok(TurnResult::waiting(next.question()))
            }
            None => self.generate(session, previous).await,
        }
    }

    /// Forget `session_id` so its next message starts a new trip.
    pub async fn reset(&self, session_id: &str) -> Result<()> {
        let lock = self.session_lock(session_id);
        let result = {
            let _guard = lock.lock().await;
            self.storage.delete(session_id).await
        };
        drop(lock);
        self.release_lock(session_id);
        result?;
        info!(session_id = %session_id, "Session reset for a new trip");
        Ok(())
    }

    pub async fn session(&self, session_id: &str) -> Result<Option<TripSession>> {
        self.storage.get(session_id).await
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the lock entry once no turn holds or waits on it.
    fn release_lock(&self, session_id: &str) {
        self.locks.remove_if(session_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Generates the itinerary for a fully filled session.
    ///
    /// The completed session is saved before the interaction is recorded. If
    /// recording fails the session goes back to `previous`, so a retry records
    /// the interaction once.
    async fn generate(
        &self,
        mut session: TripSession,
        previous: TripSession,
    ) -> Result<TurnResult> {
        let parsed = match self.request_itinerary(&session).await {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(session_id = %session.id, error = %e, "Itinerary generation failed");
                return Ok(TurnResult::fallback(e.to_string()));
            }
        };

        session.completed = true;
        let record = InteractionRecord::from_session(&session, &parsed);
        self.storage.save(session).await?;

        match self.recorder.record(&record).await {
            Ok(row_id) => {
                info!(
                    session_id = %record.session_id,
                    row_id,
                    days = parsed.days.len(),
                    recommendations = parsed.recommendations.len(),
                    has_hotel = parsed.hotel.is_some(),
                    "Itinerary generated and recorded"
                );
                Ok(TurnResult::completed(parsed))
            }
            Err(e) => {
                error!(session_id = %record.session_id, error = %e, "Failed to record interaction");
                self.storage.save(previous).await?;
                Ok(TurnResult::fallback(e.to_string()))
            }
        }
    }

    async fn request_itinerary(&self, session: &TripSession) -> Result<ParsedItinerary> {
        let prompt = prompt::render_generation_prompt(session)?;
        let reply = self.llm.complete(GUIDE_PREAMBLE, &prompt).await?;
        parse_itinerary(&reply)
    }
}

/// Typed overrides win for duration and budget; a zero override counts as absent.
fn slot_value(slot: Slot, input: &TurnInput) -> SlotValue {
    let typed = match slot {
        Slot::Duration => input.duration.filter(|d| *d != 0).map(SlotValue::Int),
        Slot::Budget => input.budget.filter(|b| *b != 0.0).map(SlotValue::Float),
        _ => None,
    };
    typed.unwrap_or_else(|| SlotValue::Text(input.message.clone()))
}
