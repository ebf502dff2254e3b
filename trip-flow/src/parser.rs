//! Splits a free-text itinerary reply into a hotel suggestion, day groups and
//! recommendations.
//!
//! The reply is expected to follow the layout requested by
//! [`GUIDE_PREAMBLE`](crate::prompt::GUIDE_PREAMBLE) but nothing enforces it, so
//! the parser is line oriented and lenient: it only fails when a hotel block is
//! present but cannot be separated from the day listing.

use tracing::debug;

use crate::error::{Result, TripError};
use crate::itinerary::{HotelSuggestion, ItineraryDay, ParsedItinerary};

const HOTEL_MARKER: &str = "Hotel Suggestion:";
const FIRST_DAY_MARKER: &str = "Day 1:";
const RECOMMENDATIONS_MARKER: &str = "Recommendations:";

/// Parses a model reply. Never mutates the input and never returns a partial result.
pub fn parse_itinerary(text: &str) -> Result<ParsedItinerary> {
    let (hotel, body) = split_hotel(text)?;
    let (day_content, rec_content) = body
        .split_once(RECOMMENDATIONS_MARKER)
        .unwrap_or((body, ""));

    Ok(ParsedItinerary {
        hotel,
        days: parse_days(day_content),
        recommendations: parse_recommendations(rec_content),
    })
}

/// Separates the hotel block from the rest of the text.
///
/// The returned body starts at the first `Day 1:`.
fn split_hotel(text: &str) -> Result<(Option<HotelSuggestion>, &str)> {
    if !text.contains(HOTEL_MARKER) {
        return Ok((None, text));
    }

    let anchor = text.find(FIRST_DAY_MARKER).ok_or_else(|| {
        TripError::MalformedSection(format!("'{HOTEL_MARKER}' without a '{FIRST_DAY_MARKER}' anchor"))
    })?;
    let (hotel_part, rest) = text.split_at(anchor);

    let mut hotel = HotelSuggestion::new();
    for line in hotel_part.lines().map(str::trim) {
        let Some(entry) = line.strip_prefix("- ") else {
            continue;
        };
        let (label, value) = entry.split_once(':').ok_or_else(|| {
            TripError::MalformedSection(format!("hotel line without a label: '{line}'"))
        })?;
        hotel.insert(label.trim().to_string(), value.trim().to_string());
    }

    Ok((Some(hotel), rest))
}

#[derive(Default)]
struct DayAccumulator<'a> {
    days: Vec<ItineraryDay>,
    current_day: Option<u32>,
    activities: Vec<String>,
    block: Vec<&'a str>,
}

impl<'a> DayAccumulator<'a> {
    fn flush_block(&mut self) {
        if !self.block.is_empty() {
            self.activities.push(self.block.join("\n"));
            self.block.clear();
        }
    }

    /// Emits the open day if it has a positive number and at least one activity.
    fn flush_day(&mut self) {
        let activities = std::mem::take(&mut self.activities);
        if let Some(day) = self.current_day.take() {
            if day > 0 && !activities.is_empty() {
                self.days.push(ItineraryDay { day, activities });
            }
        }
    }

    fn open_day(&mut self, header: &str) {
        self.flush_day();
        // An unfinished block is dropped when a new header arrives.
        self.block.clear();
        self.current_day = parse_day_number(header);
        if self.current_day.is_none() {
            debug!(line = %header, "Skipping day header without a day number");
        }
    }

    fn push_line(&mut self, line: &'a str) {
        if line.is_empty() {
            self.flush_block();
        } else if line.starts_with("Day") {
            self.open_day(line);
        } else if line.starts_with('-') {
            if starts_new_activity(&self.block, line) {
                self.flush_block();
            }
            self.block.push(line);
        } else if !self.block.is_empty() {
            self.block.push(line);
        }
    }

    fn finish(mut self) -> Vec<ItineraryDay> {
        self.flush_block();
        self.flush_day();
        self.days
    }
}

fn bullet_label(line: &str) -> Option<String> {
    let (label, _) = line.trim_start_matches('-').split_once(':')?;
    Some(label.trim().to_ascii_uppercase())
}

/// A bullet opens a new activity on `TIME` or on a label the open block already has.
fn starts_new_activity(block: &[&str], line: &str) -> bool {
    let Some(label) = bullet_label(line) else {
        return block.is_empty();
    };
    label == "TIME" || block.iter().any(|l| bullet_label(l).as_deref() == Some(label.as_str()))
}

/// Day number from a header such as `Day 3:`; the token after `Day` may carry colons.
fn parse_day_number(header: &str) -> Option<u32> {
    header
        .split_whitespace()
        .nth(1)
        .and_then(|token| token.replace(':', "").parse().ok())
}

fn parse_days(content: &str) -> Vec<ItineraryDay> {
    let mut acc = DayAccumulator::default();
    for line in content.lines() {
        acc.push_line(line.trim());
    }
    acc.finish()
}

fn parse_recommendations(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('-'))
        .map(|line| {
            line.trim_start_matches(|c| c == '-' || c == ' ')
                .trim()
                .to_string()
        })
        .collect()
}
