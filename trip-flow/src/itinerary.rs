use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Hotel block labels (`NAME`, `CATEGORY`, ...) mapped to their free-text values,
/// in the order the model wrote them
pub type HotelSuggestion = IndexMap<String, String>;

/// One day of the itinerary, activities kept as the raw labeled text blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryDay {
    pub day: u32,
    pub activities: Vec<String>,
}

impl ItineraryDay {
    pub fn parsed_activities(&self) -> Vec<ItineraryActivity> {
        self.activities
            .iter()
            .map(|block| ItineraryActivity::from_block(block))
            .collect()
    }
}

/// Result of parsing a model reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedItinerary {
    pub hotel: Option<HotelSuggestion>,
    pub days: Vec<ItineraryDay>,
    pub recommendations: Vec<String>,
}

impl ParsedItinerary {
    /// Writes the itinerary back out in the layout the model is asked to produce.
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        if let Some(hotel) = &self.hotel {
            out.push_str("Hotel Suggestion:\n");
            for (label, value) in hotel {
                out.push_str(&format!("- {label}: {value}\n"));
            }
            out.push('\n');
        }

        for day in &self.days {
            out.push_str(&format!("Day {}:\n", day.day));
            for activity in &day.activities {
                out.push_str(activity);
                out.push_str("\n\n");
            }
        }

        if !self.recommendations.is_empty() {
            out.push_str("Recommendations:\n");
            for rec in &self.recommendations {
                out.push_str(&format!("- {rec}\n"));
            }
        }

        out
    }
}

/// A single scheduled activity decoded from its labeled block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryActivity {
    pub time: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: String,
}

#[derive(Clone, Copy)]
enum Field {
    Time,
    Title,
    Description,
    Location,
    Price,
}

impl Field {
    fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "TIME" => Some(Field::Time),
            "TITLE" => Some(Field::Title),
            "DESCRIPTION" => Some(Field::Description),
            "LOCATION" => Some(Field::Location),
            "PRICE" => Some(Field::Price),
            _ => None,
        }
    }
}

impl ItineraryActivity {
    /// Decodes a block of `- LABEL: value` lines.
    ///
    /// Attributes are found by label rather than position. Unlabelled lines
    /// continue the attribute before them; unknown labels are ignored.
    pub fn from_block(block: &str) -> Self {
        let mut activity = Self::default();
        let mut last: Option<Field> = None;

        for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let labeled = line
                .strip_prefix('-')
                .and_then(|rest| rest.split_once(':'))
                .and_then(|(label, value)| Field::from_label(label).map(|f| (f, value.trim())));

            match labeled {
                Some((field, value)) => {
                    *activity.field_mut(field) = value.to_string();
                    last = Some(field);
                }
                None if line.starts_with('-') => last = None,
                None => {
                    if let Some(field) = last {
                        let slot = activity.field_mut(field);
                        if !slot.is_empty() {
                            slot.push(' ');
                        }
                        slot.push_str(line);
                    }
                }
            }
        }

        activity
    }

    /// Five labeled lines in the order TIME, TITLE, DESCRIPTION, LOCATION, PRICE.
    pub fn to_block(&self) -> String {
        format!(
            "- TIME: {}\n- TITLE: {}\n- DESCRIPTION: {}\n- LOCATION: {}\n- PRICE: {}",
            self.time, self.title, self.description, self.location, self.price
        )
    }

    /// Integer amount from a price such as `AED 250 per person`.
    pub fn price_aed(&self) -> Option<u32> {
        static AED: OnceLock<Regex> = OnceLock::new();
        let re = AED.get_or_init(|| Regex::new(r"AED\s*([0-9][0-9,]*)").expect("valid regex"));
        let caps = re.captures(&self.price)?;
        caps.get(1)?.as_str().replace(',', "").parse().ok()
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Time => &mut self.time,
            Field::Title => &mut self.title,
            Field::Description => &mut self.description,
            Field::Location => &mut self.location,
            Field::Price => &mut self.price,
        }
    }
}
