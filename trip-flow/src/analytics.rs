//! Booking statistics over the interaction log: preferences, budgets, group
//! sizes and seasonal demand by travel month.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::recorder::StoredInteraction;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupPattern {
    pub interactions: usize,
    pub avg_duration_days: Option<f64>,
    pub avg_budget: Option<f64>,
    /// Up to three most requested preferences with their counts
    pub top_preferences: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_interactions: usize,
    pub preference_counts: BTreeMap<String, usize>,
    pub preference_percentages: BTreeMap<String, f64>,
    pub avg_budget_by_preference: BTreeMap<String, f64>,
    pub avg_group_size: Option<f64>,
    pub group_patterns: BTreeMap<String, GroupPattern>,
    /// Share of each preference within the requests of one group description
    pub preference_percentages_by_group: BTreeMap<String, BTreeMap<String, f64>>,
    /// Interactions per travel month name, for rows whose travel date parses
    pub monthly_bookings: BTreeMap<String, usize>,
    pub monthly_avg_budget: BTreeMap<String, f64>,
    pub monthly_group_size: BTreeMap<String, f64>,
    /// Up to five most requested preferences per travel month
    pub monthly_top_preferences: BTreeMap<String, Vec<(String, usize)>>,
    pub avg_activity_price_aed: Option<f64>,
}

fn number_regex() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("valid regex"))
}

fn ordinal_regex() -> &'static Regex {
    static ORDINAL: OnceLock<Regex> = OnceLock::new();
    ORDINAL.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("valid regex"))
}

/// First number in free text, thousands separators ignored (`"$2,500"` is 2500).
pub fn first_number(text: &str) -> Option<f64> {
    number_regex()
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

pub fn budget_value(budget: &str) -> Option<f64> {
    first_number(budget)
}

pub fn duration_days(duration: &str) -> Option<u32> {
    first_number(duration).map(|d| d as u32)
}

/// Head count from a description such as `"Family with 2 kids"` or `"Group of 4 friends"`.
///
/// Families add two parents to the number found; without a number, solo is 1,
/// couple is 2, anything else defaults to 1.
pub fn group_size(group_info: &str) -> u32 {
    let lower = group_info.to_lowercase();
    if let Some(n) = first_number(&lower) {
        let n = n.min(f64::from(u32::MAX)) as u32;
        return if lower.contains("family") {
            n.saturating_add(2)
        } else {
            n
        };
    }
    if lower.contains("couple") { 2 } else { 1 }
}

/// Month name of a travel date given as `2024-11-02` or `2nd November`.
pub fn travel_month(travel_dates: &str) -> Option<String> {
    let raw = travel_dates.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.format("%B").to_string());
    }

    let mut cleaned = ordinal_regex().replace_all(raw, "$1").to_string();
    if !cleaned.split_whitespace().any(|t| t.len() == 4 && t.chars().all(|c| c.is_ascii_digit())) {
        cleaned.push_str(" 2024");
    }

    ["%d %B %Y", "%B %d %Y", "%d %b %Y", "%b %d %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
        .map(|date| date.format("%B").to_string())
}

fn split_preferences(preferences: &str) -> impl Iterator<Item = String> + '_ {
    preferences
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn top_counts(counts: &BTreeMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

fn percentages(counts: &BTreeMap<String, usize>) -> BTreeMap<String, f64> {
    let total: usize = counts.values().sum();
    if total == 0 {
        return BTreeMap::new();
    }
    counts
        .iter()
        .map(|(k, v)| (k.clone(), *v as f64 / total as f64 * 100.0))
        .collect()
}

#[derive(Default)]
struct MonthAccumulator {
    budgets: Vec<f64>,
    group_sizes: Vec<f64>,
    preferences: BTreeMap<String, usize>,
}

#[derive(Default)]
struct GroupAccumulator {
    interactions: usize,
    durations: Vec<f64>,
    budgets: Vec<f64>,
    preferences: BTreeMap<String, usize>,
}

pub fn summarize(interactions: &[StoredInteraction]) -> AnalyticsSummary {
    let mut summary = AnalyticsSummary {
        total_interactions: interactions.len(),
        ..Default::default()
    };
    let mut budgets_by_pref: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut groups: BTreeMap<String, GroupAccumulator> = BTreeMap::new();
    let mut months: BTreeMap<String, MonthAccumulator> = BTreeMap::new();
    let mut group_sizes = Vec::new();
    let mut prices = Vec::new();

    for interaction in interactions {
        let record = &interaction.record;
        let prefs: Vec<String> = record
            .preferences
            .as_deref()
            .map(|p| split_preferences(p).collect())
            .unwrap_or_default();
        let budget = record.budget.as_ref().and_then(|b| budget_value(&b.to_string()));
        let duration = record
            .duration
            .as_ref()
            .and_then(|d| duration_days(&d.to_string()));

        for pref in &prefs {
            *summary.preference_counts.entry(pref.clone()).or_default() += 1;
            if let Some(budget) = budget {
                budgets_by_pref.entry(pref.clone()).or_default().push(budget);
            }
        }

        let size = f64::from(record.group_info.as_deref().map(group_size).unwrap_or(1));
        group_sizes.push(size);
        if let Some(group) = &record.group_info {
            let acc = groups.entry(group.clone()).or_default();
            acc.interactions += 1;
            acc.durations.extend(duration.map(f64::from));
            acc.budgets.extend(budget);
            for pref in &prefs {
                *acc.preferences.entry(pref.clone()).or_default() += 1;
            }
        }

        if let Some(month) = record.travel_dates.as_deref().and_then(travel_month) {
            *summary.monthly_bookings.entry(month.clone()).or_default() += 1;
            let acc = months.entry(month).or_default();
            acc.budgets.extend(budget);
            acc.group_sizes.push(size);
            for pref in &prefs {
                *acc.preferences.entry(pref.clone()).or_default() += 1;
            }
        }

        prices.extend(
            record
                .generated_itinerary
                .itinerary
                .iter()
                .flat_map(|day| day.parsed_activities())
                .filter_map(|activity| activity.price_aed())
                .map(f64::from),
        );
    }

    summary.preference_percentages = percentages(&summary.preference_counts);
    summary.avg_budget_by_preference = budgets_by_pref
        .into_iter()
        .filter_map(|(pref, budgets)| mean(&budgets).map(|avg| (pref, avg)))
        .collect();
    summary.preference_percentages_by_group = groups
        .iter()
        .filter(|(_, acc)| !acc.preferences.is_empty())
        .map(|(group, acc)| (group.clone(), percentages(&acc.preferences)))
        .collect();
    summary.group_patterns = groups
        .into_iter()
        .map(|(group, acc)| {
            let pattern = GroupPattern {
                interactions: acc.interactions,
                avg_duration_days: mean(&acc.durations),
                avg_budget: mean(&acc.budgets),
                top_preferences: top_counts(&acc.preferences, 3),
            };
            (group, pattern)
        })
        .collect();
    for (month, acc) in months {
        if let Some(avg) = mean(&acc.budgets) {
            summary.monthly_avg_budget.insert(month.clone(), avg);
        }
        if let Some(avg) = mean(&acc.group_sizes) {
            summary.monthly_group_size.insert(month.clone(), avg);
        }
        summary
            .monthly_top_preferences
            .insert(month, top_counts(&acc.preferences, 5));
    }
    summary.avg_group_size = mean(&group_sizes);
    summary.avg_activity_price_aed = mean(&prices);

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itinerary::ItineraryDay;
    use crate::recorder::{GeneratedItinerary, InteractionRecord};
    use crate::session::SlotValue;
    use chrono::Utc;

    fn interaction(
        id: i64,
        dates: &str,
        group: &str,
        prefs: &str,
        budget: SlotValue,
        prices: &[u32],
    ) -> StoredInteraction {
        let activities = prices
            .iter()
            .map(|p| format!("- TITLE: Activity\n- PRICE: AED {p} per person"))
            .collect();
        StoredInteraction {
            id,
            record: InteractionRecord {
                session_id: format!("s{id}"),
                travel_dates: Some(dates.to_string()),
                duration: Some(SlotValue::Text("4 days".to_string())),
                group_info: Some(group.to_string()),
                preferences: Some(prefs.to_string()),
                budget: Some(budget),
                conversation_history: Vec::new(),
                generated_itinerary: GeneratedItinerary {
                    itinerary: vec![ItineraryDay { day: 1, activities }],
                    recommendations: Vec::new(),
                },
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_extractors() {
        assert_eq!(budget_value("$2,500"), Some(2500.0));
        assert_eq!(budget_value("around 3000 USD"), Some(3000.0));
        assert_eq!(budget_value("flexible"), None);
        assert_eq!(duration_days("7 Days"), Some(7));
        assert_eq!(group_size("Family with 2 kids"), 4);
        assert_eq!(group_size("Group of 6 friends"), 6);
        assert_eq!(group_size("Honeymoon couple"), 2);
        assert_eq!(group_size("Solo Traveler"), 1);
    }

    #[test]
    fn test_group_size_saturates_on_huge_numbers() {
        assert_eq!(group_size("Family of 4294967295"), u32::MAX);
        assert_eq!(group_size("Family of 99999999999999"), u32::MAX);
        assert_eq!(group_size("Group of 4294967295"), u32::MAX);
    }

    #[test]
    fn test_summarize_huge_family_does_not_panic() {
        let rows = vec![interaction(
            1,
            "2024-07-01",
            "Family of 4294967295",
            "Water Parks",
            SlotValue::Int(1000),
            &[],
        )];
        let summary = summarize(&rows);
        assert_eq!(summary.avg_group_size, Some(f64::from(u32::MAX)));
    }

    #[test]
    fn test_seasonal_breakdown() {
        let rows = vec![
            interaction(
                1,
                "2024-12-20",
                "Couple",
                "Desert Safaris, Food Tours",
                SlotValue::Int(2000),
                &[],
            ),
            interaction(
                2,
                "3rd December",
                "Family with 2 kids",
                "Desert Safaris, Theme Parks",
                SlotValue::Int(4000),
                &[],
            ),
            interaction(
                3,
                "2024-07-10",
                "Solo Traveler",
                "Shopping",
                SlotValue::Text("flexible".to_string()),
                &[],
            ),
        ];

        let summary = summarize(&rows);
        assert_eq!(summary.monthly_avg_budget["December"], 3000.0);
        assert!(!summary.monthly_avg_budget.contains_key("July"));
        assert_eq!(summary.monthly_group_size["December"], 3.0);
        assert_eq!(summary.monthly_group_size["July"], 1.0);

        let december = &summary.monthly_top_preferences["December"];
        assert_eq!(december.len(), 3);
        assert_eq!(december[0], ("Desert Safaris".to_string(), 2));
        assert_eq!(
            summary.monthly_top_preferences["July"],
            vec![("Shopping".to_string(), 1)]
        );
    }

    #[test]
    fn test_preference_percentages_by_group() {
        let rows = vec![
            interaction(
                1,
                "2024-12-20",
                "Couple",
                "Desert Safaris, Food Tours",
                SlotValue::Int(2000),
                &[],
            ),
            interaction(
                2,
                "2024-12-21",
                "Couple",
                "Desert Safaris",
                SlotValue::Int(2000),
                &[],
            ),
            interaction(
                3,
                "2024-12-22",
                "Solo Traveler",
                "Shopping",
                SlotValue::Int(900),
                &[],
            ),
        ];

        let summary = summarize(&rows);
        let couple = &summary.preference_percentages_by_group["Couple"];
        assert!((couple["Desert Safaris"] - 66.666).abs() < 0.01);
        assert!((couple["Food Tours"] - 33.333).abs() < 0.01);
        assert_eq!(summary.preference_percentages_by_group["Solo Traveler"]["Shopping"], 100.0);
    }

    #[test]
    fn test_travel_month_formats() {
        assert_eq!(travel_month("2024-11-02").as_deref(), Some("November"));
        assert_eq!(travel_month("2nd november").as_deref(), Some("November"));
        assert_eq!(travel_month("March 15th 2025").as_deref(), Some("March"));
        assert_eq!(travel_month("sometime soon"), None);
    }

    #[test]
    fn test_summarize() {
        let rows = vec![
            interaction(
                1,
                "2024-12-20",
                "Couple",
                "Desert Safaris, Food Tours",
                SlotValue::Float(2000.0),
                &[100, 300],
            ),
            interaction(
                2,
                "5th December",
                "Couple",
                "Desert Safaris",
                SlotValue::Text("$4,000".to_string()),
                &[200],
            ),
        ];

        let summary = summarize(&rows);
        assert_eq!(summary.total_interactions, 2);
        assert_eq!(summary.preference_counts["Desert Safaris"], 2);
        assert_eq!(summary.preference_counts["Food Tours"], 1);
        assert!((summary.preference_percentages["Desert Safaris"] - 66.666).abs() < 0.01);
        assert_eq!(summary.avg_budget_by_preference["Desert Safaris"], 3000.0);
        assert_eq!(summary.avg_budget_by_preference["Food Tours"], 2000.0);
        assert_eq!(summary.monthly_bookings["December"], 2);
        assert_eq!(summary.avg_group_size, Some(2.0));
        assert_eq!(summary.avg_activity_price_aed, Some(200.0));

        let couple = &summary.group_patterns["Couple"];
        assert_eq!(couple.interactions, 2);
        assert_eq!(couple.avg_duration_days, Some(4.0));
        assert_eq!(couple.top_preferences[0], ("Desert Safaris".to_string(), 2));
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_interactions, 0);
        assert!(summary.preference_percentages.is_empty());
        assert_eq!(summary.avg_group_size, None);
    }
}
