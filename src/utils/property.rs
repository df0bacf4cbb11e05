// ABOUTME: Real-estate helpers: price and area formatting, mortgage maths, validators
// ABOUTME: Also emergency keyword detection and help-ticket id generation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::OnceLock;

use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use regex::Regex;

/// Words that flag a message as an emergency
pub const EMERGENCY_KEYWORDS: [&str; 11] = [
    "emergency",
    "urgent",
    "leak",
    "flood",
    "fire",
    "electrical",
    "gas",
    "broken",
    "not working",
    "immediate",
    "asap",
];

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();
static PHONE_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn email_regex() -> Option<&'static Regex> {
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

fn phone_regex() -> Option<&'static Regex> {
    PHONE_RE
        .get_or_init(|| Regex::new(r"^\+?[\d\s\-()]{10,}$").ok())
        .as_ref()
}

/// Group the integer part of `value` in threes: `1234567` -> `1,234,567`
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// US-dollar price without decimals: `$1,250,000`
#[must_use]
pub fn format_price(price: f64) -> String {
    let rounded = price.abs().round() as u64;
    let sign = if price < 0.0 && rounded > 0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(rounded))
}

/// Monthly payment on `principal` at `annual_rate` percent over `years`.
///
/// A zero rate spreads the principal evenly. Returns `0.0` when the term
/// is zero.
#[must_use]
pub fn calculate_mortgage(principal: f64, annual_rate: f64, years: u32) -> f64 {
    let payments = f64::from(years) * 12.0;
    if payments == 0.0 {
        return 0.0;
    }

    let monthly_rate = annual_rate / 100.0 / 12.0;
    if monthly_rate == 0.0 {
        return principal / payments;
    }

    let growth = (1.0 + monthly_rate).powf(payments);
    principal * monthly_rate * growth / (growth - 1.0)
}

/// Price per square foot, rounded; `None` for a non-positive area
#[must_use]
pub fn price_per_square_foot(price: f64, square_feet: f64) -> Option<u64> {
    (square_feet > 0.0).then(|| (price / square_feet).round().max(0.0) as u64)
}

/// `1,850 sq ft`
#[must_use]
pub fn format_square_footage(square_feet: u64) -> String {
    format!("{} sq ft", group_thousands(square_feet))
}

/// `Mar 4, 2025, 09:15 AM`
#[must_use]
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%b %-d, %Y, %I:%M %p").to_string()
}

/// Loose email shape check: something@something.tld, no whitespace
#[must_use]
pub fn validate_email(email: &str) -> bool {
    email_regex().is_some_and(|re| re.is_match(email))
}

/// At least ten digits, spaces, dashes or parentheses, optional leading `+`
#[must_use]
pub fn validate_phone(phone: &str) -> bool {
    phone_regex().is_some_and(|re| re.is_match(phone))
}

/// Whether `message` mentions any emergency keyword, case-insensitively
#[must_use]
pub fn is_emergency_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    EMERGENCY_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

/// Help-ticket id: `PT-<last six digits of epoch millis>-<three random digits>`
#[must_use]
pub fn generate_ticket_id() -> String {
    ticket_id_at(Utc::now(), rand::thread_rng().gen_range(0..1000))
}

fn ticket_id_at(now: DateTime<Utc>, random: u32) -> String {
    let millis = now.timestamp_millis().unsigned_abs() % 1_000_000;
    format!("PT-{millis:06}-{random:03}")
}
