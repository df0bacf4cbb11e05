// ABOUTME: Structured conversation context sent alongside a chat message
// ABOUTME: Renders preferences, tickets, location and goal into a delimited text block
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! The context never reaches the model as structured fields. It is rendered
//! into a `[CONTEXT] ... [/CONTEXT]` block and appended to the user message.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Opening delimiter of the rendered block
pub const CONTEXT_OPEN: &str = "[CONTEXT]";
/// Closing delimiter of the rendered block
pub const CONTEXT_CLOSE: &str = "[/CONTEXT]";

/// Inclusive numeric range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range<T> {
    /// Lower bound
    pub min: T,
    /// Upper bound
    pub max: T,
}

/// Kinds of property a user may ask about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// Apartment or flat
    Apartment,
    /// Detached house
    House,
    /// Condominium unit
    Condo,
    /// Townhouse
    Townhouse,
    /// Commercial premises
    Commercial,
    /// Plot of land
    Land,
}

/// How the user intends to acquire the property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseType {
    /// Purchase to own
    Buy,
    /// Lease
    Rent,
    /// Purchase as an investment
    Invest,
}

/// Search preferences collected from the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPreferences {
    /// Price range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Range<f64>>,
    /// Free-text location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Property kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    /// Minimum bedrooms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    /// Minimum bathrooms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
    /// Wanted amenities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<String>>,
    /// Buy, rent or invest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_type: Option<PurchaseType>,
    /// Living area range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_footage: Option<Range<f64>>,
    /// Construction year range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_built: Option<Range<i32>>,
    /// Parking spaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_spaces: Option<u32>,
    /// Pets allowed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet_friendly: Option<bool>,
    /// School district
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_district: Option<String>,
    /// Transport options nearby
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transportation: Option<Vec<String>>,
}

/// Category of a support request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    /// Routine maintenance
    Maintenance,
    /// Needs immediate attention
    Emergency,
    /// Tenant relations
    Tenant,
    /// Anything else
    General,
    /// Electrical fault
    Electrical,
    /// Plumbing fault
    Plumbing,
    /// Heating, ventilation or air conditioning
    Hvac,
    /// Broken appliance
    Appliance,
}

/// Ticket urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait
    Low,
    /// Normal
    Medium,
    /// Soon
    High,
    /// Now
    Urgent,
}

/// Ticket lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    /// Just filed
    Open,
    /// Has an owner
    Assigned,
    /// Being worked on
    InProgress,
    /// Fixed, awaiting confirmation
    Resolved,
    /// Done
    Closed,
}

/// Preferred contact channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    /// Phone call
    Phone,
    /// Email
    Email,
    /// Text message
    Text,
}

/// Who to reach about a ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    /// Contact name
    pub name: String,
    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Preferred channel
    pub preferred_contact: ContactMethod,
}

/// A property-management help ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpTicket {
    /// Ticket id (`PT-...`)
    pub id: String,
    /// Address of the affected property
    pub property_address: String,
    /// Issue category
    pub issue_type: IssueType,
    /// Short title
    pub title: String,
    /// Problem description
    pub description: String,
    /// Urgency
    pub priority: Priority,
    /// Who to contact
    pub contact_info: ContactInfo,
    /// Lifecycle state
    pub status: TicketStatus,
    /// Assignee
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Expected resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_resolution: Option<String>,
    /// Repair cost
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Free-form notes
    #[serde(default)]
    pub notes: Vec<String>,
    /// Attachment URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,
}

/// What the user is trying to get done in this conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationGoal {
    /// Looking for a property
    PropertySearch,
    /// Filing a help ticket
    TicketCreation,
    /// Asking about a market
    MarketAnalysis,
    /// Anything else
    GeneralHelp,
}

impl ConversationGoal {
    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PropertySearch => "property_search",
            Self::TicketCreation => "ticket_creation",
            Self::MarketAnalysis => "market_analysis",
            Self::GeneralHelp => "general_help",
        }
    }
}

impl fmt::Display for ConversationGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional side channel attached to a chat submit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    /// Client session id
    #[serde(default)]
    pub session_id: String,
    /// Authenticated user, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Search preferences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_preferences: Option<PropertyPreferences>,
    /// Open help tickets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tickets: Option<Vec<HelpTicket>>,
    /// Listings the UI showed recently; kept opaque and never rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_properties: Option<Vec<Value>>,
    /// Where the user is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_location: Option<String>,
    /// Current goal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_goal: Option<ConversationGoal>,
}

impl ConversationContext {
    /// Empty context for `session_id`
    #[must_use]
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    /// Set the goal
    #[must_use]
    pub fn with_goal(mut self, goal: ConversationGoal) -> Self {
        self.conversation_goal = Some(goal);
        self
    }

    /// Set the preferences
    #[must_use]
    pub fn with_preferences(mut self, preferences: PropertyPreferences) -> Self {
        self.user_preferences = Some(preferences);
        self
    }

    /// Set the location
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.user_location = Some(location.into());
        self
    }

    /// Render the block appended to the user message.
    ///
    /// Fields appear in a fixed order and only when present; an empty ticket
    /// list counts as absent.
    #[must_use]
    pub fn render_block(&self) -> String {
        let mut block = format!("\n\n{CONTEXT_OPEN}");

        if let Some(preferences) = &self.user_preferences {
            block.push_str("\nUser Preferences: ");
            block.push_str(&pretty_json(preferences));
        }

        if let Some(tickets) = self.active_tickets.as_ref().filter(|t| !t.is_empty()) {
            block.push_str("\nActive Tickets: ");
            block.push_str(&pretty_json(tickets));
        }

        if let Some(location) = &self.user_location {
            block.push_str("\nUser Location: ");
            block.push_str(location);
        }

        if let Some(goal) = self.conversation_goal {
            block.push_str("\nConversation Goal: ");
            block.push_str(goal.as_str());
        }

        block.push('\n');
        block.push_str(CONTEXT_CLOSE);
        block
    }
}

/// User message body: the literal message followed by the context block
#[must_use]
pub fn compose_user_content(message: &str, context: Option<&ConversationContext>) -> String {
    match context {
        Some(context) => format!("{message}{}", context.render_block()),
        None => message.to_owned(),
    }
}

fn pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        warn!("Failed to render context field: {}", e);
        String::from("{}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_contains_only_present_fields() {
        let context = ConversationContext::for_session("session_1")
            .with_location("Austin, TX")
            .with_goal(ConversationGoal::MarketAnalysis);
        let content = compose_user_content("How is the market?", Some(&context));

        assert!(content.starts_with("How is the market?\n\n[CONTEXT]"));
        assert!(content.ends_with("\n[/CONTEXT]"));
        assert!(content.contains("\nUser Location: Austin, TX"));
        assert!(content.contains("\nConversation Goal: market_analysis"));
        assert!(!content.contains("User Preferences"));
        assert!(!content.contains("Active Tickets"));
    }

    #[test]
    fn test_empty_ticket_list_is_omitted() {
        let context = ConversationContext {
            active_tickets: Some(Vec::new()),
            ..ConversationContext::default()
        };
        assert_eq!(context.render_block(), "\n\n[CONTEXT]\n[/CONTEXT]");
    }

    #[test]
    fn test_preferences_rendered_as_pretty_json() {
        let context = ConversationContext::default().with_preferences(PropertyPreferences {
            bedrooms: Some(3),
            property_type: Some(PropertyType::House),
            ..PropertyPreferences::default()
        });
        let block = context.render_block();
        assert!(block.contains("User Preferences: {\n  \"propertyType\": \"house\",\n  \"bedrooms\": 3\n}"));
    }

    #[test]
    fn test_no_context_leaves_message_untouched() {
        assert_eq!(compose_user_content("hello", None), "hello");
    }

    #[test]
    fn test_context_deserializes_from_client_shape() {
        let context: ConversationContext = serde_json::from_value(serde_json::json!({
            "sessionId": "session_1_abc",
            "conversationGoal": "ticket_creation",
            "activeTickets": [{
                "id": "PT-123456-001",
                "propertyAddress": "1 Main St",
                "issueType": "plumbing",
                "title": "Leak",
                "description": "Kitchen sink leaks",
                "priority": "urgent",
                "contactInfo": {"name": "Sam", "preferredContact": "email"},
                "status": "in-progress",
                "notes": []
            }]
        }))
        .unwrap();

        assert_eq!(context.conversation_goal, Some(ConversationGoal::TicketCreation));
        let tickets = context.active_tickets.unwrap();
        assert_eq!(tickets[0].status, TicketStatus::InProgress);
        assert_eq!(tickets[0].priority, Priority::Urgent);
    }
}
