//! Core event types for the calendar engine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::event::recurrence::RecurrenceRule;

/// Who may see an event in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Privacy {
    /// Visible to everyone.
    #[default]
    Public,
    /// Visible to the owner and invitees only.
    Private,
    /// Visible to the owner and invitees only; joining requires an invite.
    InviteOnly,
}

/// An invitee's reply to an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Rsvp {
    #[default]
    Pending,
    Accepted,
    Declined,
    Maybe,
}

/// An invited user and their reply state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Invitee {
    pub user_id: String,
    #[serde(default)]
    pub rsvp: Rsvp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
}

impl Invitee {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            rsvp: Rsvp::Pending,
            responded_at: None,
        }
    }
}

/// Identity of the user performing an operation, supplied by the host
/// application's auth layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Caller {
    pub user_id: String,
    pub email: String,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
        }
    }
}

/// An event's role within a series, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRole {
    /// A plain event with no recurrence.
    Single,
    /// The hidden anchor of a series, carrying the rule.
    Template,
    /// A materialized occurrence linked back to a template.
    Instance,
}

/// A calendar event record.
///
/// One entity covers all three roles: a single event, a series template,
/// and a materialized instance. [`Event::role`] tells them apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Event {
    /// Unique identifier.
    pub id: String,
    /// Event title.
    pub title: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Start time.
    pub start: DateTime<Utc>,
    /// End time.
    pub end: DateTime<Utc>,
    /// Whether the event spans whole days.
    #[serde(default)]
    pub all_day: bool,
    /// Display color, passed through for the UI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Visibility setting.
    #[serde(default)]
    pub privacy: Privacy,
    /// Owning user's id.
    pub owner_id: String,
    /// Owning user's email. Ownership checks compare emails because
    /// callers may originate from a separate identity system.
    pub owner_email: String,
    /// Invited users in invitation order.
    #[serde(default)]
    pub invited_users: Vec<Invitee>,
    /// Recurrence rule; `Some` means repetition is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    /// Set on materialized occurrences.
    #[serde(default)]
    pub is_recurring_instance: bool,
    /// Back-reference from an instance to its template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_event_id: Option<String>,
    /// Set when an instance's fields diverged from the template via a
    /// single-occurrence edit.
    #[serde(default)]
    pub is_modified_instance: bool,
    /// Soft-delete marker; deleted records never appear in listings.
    #[serde(default)]
    pub is_deleted: bool,
    /// Templates go inactive once their instances exist; inactive records
    /// never appear in listings.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Event {
    /// Build a new event owned by `caller` from a validated definition.
    pub fn new(definition: NewEvent, caller: &Caller) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: definition.title,
            description: definition.description,
            location: definition.location,
            start: definition.start,
            end: definition.end.unwrap_or(definition.start),
            all_day: definition.all_day,
            color: definition.color,
            privacy: definition.privacy,
            owner_id: caller.user_id.clone(),
            owner_email: caller.email.clone(),
            invited_users: definition
                .invited_users
                .into_iter()
                .map(Invitee::new)
                .collect(),
            recurrence: definition.recurrence,
            is_recurring_instance: false,
            original_event_id: None,
            is_modified_instance: false,
            is_deleted: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derive this record's role within a series.
    pub fn role(&self) -> EventRole {
        if self.is_recurring_instance {
            EventRole::Instance
        } else if self.recurrence.is_some() {
            EventRole::Template
        } else {
            EventRole::Single
        }
    }

    /// Whether this record is a series template.
    pub fn is_template(&self) -> bool {
        self.role() == EventRole::Template
    }

    /// Whether this record is a materialized instance.
    pub fn is_instance(&self) -> bool {
        self.role() == EventRole::Instance
    }

    /// Whether `caller` owns this event.
    pub fn is_owned_by(&self, caller: &Caller) -> bool {
        self.owner_email == caller.email
    }

    /// Whether `user_id` appears on the invite list.
    pub fn is_invited(&self, user_id: &str) -> bool {
        self.invited_users.iter().any(|i| i.user_id == user_id)
    }

    /// Whether `viewer` may see this event, per its privacy setting.
    pub fn visible_to(&self, viewer: &Caller) -> bool {
        match self.privacy {
            Privacy::Public => true,
            Privacy::Private | Privacy::InviteOnly => {
                self.is_owned_by(viewer) || self.is_invited(&viewer.user_id)
            }
        }
    }
}

/// Definition of a new event, as supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NewEvent {
    /// Event title.
    pub title: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Start time.
    pub start: DateTime<Utc>,
    /// End time; required, but optional in the wire shape so its absence
    /// surfaces as a validation error rather than a deserialization one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Whether the event spans whole days.
    #[serde(default)]
    pub all_day: bool,
    /// Display color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Visibility setting.
    #[serde(default)]
    pub privacy: Privacy,
    /// User ids to invite.
    #[serde(default)]
    pub invited_users: Vec<String>,
    /// Recurrence rule; `Some` creates a series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
}

impl NewEvent {
    /// Create a definition with the required fields.
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            start,
            end: Some(end),
            ..Default::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the display color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Set the privacy level.
    pub fn with_privacy(mut self, privacy: Privacy) -> Self {
        self.privacy = privacy;
        self
    }

    /// Mark as an all-day event.
    pub fn all_day(mut self) -> Self {
        self.all_day = true;
        self
    }

    /// Invite users by id.
    pub fn with_invitees(mut self, user_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.invited_users = user_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a recurrence rule.
    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    /// Validate dates and the recurrence rule, if any.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let end = self.end.ok_or(ValidationError::MissingEnd)?;
        if self.start >= end {
            return Err(ValidationError::StartNotBeforeEnd {
                start: self.start,
                end,
            });
        }
        if let Some(rule) = &self.recurrence {
            rule.validate()?;
        }
        Ok(())
    }
}

/// A partial update to an event's fields.
///
/// `recurrence` / `clear_recurrence` ride along with the patch but are
/// handled by the series editor, not by [`EventUpdate::apply_to`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EventUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<Privacy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    /// Disable repetition on the target record.
    #[serde(default)]
    pub clear_recurrence: bool,
}

impl EventUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a new title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set a new description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set a new location.
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set a new start time.
    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Set a new end time.
    pub fn end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Set a new color.
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Set a new privacy level.
    pub fn privacy(mut self, privacy: Privacy) -> Self {
        self.privacy = Some(privacy);
        self
    }

    /// Replace the recurrence rule.
    pub fn recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    /// Remove the recurrence rule.
    pub fn clear_recurrence(mut self) -> Self {
        self.clear_recurrence = true;
        self
    }

    /// Whether the patch touches any plain field (not the rule).
    pub fn has_field_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.location.is_some()
            || self.start.is_some()
            || self.end.is_some()
            || self.all_day.is_some()
            || self.color.is_some()
            || self.privacy.is_some()
    }

    /// Apply the plain fields to an event, refreshing `updated_at`.
    /// Recurrence changes are applied by the series editor.
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(description) = &self.description {
            event.description = Some(description.clone());
        }
        if let Some(location) = &self.location {
            event.location = Some(location.clone());
        }
        if let Some(start) = self.start {
            event.start = start;
        }
        if let Some(end) = self.end {
            event.end = end;
        }
        if let Some(all_day) = self.all_day {
            event.all_day = all_day;
        }
        if let Some(color) = &self.color {
            event.color = Some(color.clone());
        }
        if let Some(privacy) = self.privacy {
            event.privacy = privacy;
        }
        event.updated_at = Utc::now();
    }

    /// Validate patched dates and any replacement rule.
    ///
    /// Only endpoints both present in the patch can be compared here; a
    /// single-endpoint patch is checked against the merged record at
    /// edit time.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start >= end {
                return Err(ValidationError::StartNotBeforeEnd { start, end });
            }
        }
        if let Some(rule) = &self.recurrence {
            rule.validate()?;
        }
        Ok(())
    }
}

/// Listing filter for visible events.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EventFilter {
    /// Only events starting at or after this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_after: Option<DateTime<Utc>>,
    /// Only events starting before this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_before: Option<DateTime<Utc>>,
    /// Only events owned by this email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
    /// Maximum number of results; `None` uses the configured default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Number of results to skip.
    #[serde(default)]
    pub offset: usize,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to events starting at or after `time`.
    pub fn starts_after(mut self, time: DateTime<Utc>) -> Self {
        self.starts_after = Some(time);
        self
    }

    /// Restrict to events starting before `time`.
    pub fn starts_before(mut self, time: DateTime<Utc>) -> Self {
        self.starts_before = Some(time);
        self
    }

    /// Restrict to events owned by `email`.
    pub fn owned_by(mut self, email: impl Into<String>) -> Self {
        self.owned_by = Some(email.into());
        self
    }

    /// Cap the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Check if an event matches the date and owner criteria.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(after) = self.starts_after {
            if event.start < after {
                return false;
            }
        }
        if let Some(before) = self.starts_before {
            if event.start >= before {
                return false;
            }
        }
        if let Some(owner) = &self.owned_by {
            if &event.owner_email != owner {
                return false;
            }
        }
        true
    }
}
