//! The User entity.
//!
//! One record per end-user identity, created on first contact. Users are
//! never hard-deleted except through an explicit erasure request.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Timestamp, UserId};

/// Weekly reminder preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPreference {
    /// Whether weekly reminders are sent at all.
    pub enabled: bool,
    /// Day of week, 1 = Monday through 7 = Sunday.
    pub weekday: u8,
    /// Hour of day, UTC.
    pub hour: u8,
}

impl Default for ReminderPreference {
    fn default() -> Self {
        Self {
            enabled: false,
            weekday: 1,
            hour: 10,
        }
    }
}

/// An end user of the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Platform-assigned identity.
    pub id: UserId,
    /// Display name from the platform profile.
    pub first_name: String,
    /// Optional platform username.
    pub username: Option<String>,
    /// BCP-47-ish locale code from the platform.
    pub locale: String,
    /// Weekly reminder preference.
    pub reminders: ReminderPreference,
    /// When the user first contacted the agent.
    pub created_at: Timestamp,
    /// When the record last changed.
    pub updated_at: Timestamp,
}

impl User {
    /// Registers a user on first contact.
    pub fn new(id: UserId, first_name: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            first_name: first_name.into(),
            username: None,
            locale: "ru".to_string(),
            reminders: ReminderPreference::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the platform username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Flips the reminder flag, returning the new state.
    pub fn toggle_reminders(&mut self) -> bool {
        self.reminders.enabled = !self.reminders.enabled;
        self.updated_at = Timestamp::now();
        self.reminders.enabled
    }

    /// Sets the reminder schedule.
    ///
    /// Weekday must be 1-7, hour 0-23.
    pub fn set_reminder_schedule(&mut self, weekday: u8, hour: u8) -> Result<(), DomainError> {
        if !(1..=7).contains(&weekday) {
            return Err(DomainError::validation(format!(
                "weekday must be 1-7, got {weekday}"
            )));
        }
        if hour > 23 {
            return Err(DomainError::validation(format!(
                "hour must be 0-23, got {hour}"
            )));
        }
        self.reminders.weekday = weekday;
        self.reminders.hour = hour;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_defaults() {
        let user = User::new(UserId::from_i64(7), "Anna");
        assert_eq!(user.locale, "ru");
        assert!(!user.reminders.enabled);
        assert_eq!(user.reminders.weekday, 1);
        assert_eq!(user.reminders.hour, 10);
    }

    #[test]
    fn toggle_reminders_flips_state() {
        let mut user = User::new(UserId::from_i64(7), "Anna");
        assert!(user.toggle_reminders());
        assert!(!user.toggle_reminders());
    }

    #[test]
    fn reminder_schedule_is_validated() {
        let mut user = User::new(UserId::from_i64(7), "Anna");
        user.set_reminder_schedule(5, 18).unwrap();
        assert_eq!(user.reminders.weekday, 5);
        assert_eq!(user.reminders.hour, 18);

        assert!(user.set_reminder_schedule(0, 10).is_err());
        assert!(user.set_reminder_schedule(8, 10).is_err());
        assert!(user.set_reminder_schedule(3, 24).is_err());
    }

    #[test]
    fn builder_sets_optional_fields() {
        let user = User::new(UserId::from_i64(7), "Anna")
            .with_username("anna_b")
            .with_locale("en");
        assert_eq!(user.username.as_deref(), Some("anna_b"));
        assert_eq!(user.locale, "en");
    }
}
