//! The booking entity and its mutation payloads

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::core::error::BookingError;

/// Lifecycle status of a booking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(
    feature = "postgres",
    derive(sqlx::Type),
    sqlx(type_name = "booking_status", rename_all = "lowercase")
)]
pub enum BookingStatus {
    #[default]
    New,
    Contacted,
    Approved,
    Rejected,
    Used,
    Noshow,
    Cancel,
}

impl BookingStatus {
    /// Every status, in declaration order
    pub const ALL: [BookingStatus; 7] = [
        BookingStatus::New,
        BookingStatus::Contacted,
        BookingStatus::Approved,
        BookingStatus::Rejected,
        BookingStatus::Used,
        BookingStatus::Noshow,
        BookingStatus::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::New => "new",
            BookingStatus::Contacted => "contacted",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Used => "used",
            BookingStatus::Noshow => "noshow",
            BookingStatus::Cancel => "cancel",
        }
    }

    /// Literal values accepted on the wire
    pub fn values() -> Vec<String> {
        Self::ALL.iter().map(|s| s.as_str().to_string()).collect()
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| BookingError::bad_input("status is invalid"))
    }
}

/// A persisted booking
///
/// Rows are never physically removed: deletion flips `is_deleted`, and every
/// read path filters on it. The flag is not part of the JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Booking {
    pub id: i64,
    pub customer_name: String,
    pub phone: i64,
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub is_deleted: bool,
}

/// Fields accepted when creating a booking
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct NewBooking {
    #[validate(length(min = 1, max = 100))]
    pub customer_name: String,
    pub phone: i64,
    pub booking_date: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Partial update: only the supplied fields are overwritten
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
pub struct BookingChanges {
    #[validate(length(min = 1, max = 100))]
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub phone: Option<i64>,
    #[serde(default)]
    pub booking_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
}

impl BookingChanges {
    pub fn is_empty(&self) -> bool {
        self.customer_name.is_none()
            && self.phone.is_none()
            && self.booking_date.is_none()
            && self.note.is_none()
            && self.status.is_none()
    }

    /// Merge the supplied fields into `booking` and stamp `updated_at`
    pub fn apply_to(&self, booking: &mut Booking, now: DateTime<Utc>) {
        if let Some(name) = &self.customer_name {
            booking.customer_name = name.clone();
        }
        if let Some(phone) = self.phone {
            booking.phone = phone;
        }
        if let Some(date) = self.booking_date {
            booking.booking_date = date;
        }
        if let Some(note) = &self.note {
            booking.note = Some(note.clone());
        }
        if let Some(status) = self.status {
            booking.status = status;
        }
        booking.updated_at = Some(now);
    }
}

/// Number of bookings on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCount {
    pub day: NaiveDate,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CUSTOMER_NAME_MAX_LEN;
    use chrono::TimeZone;

    fn sample() -> Booking {
        Booking {
            id: 1,
            customer_name: "Alice".to_string(),
            phone: 5551234,
            booking_date: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            status: BookingStatus::New,
            note: None,
            created_at: Utc.with_ymd_and_hms(2023, 12, 1, 8, 0, 0).unwrap(),
            updated_at: None,
            is_deleted: false,
        }
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in BookingStatus::ALL {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("pending".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(BookingStatus::Noshow).unwrap(),
            serde_json::json!("noshow")
        );
    }

    #[test]
    fn test_booking_json_shape_hides_deleted_flag() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["customer_name"], "Alice");
        assert_eq!(json["status"], "new");
        assert!(json["updated_at"].is_null());
        assert!(json.get("is_deleted").is_none());
    }

    #[test]
    fn test_changes_only_touch_supplied_fields() {
        let mut booking = sample();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let changes = BookingChanges {
            status: Some(BookingStatus::Approved),
            ..Default::default()
        };

        changes.apply_to(&mut booking, now);

        assert_eq!(booking.status, BookingStatus::Approved);
        assert_eq!(booking.customer_name, "Alice");
        assert_eq!(booking.updated_at, Some(now));
    }

    #[test]
    fn test_new_booking_rejects_long_names() {
        let new = NewBooking {
            customer_name: "x".repeat(CUSTOMER_NAME_MAX_LEN + 1),
            phone: 1,
            booking_date: Utc::now(),
            note: None,
        };
        assert!(new.validate().is_err());
    }
}
