//! Checks that book tickets and assert on the side effects.

use serde::Deserialize;
use serde_yaml::Mapping;

use super::args::{self, optional_scalar, scalar};
use super::{Check, CheckEnv, CheckError};
use crate::mail::{MailCapture, MailWait};
use crate::site::{extract_booking_cards, Row, Site, SiteError};
use crate::tasks::CatalogError;

/// Explorer query returning the most recently inserted booking.
pub(crate) const LATEST_BOOKING_SQL: &str = "select * from booking order by id desc limit 1";

const BOOK_TICKET_PATH: &str = "/book-ticket";
const BOOKINGS_PATH: &str = "/bookings";

/// A booking the harness places on behalf of a passenger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookingRequest {
    #[serde(deserialize_with = "scalar")]
    pub train_number: String,
    #[serde(deserialize_with = "scalar")]
    pub ticket_class: String,
    #[serde(deserialize_with = "scalar")]
    pub date: String,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub from_station_code: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub to_station_code: Option<String>,
    #[serde(deserialize_with = "scalar")]
    pub passenger_name: String,
    #[serde(deserialize_with = "scalar")]
    pub passenger_email: String,
}

impl BookingRequest {
    fn form(&self) -> [(&str, &str); 5] {
        [
            ("train", self.train_number.as_str()),
            ("class", self.ticket_class.as_str()),
            ("date", self.date.as_str()),
            ("passenger_name", self.passenger_name.as_str()),
            ("passenger_email", self.passenger_email.as_str()),
        ]
    }

    /// Column values the persisted booking row must carry.
    fn expected_columns(&self) -> Vec<(&'static str, &str)> {
        let mut columns = vec![
            ("train_number", self.train_number.as_str()),
            ("ticket_class", self.ticket_class.as_str()),
            ("date", self.date.as_str()),
            ("passenger_name", self.passenger_name.as_str()),
            ("passenger_email", self.passenger_email.as_str()),
        ];
        if let Some(code) = &self.from_station_code {
            columns.push(("from_station_code", code.as_str()));
        }
        if let Some(code) = &self.to_station_code {
            columns.push(("to_station_code", code.as_str()));
        }
        columns
    }

    fn describe(&self) -> String {
        format!(
            "train {} ({}) on {} for {}",
            self.train_number, self.ticket_class, self.date, self.passenger_name
        )
    }

    /// Submit the booking form. A rejected booking fails the calling check.
    fn place(&self, site: &Site) -> Result<(), CheckError> {
        let page = site.post(BOOK_TICKET_PATH, &self.form())?;
        if page.is_success() {
            Ok(())
        } else {
            Err(CheckError::Failed(format!(
                "Could not make booking: POST {BOOK_TICKET_PATH} returned HTTP {}",
                page.status
            )))
        }
    }
}

fn latest_booking(site: &Site) -> Result<Option<Row>, CheckError> {
    Ok(site.query(LATEST_BOOKING_SQL)?.into_iter().next())
}

/// Whether booking id `after` was stored later than `before`.
fn is_newer_id(after: &str, before: Option<&str>) -> bool {
    let Some(before) = before else {
        return true;
    };
    match (after.parse::<i64>(), before.parse::<i64>()) {
        (Ok(after), Ok(before)) => after > before,
        _ => after != before,
    }
}

/// Books a ticket and checks the stored booking row field by field.
///
/// The latest booking id is read before booking, so a row left over from an
/// earlier run never counts as the new booking.
#[derive(Debug)]
pub struct BookingSideEffect {
    booking: BookingRequest,
    title: String,
}

impl BookingSideEffect {
    pub const KIND: &'static str = "check_booking";

    pub fn new(booking: BookingRequest) -> Self {
        Self {
            title: format!("Check booking of {}", booking.describe()),
            booking,
        }
    }

    pub(crate) fn from_args(args: Mapping, _env: &CheckEnv) -> Result<Box<dyn Check>, CatalogError> {
        let booking: BookingRequest = args::parse(Self::KIND, args)?;
        Ok(Box::new(Self::new(booking)))
    }
}

impl Check for BookingSideEffect {
    fn title(&self) -> &str {
        &self.title
    }

    fn run(&self, site: &Site) -> Result<(), CheckError> {
        let previous_id = latest_booking(site)?.and_then(|row| row.get("id").cloned());
        self.booking.place(site)?;

        let row = latest_booking(site)?
            .ok_or_else(|| CheckError::failed("Could not make booking"))?;
        let id = row
            .get("id")
            .ok_or_else(|| CheckError::failed("Could not make booking: the stored booking has no id"))?;
        if !is_newer_id(id, previous_id.as_deref()) {
            return Err(CheckError::Failed(format!(
                "Could not make booking: no new booking was stored (latest booking id is still {id})"
            )));
        }

        let mismatches: Vec<String> = self
            .booking
            .expected_columns()
            .into_iter()
            .filter(|(column, expected)| row.get(*column).map(String::as_str) != Some(*expected))
            .map(|(column, expected)| {
                let found = row.get(column).map(String::as_str).unwrap_or("<missing>");
                format!("  {column}: expected `{expected}`, found `{found}`")
            })
            .collect();

        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(CheckError::Failed(format!(
                "The latest booking does not match the booking that was made:\n{}",
                mismatches.join("\n")
            )))
        }
    }
}

/// Books a ticket and checks a confirmation email reaches the passenger.
#[derive(Debug)]
pub struct BookingConfirmationEmail {
    booking: BookingRequest,
    capture: MailCapture,
    wait: MailWait,
    title: String,
}

impl BookingConfirmationEmail {
    pub const KIND: &'static str = "check_booking_email";

    pub fn new(booking: BookingRequest, capture: MailCapture, wait: MailWait) -> Self {
        Self {
            title: format!("Check confirmation email for {}", booking.passenger_email),
            booking,
            capture,
            wait,
        }
    }

    pub(crate) fn from_args(args: Mapping, env: &CheckEnv) -> Result<Box<dyn Check>, CatalogError> {
        let booking: BookingRequest = args::parse(Self::KIND, args)?;
        Ok(Box::new(Self::new(
            booking,
            MailCapture::new(&env.mail_file),
            env.mail_wait,
        )))
    }
}

impl Check for BookingConfirmationEmail {
    fn title(&self) -> &str {
        &self.title
    }

    fn run(&self, site: &Site) -> Result<(), CheckError> {
        let before = self.capture.stamp()?;
        self.booking.place(site)?;

        let mail = self
            .capture
            .wait_for_new(before, self.wait)?
            .ok_or_else(|| {
                CheckError::Failed(format!(
                    "No confirmation email was received within {}s of booking {}.",
                    self.wait.timeout.as_secs_f32(),
                    self.booking.describe()
                ))
            })?;

        if mail.is_addressed_to(&self.booking.passenger_email) {
            Ok(())
        } else {
            Err(CheckError::Failed(format!(
                "Expected the confirmation email to be sent to {}, but it was sent to: {}",
                self.booking.passenger_email,
                if mail.recipients.is_empty() {
                    "(no recipients)".to_string()
                } else {
                    mail.recipients.join(", ")
                }
            )))
        }
    }
}

/// Logs in, books tickets and checks they are all listed on the trips page,
/// all within one cookie session.
#[derive(Debug)]
pub struct TripListing {
    email: String,
    bookings: Vec<BookingRequest>,
    title: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TripListingArgs {
    #[serde(default, deserialize_with = "optional_scalar")]
    email: Option<String>,
    bookings: Vec<BookingRequest>,
}

impl TripListing {
    pub const KIND: &'static str = "check_trips";

    pub fn new(email: impl Into<String>, bookings: Vec<BookingRequest>) -> Self {
        let email = email.into();
        Self {
            title: format!("Check trips listed for {email}"),
            email,
            bookings,
        }
    }

    pub(crate) fn from_args(args: Mapping, _env: &CheckEnv) -> Result<Box<dyn Check>, CatalogError> {
        let parsed: TripListingArgs = args::parse(Self::KIND, args)?;
        let invalid = |reason: &str| CatalogError::InvalidArgs {
            kind: Self::KIND.to_string(),
            reason: reason.to_string(),
        };

        if parsed.bookings.is_empty() {
            return Err(invalid("bookings cannot be empty"));
        }
        let email = parsed
            .email
            .or_else(|| parsed.bookings.first().map(|b| b.passenger_email.clone()))
            .ok_or_else(|| invalid("email is required"))?;

        Ok(Box::new(Self::new(email, parsed.bookings)))
    }

    fn run_in_session(&self, site: &Site) -> Result<(), CheckError> {
        site.login(&self.email).map_err(|e| match e {
            SiteError::HttpStatus { status, .. } => {
                CheckError::Failed(format!("Could not log in as {}: HTTP {status}", self.email))
            }
            other => other.into(),
        })?;

        for booking in &self.bookings {
            booking.place(site)?;
        }

        let page = site.get(BOOKINGS_PATH, &[])?;
        if !page.is_success() {
            return Err(CheckError::Failed(format!(
                "Page {BOOKINGS_PATH} returned HTTP {}",
                page.status
            )));
        }

        let cards = extract_booking_cards(&page.body)?;
        let missing: Vec<String> = self
            .bookings
            .iter()
            .filter(|booking| {
                let fragments = [
                    booking.train_number.as_str(),
                    booking.date.as_str(),
                    booking.passenger_name.as_str(),
                ];
                !cards.iter().any(|card| card.mentions(&fragments))
            })
            .map(|booking| format!("  - {}", booking.describe()))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CheckError::Failed(format!(
                "{} booking(s) listed on {BOOKINGS_PATH}, but these are missing:\n{}",
                cards.len(),
                missing.join("\n")
            )))
        }
    }
}

impl Check for TripListing {
    fn title(&self) -> &str {
        &self.title
    }

    fn run(&self, site: &Site) -> Result<(), CheckError> {
        site.with_session(|site| self.run_in_session(site))?
    }
}
