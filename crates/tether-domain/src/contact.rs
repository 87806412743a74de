//! Structured contact data carried by person entities
//!
//! The data is persisted as an opaque JSON blob on the entity row. Reading
//! a blob never fails outright: an unparsable blob yields a
//! [`RepairOutcome`] holding the empty replacement the caller should
//! persist.

use crate::dedup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A phone number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    /// The number as entered
    pub number: String,

    /// Label such as "mobile" or "work"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Whether this is the preferred number
    #[serde(default)]
    pub is_primary: bool,
}

impl PhoneNumber {
    /// Create an unlabeled, non-primary number
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            label: None,
            is_primary: false,
        }
    }
}

/// An email address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAddress {
    /// The address
    pub email: String,

    /// Label such as "home"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Whether this is the preferred address
    #[serde(default)]
    pub is_primary: bool,
}

impl EmailAddress {
    /// Create an unlabeled, non-primary address
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            label: None,
            is_primary: false,
        }
    }
}

/// A postal address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    /// Street line
    #[serde(default)]
    pub street: String,

    /// City
    #[serde(default)]
    pub city: String,

    /// State or region
    #[serde(default)]
    pub state: String,

    /// Postal code
    #[serde(default)]
    pub postal_code: String,

    /// Country
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Label such as "home"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Whether this is the preferred address
    #[serde(default)]
    pub is_primary: bool,
}

impl PostalAddress {
    /// Identity used when merging: street, city, state and postal code
    fn merge_key(&self) -> (&str, &str, &str, &str) {
        (
            self.street.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
        )
    }

    /// Single-line rendering
    pub fn one_line(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for part in [&self.street, &self.city] {
            if !part.is_empty() {
                parts.push(part.clone());
            }
        }
        let region = format!("{} {}", self.state, self.postal_code).trim().to_string();
        if !region.is_empty() {
            parts.push(region);
        }
        if let Some(country) = self.country.as_ref().filter(|c| !c.is_empty()) {
            parts.push(country.clone());
        }
        parts.join(", ")
    }
}

/// Contact details of a person
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactData {
    /// Phone numbers
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumber>,

    /// Email addresses
    #[serde(default)]
    pub emails: Vec<EmailAddress>,

    /// Postal addresses
    #[serde(default)]
    pub addresses: Vec<PostalAddress>,

    /// Birthday as entered (ISO `YYYY-MM-DD` or `--MM-DD` without a year)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
}

/// Result of reading a blob that could not be parsed
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    /// Why the blob was rejected
    pub reason: String,

    /// Valid replacement to persist in place of the corrupt blob
    pub replacement: ContactData,
}

impl ContactData {
    /// Parse a stored blob
    ///
    /// Blank blobs parse as empty data. Anything else that is not valid
    /// contact JSON is reported as a [`RepairOutcome`] carrying an empty
    /// replacement.
    pub fn parse(blob: &str) -> Result<ContactData, RepairOutcome> {
        if blob.trim().is_empty() {
            return Ok(ContactData::default());
        }
        serde_json::from_str(blob).map_err(|e| RepairOutcome {
            reason: e.to_string(),
            replacement: ContactData::default(),
        })
    }

    /// Serialize for storage
    pub fn to_blob(&self) -> String {
        // Plain data structs with string keys cannot fail to serialize
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Whether nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.phone_numbers.is_empty()
            && self.emails.is_empty()
            && self.addresses.is_empty()
            && self.birthday.is_none()
    }

    /// Union another entity's contact data into this one
    ///
    /// Phones and emails are matched by exact value, addresses by
    /// street+city+state+postal code. Items taken from `other` are never
    /// primary; this record's existing primaries are left as they are.
    pub fn merge_from(&mut self, other: &ContactData) {
        for phone in &other.phone_numbers {
            if !self.phone_numbers.iter().any(|p| p.number == phone.number) {
                self.phone_numbers.push(PhoneNumber {
                    is_primary: false,
                    ..phone.clone()
                });
            }
        }

        for email in &other.emails {
            if !self.emails.iter().any(|e| e.email == email.email) {
                self.emails.push(EmailAddress {
                    is_primary: false,
                    ..email.clone()
                });
            }
        }

        for address in &other.addresses {
            if !self.addresses.iter().any(|a| a.merge_key() == address.merge_key()) {
                self.addresses.push(PostalAddress {
                    is_primary: false,
                    ..address.clone()
                });
            }
        }

        if self.birthday.is_none() {
            self.birthday = other.birthday.clone();
        }
    }

    /// Human-readable summary used as the searchable details text
    pub fn searchable_summary(&self) -> String {
        let mut lines = Vec::new();
        for phone in &self.phone_numbers {
            lines.push(format!("Phone: {}", phone.number));
        }
        for email in &self.emails {
            lines.push(format!("Email: {}", email.email));
        }
        for address in &self.addresses {
            let line = address.one_line();
            if !line.is_empty() {
                lines.push(format!("Address: {}", line));
            }
        }
        if let Some(birthday) = &self.birthday {
            lines.push(format!("Birthday: {}", birthday));
        }
        lines.join("\n")
    }

    /// Whether a search term matches any phone, email or address field
    ///
    /// Terms containing digits are also compared digits-only against phone
    /// numbers, so "555-123" finds "(555) 123 4567".
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return false;
        }
        let term_digits = dedup::digits_only(&term);

        let phone_hit = self.phone_numbers.iter().any(|p| {
            p.number.to_lowercase().contains(&term)
                || (!term_digits.is_empty() && dedup::digits_only(&p.number).contains(&term_digits))
        });
        if phone_hit {
            return true;
        }

        if self.emails.iter().any(|e| e.email.to_lowercase().contains(&term)) {
            return true;
        }

        self.addresses.iter().any(|a| {
            [&a.street, &a.city, &a.state, &a.postal_code]
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
                || a.country.as_ref().is_some_and(|c| c.to_lowercase().contains(&term))
        })
    }

    /// Normalized phone/email fragments used for duplicate detection
    pub fn fragments(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for phone in &self.phone_numbers {
            let digits = dedup::digits_only(&phone.number);
            if digits.len() >= dedup::MIN_PHONE_DIGITS {
                out.insert(digits);
            }
        }
        for email in &self.emails {
            let email = email.email.trim().to_lowercase();
            if !email.is_empty() {
                out.insert(email);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(street: &str, city: &str) -> PostalAddress {
        PostalAddress {
            street: street.to_string(),
            city: city.to_string(),
            state: "OR".to_string(),
            postal_code: "97201".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_blank_and_valid() {
        assert_eq!(ContactData::parse("").unwrap(), ContactData::default());

        let blob = r#"{"phoneNumbers":[{"number":"5551234567","isPrimary":true}],"emails":[]}"#;
        let data = ContactData::parse(blob).unwrap();
        assert_eq!(data.phone_numbers.len(), 1);
        assert!(data.phone_numbers[0].is_primary);
    }

    #[test]
    fn test_parse_corrupt_reports_repair() {
        let outcome = ContactData::parse("{\"phoneNumbers\": [").unwrap_err();
        assert!(!outcome.reason.is_empty());
        assert!(outcome.replacement.is_empty());
    }

    #[test]
    fn test_blob_round_trip() {
        let mut data = ContactData::default();
        data.emails.push(EmailAddress::new("alice@example.com"));
        data.birthday = Some("1990-04-12".to_string());
        assert_eq!(ContactData::parse(&data.to_blob()).unwrap(), data);
    }

    #[test]
    fn test_merge_unions_and_demotes() {
        let mut target = ContactData {
            phone_numbers: vec![PhoneNumber {
                number: "5551234567".to_string(),
                label: None,
                is_primary: true,
            }],
            addresses: vec![address("1 Main St", "Portland")],
            ..Default::default()
        };
        let source = ContactData {
            phone_numbers: vec![
                PhoneNumber {
                    number: "5551234567".to_string(),
                    label: Some("dup".to_string()),
                    is_primary: true,
                },
                PhoneNumber {
                    number: "5559876543".to_string(),
                    label: None,
                    is_primary: true,
                },
            ],
            emails: vec![EmailAddress {
                email: "bob@example.com".to_string(),
                label: None,
                is_primary: true,
            }],
            addresses: vec![address("1 Main St", "Portland"), address("9 Oak Ave", "Salem")],
            birthday: Some("--06-01".to_string()),
        };

        target.merge_from(&source);

        assert_eq!(target.phone_numbers.len(), 2);
        assert!(target.phone_numbers[0].is_primary);
        assert!(!target.phone_numbers[1].is_primary);
        assert_eq!(target.emails.len(), 1);
        assert!(!target.emails[0].is_primary);
        assert_eq!(target.addresses.len(), 2);
        assert_eq!(target.birthday.as_deref(), Some("--06-01"));
    }

    #[test]
    fn test_matches_phone_digits_and_address() {
        let data = ContactData {
            phone_numbers: vec![PhoneNumber::new("(555) 123-4567")],
            addresses: vec![address("1 Main St", "Portland")],
            ..Default::default()
        };
        assert!(data.matches("555-123"));
        assert!(data.matches("portland"));
        assert!(!data.matches("seattle"));
        assert!(!data.matches("   "));
    }

    #[test]
    fn test_summary_and_fragments() {
        let data = ContactData {
            phone_numbers: vec![PhoneNumber::new("555 123 4567")],
            emails: vec![EmailAddress::new("Alice@Example.com")],
            ..Default::default()
        };
        let summary = data.searchable_summary();
        assert!(summary.contains("Phone: 555 123 4567"));
        assert!(summary.contains("Email: Alice@Example.com"));

        let fragments = data.fragments();
        assert!(fragments.contains("5551234567"));
        assert!(fragments.contains("alice@example.com"));
    }
}
