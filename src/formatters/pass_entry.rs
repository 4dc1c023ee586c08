//! Pass entry formatter
//!
//! Renders a Bitwarden item as a flat `Label: value` text block and derives
//! the entry name it is stored under.

use super::FormattedEntry;
use crate::error::FormatError;
use crate::item::{ItemKind, SourceItem};
use serde_json::{Map, Value};

const IDENTITY_FIELDS: [(&str, &str); 18] = [
    ("ID Title", "title"),
    ("ID FirstName", "firstName"),
    ("ID MiddleName", "middleName"),
    ("ID LastName", "lastName"),
    ("ID Address1", "address1"),
    ("ID Address2", "address2"),
    ("ID Address3", "address3"),
    ("ID City", "city"),
    ("ID State", "state"),
    ("ID PostalCode", "postalCode"),
    ("ID Country", "country"),
    ("ID Company", "company"),
    ("ID Email", "email"),
    ("ID Phone", "phone"),
    ("ID SSN", "ssn"),
    ("ID Username", "username"),
    ("ID Passport Number", "passportNumber"),
    ("ID License Number", "licenseNumber"),
];

/// Formatter producing pass entries
#[derive(Debug, Clone, Copy, Default)]
pub struct PassEntryFormatter;

impl PassEntryFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(&self, item: &SourceItem) -> Result<FormattedEntry, FormatError> {
        Ok(FormattedEntry {
            name: self.entry_name(item)?,
            body: self.body(item)?,
        })
    }

    /// Canonical entry name: `<slug>-<type label>-<id prefix>`
    pub fn entry_name(&self, item: &SourceItem) -> Result<String, FormatError> {
        let kind = item.kind()?;
        let id_head = item.id.split('-').next().unwrap_or_default();
        let id_prefix: String = id_head.chars().take(4).collect();
        Ok(format!("{}-{}-{}", Self::slugify(&item.name), kind.label(), id_prefix))
    }

    /// Separators become spaces, each run of spaces becomes one hyphen
    fn slugify(name: &str) -> String {
        let mut slug = String::with_capacity(name.len());
        let mut in_run = false;
        for c in name.chars() {
            let c = if matches!(c, '-' | '_' | '|') { ' ' } else { c };
            if c == ' ' {
                if !in_run {
                    slug.push('-');
                }
                in_run = true;
            } else {
                slug.push(c);
                in_run = false;
            }
        }
        slug.to_lowercase()
    }

    /// Multi-line entry body, always ending with a newline
    pub fn body(&self, item: &SourceItem) -> Result<String, FormatError> {
        let kind = item.kind()?;
        let mut body = EntryBody::default();

        body.push("Name", Some(item.name.clone()));

        match kind {
            ItemKind::Login => Self::login_lines(&mut body, payload(&item.login, "login")?)?,
            ItemKind::SecureNote => {}
            ItemKind::Card => Self::card_lines(&mut body, payload(&item.card, "card")?)?,
            ItemKind::Identity => {
                Self::identity_lines(&mut body, payload(&item.identity, "identity")?)?
            }
        }

        for (idx, field) in item.fields.iter().flatten().enumerate() {
            let label = format!(
                "[Custom Field {}] {}",
                idx + 1,
                field.name.as_deref().unwrap_or_default()
            );
            body.push(label, field.value.as_ref().and_then(render));
        }

        // Attachments are numbered from zero
        for (idx, attachment) in item.attachments.iter().flatten().enumerate() {
            body.push(
                format!("Attachment {} File Name", idx),
                attachment.file_name.clone(),
            );
            body.push(
                format!("Attachment {} File Size", idx),
                attachment.size_name.clone(),
            );
            body.push(format!("Attachment {} URL", idx), attachment.url.clone());
        }

        body.push("Notes", item.notes.clone());

        Ok(body.finish())
    }

    fn login_lines(body: &mut EntryBody, login: &Map<String, Value>) -> Result<(), FormatError> {
        body.push("Username", field(login, "login", "username")?);
        body.push("Password", field(login, "login", "password")?);
        body.push("TOTP", field(login, "login", "totp")?);

        let uris: Vec<Option<String>> = login
            .get("uris")
            .and_then(Value::as_array)
            .map(|uris| {
                uris.iter()
                    .map(|uri| uri.get("uri").and_then(render))
                    .collect()
            })
            .unwrap_or_default();

        if uris.len() == 1 {
            body.push("URL", uris[0].clone());
        } else {
            for (idx, uri) in uris.into_iter().enumerate() {
                body.push(format!("URL {}", idx + 1), uri);
            }
        }
        Ok(())
    }

    fn card_lines(body: &mut EntryBody, card: &Map<String, Value>) -> Result<(), FormatError> {
        body.push("Card Holder Name", field(card, "card", "cardholderName")?);
        body.push("Card Brand", field(card, "card", "brand")?);
        body.push("Card Number", field(card, "card", "number")?);

        let month = field(card, "card", "expMonth")?;
        let year = field(card, "card", "expYear")?;
        // Unlike the other fields a half-set expiry still gets a line
        let expiry = match (month, year) {
            (None, None) => None,
            (month, year) => Some(format!(
                "{}/{}",
                month.unwrap_or_default(),
                year.unwrap_or_default()
            )),
        };
        body.push("Card Expire MM/YYYY", expiry);

        body.push("Card Security Code", field(card, "card", "code")?);
        Ok(())
    }

    fn identity_lines(
        body: &mut EntryBody,
        identity: &Map<String, Value>,
    ) -> Result<(), FormatError> {
        for (label, key) in IDENTITY_FIELDS {
            body.push(label, field(identity, "identity", key)?);
        }
        Ok(())
    }
}

/// Ordered label/value lines; absent values produce no line
#[derive(Debug, Default)]
struct EntryBody {
    lines: Vec<(String, String)>,
}

impl EntryBody {
    fn push(&mut self, label: impl Into<String>, value: Option<String>) {
        if let Some(value) = value {
            self.lines.push((label.into(), value));
        }
    }

    fn finish(self) -> String {
        let mut out = String::new();
        for (label, value) in &self.lines {
            out.push_str(label);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

fn payload<'a>(
    payload: &'a Option<Map<String, Value>>,
    section: &'static str,
) -> Result<&'a Map<String, Value>, FormatError> {
    payload.as_ref().ok_or(FormatError::MissingField {
        section: "item",
        field: section,
    })
}

/// Value of a key that must exist; `null` renders as absent
fn field(
    map: &Map<String, Value>,
    section: &'static str,
    key: &'static str,
) -> Result<Option<String>, FormatError> {
    map.get(key)
        .map(render)
        .ok_or(FormatError::MissingField {
            section,
            field: key,
        })
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        // Capitalised, as existing entries were written
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        other => Some(other.to_string()),
    }
}
