//! Bitwarden item model, as emitted by `bw list items`.

use crate::error::{Error, FormatError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Item kinds known to the Bitwarden CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Login,
    SecureNote,
    Card,
    Identity,
}

impl ItemKind {
    pub fn from_code(code: i64) -> Result<Self, FormatError> {
        match code {
            1 => Ok(Self::Login),
            2 => Ok(Self::SecureNote),
            3 => Ok(Self::Card),
            4 => Ok(Self::Identity),
            other => Err(FormatError::UnknownType(other)),
        }
    }

    /// Label used inside canonical entry names
    pub fn label(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::SecureNote => "note",
            Self::Card => "card",
            Self::Identity => "identity",
        }
    }
}

/// Custom name/value field attached to an item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

/// Attachment metadata (the file itself is never downloaded)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub size_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One record from the source export.
///
/// Type-specific payloads stay as raw JSON objects: the formatter needs to
/// tell a key that is absent from a key whose value is `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<CustomField>>,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default)]
    pub login: Option<Map<String, Value>>,
    #[serde(default)]
    pub card: Option<Map<String, Value>>,
    #[serde(default)]
    pub identity: Option<Map<String, Value>>,
}

impl SourceItem {
    pub fn kind(&self) -> Result<ItemKind, FormatError> {
        ItemKind::from_code(self.item_type)
    }
}

/// A list element that could not be decoded into a [`SourceItem`]
#[derive(Debug, Clone, PartialEq)]
pub struct RawItemError {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub reason: String,
}

/// Outcome of decoding one list element
pub type DecodedItem = Result<SourceItem, RawItemError>;

/// Parse the output of `bw list items`.
///
/// The document must be a JSON array; anything else is fatal. Each element
/// is decoded on its own so one malformed record does not hide the rest.
pub fn parse_items(json: &str) -> Result<Vec<DecodedItem>, Error> {
    let values: Vec<Value> = serde_json::from_str(json).map_err(Error::ItemList)?;

    Ok(values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let id = value.get("id").and_then(Value::as_str).map(str::to_string);
            let name = value
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string);
            serde_json::from_value::<SourceItem>(value).map_err(|err| RawItemError {
                index,
                id,
                name,
                reason: err.to_string(),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_codes() {
        assert_eq!(ItemKind::from_code(1), Ok(ItemKind::Login));
        assert_eq!(ItemKind::from_code(2), Ok(ItemKind::SecureNote));
        assert_eq!(ItemKind::from_code(3), Ok(ItemKind::Card));
        assert_eq!(ItemKind::from_code(4), Ok(ItemKind::Identity));
        assert_eq!(ItemKind::from_code(5), Err(FormatError::UnknownType(5)));
        assert_eq!(ItemKind::from_code(0), Err(FormatError::UnknownType(0)));
        assert_eq!(ItemKind::SecureNote.label(), "note");
    }

    #[test]
    fn test_parse_bitwarden_login() -> anyhow::Result<()> {
        let json = r#"[{
            "object": "item",
            "id": "0c5bd3a4-3f5c-4c1f-9a4c-b01e00f1c9d2",
            "organizationId": null,
            "folderId": null,
            "type": 1,
            "name": "GitHub",
            "notes": null,
            "favorite": false,
            "fields": [{"name": "recovery", "value": "abcd", "type": 0}],
            "login": {
                "uris": [{"match": null, "uri": "https://github.com"}],
                "username": "octocat",
                "password": "hunter2",
                "totp": null
            },
            "revisionDate": "2024-01-01T00:00:00.000Z"
        }]"#;

        let items = parse_items(json)?;
        assert_eq!(items.len(), 1);
        let item = items[0].as_ref().map_err(|e| anyhow::anyhow!(e.reason.clone()))?;
        assert_eq!(item.kind(), Ok(ItemKind::Login));
        assert_eq!(item.name, "GitHub");
        assert_eq!(item.notes, None);
        assert_eq!(item.fields.as_ref().map(Vec::len), Some(1));
        let login = item.login.as_ref().expect("login payload");
        assert_eq!(login.get("username"), Some(&Value::from("octocat")));
        assert_eq!(login.get("totp"), Some(&Value::Null));
        Ok(())
    }

    #[test]
    fn test_parse_keeps_going_past_bad_element() -> anyhow::Result<()> {
        let json = r#"[
            {"id": "a1", "name": "ok", "type": 2},
            {"id": "b2", "type": 1},
            42
        ]"#;

        let items = parse_items(json)?;
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());

        let bad = items[1].as_ref().unwrap_err();
        assert_eq!(bad.index, 1);
        assert_eq!(bad.id.as_deref(), Some("b2"));
        assert!(bad.reason.contains("name"));

        let bad = items[2].as_ref().unwrap_err();
        assert_eq!(bad.index, 2);
        assert_eq!(bad.id, None);
        Ok(())
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(
            parse_items(r#"{"items": []}"#),
            Err(Error::ItemList(_))
        ));
        assert!(matches!(parse_items(""), Err(Error::ItemList(_))));
    }
}
