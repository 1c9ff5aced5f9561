use serde::{ Deserialize, Serialize };
use uuid::Uuid;

use crate::error::{ AppError, Result };

/// Structured metadata attached to ledger entries and withdrawal requests.
///
/// Stored as a JSON document in a `text` column; the `kind` tag keeps old
/// rows readable when variants are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Metadata {
    ManualAdjustment {
        reason: String,
        admin_id: Uuid,
    },
    ExternalReference {
        system: String,
        reference: String,
    },
    Reversal {
        original_entry_id: Uuid,
        reason: String,
    },
    ClientContext {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ip_address: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_agent: Option<String>,
    },
    Opaque {
        data: Vec<u8>,
    },
}

impl Metadata {
    pub fn encode(&self) -> Result<String> {
        serde_json
            ::to_string(self)
            .map_err(|e| AppError::Internal(format!("Failed to encode metadata: {}", e)))
    }

    pub fn decode(raw: &str) -> Result<Self> {
        serde_json
            ::from_str(raw)
            .map_err(|e| AppError::InvalidInput(format!("Malformed metadata: {}", e)))
    }

    /// Encodes an optional value for storage in a nullable column.
    pub fn encode_opt(value: Option<&Metadata>) -> Result<Option<String>> {
        value.map(Metadata::encode).transpose()
    }

    /// Kinds a customer may attach to their own requests. Adjustment and
    /// reversal records are written by the ledger and admin paths only.
    pub fn is_client_supplied(&self) -> bool {
        matches!(
            self,
            Metadata::ClientContext { .. } |
                Metadata::ExternalReference { .. } |
                Metadata::Opaque { .. }
        )
    }

    /// Rejects kinds a customer may not supply.
    pub fn ensure_client_supplied(value: Option<&Metadata>) -> Result<()> {
        match value {
            Some(meta) if !meta.is_client_supplied() =>
                Err(AppError::InvalidInput("Metadata kind is reserved for internal records".into())),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_encoding() {
        let admin_id = Uuid::new_v4();
        let meta = Metadata::ManualAdjustment {
            reason: "goodwill".into(),
            admin_id,
        };
        let raw = meta.encode().unwrap();
        assert!(raw.contains("\"kind\":\"manual_adjustment\""));
        assert_eq!(Metadata::decode(&raw).unwrap(), meta);
    }

    #[test]
    fn test_client_context_omits_missing_fields() {
        let meta = Metadata::ClientContext {
            ip_address: Some("10.0.0.1".into()),
            user_agent: None,
        };
        let raw = meta.encode().unwrap();
        assert!(!raw.contains("user_agent"));
        assert_eq!(
            Metadata::decode(r#"{"kind":"client_context"}"#).unwrap(),
            Metadata::ClientContext { ip_address: None, user_agent: None }
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(matches!(Metadata::decode(r#"{"kind":"free_form"}"#), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_reserved_kinds_not_client_supplied() {
        let adjustment = Metadata::ManualAdjustment {
            reason: "goodwill".into(),
            admin_id: Uuid::new_v4(),
        };
        let reversal = Metadata::Reversal {
            original_entry_id: Uuid::new_v4(),
            reason: "rejected".into(),
        };
        assert!(!adjustment.is_client_supplied());
        assert!(matches!(
            Metadata::ensure_client_supplied(Some(&reversal)),
            Err(AppError::InvalidInput(_))
        ));

        let context = Metadata::ClientContext { ip_address: None, user_agent: Some("app/2.1".into()) };
        assert!(context.is_client_supplied());
        assert!(Metadata::ensure_client_supplied(Some(&context)).is_ok());
        assert!(Metadata::ensure_client_supplied(None).is_ok());
    }
}
