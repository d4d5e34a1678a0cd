//! Visitor id derivation

use sha2::{Digest, Sha256};

use crate::models::{is_visitor_id, EventRecord, TagConfig};

/// Length of a Piwik PRO visitor id in hex characters
pub const VISITOR_ID_LEN: usize = 16;

/// Hash a raw client identifier into a visitor id
///
/// The id is the first 16 hex characters of the identifier's SHA-256 digest.
pub fn hash_visitor_id(identifier: &str) -> String {
    let digest = Sha256::digest(identifier.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(VISITOR_ID_LEN);
    id
}

/// Resolve the visitor id (`_id`)
///
/// A well-formed configured id wins. Otherwise the event's client identifier
/// is used as-is when already well-formed, or hashed.
pub fn resolve_visitor_id(config: &TagConfig, event: &EventRecord) -> Option<String> {
    if let Some(id) = config.visitor_id.as_deref().filter(|id| is_visitor_id(id)) {
        return Some(id.to_string());
    }

    event.client_id().map(|client_id| {
        if is_visitor_id(&client_id) {
            client_id
        } else {
            hash_visitor_id(&client_id)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventBuilder;

    #[test]
    fn test_hash_visitor_id() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(hash_visitor_id("abc"), "ba7816bf8f01cfea");
        assert_eq!(hash_visitor_id("abc"), hash_visitor_id("abc"));
        assert!(is_visitor_id(&hash_visitor_id("1234567890.1700000000")));
    }

    #[test]
    fn test_configured_id_wins() {
        let mut config = TagConfig::new("shop");
        config.visitor_id = Some("00112233AABBCCDD".to_string());
        let event = EventBuilder::new().field("client_id", "abc").build();

        assert_eq!(
            resolve_visitor_id(&config, &event).as_deref(),
            Some("00112233AABBCCDD")
        );
    }

    #[test]
    fn test_malformed_configured_id_falls_back_to_event() {
        let mut config = TagConfig::new("shop");
        config.visitor_id = Some("visitor-1".to_string());
        let event = EventBuilder::new().field("client_id", "abc").build();

        assert_eq!(
            resolve_visitor_id(&config, &event).as_deref(),
            Some("ba7816bf8f01cfea")
        );
    }

    #[test]
    fn test_well_formed_client_id_is_kept() {
        let config = TagConfig::new("shop");
        let event = EventBuilder::new().vendor("_id", "0123456789abcdef").build();

        assert_eq!(
            resolve_visitor_id(&config, &event).as_deref(),
            Some("0123456789abcdef")
        );
    }

    #[test]
    fn test_absent_without_sources() {
        let config = TagConfig::new("shop");
        assert_eq!(resolve_visitor_id(&config, &EventBuilder::new().build()), None);
    }
}
