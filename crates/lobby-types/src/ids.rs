//! Type-safe identifier wrappers around [`String`].
//!
//! Viewer identifiers are handed out by the ordering service and are opaque
//! to the lobby; session names are chosen by users. Both are plain strings
//! on the wire, but wrapping them prevents passing a viewer where a session
//! name is expected.

use std::borrow::Borrow;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Wrap any string-like value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner [`String`] value.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifier of one connected viewer (one connection to the lobby).
    ViewerId
}

define_id! {
    /// User-chosen name of an application session, unique within the lobby.
    SessionName
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let viewer = ViewerId::new("v-1");
        let json = serde_json::to_string(&viewer).ok();
        assert_eq!(json.as_deref(), Some("\"v-1\""));

        let restored: Result<SessionName, _> = serde_json::from_str("\"Alpha\"");
        assert_eq!(restored.ok(), Some(SessionName::from("Alpha")));
    }

    #[test]
    fn map_lookup_by_str() {
        let mut map = BTreeMap::new();
        map.insert(SessionName::from("Alpha"), 1_u32);
        assert_eq!(map.get("Alpha"), Some(&1));
        assert_eq!(map.get("Beta"), None);
    }

    #[test]
    fn display_matches_inner() {
        let name = SessionName::new(String::from("Game 1"));
        assert_eq!(name.to_string(), "Game 1");
        assert_eq!(name.into_inner(), "Game 1");
    }
}
