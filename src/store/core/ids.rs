// File: src/store/core/ids.rs

//! Identifier types for the conversation store.
//!
//! Every identifier is an opaque string newtype. Conversation and message
//! ids are generated with the `uuid` crate but are never parsed back: persisted state
//! written by other clients may carry any string, and the store only ever
//! compares ids for equality.
//!
//! Model and purpose ids come from an external catalog and are passed
//! through without validation, so ids unknown to the catalog survive a
//! save/restore cycle untouched.
//!
//! ## Cargo features used by this module
//! - `uuid_v7`: enables `UUIDv7` generation via `uuid/v7`.

use core::fmt;
use core::str::FromStr;
use std::convert::Infallible;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate an id string that sorts roughly by creation time.
///
/// With feature `uuid_v7` enabled, this uses `Uuid::now_v7()`.
/// Otherwise it falls back to `Uuid::new_v4()`.
#[inline]
#[must_use]
fn uuid_time_ordered() -> String {
    #[cfg(feature = "uuid_v7")]
    {
        Uuid::now_v7().to_string()
    }
    #[cfg(not(feature = "uuid_v7"))]
    {
        Uuid::new_v4().to_string()
    }
}

/// Generate a random id string (`UUIDv4`).
#[inline]
#[must_use]
fn uuid_random() -> String {
    Uuid::new_v4().to_string()
}

/// Declare a string newtype with a consistent API.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing string.
            #[inline]
            #[must_use]
            pub fn from_string(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow as `&str`.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into `String`.
            #[inline]
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<$name> for String {
            #[inline]
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }
    };
    (
        $(#[$meta:meta])*
        $name:ident,
        generator = $generator:ident
    ) => {
        define_string_id!($(#[$meta])* $name);

        impl $name {
            /// Generate a fresh identifier.
            #[inline]
            #[must_use]
            pub fn generate() -> Self {
                Self($generator())
            }
        }
    };
}

define_string_id!(
    /// Identifier for a conversation.
    ///
    /// Callers adding a conversation must supply a fresh id; the store does
    /// not check for duplicates on insert.
    ConversationId,
    generator = uuid_time_ordered
);

define_string_id!(
    /// Identifier for a single message within a conversation.
    MessageId,
    generator = uuid_random
);

define_string_id!(
    /// Identifier of a chat model, as supplied by the model catalog.
    ///
    /// Unknown values are accepted so that messages produced by models that
    /// were later removed from the catalog still load.
    ChatModelId
);

define_string_id!(
    /// Identifier of a system purpose (persona), as supplied by the catalog.
    SystemPurposeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = ConversationId::generate();
        let b = ConversationId::generate();
        assert_ne!(a, b);
        assert!(!MessageId::generate().as_str().is_empty());
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = ConversationId::from("c1");
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, "\"c1\"");

        let parsed: Result<ChatModelId, _> = serde_json::from_str("\"not-in-catalog:v9\"");
        assert_eq!(
            parsed.ok().map(ChatModelId::into_string),
            Some("not-in-catalog:v9".to_string())
        );
    }

    #[test]
    fn test_from_str_accepts_anything() {
        let parsed = "missing".parse::<ConversationId>();
        assert_eq!(parsed, Ok(ConversationId::from("missing")));
        assert_eq!(ConversationId::from("x").to_string(), "x");
    }
}
