use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Default,
            Eq,
            PartialEq,
            Hash,
            PartialOrd,
            Ord,
            Display,
            From,
            Into,
            Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(TriggerId);
string_id!(SubscriptionId);
string_id!(ContactId);
string_id!(OwnerId);
