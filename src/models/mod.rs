//! Data models for the Kard backend.
//!
//! Field names follow the frontend's camelCase JSON contract.

mod flashcard;
mod generate;
mod usage;

pub use flashcard::*;
pub use generate::*;
pub use usage::*;

/// Deserializers for ids the frontend may send either as strings or as numbers.
pub mod opaque_id {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    impl RawId {
        fn into_string(self) -> String {
            match self {
                RawId::Text(s) => s,
                RawId::Number(n) => n.to_string(),
            }
        }
    }

    pub fn option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<RawId>::deserialize(deserializer).map(|raw| raw.map(RawId::into_string))
    }
}
