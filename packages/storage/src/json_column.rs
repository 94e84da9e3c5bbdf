// ABOUTME: Typed JSON column adapters for per-user provider mappings
// ABOUTME: Converts ApiKeysProvided and ModelPreferences to and from JSON/JSONB columns

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{Sqlite, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Database, Decode, Encode, Type, TypeInfo, ValueRef};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ColumnError {
    #[error("failed to encode {target}: {source}")]
    Encode {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot scan {found} into {target}")]
    UnsupportedType { target: &'static str, found: String },
    #[error("failed to decode {target}: {source}")]
    Decode {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw value read from a JSON column, as surfaced by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue<'a> {
    Null,
    Bytes(&'a [u8]),
    Text(&'a str),
    /// Any other driver type, carried by name for error reporting
    Other(String),
}

impl<'a> From<&'a [u8]> for ColumnValue<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        ColumnValue::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for ColumnValue<'a> {
    fn from(text: &'a str) -> Self {
        ColumnValue::Text(text)
    }
}

/// Read/write contract shared by every mapping stored in a JSON column.
///
/// Writes always produce a JSON object: an absent mapping encodes as `{}`.
/// Reads treat NULL, zero-length values and the JSON literal `null` as an
/// empty mapping, so callers can index into the result without checks.
pub trait JsonColumn: Default + Serialize + DeserializeOwned {
    /// Name used in error messages
    const TYPE_NAME: &'static str;

    fn encode_column(value: Option<&Self>) -> Result<String, ColumnError> {
        let encoded = match value {
            Some(value) => serde_json::to_string(value),
            None => serde_json::to_string(&Self::default()),
        };
        encoded.map_err(|source| ColumnError::Encode {
            target: Self::TYPE_NAME,
            source,
        })
    }

    fn to_column(&self) -> Result<String, ColumnError> {
        Self::encode_column(Some(self))
    }

    /// Decode into a fresh value. Callers assign the result only on success.
    fn from_column(value: ColumnValue<'_>) -> Result<Self, ColumnError> {
        let bytes = match value {
            ColumnValue::Null => return Ok(Self::default()),
            ColumnValue::Bytes(bytes) => bytes,
            ColumnValue::Text(text) => text.as_bytes(),
            ColumnValue::Other(found) => {
                return Err(ColumnError::UnsupportedType {
                    target: Self::TYPE_NAME,
                    found,
                })
            }
        };

        if bytes.is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_slice::<Option<Self>>(bytes)
            .map(Option::unwrap_or_default)
            .map_err(|source| ColumnError::Decode {
                target: Self::TYPE_NAME,
                source,
            })
    }

    /// In-place decode.
    ///
    /// An unsupported source type resets `self` to empty before returning
    /// the error. Malformed JSON leaves `self` untouched.
    fn scan_column(&mut self, value: ColumnValue<'_>) -> Result<(), ColumnError> {
        match Self::from_column(value) {
            Ok(decoded) => {
                *self = decoded;
                Ok(())
            }
            Err(err @ ColumnError::UnsupportedType { .. }) => {
                *self = Self::default();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

/// Provider name -> whether the user has supplied an API key for it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKeysProvided(BTreeMap<String, bool>);

impl ApiKeysProvided {
    pub fn new() -> Self {
        Self::default()
    }

    /// Missing providers count as not provided
    pub fn has_key(&self, provider: &str) -> bool {
        self.0.get(provider).copied().unwrap_or(false)
    }

    pub fn set(&mut self, provider: impl Into<String>, provided: bool) {
        self.0.insert(provider.into(), provided);
    }
}

impl JsonColumn for ApiKeysProvided {
    const TYPE_NAME: &'static str = "ApiKeysProvided";
}

impl Deref for ApiKeysProvided {
    type Target = BTreeMap<String, bool>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ApiKeysProvided {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<BTreeMap<String, bool>> for ApiKeysProvided {
    fn from(map: BTreeMap<String, bool>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for ApiKeysProvided {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Per-provider model toggles: provider -> model -> enabled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelPreferences(BTreeMap<String, BTreeMap<String, bool>>);

impl ModelPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, provider: &str, model: &str) -> bool {
        self.0
            .get(provider)
            .and_then(|models| models.get(model))
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&mut self, provider: impl Into<String>, model: impl Into<String>, enabled: bool) {
        self.0
            .entry(provider.into())
            .or_default()
            .insert(model.into(), enabled);
    }

    /// Enabled model ids for a provider, in key order
    pub fn enabled_models(&self, provider: &str) -> Vec<&str> {
        self.0
            .get(provider)
            .map(|models| {
                models
                    .iter()
                    .filter(|(_, enabled)| **enabled)
                    .map(|(model, _)| model.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl JsonColumn for ModelPreferences {
    const TYPE_NAME: &'static str = "ModelPreferences";
}

impl Deref for ModelPreferences {
    type Target = BTreeMap<String, BTreeMap<String, bool>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ModelPreferences {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<BTreeMap<String, BTreeMap<String, bool>>> for ModelPreferences {
    fn from(map: BTreeMap<String, BTreeMap<String, bool>>) -> Self {
        Self(map)
    }
}

/// Classify a SQLite value. JSON is stored as TEXT, but BLOBs written by
/// other tools are accepted too.
fn sqlite_column_value(value: SqliteValueRef<'_>) -> Result<ColumnValue<'_>, BoxDynError> {
    if value.is_null() {
        return Ok(ColumnValue::Null);
    }

    let type_name = value.type_info().name().to_string();
    match type_name.as_str() {
        "TEXT" => Ok(ColumnValue::Text(<&str as Decode<Sqlite>>::decode(value)?)),
        "BLOB" => Ok(ColumnValue::Bytes(<&[u8] as Decode<Sqlite>>::decode(value)?)),
        _ => Ok(ColumnValue::Other(type_name)),
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    use super::{BoxDynError, ColumnValue};
    use sqlx::postgres::{PgValueFormat, PgValueRef};
    use sqlx::{TypeInfo, ValueRef};

    pub(super) const JSONB_VERSION: u8 = 1;

    /// Binary JSONB is the JSON text prefixed with a format version byte.
    pub(super) fn encode_jsonb(json: &str, buf: &mut Vec<u8>) {
        buf.push(JSONB_VERSION);
        buf.extend_from_slice(json.as_bytes());
    }

    pub(super) fn strip_jsonb_version(bytes: &[u8]) -> Result<&[u8], BoxDynError> {
        match bytes.split_first() {
            None => Ok(bytes),
            Some((&JSONB_VERSION, json)) => Ok(json),
            Some((version, _)) => {
                Err(format!("unsupported JSONB format version {}", version).into())
            }
        }
    }

    pub(super) fn classify(
        type_name: String,
        format: PgValueFormat,
        bytes: &[u8],
    ) -> Result<ColumnValue<'_>, BoxDynError> {
        match (type_name.as_str(), format) {
            ("JSONB", PgValueFormat::Binary) => {
                Ok(ColumnValue::Bytes(strip_jsonb_version(bytes)?))
            }
            ("BYTEA", PgValueFormat::Binary) => Ok(ColumnValue::Bytes(bytes)),
            ("JSON" | "JSONB" | "TEXT" | "VARCHAR" | "BPCHAR", _) => {
                Ok(ColumnValue::Text(std::str::from_utf8(bytes)?))
            }
            _ => Ok(ColumnValue::Other(type_name)),
        }
    }

    pub(super) fn pg_column_value(value: PgValueRef<'_>) -> Result<ColumnValue<'_>, BoxDynError> {
        if value.is_null() {
            return Ok(ColumnValue::Null);
        }

        let type_name = value.type_info().name().to_string();
        let format = value.format();
        classify(type_name, format, value.as_bytes()?)
    }

}

// `compatible` accepts every column type so that unexpected types reach
// `decode` and surface as `ColumnError::UnsupportedType`.
macro_rules! impl_sqlx_json_column {
    ($ty:ty) => {
        impl Type<Sqlite> for $ty {
            fn type_info() -> SqliteTypeInfo {
                <str as Type<Sqlite>>::type_info()
            }

            fn compatible(_ty: &SqliteTypeInfo) -> bool {
                true
            }
        }

        impl<'q> Encode<'q, Sqlite> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
            ) -> Result<IsNull, BoxDynError> {
                let json = self.to_column()?;
                <String as Encode<'q, Sqlite>>::encode(json, buf)
            }
        }

        impl<'r> Decode<'r, Sqlite> for $ty {
            fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
                Ok(<$ty as JsonColumn>::from_column(sqlite_column_value(value)?)?)
            }
        }

        #[cfg(feature = "postgres")]
        impl Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                sqlx::postgres::PgTypeInfo::with_name("jsonb")
            }

            fn compatible(_ty: &sqlx::postgres::PgTypeInfo) -> bool {
                true
            }
        }

        #[cfg(feature = "postgres")]
        impl<'q> Encode<'q, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<IsNull, BoxDynError> {
                let json = self.to_column()?;
                postgres::encode_jsonb(&json, buf);
                Ok(IsNull::No)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> Decode<'r, sqlx::Postgres> for $ty {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, BoxDynError> {
                Ok(<$ty as JsonColumn>::from_column(
                    postgres::pg_column_value(value)?,
                )?)
            }
        }
    };
}

impl_sqlx_json_column!(ApiKeysProvided);
impl_sqlx_json_column!(ModelPreferences);
