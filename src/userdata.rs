//! User data codec.
//!
//! Stremio clients embed addon configuration in the URL, either as a path
//! segment (`/{userData}/stream/...`) or as a `userData` query parameter.
//! The value is JSON, encoded as percent-escaped text or as URL-safe base64
//! depending on [`UserDataEncoding`].
//!
//! Whether the addon expects typed user data is decided once, when the
//! addon is built: [`UserDataSchema::Unregistered`] always yields the empty
//! [`UserData::Placeholder`], while [`UserDataSchema::Registered`] parses
//! the JSON into the addon's user data type.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::UserDataEncoding;

/// Marker bound for user data types.
pub trait UserDataType: DeserializeOwned + fmt::Debug + Send + Sync + 'static {}

impl<T> UserDataType for T where T: DeserializeOwned + fmt::Debug + Send + Sync + 'static {}

/// User data could not be decoded. Always the client's fault.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid percent-encoding: {0}")]
    Percent(#[from] std::str::Utf8Error),

    #[error("user data doesn't match the registered schema: {0}")]
    Schema(#[from] serde_json::Error),
}

/// Whether a user data type was registered for the addon.
pub enum UserDataSchema<U> {
    /// Handlers receive [`UserData::Placeholder`] for every request.
    Unregistered,
    /// User data is parsed into `U`.
    Registered(PhantomData<fn() -> U>),
}

impl<U> UserDataSchema<U> {
    pub fn registered() -> Self {
        Self::Registered(PhantomData)
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(_))
    }
}

impl<U> Clone for UserDataSchema<U> {
    fn clone(&self) -> Self {
        match self {
            Self::Unregistered => Self::Unregistered,
            Self::Registered(_) => Self::Registered(PhantomData),
        }
    }
}

impl<U> fmt::Debug for UserDataSchema<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unregistered => f.write_str("Unregistered"),
            Self::Registered(_) => write!(f, "Registered<{}>", std::any::type_name::<U>()),
        }
    }
}

/// Decoded user data handed to handlers.
#[derive(Debug)]
pub enum UserData<U> {
    /// No schema registered. Stands in for the empty string.
    Placeholder,
    /// A schema is registered but the request carried no user data.
    Absent,
    /// Parsed user data.
    Typed(Arc<U>),
}

impl<U> UserData<U> {
    /// The parsed value, if any.
    pub fn typed(&self) -> Option<&U> {
        match self {
            Self::Typed(value) => Some(value.as_ref()),
            _ => None,
        }
    }

    /// The placeholder string for addons without a registered schema.
    pub fn as_placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Placeholder => Some(""),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        !matches!(self, Self::Typed(_))
    }
}

impl<U> Clone for UserData<U> {
    fn clone(&self) -> Self {
        match self {
            Self::Placeholder => Self::Placeholder,
            Self::Absent => Self::Absent,
            Self::Typed(value) => Self::Typed(Arc::clone(value)),
        }
    }
}

/// Decoder for one addon's user data.
pub struct UserDataCodec<U> {
    schema: UserDataSchema<U>,
    encoding: UserDataEncoding,
}

impl<U> Clone for UserDataCodec<U> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            encoding: self.encoding,
        }
    }
}

impl<U> fmt::Debug for UserDataCodec<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDataCodec")
            .field("schema", &self.schema)
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl<U: UserDataType> UserDataCodec<U> {
    pub fn new(schema: UserDataSchema<U>, encoding: UserDataEncoding) -> Self {
        Self { schema, encoding }
    }

    pub fn encoding(&self) -> UserDataEncoding {
        self.encoding
    }

    pub fn schema(&self) -> &UserDataSchema<U> {
        &self.schema
    }

    /// Decode a raw user data value.
    ///
    /// Empty input or an unregistered schema never fails.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` when the value is not valid for the configured
    /// encoding or doesn't match the schema. Callers answer with 400.
    pub fn decode(&self, raw: &str) -> Result<UserData<U>, DecodeError> {
        if self.schema.is_registered() && raw.is_empty() {
            return Ok(UserData::Absent);
        }
        if !self.schema.is_registered() {
            return Ok(UserData::Placeholder);
        }

        let json = decode_bytes(raw, self.encoding).inspect_err(|e| {
            // Most likely an encoding error on the client side
            warn!(error = %e, "Couldn't decode user data");
        })?;

        let value: U = serde_json::from_slice(&json).map_err(|e| {
            warn!(error = %e, "Couldn't unmarshal user data");
            DecodeError::Schema(e)
        })?;

        debug!(user_data = ?value, "Decoded user data");
        Ok(UserData::Typed(Arc::new(value)))
    }
}

/// Strip the encoding and return the raw JSON bytes.
fn decode_bytes(raw: &str, encoding: UserDataEncoding) -> Result<Vec<u8>, DecodeError> {
    match encoding {
        UserDataEncoding::Base64Url => {
            // Accept values with and without padding
            let unpadded = raw.trim_end_matches('=');
            Ok(URL_SAFE_NO_PAD.decode(unpadded)?)
        }
        UserDataEncoding::PercentEncodedJson => {
            let text = percent_decode_str(raw).decode_utf8()?;
            Ok(text.into_owned().into_bytes())
        }
    }
}

/// Encode user data the way a client would put it into the URL.
///
/// # Errors
///
/// Returns the serialization error if `value` can't be turned into JSON.
pub fn encode<T: Serialize>(value: &T, encoding: UserDataEncoding) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(value)?;
    Ok(match encoding {
        UserDataEncoding::Base64Url => URL_SAFE.encode(json),
        UserDataEncoding::PercentEncodedJson => {
            let text = String::from_utf8_lossy(&json);
            utf8_percent_encode(&text, NON_ALPHANUMERIC).to_string()
        }
    })
}
