use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Serializer;
use crate::error::SerializationError;

/// Compact binary encoding via bincode's serde bridge (standard config).
pub struct BincodeSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeSerializer<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BincodeSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BincodeSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BincodeSerializer")
            .field("type", &type_name::<T>())
            .finish()
    }
}

impl<T> Serializer<T> for BincodeSerializer<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>, SerializationError> {
        bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|e| {
            SerializationError::Encode {
                type_name: type_name::<T>(),
                reason: e.to_string(),
            }
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, SerializationError> {
        let (value, read) =
            bincode::serde::decode_from_slice::<T, _>(bytes, bincode::config::standard())
                .map_err(|e| SerializationError::Decode {
                    type_name: type_name::<T>(),
                    reason: e.to_string(),
                })?;

        // Trailing bytes mean the file was written for a different type.
        if read != bytes.len() {
            return Err(SerializationError::Decode {
                type_name: type_name::<T>(),
                reason: format!("{} trailing bytes", bytes.len() - read),
            });
        }
        Ok(value)
    }

    fn format_name(&self) -> &'static str {
        "bincode"
    }
}
