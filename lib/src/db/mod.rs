mod sled;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::Result;

pub use self::sled::{SledDb as Database, Tx, TxResult};

pub trait Identifiable {
    fn get_id(&self) -> Uuid;
}

pub trait Collectable {
    fn get_collection_name() -> &'static str;
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let t: T = pot::from_slice(bytes)?;
    Ok(t)
}

pub fn encode<T: Serialize>(item: &T) -> Result<Vec<u8>> {
    let bytes = pot::to_vec(item)?;
    Ok(bytes)
}

/// Namespace for keys derived from composite identities.
const DERIVED_KEY_NAMESPACE: Uuid = Uuid::from_u128(0x6a1d_43f4_93c4_4b0e_9a1f_52d1_c0e7_a3b9);

/// Derives a stable key from the parts of a composite identity.
///
/// Entities that must be unique per combination of fields (a like per post
/// and user, a view per post, address and agent) are stored under the
/// derived key, so inserting a duplicate overwrites the same slot instead of
/// creating a second row.
pub fn derived_key(parts: &[&[u8]]) -> Uuid {
    let mut name = Vec::new();
    for part in parts {
        name.extend_from_slice(&(part.len() as u32).to_be_bytes());
        name.extend_from_slice(part);
    }
    Uuid::new_v5(&DERIVED_KEY_NAMESPACE, &name)
}
