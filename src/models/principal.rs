//! Principal model
//!
//! An authenticated actor, supplied by the external authentication service
//! as an opaque id plus optional email. Attached to the unit of work before
//! tenant resolution runs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: Option<String>,
}
