use serde::{Deserialize, Serialize};

use super::ids::{ContactId, OwnerId};

/// A delivery endpoint. `contact_type` is the routing key used to pick a
/// sender channel (component G); `value` is transport-specific (an email
/// address, a webhook URL, a phone number, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub user: OwnerId,
    pub contact_type: String,
    pub value: String,
}
