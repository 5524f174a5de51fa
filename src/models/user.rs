use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Contact record fetched from the user service. Either channel may be
/// absent; the notification fan-out skips missing channels silently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}
