use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// An already-authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Owner {
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Name as embossed on a card: "JANE DOE"
    pub fn card_holder_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_uppercase()
    }
}
