use chrono::Utc;
use uuid::Uuid;

/// Entity families that receive generated identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdPrefix {
    Approval,
    Department,
    Budget,
}

impl IdPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approval => "APR",
            Self::Department => "DEPT",
            Self::Budget => "BUD",
        }
    }
}

/// Human-readable unique id: `{PREFIX}-{millis}-{random}`. The millis keep ids
/// roughly sortable by creation time; the uuid suffix keeps two submissions
/// inside the same millisecond from colliding.
pub fn generate(prefix: IdPrefix) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{millis}-{}", prefix.as_str(), &suffix[..8])
}
