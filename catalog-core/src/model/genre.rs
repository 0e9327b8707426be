use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique by `name` (spec §3). Indexed in the `genres` index and served
/// verbatim by `GenreService`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub uuid: Uuid,
    pub name: String,
}
