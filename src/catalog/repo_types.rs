use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Artist {
    pub artist_id: i32,
    pub name: String,
    pub stage_name: Option<String>,
    pub group_name: Option<String>,
    pub country: Option<String>,
    pub debut_year: Option<i32>,
    pub hometown: Option<String>,
    pub extra_info: Option<serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Card joined with its artist.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CardWithArtist {
    pub card_id: i32,
    pub version: i32,
    pub rarity_level: i32,
    pub image_url: Option<String>,
    pub image_alt_text: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub card_created_at: OffsetDateTime,
    pub artist_id: i32,
    pub artist_name: String,
    pub stage_name: Option<String>,
    pub group_name: Option<String>,
    pub country: Option<String>,
    pub debut_year: Option<i32>,
    pub hometown: Option<String>,
    pub extra_info: Option<serde_json::Value>,
}

impl CardWithArtist {
    /// Stage name when the artist has one, legal name otherwise.
    pub fn display_name(&self) -> &str {
        self.stage_name.as_deref().unwrap_or(&self.artist_name)
    }
}
