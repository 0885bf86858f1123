use serde::Serialize;

use crate::catalog::repo_types::{Artist, CardWithArtist};
use crate::error::{AppError, AppResult};

pub const VERSIONS_PER_ARTIST: usize = 2;

/// Parses a path segment as a strictly positive integer id.
pub fn parse_positive_id(raw: &str, what: &str, example: &str) -> AppResult<i32> {
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::InvalidParam(format!(
            "Invalid {what} ID. Must be a positive number (e.g. {example})."
        ))),
    }
}

pub fn parse_rarity(raw: &str) -> AppResult<i32> {
    match raw.parse::<i32>() {
        Ok(level) if (1..=5).contains(&level) => Ok(level),
        _ => Err(AppError::InvalidParam(
            "Invalid rarity level. Must be between 1 and 5.".into(),
        )),
    }
}

/// Display name for a validated rarity level.
pub fn rarity_name(level: i32) -> &'static str {
    match level {
        1 => "Common ⭐",
        2 => "Uncommon ⭐⭐",
        3 => "Rare ⭐⭐⭐",
        4 => "Epic ⭐⭐⭐⭐",
        _ => "Legendary ⭐⭐⭐⭐⭐",
    }
}

#[derive(Debug, Serialize)]
pub struct ArtistListResponse {
    pub success: bool,
    pub message: String,
    pub data: Vec<Artist>,
}

#[derive(Debug, Serialize)]
pub struct ArtistResponse {
    pub success: bool,
    pub message: String,
    pub data: Artist,
}

#[derive(Debug, Serialize)]
pub struct Breakdown {
    pub total_artists: usize,
    pub versions_per_artist: usize,
}

#[derive(Debug, Serialize)]
pub struct CardListResponse {
    pub success: bool,
    pub message: String,
    pub total_cards: usize,
    pub breakdown: Breakdown,
    pub data: Vec<CardWithArtist>,
}

impl CardListResponse {
    pub fn new(cards: Vec<CardWithArtist>) -> Self {
        let mut artists: Vec<i32> = cards.iter().map(|c| c.artist_id).collect();
        artists.sort_unstable();
        artists.dedup();
        Self {
            success: true,
            message: format!("Found {} collectible cards", cards.len()),
            total_cards: cards.len(),
            breakdown: Breakdown {
                total_artists: artists.len(),
                versions_per_artist: VERSIONS_PER_ARTIST,
            },
            data: cards,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RarityResponse {
    pub success: bool,
    pub message: String,
    pub rarity_level: i32,
    pub rarity_name: &'static str,
    pub card_count: usize,
    pub data: Vec<CardWithArtist>,
}

#[derive(Debug, Serialize)]
pub struct ArtistSummary {
    pub artist_id: i32,
    pub name: String,
    pub stage_name: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ArtistCardsResponse {
    pub success: bool,
    pub message: String,
    pub artist: ArtistSummary,
    pub card_count: usize,
    pub data: Vec<CardWithArtist>,
}

#[derive(Debug, Serialize)]
pub struct CollectionInfo {
    pub other_version_hint: String,
    pub rarity_peers_hint: String,
}

#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub success: bool,
    pub message: String,
    pub data: CardWithArtist,
    pub collection_info: CollectionInfo,
}
