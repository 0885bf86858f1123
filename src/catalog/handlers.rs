use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::{debug, instrument};

use crate::{
    catalog::{
        dto::{
            parse_positive_id, parse_rarity, rarity_name, ArtistCardsResponse,
            ArtistListResponse, ArtistResponse, ArtistSummary, CardListResponse, CardResponse,
            CollectionInfo, RarityResponse,
        },
        repo,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn artist_routes() -> Router<AppState> {
    Router::new()
        .route("/artists", get(list_artists))
        .route("/artists/:id", get(get_artist))
}

pub fn card_routes() -> Router<AppState> {
    Router::new()
        .route("/cards", get(list_cards))
        .route("/cards/rarity/:level", get(cards_by_rarity))
        .route("/cards/artist/:artist_id", get(cards_by_artist))
        .route("/cards/:id", get(get_card))
}

#[instrument(skip(state))]
pub async fn list_artists(State(state): State<AppState>) -> AppResult<Json<ArtistListResponse>> {
    let artists = repo::list_artists(&state.db).await?;
    Ok(Json(ArtistListResponse {
        success: true,
        message: format!("Found {} K-pop artists", artists.len()),
        data: artists,
    }))
}

#[instrument(skip(state))]
pub async fn get_artist(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<ArtistResponse>> {
    let id = parse_positive_id(&raw_id, "artist", "GET /api/artists/8")?;
    let artist = repo::find_artist(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Artist with ID {id} not found")))?;
    Ok(Json(ArtistResponse {
        success: true,
        message: format!(
            "Found {}",
            artist.stage_name.as_deref().unwrap_or(&artist.name)
        ),
        data: artist,
    }))
}

#[instrument(skip(state))]
pub async fn list_cards(State(state): State<AppState>) -> AppResult<Json<CardListResponse>> {
    let cards = repo::list_cards(&state.db).await?;
    debug!(count = cards.len(), "card catalog loaded");
    Ok(Json(CardListResponse::new(cards)))
}

#[instrument(skip(state))]
pub async fn cards_by_rarity(
    State(state): State<AppState>,
    Path(raw_level): Path<String>,
) -> AppResult<Json<RarityResponse>> {
    let level = parse_rarity(&raw_level)?;
    let cards = repo::list_cards_by_rarity(&state.db, level).await?;
    let name = rarity_name(level);
    Ok(Json(RarityResponse {
        success: true,
        message: format!("Found {} {} cards", cards.len(), name),
        rarity_level: level,
        rarity_name: name,
        card_count: cards.len(),
        data: cards,
    }))
}

#[instrument(skip(state))]
pub async fn cards_by_artist(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<ArtistCardsResponse>> {
    let artist_id = parse_positive_id(&raw_id, "artist", "GET /api/cards/artist/8")?;
    let cards = repo::list_cards_by_artist(&state.db, artist_id).await?;
    let Some(first) = cards.first() else {
        return Err(AppError::NotFound(format!(
            "No cards found for artist ID {artist_id}"
        )));
    };
    let message = format!("Found {} cards for {}", cards.len(), first.display_name());
    let artist = ArtistSummary {
        artist_id: first.artist_id,
        name: first.artist_name.clone(),
        stage_name: first.stage_name.clone(),
        group: first.group_name.clone(),
    };
    Ok(Json(ArtistCardsResponse {
        success: true,
        message,
        artist,
        card_count: cards.len(),
        data: cards,
    }))
}

#[instrument(skip(state))]
pub async fn get_card(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<CardResponse>> {
    let card_id = parse_positive_id(&raw_id, "card", "GET /api/cards/15")?;
    let card = repo::find_card(&state.db, card_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Card with ID {card_id} not found")))?;
    Ok(Json(CardResponse {
        success: true,
        message: format!("Found {} - Version {}", card.display_name(), card.version),
        collection_info: CollectionInfo {
            other_version_hint: format!(
                "Try GET /api/cards/artist/{} to see both versions",
                card.artist_id
            ),
            rarity_peers_hint: format!(
                "Try GET /api/cards/rarity/{} to see similar rarity cards",
                card.rarity_level
            ),
        },
        data: card,
    }))
}
