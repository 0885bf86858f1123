use sqlx::PgPool;

use crate::catalog::repo_types::{Artist, CardWithArtist};

const CARD_COLUMNS: &str = r#"
    c.card_id,
    c.version,
    c.rarity_level,
    c.image_url,
    c.image_alt_text,
    c.created_at AS card_created_at,
    a.artist_id,
    a.name AS artist_name,
    a.stage_name,
    a.group_name,
    a.country,
    a.debut_year,
    a.hometown,
    a.extra_info
"#;

fn card_query(filter: &str, order: &str) -> String {
    format!(
        "SELECT {CARD_COLUMNS} FROM cards c JOIN artists a ON c.artist_id = a.artist_id {filter} ORDER BY {order}"
    )
}

pub async fn list_artists(db: &PgPool) -> anyhow::Result<Vec<Artist>> {
    let rows = sqlx::query_as::<_, Artist>(
        r#"
        SELECT artist_id, name, stage_name, group_name, country, debut_year,
               hometown, extra_info, created_at
        FROM artists
        ORDER BY name
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_artist(db: &PgPool, artist_id: i32) -> anyhow::Result<Option<Artist>> {
    let row = sqlx::query_as::<_, Artist>(
        r#"
        SELECT artist_id, name, stage_name, group_name, country, debut_year,
               hometown, extra_info, created_at
        FROM artists
        WHERE artist_id = $1
        "#,
    )
    .bind(artist_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn list_cards(db: &PgPool) -> anyhow::Result<Vec<CardWithArtist>> {
    let sql = card_query("", "a.group_name, a.name, c.version");
    let rows = sqlx::query_as::<_, CardWithArtist>(&sql).fetch_all(db).await?;
    Ok(rows)
}

pub async fn list_cards_by_rarity(
    db: &PgPool,
    rarity_level: i32,
) -> anyhow::Result<Vec<CardWithArtist>> {
    let sql = card_query("WHERE c.rarity_level = $1", "a.group_name, a.name, c.version");
    let rows = sqlx::query_as::<_, CardWithArtist>(&sql)
        .bind(rarity_level)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn list_cards_by_artist(
    db: &PgPool,
    artist_id: i32,
) -> anyhow::Result<Vec<CardWithArtist>> {
    let sql = card_query("WHERE c.artist_id = $1", "c.version");
    let rows = sqlx::query_as::<_, CardWithArtist>(&sql)
        .bind(artist_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_card(db: &PgPool, card_id: i32) -> anyhow::Result<Option<CardWithArtist>> {
    let sql = card_query("WHERE c.card_id = $1", "c.card_id");
    let row = sqlx::query_as::<_, CardWithArtist>(&sql)
        .bind(card_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}
