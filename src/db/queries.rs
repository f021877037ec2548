use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{Review, ReviewStatus};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const REVIEW_COLUMNS: &str = "review_id, reviewer_name, town, stars, service_type, review_text, status, submitted_at, moderated_at";

fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).ok()
}

fn parse_review_row(row: &Row) -> rusqlite::Result<Review> {
    let status: String = row.get(6)?;
    let submitted_at: String = row.get(7)?;
    let moderated_at: Option<String> = row.get(8)?;

    Ok(Review {
        review_id: row.get(0)?,
        reviewer_name: row.get(1)?,
        town: row.get(2)?,
        stars: row.get(3)?,
        service_type: row.get(4)?,
        review_text: row.get(5)?,
        status: ReviewStatus::parse(&status).unwrap_or(ReviewStatus::Pending),
        submitted_at: parse_ts(&submitted_at).unwrap_or(NaiveDateTime::MIN),
        moderated_at: moderated_at.as_deref().and_then(parse_ts),
    })
}

pub fn insert_review(conn: &Connection, review: &Review) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO reviews (review_id, reviewer_name, town, stars, service_type, review_text, status, submitted_at, moderated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            review.review_id,
            review.reviewer_name,
            review.town,
            review.stars,
            review.service_type,
            review.review_text,
            review.status.as_str(),
            format_ts(&review.submitted_at),
            review.moderated_at.as_ref().map(format_ts),
        ],
    )?;
    Ok(())
}

/// Reviews submitted under `name` strictly after `since`, regardless of status.
pub fn count_reviews_since(
    conn: &Connection,
    name: &str,
    since: &NaiveDateTime,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM reviews WHERE reviewer_name = ?1 AND submitted_at > ?2",
        params![name, format_ts(since)],
        |row| row.get(0),
    )
}

/// Newest first.
pub fn list_reviews_by_status(
    conn: &Connection,
    status: ReviewStatus,
) -> rusqlite::Result<Vec<Review>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE status = ?1 ORDER BY submitted_at DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map(params![status.as_str()], parse_review_row)?;
    rows.collect()
}

pub fn get_review(conn: &Connection, review_id: &str) -> rusqlite::Result<Option<Review>> {
    conn.query_row(
        &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE review_id = ?1"),
        params![review_id],
        parse_review_row,
    )
    .optional()
}

pub fn set_review_status(
    conn: &Connection,
    review_id: &str,
    status: ReviewStatus,
    moderated_at: &NaiveDateTime,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE reviews SET status = ?1, moderated_at = ?2 WHERE review_id = ?3",
        params![status.as_str(), format_ts(moderated_at), review_id],
    )?;
    Ok(count > 0)
}
