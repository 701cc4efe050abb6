use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;

pub mod goal;
pub mod meal;
pub mod notification;
pub mod password_reset;
pub mod user;
pub mod workout;

pub use goal::GoalRepository;
pub use meal::MealRepository;
pub use notification::NotificationRepository;
pub use password_reset::PasswordResetRepository;
pub use user::UserRepository;
pub use workout::WorkoutRepository;

/// Result of a scan query. Rows that fail to decode are logged and counted
/// instead of aborting the whole batch.
#[derive(Debug)]
pub struct ScanRows<T> {
    pub rows: Vec<T>,
    pub undecodable: usize,
}

impl<T> ScanRows<T> {
    /// Every row the query returned, decodable or not.
    pub fn total(&self) -> usize {
        self.rows.len() + self.undecodable
    }
}

pub(crate) fn decode_rows<T>(rows: &[SqliteRow], what: &str) -> ScanRows<T>
where
    T: for<'r> FromRow<'r, SqliteRow>,
{
    let mut out = ScanRows {
        rows: Vec::with_capacity(rows.len()),
        undecodable: 0,
    };
    for row in rows {
        match T::from_row(row) {
            Ok(v) => out.rows.push(v),
            Err(e) => {
                tracing::warn!("Skipping undecodable {} row: {}", what, e);
                out.undecodable += 1;
            }
        }
    }
    out
}
