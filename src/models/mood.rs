use sqlx::FromRow;

/// One `GROUP BY icon` row of the `mood` table.
#[derive(Debug, Clone, FromRow)]
pub struct IconCount {
    pub icon: String,
    pub cnt: i64,
}
