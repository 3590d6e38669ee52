/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Stock and reservation counts. Matches the `INTEGER` quantity columns.
pub type Quantity = i32;
