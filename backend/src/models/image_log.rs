use serde::Serialize;

/// One audit row: a file that was received or produced by an operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLog {
    pub id: u64,
    pub filename: String,
    pub operation: String,
    pub processed: bool,
    pub created_at: String,
}
