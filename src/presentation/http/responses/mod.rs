use poem_openapi::Object;

#[derive(Object)]
pub struct AckResponseDto {
    pub msg: String,
}

impl AckResponseDto {
    pub fn ok() -> Self {
        Self {
            msg: "ok".to_string(),
        }
    }
}

#[derive(Object)]
pub struct UidResponseDto {
    pub uid: String,
}

#[derive(Object)]
pub struct HistoryRecordDto {
    pub id: i64,
    /// The submitted message as JSON.
    pub message: String,
    pub err: String,
    pub req: String,
    pub resp: String,
    pub status: bool,
    pub received_at: i64,
    pub created_at: i64,
}

#[derive(Object)]
pub struct HistoryPageDto {
    pub count: u64,
    pub list: Vec<HistoryRecordDto>,
}
