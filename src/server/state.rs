use crate::chat::TranscriptStore;
use crate::consult::ConsultService;
use sea_orm::DatabaseConnection;

/// 各路由共享的服务句柄
pub struct AppState {
    pub db: DatabaseConnection,
    pub consult: ConsultService,
    pub transcripts: TranscriptStore,
}

impl AppState {
    pub fn new(db: DatabaseConnection, consult: ConsultService, transcripts: TranscriptStore) -> Self {
        Self {
            db,
            consult,
            transcripts,
        }
    }
}
