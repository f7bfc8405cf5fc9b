use crate::storage::entity::family_member;
use log::info;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use std::time::Duration;

pub async fn establish_connection(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    // 内存库随连接销毁，只能保持单个常驻连接
    let in_memory = db_url.contains(":memory:");

    let mut opt = ConnectOptions::new(db_url.to_owned());
    opt.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Info);
    if in_memory {
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(10)
            .min_connections(2)
            .idle_timeout(Duration::from_secs(8))
            .max_lifetime(Duration::from_secs(8));
    }

    let db = Database::connect(opt).await?;

    // 启用 WAL 模式
    if !in_memory {
        let _ = sea_orm::ConnectionTrait::execute(
            &db,
            sea_orm::Statement::from_string(
                sea_orm::DatabaseBackend::Sqlite,
                "PRAGMA journal_mode=WAL;".to_string(),
            ),
        )
        .await?;
    }

    // 创建表（如果不存在）
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let stmt = builder.build(
        schema
            .create_table_from_entity(family_member::Entity)
            .if_not_exists(),
    );
    db.execute(stmt).await?;

    // 唯一索引：同一账户的槽位不可重复
    let _ = sea_orm::ConnectionTrait::execute(
        &db,
        sea_orm::Statement::from_string(
            sea_orm::DatabaseBackend::Sqlite,
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_family_members_email_slot ON family_members(email, slot);".to_string(),
        ),
    )
    .await?;

    info!(
        "Database connection established{} and tables initialized.",
        if in_memory { " (in-memory)" } else { " with WAL mode" }
    );

    Ok(db)
}
