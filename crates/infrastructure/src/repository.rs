use std::sync::Arc;

use application::{BoardRepository, ConnectionRepository, MessageRepository, UserRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use config::ResourceConfig;
use domain::{Board, Message, RepositoryError, StoredRecord, User, WebSocketConnection};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use tracing::info;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    RepositoryError::storage(err.to_string())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// 四类实体的表名，来自 `resources` 配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub users: String,
    pub boards: String,
    pub messages: String,
    pub connections: String,
}

impl From<&ResourceConfig> for TableNames {
    fn from(resources: &ResourceConfig) -> Self {
        Self {
            users: resources.users_table.clone(),
            boards: resources.boards_table.clone(),
            messages: resources.messages_table.clone(),
            connections: resources.connections_table.clone(),
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: String,
    email: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(value: UserRecord) -> Self {
        User {
            id: value.id,
            email: value.email,
            name: value.name,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct BoardRecord {
    id: String,
    name: String,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl From<BoardRecord> for Board {
    fn from(value: BoardRecord) -> Self {
        Board {
            id: value.id,
            name: value.name,
            created_by: value.created_by,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: String,
    topic: String,
    data: String,
    board_id: String,
    user_id: String,
    created_at: DateTime<Utc>,
}

impl From<MessageRecord> for Message {
    fn from(value: MessageRecord) -> Self {
        Message {
            id: value.id,
            topic: value.topic,
            data: value.data,
            board_id: value.board_id,
            user_id: value.user_id,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ConnectionRecord {
    connection_id: String,
    board_id: Option<String>,
    user_id: Option<String>,
    connected_at: DateTime<Utc>,
}

impl From<ConnectionRecord> for WebSocketConnection {
    fn from(value: ConnectionRecord) -> Self {
        WebSocketConnection {
            connection_id: value.connection_id,
            board_id: value.board_id,
            user_id: value.user_id,
            connected_at: value.connected_at,
        }
    }
}

/// 把行转换为实体并重新校验
fn into_valid<R, T>(rows: Vec<R>) -> Result<Vec<T>, RepositoryError>
where
    T: From<R> + StoredRecord,
{
    rows.into_iter().map(|row| T::from(row).ensure_valid()).collect()
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
    table: String,
}

impl PgUserRepository {
    pub fn new(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: quote_ident(table),
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: User) -> Result<(), RepositoryError> {
        let sql = format!(
            "INSERT INTO {} (id, email, name, created_at) VALUES ($1, $2, $3, $4)",
            self.table
        );
        sqlx::query(&sql)
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            "SELECT id, email, name, created_at FROM {} WHERE email = $1 ORDER BY seq LIMIT 1",
            self.table
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        record.map(|r| User::from(r).ensure_valid()).transpose()
    }
}

#[derive(Clone)]
pub struct PgBoardRepository {
    pool: PgPool,
    table: String,
}

impl PgBoardRepository {
    pub fn new(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: quote_ident(table),
        }
    }
}

#[async_trait]
impl BoardRepository for PgBoardRepository {
    async fn insert(&self, board: Board) -> Result<(), RepositoryError> {
        let sql = format!(
            "INSERT INTO {} (id, name, created_by, created_at) VALUES ($1, $2, $3, $4)",
            self.table
        );
        sqlx::query(&sql)
            .bind(&board.id)
            .bind(&board.name)
            .bind(&board.created_by)
            .bind(board.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Board>, RepositoryError> {
        let sql = format!(
            "SELECT id, name, created_by, created_at FROM {} ORDER BY seq",
            self.table
        );
        let records = sqlx::query_as::<_, BoardRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        into_valid(records)
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
    table: String,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: quote_ident(table),
        }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, message: Message) -> Result<(), RepositoryError> {
        let sql = format!(
            "INSERT INTO {} (id, topic, data, board_id, user_id, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
            self.table
        );
        sqlx::query(&sql)
            .bind(&message.id)
            .bind(&message.topic)
            .bind(&message.data)
            .bind(&message.board_id)
            .bind(&message.user_id)
            .bind(message.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn list_by_board(&self, board_id: &str) -> Result<Vec<Message>, RepositoryError> {
        let sql = format!(
            "SELECT id, topic, data, board_id, user_id, created_at FROM {} WHERE board_id = $1 ORDER BY seq",
            self.table
        );
        let records = sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(board_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        into_valid(records)
    }
}

#[derive(Clone)]
pub struct PgConnectionRepository {
    pool: PgPool,
    table: String,
}

impl PgConnectionRepository {
    pub fn new(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: quote_ident(table),
        }
    }
}

#[async_trait]
impl ConnectionRepository for PgConnectionRepository {
    async fn put(&self, connection: WebSocketConnection) -> Result<(), RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO {} (connection_id, board_id, user_id, connected_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (connection_id) DO UPDATE
            SET board_id = EXCLUDED.board_id,
                user_id = EXCLUDED.user_id,
                connected_at = EXCLUDED.connected_at
            "#,
            self.table
        );
        sqlx::query(&sql)
            .bind(&connection.connection_id)
            .bind(&connection.board_id)
            .bind(&connection.user_id)
            .bind(connection.connected_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn delete(&self, connection_id: &str) -> Result<(), RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE connection_id = $1", self.table);
        sqlx::query(&sql)
            .bind(connection_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn list_by_board(
        &self,
        board_id: &str,
    ) -> Result<Vec<WebSocketConnection>, RepositoryError> {
        let sql = format!(
            "SELECT connection_id, board_id, user_id, connected_at FROM {} WHERE board_id = $1 ORDER BY seq",
            self.table
        );
        let records = sqlx::query_as::<_, ConnectionRecord>(&sql)
            .bind(board_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        into_valid(records)
    }
}

/// 不存在时创建四张表及其二级索引
pub async fn ensure_schema(pool: &PgPool, tables: &TableNames) -> Result<(), sqlx::Error> {
    let users = quote_ident(&tables.users);
    let boards = quote_ident(&tables.boards);
    let messages = quote_ident(&tables.messages);
    let connections = quote_ident(&tables.connections);

    let statements = [
        format!(
            "CREATE TABLE IF NOT EXISTS {users} (
                seq BIGSERIAL,
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {users} (email)",
            quote_ident(&format!("{}_email_idx", tables.users))
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {boards} (
                seq BIGSERIAL,
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_by TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {messages} (
                seq BIGSERIAL,
                id TEXT PRIMARY KEY,
                topic TEXT NOT NULL,
                data TEXT NOT NULL,
                board_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {messages} (board_id)",
            quote_ident(&format!("{}_board_id_idx", tables.messages))
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {connections} (
                seq BIGSERIAL,
                connection_id TEXT PRIMARY KEY,
                board_id TEXT,
                user_id TEXT,
                connected_at TIMESTAMPTZ NOT NULL
            )"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {connections} (board_id)",
            quote_ident(&format!("{}_board_id_idx", tables.connections))
        ),
    ];

    for statement in &statements {
        sqlx::query(statement).execute(pool).await?;
    }
    info!(?tables, "database schema ready");
    Ok(())
}

pub struct PgStorage {
    pub pool: PgPool,
    pub user_repository: Arc<PgUserRepository>,
    pub board_repository: Arc<PgBoardRepository>,
    pub message_repository: Arc<PgMessageRepository>,
    pub connection_repository: Arc<PgConnectionRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool, tables: &TableNames) -> Self {
        Self {
            user_repository: Arc::new(PgUserRepository::new(pool.clone(), &tables.users)),
            board_repository: Arc::new(PgBoardRepository::new(pool.clone(), &tables.boards)),
            message_repository: Arc::new(PgMessageRepository::new(pool.clone(), &tables.messages)),
            connection_repository: Arc::new(PgConnectionRepository::new(
                pool.clone(),
                &tables.connections,
            )),
            pool,
        }
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn table_names_follow_resource_config() {
        let resources = ResourceConfig {
            users_table: "u".into(),
            boards_table: "b".into(),
            messages_table: "m".into(),
            connections_table: "c".into(),
            ..Default::default()
        };
        let tables = TableNames::from(&resources);
        assert_eq!(tables.users, "u");
        assert_eq!(tables.connections, "c");
    }

    #[test]
    fn invalid_rows_are_rejected() {
        let rows = vec![BoardRecord {
            id: "b-1".into(),
            name: "x".into(),
            created_by: "u-1".into(),
            created_at: Utc::now(),
        }];
        let err = into_valid::<_, Board>(rows).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidRecord { entity: "board", .. }));
    }
}
