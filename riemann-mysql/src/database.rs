use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Connection, Executor, Row};

use crate::classify::{
    StatusRow, CHANNEL_NAME, CONNECTION_NAME, SECONDS_BEHIND_MASTER, SLAVE_IO_RUNNING,
    SLAVE_SQL_RUNNING,
};
use crate::connection::{self, ReplicationSource, Session};
use crate::error::{ConnectionError, Endpoint, QueryError, RowFieldError};

pub struct MySqlConnector {
    options: MySqlConnectOptions,
    replication_query: String,
}

impl MySqlConnector {
    pub fn new(options: MySqlConnectOptions, replication_query: &str) -> Self {
        Self {
            options,
            replication_query: replication_query.to_owned(),
        }
    }
}

#[async_trait]
impl connection::Connector for MySqlConnector {
    type Session = MySqlSession;

    async fn connect(&self) -> Result<MySqlSession, ConnectionError> {
        let conn = MySqlConnection::connect_with(&self.options)
            .await
            .map_err(|e| ConnectionError::connect(Endpoint::Database, e))?;

        Ok(MySqlSession {
            conn,
            replication_query: self.replication_query.clone(),
        })
    }
}

pub struct MySqlSession {
    conn: MySqlConnection,
    replication_query: String,
}

#[async_trait]
impl Session for MySqlSession {
    const ENDPOINT: Endpoint = Endpoint::Database;

    async fn probe(&mut self) -> Result<(), ConnectionError> {
        self.conn
            .ping()
            .await
            .map_err(|e| ConnectionError::probe(Endpoint::Database, e))
    }

    async fn close(self) {
        if let Err(e) = self.conn.close().await {
            tracing::debug!("error while closing database connection: {}", e);
        }
    }
}

#[async_trait]
impl ReplicationSource for MySqlSession {
    type Row = MySqlRow;

    async fn replication_status(&mut self) -> Result<Vec<MySqlRow>, QueryError> {
        // SHOW statements go over the text protocol, they cannot all be prepared
        let conn: &mut MySqlConnection = &mut self.conn;
        let rows = Executor::fetch_all(conn, sqlx::raw_sql(&self.replication_query)).await?;
        Ok(rows)
    }
}

impl StatusRow for MySqlRow {
    fn connection_name(&self) -> Option<String> {
        // MariaDB calls the channel Connection_name, MySQL Channel_Name
        [CONNECTION_NAME, CHANNEL_NAME]
            .into_iter()
            .find_map(|column| self.try_get::<Option<String>, _>(column).ok().flatten())
    }

    fn io_running(&self) -> Result<Option<String>, RowFieldError> {
        read_string(self, SLAVE_IO_RUNNING)
    }

    fn sql_running(&self) -> Result<Option<String>, RowFieldError> {
        read_string(self, SLAVE_SQL_RUNNING)
    }

    fn seconds_behind_master(&self) -> Result<Option<i64>, RowFieldError> {
        // Reported as BIGINT UNSIGNED by some servers
        match self.try_get::<Option<i64>, _>(SECONDS_BEHIND_MASTER) {
            Ok(lag) => Ok(lag),
            Err(sqlx::Error::ColumnDecode { .. }) => self
                .try_get::<Option<u64>, _>(SECONDS_BEHIND_MASTER)
                .map(|lag| lag.map(|lag| i64::try_from(lag).unwrap_or(i64::MAX)))
                .map_err(|source| RowFieldError {
                    column: SECONDS_BEHIND_MASTER,
                    source,
                }),
            Err(source) => Err(RowFieldError {
                column: SECONDS_BEHIND_MASTER,
                source,
            }),
        }
    }
}

fn read_string(row: &MySqlRow, column: &'static str) -> Result<Option<String>, RowFieldError> {
    row.try_get::<Option<String>, _>(column)
        .map_err(|source| RowFieldError { column, source })
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;
    use crate::connection::Connector;

    fn assert_replication_source<S: ReplicationSource>() {}

    #[test]
    fn mysql_session_reports_replication_status() {
        assert_replication_source::<MySqlSession>();
    }

    #[tokio::test]
    async fn refused_connect_is_a_database_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = MySqlConnector::new(
            MySqlConnectOptions::new().host("127.0.0.1").port(port),
            "SHOW ALL SLAVES STATUS",
        );

        match connector.connect().await {
            Err(e @ ConnectionError::Connect { .. }) => assert_eq!(e.endpoint(), Endpoint::Database),
            Err(other) => panic!("expected a connect error, got {other:?}"),
            Ok(_) => panic!("connected to a closed port"),
        }
    }
}
