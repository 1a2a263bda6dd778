use super::*;
use crate::persistence::{PostgresConnection, PostgresPersistence};

pub struct PostgresSessionStore;

impl SessionStore<PostgresPersistence> for PostgresSessionStore {
    fn authenticate(
        &self,
        conn: &mut PostgresConnection,
        credentials: &Credentials,
    ) -> Result<Option<UserId>> {
        Ok(conn
            .query_opt(
                "SELECT user_id FROM users_sessions WHERE uid = $1 AND client = $2 AND access_token = $3",
                &[&credentials.uid, &credentials.client, &credentials.access_token],
            )?
            .map(|row| row.try_get("user_id"))
            .transpose()?)
    }
}
