use crate::Database;
use crate::models::{GrievanceRow, PushSubscriptionRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, email: &str, name: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, password) VALUES (?1, ?2, ?3, ?4)",
                (id, email, name, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    // -- Grievances --

    pub fn insert_grievance(
        &self,
        id: &str,
        filed_by: &str,
        filed_against: &str,
        text: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO grievances (id, filed_by, filed_against, text) VALUES (?1, ?2, ?3, ?4)",
                (id, filed_by, filed_against, text),
            )?;
            Ok(())
        })
    }

    /// Grievances the user filed, joined with the target's display name.
    pub fn grievances_filed_by(&self, user_id: &str) -> Result<Vec<GrievanceRow>> {
        self.with_conn(|conn| {
            query_grievances(
                conn,
                "SELECT g.id, g.filed_by, g.filed_against, u.name, g.text, g.created_at
                 FROM grievances g
                 LEFT JOIN users u ON g.filed_against = u.id
                 WHERE g.filed_by = ?1
                 ORDER BY g.created_at, g.rowid",
                user_id,
            )
        })
    }

    /// Grievances filed against the user, joined with the filer's display name.
    pub fn grievances_filed_against(&self, user_id: &str) -> Result<Vec<GrievanceRow>> {
        self.with_conn(|conn| {
            query_grievances(
                conn,
                "SELECT g.id, g.filed_by, g.filed_against, u.name, g.text, g.created_at
                 FROM grievances g
                 LEFT JOIN users u ON g.filed_by = u.id
                 WHERE g.filed_against = ?1
                 ORDER BY g.created_at, g.rowid",
                user_id,
            )
        })
    }

    // -- Push subscriptions --

    /// Upsert keyed by (user_id, user_agent). `INSERT OR REPLACE` also clears
    /// a row holding the same endpoint, so re-subscribing a device never
    /// trips either unique constraint.
    pub fn upsert_push_subscription(
        &self,
        id: &str,
        user_id: &str,
        user_agent: &str,
        endpoint: &str,
        expiration_time: Option<i64>,
        p256dh: &str,
        auth: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO push_subscriptions
                     (id, user_id, user_agent, endpoint, expiration_time, p256dh, auth)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![id, user_id, user_agent, endpoint, expiration_time, p256dh, auth],
            )?;
            Ok(())
        })
    }

    /// Returns the number of rows removed. Zero is not an error.
    pub fn delete_push_subscription(&self, user_id: &str, user_agent: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM push_subscriptions WHERE user_id = ?1 AND user_agent = ?2",
                (user_id, user_agent),
            )?;
            Ok(removed)
        })
    }

    pub fn push_subscriptions_for_user(&self, user_id: &str) -> Result<Vec<PushSubscriptionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, user_agent, endpoint, expiration_time, p256dh, auth
                 FROM push_subscriptions
                 WHERE user_id = ?1
                 ORDER BY created_at, rowid",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(PushSubscriptionRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        user_agent: row.get(2)?,
                        endpoint: row.get(3)?,
                        expiration_time: row.get(4)?,
                        p256dh: row.get(5)?,
                        auth: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, email, name, password, created_at FROM users WHERE email = ?1")?;

    let row = stmt
        .query_row([email], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, email, name, password, created_at FROM users WHERE id = ?1")?;

    let row = stmt
        .query_row([id], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_grievances(conn: &Connection, sql: &str, user_id: &str) -> Result<Vec<GrievanceRow>> {
    let mut stmt = conn.prepare(sql)?;

    let rows = stmt
        .query_map([user_id], |row| {
            Ok(GrievanceRow {
                id: row.get(0)?,
                filed_by: row.get(1)?,
                filed_against: row.get(2)?,
                counterparty_name: row
                    .get::<_, Option<String>>(3)?
                    .unwrap_or_else(|| "unknown".to_string()),
                text: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
