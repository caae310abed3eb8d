//! Persistence collaborator.
//!
//! [`Repository`] is the row-oriented contract the stores are built against;
//! [`Database`] implements it on SQLite. Stores never write piecemeal: every
//! mutation is handed over as one [`ChangeSet`] and either lands completely
//! or not at all.

mod schema;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, Transaction};
use uuid::Uuid;

use crate::models::*;

/// A manifestation row write.
#[derive(Debug, Clone, Copy)]
pub enum ManifestationWrite<'a> {
    Insert(&'a Manifestation),
    Update(&'a Manifestation),
    Delete(Uuid),
}

/// Everything one store operation needs persisted, applied atomically.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeSet<'a> {
    pub user: Option<&'a User>,
    pub manifestation: Option<ManifestationWrite<'a>>,
    pub daily_intent: Option<&'a DailyIntent>,
    /// A newly published community entry, written with its source update.
    pub community: Option<&'a CommunityManifestation>,
}

/// Row storage for users, manifestations and the community pool.
///
/// Implementations must be safe to share between request handlers. Writes
/// that would touch zero rows (updating or deleting a missing id) are errors,
/// so that a caller's in-memory copy can never silently drift from storage.
pub trait Repository: Send + Sync {
    /// Insert `candidate` unless a user with the same wallet address already
    /// exists; return whichever row is stored.
    fn find_or_create_user(&self, candidate: &User) -> Result<User>;

    fn get_manifestations_by_owner(&self, owner_id: Uuid) -> Result<Vec<Manifestation>>;

    fn commit(&self, changes: &ChangeSet<'_>) -> Result<()>;

    /// The whole pool, most recently shared first.
    fn get_community_manifestations(&self) -> Result<Vec<CommunityManifestation>>;

    fn insert_community_manifestation(&self, entry: &CommunityManifestation) -> Result<()>;

    /// Make `address` a member (`present`) or non-member of the like or
    /// support set. Idempotent in both directions.
    fn set_interaction(
        &self,
        manifestation_id: Uuid,
        address: &str,
        kind: InteractionKind,
        present: bool,
        at: DateTime<Utc>,
    ) -> Result<()>;

    fn insert_comment(&self, manifestation_id: Uuid, comment: &CommunityComment) -> Result<()>;
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    pub fn get_user_by_wallet(&self, wallet_address: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE wallet_address = ?"),
                [wallet_address],
                read_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_daily_intents(&self, user_id: Uuid) -> Result<Vec<DailyIntent>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, user_id, intent, date, energy_boost, created_at
             FROM daily_intents WHERE user_id = ? ORDER BY created_at",
        )?;

        let intents = stmt
            .query_map([user_id.to_string()], |row| {
                Ok(DailyIntent {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    user_id: parse_uuid(row.get::<_, String>(1)?),
                    intent: row.get(2)?,
                    date: parse_date(row.get::<_, String>(3)?),
                    energy_boost: row.get(4)?,
                    created_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(intents)
    }
}

/// `<data dir>/manifestation/manifestation.db` for the current platform.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "manifestation")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("manifestation.db"))
}

impl Repository for Database {
    fn find_or_create_user(&self, candidate: &User) -> Result<User> {
        let conn = self.conn.lock().expect("database lock poisoned");

        let inserted = conn.execute(
            "INSERT INTO users (id, wallet_address, name, energy_level, daily_streak, total_manifestations,
                                completed_count, daily_intent, last_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(wallet_address) DO NOTHING",
            rusqlite::params![
                candidate.id.to_string(),
                &candidate.wallet_address,
                &candidate.name,
                candidate.energy_level,
                candidate.daily_streak,
                candidate.total_manifestations,
                candidate.completed_count,
                &candidate.daily_intent,
                candidate.last_active_at.to_rfc3339(),
                candidate.created_at.to_rfc3339(),
                candidate.updated_at.to_rfc3339(),
            ],
        )?;
        if inserted > 0 {
            tracing::info!(wallet = %candidate.wallet_address, "Created user");
        }

        let user = conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE wallet_address = ?"),
            [&candidate.wallet_address],
            read_user,
        )?;
        Ok(user)
    }

    fn get_manifestations_by_owner(&self, owner_id: Uuid) -> Result<Vec<Manifestation>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {MANIFESTATION_COLUMNS} FROM manifestations
             WHERE user_id = ? ORDER BY created_at, rowid"
        ))?;

        let manifestations = stmt
            .query_map([owner_id.to_string()], read_manifestation)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(manifestations)
    }

    fn commit(&self, changes: &ChangeSet<'_>) -> Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        if let Some(write) = changes.manifestation {
            write_manifestation(&tx, write)?;
        }
        if let Some(user) = changes.user {
            write_user(&tx, user)?;
        }
        if let Some(intent) = changes.daily_intent {
            tx.execute(
                "INSERT INTO daily_intents (id, user_id, intent, date, energy_boost, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                (
                    intent.id.to_string(),
                    intent.user_id.to_string(),
                    &intent.intent,
                    intent.date.to_string(),
                    intent.energy_boost,
                    intent.created_at.to_rfc3339(),
                ),
            )?;
        }
        if let Some(entry) = changes.community {
            write_community_manifestation(&tx, entry)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_community_manifestations(&self) -> Result<Vec<CommunityManifestation>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, source_id, title, description, emoji, state, category, tags, progress,
                    author_name, author_address, author_verified, created_at, updated_at, shared_at
             FROM community_manifestations ORDER BY shared_at DESC, rowid DESC",
        )?;

        let mut entries = stmt
            .query_map([], |row| {
                Ok(CommunityManifestation {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    source_id: parse_uuid(row.get::<_, String>(1)?),
                    title: row.get(2)?,
                    description: row.get(3)?,
                    emoji: row.get(4)?,
                    state: parse_state(row.get::<_, String>(5)?),
                    category: row.get(6)?,
                    tags: parse_tags(row.get::<_, String>(7)?),
                    progress: row.get(8)?,
                    author: Author {
                        name: row.get(9)?,
                        address: row.get(10)?,
                        verified: row.get::<_, i32>(11)? != 0,
                    },
                    likes: Vec::new(),
                    supporters: Vec::new(),
                    comments: Vec::new(),
                    created_at: parse_datetime(row.get::<_, String>(12)?),
                    updated_at: parse_datetime(row.get::<_, String>(13)?),
                    shared_at: parse_datetime(row.get::<_, String>(14)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let index: HashMap<Uuid, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();

        let mut stmt = conn.prepare(
            "SELECT id, user_id, manifestation_id, type, content, author_name, created_at
             FROM community_interactions ORDER BY created_at, rowid",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let manifestation_id = parse_uuid(row.get::<_, String>(2)?);
            let Some(&i) = index.get(&manifestation_id) else {
                continue;
            };
            let entry = &mut entries[i];
            let address: String = row.get(1)?;
            match row.get::<_, String>(3)?.as_str() {
                "like" => entry.likes.push(address),
                "support" => entry.supporters.push(address),
                "comment" => entry.comments.push(CommunityComment {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    author: CommentAuthor {
                        name: row
                            .get::<_, Option<String>>(5)?
                            .unwrap_or_else(|| short_address(&address)),
                        address,
                    },
                    content: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    created_at: parse_datetime(row.get::<_, String>(6)?),
                }),
                other => tracing::warn!("Skipping unknown interaction type {:?}", other),
            }
        }

        Ok(entries)
    }

    fn insert_community_manifestation(&self, entry: &CommunityManifestation) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        write_community_manifestation(&conn, entry)
    }

    fn set_interaction(
        &self,
        manifestation_id: Uuid,
        address: &str,
        kind: InteractionKind,
        present: bool,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        if present {
            conn.execute(
                "INSERT OR IGNORE INTO community_interactions (id, user_id, manifestation_id, type, created_at)
                 VALUES (?, ?, ?, ?, ?)",
                (
                    Uuid::new_v4().to_string(),
                    address,
                    manifestation_id.to_string(),
                    kind.as_str(),
                    at.to_rfc3339(),
                ),
            )?;
        } else {
            conn.execute(
                "DELETE FROM community_interactions
                 WHERE manifestation_id = ? AND user_id = ? AND type = ?",
                (manifestation_id.to_string(), address, kind.as_str()),
            )?;
        }
        Ok(())
    }

    fn insert_comment(&self, manifestation_id: Uuid, comment: &CommunityComment) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO community_interactions
                (id, user_id, manifestation_id, type, content, author_name, created_at)
             VALUES (?, ?, ?, 'comment', ?, ?, ?)",
            (
                comment.id.to_string(),
                &comment.author.address,
                manifestation_id.to_string(),
                &comment.content,
                &comment.author.name,
                comment.created_at.to_rfc3339(),
            ),
        )?;
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

const USER_COLUMNS: &str = "id, wallet_address, name, energy_level, daily_streak, total_manifestations, \
     completed_count, daily_intent, last_active, created_at, updated_at";

const MANIFESTATION_COLUMNS: &str = "id, user_id, title, description, emoji, state, is_public, \
     category, tags, progress, created_at, updated_at";

fn read_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(row.get::<_, String>(0)?),
        wallet_address: row.get(1)?,
        name: row.get(2)?,
        energy_level: row.get(3)?,
        daily_streak: row.get(4)?,
        total_manifestations: row.get(5)?,
        completed_count: row.get(6)?,
        daily_intent: row.get(7)?,
        last_active_at: parse_datetime(row.get::<_, String>(8)?),
        created_at: parse_datetime(row.get::<_, String>(9)?),
        updated_at: parse_datetime(row.get::<_, String>(10)?),
    })
}

fn read_manifestation(row: &Row<'_>) -> rusqlite::Result<Manifestation> {
    Ok(Manifestation {
        id: parse_uuid(row.get::<_, String>(0)?),
        owner_id: parse_uuid(row.get::<_, String>(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        emoji: row.get(4)?,
        state: parse_state(row.get::<_, String>(5)?),
        is_public: row.get::<_, i32>(6)? != 0,
        category: row.get(7)?,
        tags: parse_tags(row.get::<_, String>(8)?),
        progress: row.get(9)?,
        created_at: parse_datetime(row.get::<_, String>(10)?),
        updated_at: parse_datetime(row.get::<_, String>(11)?),
    })
}

fn write_manifestation(tx: &Transaction<'_>, write: ManifestationWrite<'_>) -> Result<()> {
    match write {
        ManifestationWrite::Insert(m) => {
            tx.execute(
                &format!(
                    "INSERT INTO manifestations ({MANIFESTATION_COLUMNS})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                rusqlite::params![
                    m.id.to_string(),
                    m.owner_id.to_string(),
                    &m.title,
                    &m.description,
                    &m.emoji,
                    m.state.as_str(),
                    if m.is_public { 1 } else { 0 },
                    &m.category,
                    serde_json::to_string(&m.tags)?,
                    m.progress,
                    m.created_at.to_rfc3339(),
                    m.updated_at.to_rfc3339(),
                ],
            )?;
        }
        ManifestationWrite::Update(m) => {
            let rows = tx.execute(
                "UPDATE manifestations SET title = ?, description = ?, emoji = ?, state = ?, is_public = ?,
                        category = ?, tags = ?, progress = ?, updated_at = ?
                 WHERE id = ? AND user_id = ?",
                rusqlite::params![
                    &m.title,
                    &m.description,
                    &m.emoji,
                    m.state.as_str(),
                    if m.is_public { 1 } else { 0 },
                    &m.category,
                    serde_json::to_string(&m.tags)?,
                    m.progress,
                    m.updated_at.to_rfc3339(),
                    m.id.to_string(),
                    m.owner_id.to_string(),
                ],
            )?;
            if rows == 0 {
                anyhow::bail!("Manifestation {} missing from storage", m.id);
            }
        }
        ManifestationWrite::Delete(id) => {
            let rows = tx.execute("DELETE FROM manifestations WHERE id = ?", [id.to_string()])?;
            if rows == 0 {
                anyhow::bail!("Manifestation {} missing from storage", id);
            }
        }
    }
    Ok(())
}

fn write_user(tx: &Transaction<'_>, user: &User) -> Result<()> {
    let rows = tx.execute(
        "UPDATE users SET name = ?, energy_level = ?, daily_streak = ?, total_manifestations = ?,
                completed_count = ?, daily_intent = ?, last_active = ?, updated_at = ?
         WHERE id = ?",
        rusqlite::params![
            &user.name,
            user.energy_level,
            user.daily_streak,
            user.total_manifestations,
            user.completed_count,
            &user.daily_intent,
            user.last_active_at.to_rfc3339(),
            user.updated_at.to_rfc3339(),
            user.id.to_string(),
        ],
    )?;
    if rows == 0 {
        anyhow::bail!("User {} missing from storage", user.id);
    }
    Ok(())
}

fn write_community_manifestation(conn: &Connection, entry: &CommunityManifestation) -> Result<()> {
    conn.execute(
        "INSERT INTO community_manifestations
            (id, source_id, title, description, emoji, state, category, tags, progress,
             author_name, author_address, author_verified, created_at, updated_at, shared_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            entry.id.to_string(),
            entry.source_id.to_string(),
            &entry.title,
            &entry.description,
            &entry.emoji,
            entry.state.as_str(),
            &entry.category,
            serde_json::to_string(&entry.tags)?,
            entry.progress,
            &entry.author.name,
            &entry.author.address,
            if entry.author.verified { 1 } else { 0 },
            entry.created_at.to_rfc3339(),
            entry.updated_at.to_rfc3339(),
            entry.shared_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: String) -> NaiveDate {
    s.parse().unwrap_or_else(|_| Utc::now().date_naive())
}

fn parse_state(s: String) -> ManifestationState {
    ManifestationState::from_str(&s).unwrap_or(ManifestationState::Dream)
}

fn parse_tags(s: String) -> Vec<String> {
    serde_json::from_str(&s).unwrap_or_default()
}
