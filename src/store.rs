//! File-backed JSON document store.
//!
//! Stands in for the document database: each collection lives in one JSON
//! file under the data directory (`users.json`, `decks.json`, `cards.json`),
//! keyed by document id. Collections are loaded into memory at startup and
//! written back whole on every mutation; last write wins.
//!
//! Sessions are held in memory only and vanish on restart.

use std::collections::HashMap;
use std::fs::{File, create_dir_all};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::cards::Card;
use crate::decks::Deck;
use crate::login::User;

const USERS_FILE: &str = "users.json";
const DECKS_FILE: &str = "decks.json";
const CARDS_FILE: &str = "cards.json";

/// How long a session stays valid: 24 hours.
const SESSION_DURATION_SECS: i64 = 24 * 60 * 60;

/// An authenticated user session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Id of the user the session belongs to.
    pub user_id: String,

    /// Time after which the session is no longer accepted.
    pub expires_at: DateTime<Utc>,
}

/// The application's persistent state: three document collections on disk
/// plus the in-memory session table.
pub struct Store {
    dir: PathBuf,
    users: RwLock<HashMap<String, User>>,
    decks: RwLock<HashMap<String, Deck>>,
    cards: RwLock<HashMap<String, Card>>,
    sessions: RwLock<HashMap<String, Session>>,
}

fn load_collection<T: DeserializeOwned>(path: &Path) -> std::io::Result<HashMap<String, T>> {
    if !path.exists() {
        // First run: seed an empty collection file
        let mut file = File::create(path)?;
        file.write_all(b"{}")?;
        return Ok(HashMap::new());
    }

    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

fn write_collection<T: Serialize>(path: &Path, map: &HashMap<String, T>) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, map)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writer.flush()
}

/// Generates a fresh document id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Store {
    /// Opens the store rooted at `dir`, creating the directory and empty
    /// collection files on first run.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        create_dir_all(&dir)?;

        let users = load_collection(&dir.join(USERS_FILE))?;
        let decks = load_collection(&dir.join(DECKS_FILE))?;
        let cards = load_collection(&dir.join(CARDS_FILE))?;

        Ok(Store {
            dir,
            users: RwLock::new(users),
            decks: RwLock::new(decks),
            cards: RwLock::new(cards),
            sessions: RwLock::new(HashMap::new()),
        })
    }

    // ----- users -----

    pub fn get_user(&self, id: &str) -> Option<User> {
        self.users.read().unwrap().get(id).cloned()
    }

    /// Looks a user up by exact (already lowercased) username.
    pub fn find_user_by_username(&self, username: &str) -> Option<User> {
        self.users
            .read()
            .unwrap()
            .values()
            .find(|u| u.username == username)
            .cloned()
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .read()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    /// Inserts or replaces a user document and persists the collection.
    pub fn put_user(&self, user: User) -> std::io::Result<()> {
        let mut users = self.users.write().unwrap();
        users.insert(user.id.clone(), user);
        write_collection(&self.dir.join(USERS_FILE), &users)
    }

    pub fn delete_user(&self, id: &str) -> std::io::Result<()> {
        let mut users = self.users.write().unwrap();
        users.remove(id);
        write_collection(&self.dir.join(USERS_FILE), &users)
    }

    /// All users, newest first.
    pub fn list_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.read().unwrap().values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users
    }

    /// Number of users currently holding the admin role.
    pub fn admin_count(&self) -> usize {
        self.users
            .read()
            .unwrap()
            .values()
            .filter(|u| u.is_admin)
            .count()
    }

    // ----- decks -----

    pub fn get_deck(&self, id: &str) -> Option<Deck> {
        self.decks.read().unwrap().get(id).cloned()
    }

    /// A user's decks, newest first.
    pub fn decks_for_owner(&self, owner_id: &str) -> Vec<Deck> {
        let mut decks: Vec<Deck> = self
            .decks
            .read()
            .unwrap()
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        decks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        decks
    }

    /// Resolves a share link to its deck, if one exists.
    pub fn find_deck_by_share_id(&self, share_id: &str) -> Option<Deck> {
        self.decks
            .read()
            .unwrap()
            .values()
            .find(|d| d.share_id.as_deref() == Some(share_id))
            .cloned()
    }

    pub fn put_deck(&self, deck: Deck) -> std::io::Result<()> {
        let mut decks = self.decks.write().unwrap();
        decks.insert(deck.id.clone(), deck);
        write_collection(&self.dir.join(DECKS_FILE), &decks)
    }

    pub fn delete_deck(&self, id: &str) -> std::io::Result<()> {
        let mut decks = self.decks.write().unwrap();
        decks.remove(id);
        write_collection(&self.dir.join(DECKS_FILE), &decks)
    }

    // ----- cards -----

    pub fn get_card(&self, id: &str) -> Option<Card> {
        self.cards.read().unwrap().get(id).cloned()
    }

    /// A deck's cards in creation order.
    pub fn cards_for_deck(&self, deck_id: &str) -> Vec<Card> {
        let mut cards: Vec<Card> = self
            .cards
            .read()
            .unwrap()
            .values()
            .filter(|c| c.deck_id == deck_id)
            .cloned()
            .collect();
        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        cards
    }

    pub fn put_card(&self, card: Card) -> std::io::Result<()> {
        let mut cards = self.cards.write().unwrap();
        cards.insert(card.id.clone(), card);
        write_collection(&self.dir.join(CARDS_FILE), &cards)
    }

    pub fn delete_card(&self, id: &str) -> std::io::Result<()> {
        let mut cards = self.cards.write().unwrap();
        cards.remove(id);
        write_collection(&self.dir.join(CARDS_FILE), &cards)
    }

    /// Removes every card belonging to a deck (deck deletion cascade).
    pub fn delete_cards_in_deck(&self, deck_id: &str) -> std::io::Result<()> {
        let mut cards = self.cards.write().unwrap();
        cards.retain(|_, c| c.deck_id != deck_id);
        write_collection(&self.dir.join(CARDS_FILE), &cards)
    }

    // ----- sessions -----

    /// Creates a session for a user and returns its id. Expired sessions
    /// are evicted here so the table does not grow without bound.
    pub fn create_session(&self, user_id: &str) -> String {
        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let session = Session {
            user_id: user_id.to_string(),
            expires_at: now + Duration::seconds(SESSION_DURATION_SECS),
        };

        let mut sessions = self.sessions.write().unwrap();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(session_id.clone(), session);
        session_id
    }

    /// Returns the user id behind a session, if the session exists and has
    /// not expired.
    pub fn validate_session(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.read().unwrap();
        sessions
            .get(session_id)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.user_id.clone())
    }

    pub fn remove_session(&self, session_id: &str) {
        self.sessions.write().unwrap().remove(session_id);
    }

    /// Drops every live session of a user (used when the account is deleted).
    pub fn remove_sessions_for_user(&self, user_id: &str) {
        self.sessions
            .write()
            .unwrap()
            .retain(|_, s| s.user_id != user_id);
    }
}
