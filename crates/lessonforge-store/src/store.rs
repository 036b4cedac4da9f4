//! JSON-file user store.
//!
//! Layout under the data directory:
//!
//! ```text
//! users.json                          all user records, keyed by username
//! conversations/<id>.json             one saved playground conversation each
//! ```
//!
//! Every mutation is a locked read-modify-write of `users.json`, written to a
//! temporary file and renamed into place.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lessonforge_core::model::Response;
use lessonforge_core::traits::{ChatMessage, ProgressStore, QuizScoreRecord};

use crate::credentials::{self, DEFAULT_COST};
use crate::error::StoreError;

const USERS_FILE: &str = "users.json";
const CONVERSATIONS_DIR: &str = "conversations";

/// Accounts that can never be deleted.
const PROTECTED_USERS: &[&str] = &["admin"];

/// Registration details for a new account.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub organization: String,
}

/// Profile fields to change; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.organization.is_none()
    }
}

/// A stored account and its learning progress.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub organization: String,
    pub created_at: DateTime<Utc>,
    /// Highest completed lesson id.
    #[serde(default)]
    pub lesson_progress: u32,
    #[serde(default)]
    pub completed_lessons: BTreeSet<u32>,
    /// Best score per quiz, keyed by quiz id.
    #[serde(default)]
    pub quiz_scores: BTreeMap<String, QuizScoreRecord>,
    #[serde(default)]
    pub saved_conversations: Vec<ConversationRef>,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("username", &self.username)
            .field("password_hash", &"***")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("organization", &self.organization)
            .field("created_at", &self.created_at)
            .field("lesson_progress", &self.lesson_progress)
            .field("completed_lessons", &self.completed_lessons)
            .field("quiz_scores", &self.quiz_scores.len())
            .field("saved_conversations", &self.saved_conversations.len())
            .finish()
    }
}

/// Index entry for a saved conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRef {
    pub id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    /// File name inside the conversations directory.
    pub file_name: String,
}

/// A saved playground conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
}

type UserDatabase = BTreeMap<String, UserRecord>;

/// User store backed by JSON files in a data directory.
pub struct FileUserStore {
    data_dir: PathBuf,
    users_path: PathBuf,
    conversations_dir: PathBuf,
    hash_cost: u32,
    lock: Mutex<()>,
}

impl FileUserStore {
    /// Open (creating if needed) the store rooted at `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        let conversations_dir = data_dir.join(CONVERSATIONS_DIR);
        std::fs::create_dir_all(&conversations_dir)
            .map_err(|e| StoreError::io(&conversations_dir, e))?;

        let store = Self {
            users_path: data_dir.join(USERS_FILE),
            conversations_dir,
            data_dir,
            hash_cost: DEFAULT_COST,
            lock: Mutex::new(()),
        };

        if !store.users_path.exists() {
            store.write_db(&UserDatabase::new())?;
            tracing::info!("created user database at {}", store.users_path.display());
        }
        Ok(store)
    }

    /// Override the bcrypt cost for newly hashed passwords.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // -- accounts ----------------------------------------------------------

    /// Register a new account.
    pub fn create_user(&self, new_user: NewUser) -> Result<UserRecord, StoreError> {
        credentials::validate_username(&new_user.username)?;
        credentials::validate_email(&new_user.email)?;
        credentials::validate_password(&new_user.password)?;

        let password_hash = credentials::hash_password(&new_user.password, self.hash_cost)?;

        self.update(|db| {
            if db.contains_key(&new_user.username) {
                return Err(StoreError::UserExists(new_user.username.clone()));
            }
            let record = UserRecord {
                username: new_user.username.clone(),
                password_hash,
                name: new_user.name.clone(),
                email: new_user.email.trim().to_string(),
                organization: new_user.organization.clone(),
                created_at: Utc::now(),
                lesson_progress: 0,
                completed_lessons: BTreeSet::new(),
                quiz_scores: BTreeMap::new(),
                saved_conversations: Vec::new(),
            };
            db.insert(record.username.clone(), record.clone());
            tracing::info!(user = %record.username, "created user");
            Ok(record)
        })
    }

    /// Returns `true` if the username exists and the password matches.
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let db = self.read()?;
        Ok(db
            .get(username)
            .is_some_and(|user| credentials::verify_password(password, &user.password_hash)))
    }

    pub fn get_user(&self, username: &str) -> Result<UserRecord, StoreError> {
        self.read()?
            .remove(username)
            .ok_or_else(|| StoreError::UserNotFound(username.to_string()))
    }

    pub fn user_exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.contains_key(username))
    }

    /// All accounts, ordered by username.
    pub fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.read()?.into_values().collect())
    }

    /// Change name, email, or organization.
    pub fn update_profile(
        &self,
        username: &str,
        update: ProfileUpdate,
    ) -> Result<UserRecord, StoreError> {
        if let Some(email) = &update.email {
            credentials::validate_email(email)?;
        }
        self.update_user(username, |user| {
            if let Some(name) = update.name {
                user.name = name;
            }
            if let Some(email) = update.email {
                user.email = email.trim().to_string();
            }
            if let Some(organization) = update.organization {
                user.organization = organization;
            }
            tracing::info!(user = username, "updated profile");
            Ok(user.clone())
        })
    }

    /// Replace the password after checking the current one.
    pub fn change_password(
        &self,
        username: &str,
        current: &str,
        new_password: &str,
    ) -> Result<(), StoreError> {
        credentials::validate_password(new_password)?;

        // Hashing is slow; do it outside the lock and only commit if the
        // stored hash is still the one that was checked.
        let verified_hash = self.get_user(username)?.password_hash;
        if !credentials::verify_password(current, &verified_hash) {
            return Err(StoreError::InvalidCredentials);
        }
        let new_hash = credentials::hash_password(new_password, self.hash_cost)?;

        self.update_user(username, |user| {
            if user.password_hash != verified_hash {
                return Err(StoreError::InvalidCredentials);
            }
            user.password_hash = new_hash;
            Ok(())
        })?;
        tracing::info!(user = username, "changed password");
        Ok(())
    }

    /// Clear lesson progress and quiz scores. Saved conversations stay.
    pub fn reset_progress(&self, username: &str) -> Result<(), StoreError> {
        self.update_user(username, |user| {
            user.lesson_progress = 0;
            user.completed_lessons.clear();
            user.quiz_scores.clear();
            Ok(())
        })?;
        tracing::info!(user = username, "reset progress");
        Ok(())
    }

    pub fn completed_lessons(&self, username: &str) -> Result<BTreeSet<u32>, StoreError> {
        Ok(self.get_user(username)?.completed_lessons)
    }

    /// Delete an account and its saved conversations.
    pub fn delete_user(&self, username: &str) -> Result<(), StoreError> {
        if PROTECTED_USERS.contains(&username) {
            return Err(StoreError::ProtectedUser(username.to_string()));
        }

        let removed = self.update(|db| {
            db.remove(username)
                .ok_or_else(|| StoreError::UserNotFound(username.to_string()))
        })?;

        for conversation in &removed.saved_conversations {
            let removal = self
                .conversation_path(conversation)
                .and_then(|path| std::fs::remove_file(&path).map_err(|e| StoreError::io(&path, e)));
            if let Err(e) = removal {
                tracing::warn!("could not remove conversation {}: {e}", conversation.id);
            }
        }
        tracing::info!(user = username, "deleted user");
        Ok(())
    }

    // -- progress ----------------------------------------------------------

    /// Record a completed lesson. Progress only moves forward.
    pub fn record_lesson(&self, username: &str, lesson_id: u32) -> Result<bool, StoreError> {
        self.update_user(username, |user| {
            user.completed_lessons.insert(lesson_id);
            if lesson_id > user.lesson_progress {
                user.lesson_progress = lesson_id;
                Ok(true)
            } else {
                Ok(false)
            }
        })
    }

    /// Store a quiz score unless a higher one is already recorded.
    pub fn record_quiz_score(
        &self,
        username: &str,
        quiz_id: u32,
        score: f64,
        answers: BTreeMap<usize, Response>,
    ) -> Result<bool, StoreError> {
        self.update_user(username, |user| {
            let key = quiz_id.to_string();
            if user
                .quiz_scores
                .get(&key)
                .is_some_and(|existing| score < existing.score)
            {
                return Ok(false);
            }
            user.quiz_scores.insert(
                key,
                QuizScoreRecord {
                    score,
                    timestamp: Utc::now(),
                    answers,
                },
            );
            Ok(true)
        })
    }

    // -- conversations -----------------------------------------------------

    /// Save a conversation and return its id.
    pub fn save_conversation(
        &self,
        username: &str,
        title: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let file_name = format!("{id}.json");
        let conversation = Conversation {
            id: id.clone(),
            title: title.to_string(),
            timestamp: Utc::now(),
            messages,
        };

        // Write the file before indexing it so the index never points at
        // a missing conversation.
        let path = self.conversations_dir.join(&file_name);
        self.write_json(&path, &conversation)?;

        let reference = ConversationRef {
            id: id.clone(),
            title: conversation.title,
            timestamp: conversation.timestamp,
            file_name,
        };
        let indexed = self.update_user(username, |user| {
            user.saved_conversations.push(reference);
            Ok(())
        });
        if let Err(e) = indexed {
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }

        tracing::info!(user = username, conversation = %id, "saved conversation");
        Ok(id)
    }

    pub fn list_conversations(&self, username: &str) -> Result<Vec<ConversationRef>, StoreError> {
        Ok(self.get_user(username)?.saved_conversations)
    }

    pub fn get_conversation(&self, username: &str, id: &str) -> Result<Conversation, StoreError> {
        let reference = self
            .list_conversations(username)?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::ConversationNotFound(id.to_string()))?;

        let path = self.conversation_path(&reference)?;
        let content = std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn delete_conversation(&self, username: &str, id: &str) -> Result<(), StoreError> {
        let reference = self.update_user(username, |user| {
            let position = user
                .saved_conversations
                .iter()
                .position(|c| c.id == id)
                .ok_or_else(|| StoreError::ConversationNotFound(id.to_string()))?;
            Ok(user.saved_conversations.remove(position))
        })?;

        let path = self.conversation_path(&reference)?;
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!("could not remove {}: {}", path.display(), e);
        }
        Ok(())
    }

    // -- file plumbing -----------------------------------------------------

    /// Only the final component of a stored file name is trusted.
    fn conversation_path(&self, reference: &ConversationRef) -> Result<PathBuf, StoreError> {
        Path::new(&reference.file_name)
            .file_name()
            .map(|name| self.conversations_dir.join(name))
            .ok_or_else(|| StoreError::Corrupt {
                path: self.users_path.display().to_string(),
                reason: format!("bad conversation file name '{}'", reference.file_name),
            })
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The mutex only serializes file access; a panic elsewhere leaves
        // nothing half-updated in memory.
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read(&self) -> Result<UserDatabase, StoreError> {
        let _guard = self.guard();
        self.read_db()
    }

    fn update<T>(
        &self,
        f: impl FnOnce(&mut UserDatabase) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.guard();
        let mut db = self.read_db()?;
        let value = f(&mut db)?;
        self.write_db(&db)?;
        Ok(value)
    }

    fn update_user<T>(
        &self,
        username: &str,
        f: impl FnOnce(&mut UserRecord) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.update(|db| {
            let user = db
                .get_mut(username)
                .ok_or_else(|| StoreError::UserNotFound(username.to_string()))?;
            f(user)
        })
    }

    fn read_db(&self) -> Result<UserDatabase, StoreError> {
        let content = match std::fs::read_to_string(&self.users_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(UserDatabase::new()),
            Err(e) => return Err(StoreError::io(&self.users_path, e)),
        };
        if content.trim().is_empty() {
            return Ok(UserDatabase::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path: self.users_path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn write_db(&self, db: &UserDatabase) -> Result<(), StoreError> {
        self.write_json(&self.users_path, db)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Corrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let dir = path.parent().unwrap_or(&self.data_dir);
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        tmp.write_all(&json).map_err(|e| StoreError::io(path, e))?;
        tmp.persist(path)
            .map_err(|e| StoreError::io(path, e.error))?;
        Ok(())
    }
}

impl ProgressStore for FileUserStore {
    fn get_progress(&self, user: &str) -> anyhow::Result<u32> {
        Ok(self.get_user(user)?.lesson_progress)
    }

    fn update_progress(&self, user: &str, lesson_id: u32) -> anyhow::Result<bool> {
        Ok(self.record_lesson(user, lesson_id)?)
    }

    fn get_quiz_scores(&self, user: &str) -> anyhow::Result<BTreeMap<String, QuizScoreRecord>> {
        Ok(self.get_user(user)?.quiz_scores)
    }

    fn save_quiz_score(
        &self,
        user: &str,
        quiz_id: u32,
        score: f64,
        answers: BTreeMap<usize, Response>,
    ) -> anyhow::Result<bool> {
        Ok(self.record_quiz_score(user, quiz_id, score, answers)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileUserStore) {
        let dir = TempDir::new().unwrap();
        let store = FileUserStore::open(dir.path()).unwrap().with_hash_cost(4);
        (dir, store)
    }

    fn register(store: &FileUserStore, username: &str) -> UserRecord {
        store
            .create_user(NewUser {
                username: username.into(),
                password: "hunter2".into(),
                name: "Test User".into(),
                email: format!("{username}@agency.example.org"),
                organization: "Agency".into(),
            })
            .unwrap()
    }

    #[test]
    fn open_creates_layout() {
        let (dir, _store) = store();
        assert!(dir.path().join("users.json").is_file());
        assert!(dir.path().join("conversations").is_dir());
    }

    #[test]
    fn create_and_verify() {
        let (_dir, store) = store();
        let user = register(&store, "ada");
        assert_eq!(user.lesson_progress, 0);
        assert!(store.user_exists("ada").unwrap());
        assert!(store.verify_credentials("ada", "hunter2").unwrap());
        assert!(!store.verify_credentials("ada", "nope").unwrap());
        assert!(!store.verify_credentials("bob", "hunter2").unwrap());
    }

    #[test]
    fn duplicate_username_rejected() {
        let (_dir, store) = store();
        register(&store, "ada");
        let err = store
            .create_user(NewUser {
                username: "ada".into(),
                password: "another one".into(),
                email: "ada@agency.example.org".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::UserExists(_)));
    }

    #[test]
    fn public_email_rejected() {
        let (_dir, store) = store();
        let err = store
            .create_user(NewUser {
                username: "ada".into(),
                email: "ada@gmail.com".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidEmail { .. }));
        assert!(!store.user_exists("ada").unwrap());
    }

    #[test]
    fn debug_masks_password_hash() {
        let (_dir, store) = store();
        let user = register(&store, "ada");
        let debug = format!("{user:?}");
        assert!(debug.contains("***"));
        assert!(!debug.contains(&user.password_hash));
    }

    #[test]
    fn lesson_progress_is_monotonic() {
        let (_dir, store) = store();
        register(&store, "ada");

        assert!(store.update_progress("ada", 2).unwrap());
        assert!(!store.update_progress("ada", 1).unwrap());
        assert_eq!(store.get_progress("ada").unwrap(), 2);
        assert_eq!(
            store.completed_lessons("ada").unwrap(),
            BTreeSet::from([1, 2])
        );
    }

    #[test]
    fn quiz_score_keeps_best() {
        let (_dir, store) = store();
        register(&store, "ada");

        assert!(store.save_quiz_score("ada", 1, 60.0, BTreeMap::new()).unwrap());
        assert!(!store.save_quiz_score("ada", 1, 40.0, BTreeMap::new()).unwrap());
        assert!(store
            .save_quiz_score("ada", 1, 60.0, BTreeMap::from([(0, Response::SingleChoice(1))]))
            .unwrap());

        let scores = store.get_quiz_scores("ada").unwrap();
        assert_eq!(scores["1"].score, 60.0);
        assert_eq!(scores["1"].answers.len(), 1);
    }

    #[test]
    fn unknown_user_progress_is_an_error() {
        let (_dir, store) = store();
        assert!(store.get_progress("ghost").is_err());
        assert!(store.update_progress("ghost", 1).is_err());
    }

    #[test]
    fn conversations_round_trip() {
        let (dir, store) = store();
        register(&store, "ada");

        let messages = vec![
            ChatMessage::user("Explain chain of custody"),
            ChatMessage::assistant("It documents evidence handling."),
        ];
        let id = store
            .save_conversation("ada", "Custody", messages.clone())
            .unwrap();

        let listed = store.list_conversations("ada").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Custody");

        let conversation = store.get_conversation("ada", &id).unwrap();
        assert_eq!(conversation.messages, messages);

        store.delete_conversation("ada", &id).unwrap();
        assert!(store.list_conversations("ada").unwrap().is_empty());
        assert!(!dir
            .path()
            .join("conversations")
            .join(&listed[0].file_name)
            .exists());
        assert!(matches!(
            store.get_conversation("ada", &id),
            Err(StoreError::ConversationNotFound(_))
        ));
    }

    #[test]
    fn delete_user_removes_conversations() {
        let (dir, store) = store();
        register(&store, "ada");
        store
            .save_conversation("ada", "One", vec![ChatMessage::user("hi")])
            .unwrap();

        store.delete_user("ada").unwrap();
        assert!(!store.user_exists("ada").unwrap());
        let leftover = std::fs::read_dir(dir.path().join("conversations"))
            .unwrap()
            .count();
        assert_eq!(leftover, 0);
    }

    #[test]
    fn admin_cannot_be_deleted() {
        let (_dir, store) = store();
        register(&store, "admin");
        assert!(matches!(
            store.delete_user("admin"),
            Err(StoreError::ProtectedUser(_))
        ));
        assert!(store.user_exists("admin").unwrap());
    }

    #[test]
    fn corrupt_database_is_reported() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("users.json"), "{ not json").unwrap();
        assert!(matches!(
            store.get_user("ada"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn unsafe_usernames_are_rejected() {
        let (dir, store) = store();
        for username in ["../../escaped", "a/b", "..", "tab\tname"] {
            let err = store
                .create_user(NewUser {
                    username: username.into(),
                    password: "hunter2".into(),
                    email: "x@agency.example.org".into(),
                    ..Default::default()
                })
                .unwrap_err();
            assert!(matches!(err, StoreError::InvalidUsername(_)), "{username:?}");
        }
        assert!(store.list_users().unwrap().is_empty());
        assert!(!dir.path().parent().unwrap().join("escaped.json").exists());
    }

    #[test]
    fn short_password_rejected() {
        let (_dir, store) = store();
        let err = store
            .create_user(NewUser {
                username: "ada".into(),
                password: "abc".into(),
                email: "ada@agency.example.org".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::WeakPassword(_)));
    }

    #[test]
    fn conversation_files_stay_in_conversations_dir() {
        let (dir, store) = store();
        register(&store, "ada");
        let id = store
            .save_conversation("ada", "Notes", vec![ChatMessage::user("hi")])
            .unwrap();

        let listed = store.list_conversations("ada").unwrap();
        assert_eq!(listed[0].file_name, format!("{id}.json"));
        assert!(dir.path().join("conversations").join(format!("{id}.json")).is_file());

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(files.len(), 2, "unexpected files: {files:?}");
    }

    #[test]
    fn tampered_file_name_does_not_leave_the_store() {
        let (dir, store) = store();
        register(&store, "ada");
        let id = store
            .save_conversation("ada", "Notes", vec![ChatMessage::user("hi")])
            .unwrap();

        let outside = dir.path().join("outside.json");
        std::fs::write(&outside, "{}").unwrap();
        store
            .update_user("ada", |user| {
                user.saved_conversations[0].file_name = "../outside.json".into();
                Ok(())
            })
            .unwrap();

        // Only the last path component is used, so this looks inside
        // `conversations/` and finds nothing.
        assert!(matches!(
            store.get_conversation("ada", &id),
            Err(StoreError::Io { .. })
        ));
        store.delete_conversation("ada", &id).unwrap();
        assert!(outside.exists());
    }

    #[test]
    fn update_profile_changes_only_given_fields() {
        let (_dir, store) = store();
        register(&store, "ada");

        let updated = store
            .update_profile(
                "ada",
                ProfileUpdate {
                    name: Some("Ada King".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Ada King");
        assert_eq!(updated.email, "ada@agency.example.org");
        assert_eq!(updated.organization, "Agency");

        let err = store
            .update_profile(
                "ada",
                ProfileUpdate {
                    email: Some("ada@gmail.com".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidEmail { .. }));
        assert_eq!(store.get_user("ada").unwrap().email, "ada@agency.example.org");
    }

    #[test]
    fn change_password_requires_current() {
        let (_dir, store) = store();
        register(&store, "ada");

        assert!(matches!(
            store.change_password("ada", "wrong", "new password"),
            Err(StoreError::InvalidCredentials)
        ));
        assert!(matches!(
            store.change_password("ada", "hunter2", "short"),
            Err(StoreError::WeakPassword(_))
        ));

        store.change_password("ada", "hunter2", "new password").unwrap();
        assert!(store.verify_credentials("ada", "new password").unwrap());
        assert!(!store.verify_credentials("ada", "hunter2").unwrap());
    }

    #[test]
    fn reset_progress_keeps_account_and_conversations() {
        let (_dir, store) = store();
        register(&store, "ada");
        store.update_progress("ada", 3).unwrap();
        store.save_quiz_score("ada", 1, 80.0, BTreeMap::new()).unwrap();
        store
            .save_conversation("ada", "Keep me", vec![ChatMessage::user("hi")])
            .unwrap();

        store.reset_progress("ada").unwrap();
        let user = store.get_user("ada").unwrap();
        assert_eq!(user.lesson_progress, 0);
        assert!(user.completed_lessons.is_empty());
        assert!(user.quiz_scores.is_empty());
        assert_eq!(user.saved_conversations.len(), 1);
        assert!(store.verify_credentials("ada", "hunter2").unwrap());
    }

    #[test]
    fn list_users_is_sorted() {
        let (_dir, store) = store();
        register(&store, "zed");
        register(&store, "ada");
        let names: Vec<_> = store
            .list_users()
            .unwrap()
            .into_iter()
            .map(|user| user.username)
            .collect();
        assert_eq!(names, ["ada", "zed"]);
    }
}
