//! User profiles and the friend list.
//!
//! Each user has a `users/{userId}` profile document with a display name,
//! an optional email and the ids of their friends.

use std::sync::Arc;

use serde_json::Value;

use crate::collection::{CollectionService, FriendCollection};
use crate::config::USERS_COLLECTION;
use crate::error::{Result, TcgpError};
use crate::models::UserProfile;
use crate::store::{ArrayUpdate, DocumentData, DocumentSnapshot, DocumentStore, SetOptions};

/// Profile and friendship operations on behalf of one signed-in user.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
    user_id: String,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DocumentStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// First-login provisioning: create the profile (placeholder name, the
    /// given email, no friends) and an empty collection when missing.
    /// Existing documents are left untouched.
    pub async fn ensure_user_documents(&self, email: Option<&str>) -> Result<UserProfile> {
        let snap = self.store.get_document(USERS_COLLECTION, &self.user_id).await?;
        let profile = match parse_profile(&self.user_id, &snap)? {
            Some(profile) => profile,
            None => {
                let mut profile = UserProfile::placeholder(&self.user_id);
                profile.email = email.map(String::from);
                self.store
                    .set_document(
                        USERS_COLLECTION,
                        &self.user_id,
                        to_document(&profile)?,
                        SetOptions::default(),
                    )
                    .await?;
                tracing::info!(user_id = %self.user_id, "created user profile");
                profile
            }
        };

        CollectionService::new(self.store.clone(), self.user_id.clone())
            .ensure_exists()
            .await?;
        Ok(profile)
    }

    /// The signed-in user's profile, or a placeholder if none is stored.
    pub async fn profile(&self) -> Result<UserProfile> {
        self.profile_of(&self.user_id).await
    }

    /// Any user's profile, or a placeholder if none is stored.
    pub async fn profile_of(&self, user_id: &str) -> Result<UserProfile> {
        let snap = self.store.get_document(USERS_COLLECTION, user_id).await?;
        Ok(parse_profile(user_id, &snap)?.unwrap_or_else(|| UserProfile::placeholder(user_id)))
    }

    /// Change the display name shown to friends.
    pub async fn set_display_name(&self, display_name: &str) -> Result<()> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(TcgpError::InvalidArgument("display name must not be empty".into()));
        }
        let mut data = DocumentData::new();
        data.insert("displayName".into(), Value::from(name));
        self.store
            .set_document(USERS_COLLECTION, &self.user_id, data, SetOptions::merge())
            .await
    }

    /// Add `friend_id` to the friend list and return the friend's profile.
    ///
    /// Rejects an empty id or the user's own id, and fails with
    /// [`TcgpError::NotFound`] when the friend has no profile. Adding an
    /// existing friend is a no-op.
    pub async fn add_friend(&self, friend_id: &str) -> Result<UserProfile> {
        let friend_id = friend_id.trim();
        if friend_id.is_empty() || friend_id == self.user_id {
            return Err(TcgpError::InvalidArgument(
                "friend id must be non-empty and different from your own".into(),
            ));
        }

        let friend_snap = self.store.get_document(USERS_COLLECTION, friend_id).await?;
        let friend = parse_profile(friend_id, &friend_snap)?
            .ok_or_else(|| TcgpError::NotFound(format!("User {friend_id} does not exist")))?;

        self.store
            .update_array(
                USERS_COLLECTION,
                &self.user_id,
                "friends",
                ArrayUpdate::Union(vec![Value::from(friend_id)]),
            )
            .await?;
        tracing::info!(user_id = %self.user_id, friend_id, "friend added");
        Ok(friend)
    }

    /// Remove `friend_id` from the friend list. Unknown ids are ignored.
    pub async fn remove_friend(&self, friend_id: &str) -> Result<()> {
        self.store
            .update_array(
                USERS_COLLECTION,
                &self.user_id,
                "friends",
                ArrayUpdate::Remove(vec![Value::from(friend_id)]),
            )
            .await?;
        tracing::info!(user_id = %self.user_id, friend_id, "friend removed");
        Ok(())
    }

    /// Read-only access to a friend's collection. The friend must be on the
    /// user's friend list.
    pub async fn friend_collection(&self, friend_id: &str) -> Result<FriendCollection> {
        let me = self.profile().await?;
        if !me.friends.iter().any(|f| f == friend_id) {
            return Err(TcgpError::NotFound(format!("{friend_id} is not in your friend list")));
        }
        Ok(FriendCollection::new(self.store.clone(), friend_id))
    }

}

/// Decode a stored profile; a blank display name falls back to the placeholder.
fn parse_profile(user_id: &str, snap: &DocumentSnapshot) -> Result<Option<UserProfile>> {
    match snap.data() {
        Some(data) => {
            let mut profile: UserProfile = serde_json::from_value(Value::Object(data.clone()))
                .map_err(|e| TcgpError::Store(format!("malformed user profile: {e}")))?;
            if profile.display_name.trim().is_empty() {
                profile.display_name = UserProfile::placeholder(user_id).display_name;
            }
            Ok(Some(profile))
        }
        None => Ok(None),
    }
}

fn to_document(profile: &UserProfile) -> Result<DocumentData> {
    match serde_json::to_value(profile)? {
        Value::Object(map) => Ok(map),
        _ => Err(TcgpError::Store("profile did not serialize to an object".into())),
    }
}
