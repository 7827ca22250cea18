use std::sync::Arc;

use tracing::info;

use super::repo_types::User;
use crate::{
    auth::password::{hash_password, verify_password},
    error::{Error, Result},
    store::Store,
};

#[derive(Clone)]
pub struct UserService {
    store: Arc<Store>,
}

impl UserService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Register a new user. Emails are compared exactly, case included.
    pub async fn create(&self, email: &str, password: &str) -> Result<User> {
        // hash before taking the write lock
        let password_hash = hash_password(password)?;
        let email = email.to_owned();
        let user = self
            .store
            .mutate(move |doc| {
                if doc.users.values().any(|u| u.email == email) {
                    return Err(Error::DuplicateEmail);
                }
                let id = doc.next_user_id()?;
                let user = User {
                    id,
                    email,
                    password_hash,
                    is_upgraded: false,
                };
                doc.users.insert(id, user.clone());
                Ok(user)
            })
            .await?;
        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    pub async fn get(&self, id: u64) -> Result<User> {
        let doc = self.store.load().await?;
        doc.users.get(&id).cloned().ok_or(Error::NotFound)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let doc = self.store.load().await?;
        let user = doc
            .users
            .into_values()
            .find(|u| u.email == email)
            .ok_or(Error::NotFound)?;
        verify_password(password, &user.password_hash)?;
        Ok(user)
    }

    /// Overwrite email and password of an existing user. The upgrade status is
    /// replaced when `is_upgraded` is given and read from the stored record,
    /// under the same write lock, when it is `None`.
    pub async fn update(
        &self,
        id: u64,
        email: &str,
        password: &str,
        is_upgraded: Option<bool>,
    ) -> Result<User> {
        let password_hash = hash_password(password)?;
        let email = email.to_owned();
        let user = self
            .store
            .mutate(move |doc| {
                let current = doc.users.get(&id).ok_or(Error::NotFound)?;
                let is_upgraded = is_upgraded.unwrap_or(current.is_upgraded);
                if doc.users.values().any(|u| u.id != id && u.email == email) {
                    return Err(Error::DuplicateEmail);
                }
                let user = User {
                    id,
                    email,
                    password_hash,
                    is_upgraded,
                };
                doc.users.insert(id, user.clone());
                Ok(user)
            })
            .await?;
        info!(user_id = id, "user updated");
        Ok(user)
    }

    pub async fn upgrade(&self, id: u64) -> Result<()> {
        self.store
            .mutate(|doc| {
                let user = doc.users.get_mut(&id).ok_or(Error::NotFound)?;
                user.is_upgraded = true;
                Ok(())
            })
            .await?;
        info!(user_id = id, "user upgraded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn service() -> (UserService, Arc<Store>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("db.json")).await.unwrap());
        (UserService::new(Arc::clone(&store)), store, dir)
    }

    #[tokio::test]
    async fn create_then_authenticate() {
        let (users, _store, _dir) = service().await;
        let created = users.create("luffy@onepiece.com", "ilovemeat").await.unwrap();
        assert_eq!(created.id, 1);
        assert!(!created.is_upgraded);
        assert_ne!(created.password_hash, "ilovemeat");

        let authed = users
            .authenticate("luffy@onepiece.com", "ilovemeat")
            .await
            .unwrap();
        assert_eq!(authed.id, created.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (users, store, _dir) = service().await;
        users.create("lane@bootdev.com", "password").await.unwrap();
        let err = users
            .create("lane@bootdev.com", "another-password")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail));
        assert_eq!(store.load().await.unwrap().users.len(), 1);
    }

    #[tokio::test]
    async fn ids_follow_registration_order() {
        let (users, _store, _dir) = service().await;
        let a = users.create("a@example.com", "pw-a").await.unwrap();
        let b = users.create("b@example.com", "pw-b").await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(users.get(2).await.unwrap(), b);
        assert!(matches!(users.get(3).await, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn authenticate_failures() {
        let (users, _store, _dir) = service().await;
        users.create("zoro@onepiece.com", "swords").await.unwrap();

        let err = users
            .authenticate("nobody@onepiece.com", "swords")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));

        let err = users
            .authenticate("zoro@onepiece.com", "lost-again")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authentication));
    }

    #[tokio::test]
    async fn update_overwrites_fields() {
        let (users, _store, _dir) = service().await;
        let user = users.create("harry@wizards.com", "ilovevoldemort").await.unwrap();

        let updated = users
            .update(user.id, "ron@wizards.com", "iloveclowns", Some(true))
            .await
            .unwrap();
        assert_eq!(updated.email, "ron@wizards.com");
        assert!(updated.is_upgraded);
        assert_eq!(users.get(user.id).await.unwrap(), updated);

        users.authenticate("ron@wizards.com", "iloveclowns").await.unwrap();
        assert!(matches!(
            users.authenticate("harry@wizards.com", "ilovevoldemort").await,
            Err(Error::NotFound)
        ));
    }

    #[tokio::test]
    async fn update_missing_user_is_not_found() {
        let (users, store, _dir) = service().await;
        let err = users.update(9, "ghost@example.com", "boo", None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
        assert!(store.load().await.unwrap().users.is_empty());
    }

    #[tokio::test]
    async fn update_cannot_steal_another_email() {
        let (users, _store, _dir) = service().await;
        users.create("first@example.com", "pw").await.unwrap();
        let second = users.create("second@example.com", "pw").await.unwrap();
        let err = users
            .update(second.id, "first@example.com", "pw", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail));

        // keeping your own email is fine
        users
            .update(second.id, "second@example.com", "new-pw", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_keeps_upgrade_applied_after_caller_read() {
        let (users, _store, _dir) = service().await;
        let user = users.create("robin@onepiece.com", "ohara").await.unwrap();

        let seen = users.get(user.id).await.unwrap();
        assert!(!seen.is_upgraded);
        users.upgrade(user.id).await.unwrap();

        let updated = users
            .update(user.id, "nico@onepiece.com", "poneglyph", None)
            .await
            .unwrap();
        assert!(updated.is_upgraded);
        assert!(users.get(user.id).await.unwrap().is_upgraded);

        let downgraded = users
            .update(user.id, "nico@onepiece.com", "poneglyph", Some(false))
            .await
            .unwrap();
        assert!(!downgraded.is_upgraded);
    }

    #[tokio::test]
    async fn upgrade_sets_flag() {
        let (users, _store, _dir) = service().await;
        let user = users.create("nami@onepiece.com", "tangerines").await.unwrap();
        users.upgrade(user.id).await.unwrap();
        assert!(users.get(user.id).await.unwrap().is_upgraded);
        assert!(matches!(users.upgrade(42).await, Err(Error::NotFound)));
    }
}
