//! Profile persistence on the `users` collection.

use super::models::{ArtisanApplication, ProfileSetup, Role, UserProfile, VerificationStatus};
use crate::documents::{DocumentStore, USERS};
use crate::error::{Error, Result};
use crate::session::AuthUser;
use crate::storage::BlobStore;

use chrono::Utc;
use futures::StreamExt as _;
use futures::stream::BoxStream;
use serde_json::{Map, Value, json};
use std::path::Path;

/// Reads and writes `users/{uid}` documents.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    documents: DocumentStore,
}

impl ProfileStore {
    pub fn new(documents: DocumentStore) -> Self {
        Self { documents }
    }

    /// Create the initial buyer profile on first sign-in. Returns `true`
    /// when a document was created, `false` when the user already had one.
    pub async fn create_initial(&self, user: &AuthUser) -> Result<bool> {
        let profile = UserProfile {
            uid: user.uid.clone(),
            email: user.email.clone(),
            name: user.display_name.clone().filter(|name| !name.trim().is_empty()),
            city: None,
            phone: None,
            role: Role::Buyer,
            verification_status: None,
            profile_complete: false,
            craft: None,
            experience: None,
            bio: None,
            sample_images: Vec::new(),
            created_at: Utc::now(),
        };

        let created = self
            .documents
            .create_if_absent(USERS, &user.uid, &serde_json::to_value(&profile)?)
            .await?;
        if created {
            tracing::info!(uid = %user.uid, "created initial profile");
        }
        Ok(created)
    }

    pub async fn get(&self, uid: &str) -> Result<Option<UserProfile>> {
        match self.documents.get(USERS, uid).await? {
            Some(document) => Ok(Some(document.parse()?)),
            None => Ok(None),
        }
    }

    /// Like [`ProfileStore::get`], but a missing profile is an error.
    pub async fn require(&self, uid: &str) -> Result<UserProfile> {
        self.get(uid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("profile for {uid}")))
    }

    /// Live view of one profile. Yields `None` while the document is absent.
    pub fn watch(&self, uid: &str) -> BoxStream<'static, Result<Option<UserProfile>>> {
        self.documents
            .watch_document(USERS, uid)
            .map(|item| -> Result<Option<UserProfile>> {
                match item? {
                    Some(document) => Ok(Some(document.parse()?)),
                    None => Ok(None),
                }
            })
            .boxed()
    }

    /// Record name, city and phone and mark the profile complete. The profile
    /// must already exist.
    pub async fn complete_setup(&self, uid: &str, setup: &ProfileSetup) -> Result<()> {
        setup.validate()?;

        let mut fields = Map::new();
        fields.insert("name".into(), json!(setup.name.trim()));
        fields.insert("city".into(), json!(setup.city.trim()));
        fields.insert("phone".into(), json!(setup.phone.trim()));
        fields.insert("profile_complete".into(), json!(true));
        self.documents.update(USERS, uid, fields).await?;

        tracing::info!(uid, "profile setup completed");
        Ok(())
    }

    /// Turn a buyer into a pending artisan. The sample image is uploaded to
    /// `artisan-applications/{uid}/{file}` before the profile changes.
    pub async fn apply_as_artisan(
        &self,
        uid: &str,
        application: &ArtisanApplication,
        blobs: &dyn BlobStore,
    ) -> Result<UserProfile> {
        application.validate()?;

        let profile = self.require(uid).await?;
        if profile.is_artisan() {
            match profile.verification_status {
                Some(VerificationStatus::Pending) => {
                    return Err(Error::Conflict(
                        "Your artisan application is already under review.".into(),
                    ));
                }
                Some(VerificationStatus::Verified) => {
                    return Err(Error::Conflict("You are already a verified artisan.".into()));
                }
                Some(VerificationStatus::Rejected) | None => {}
            }
        }

        // validate() guarantees the image is present.
        let Some(image) = &application.sample_image else {
            return Err(Error::Other(anyhow::anyhow!("sample image missing after validation")));
        };
        let blob_path = format!("artisan-applications/{uid}/{}", upload_file_name(&image.file_name));
        let image_url = blobs.put(&blob_path, &image.bytes, &image.content_type).await?;

        let mut fields = Map::new();
        fields.insert("role".into(), json!(Role::Artisan));
        fields.insert("craft".into(), json!(application.craft_name.trim()));
        fields.insert("experience".into(), json!(application.experience));
        fields.insert("bio".into(), json!(application.bio.trim()));
        fields.insert("sample_images".into(), Value::Array(vec![json!(image_url)]));
        fields.insert(
            "verification_status".into(),
            json!(VerificationStatus::Pending),
        );
        self.documents.update(USERS, uid, fields).await?;

        tracing::info!(uid, craft = %application.craft_name.trim(), "artisan application submitted");
        self.require(uid).await
    }

    pub async fn set_verification_status(&self, uid: &str, status: VerificationStatus) -> Result<()> {
        let mut fields = Map::new();
        fields.insert("verification_status".into(), json!(status));
        self.documents.update(USERS, uid, fields).await?;

        tracing::info!(uid, %status, "verification status changed");
        Ok(())
    }
}

/// Keep only the final path component of a client-supplied file name.
fn upload_file_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or("sample")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::SampleImage;
    use crate::storage::LocalBlobStore;
    use futures::StreamExt;

    async fn profiles() -> ProfileStore {
        ProfileStore::new(DocumentStore::new(crate::db::connect_in_memory().await))
    }

    fn user(uid: &str) -> AuthUser {
        AuthUser {
            uid: uid.to_string(),
            email: Some(format!("{uid}@example.com")),
            display_name: Some("Asha Devi".to_string()),
        }
    }

    fn application() -> ArtisanApplication {
        ArtisanApplication {
            craft_name: "Madhubani".to_string(),
            experience: 8,
            bio: "I paint Madhubani scenes on handmade paper.".to_string(),
            sample_image: Some(SampleImage {
                file_name: "../../fish.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            }),
        }
    }

    #[tokio::test]
    async fn initial_profile_is_created_once() {
        let profiles = profiles().await;

        assert!(profiles.create_initial(&user("u1")).await.unwrap());
        assert!(!profiles.create_initial(&user("u1")).await.unwrap());

        let profile = profiles.require("u1").await.unwrap();
        assert_eq!(profile.role, Role::Buyer);
        assert!(!profile.profile_complete);
        assert_eq!(profile.name.as_deref(), Some("Asha Devi"));
        assert_eq!(profile.email.as_deref(), Some("u1@example.com"));
    }

    #[tokio::test]
    async fn setup_marks_profile_complete() {
        let profiles = profiles().await;
        profiles.create_initial(&user("u1")).await.unwrap();

        let setup = ProfileSetup {
            name: " Asha Devi ".to_string(),
            city: "Jaipur".to_string(),
            phone: "9876543210".to_string(),
        };
        profiles.complete_setup("u1", &setup).await.unwrap();

        let profile = profiles.require("u1").await.unwrap();
        assert!(profile.profile_complete);
        assert_eq!(profile.name.as_deref(), Some("Asha Devi"));
        assert_eq!(profile.city.as_deref(), Some("Jaipur"));
    }

    #[tokio::test]
    async fn invalid_setup_writes_nothing() {
        let profiles = profiles().await;
        profiles.create_initial(&user("u1")).await.unwrap();

        let setup = ProfileSetup {
            name: "Asha".to_string(),
            city: "J".to_string(),
            phone: "9876543210".to_string(),
        };
        let error = profiles.complete_setup("u1", &setup).await.expect_err("short city");
        assert!(matches!(error, Error::Validation(ref v) if v.field == "city"));
        assert!(!profiles.require("u1").await.unwrap().profile_complete);
    }

    #[tokio::test]
    async fn setup_without_a_profile_is_not_found() {
        let profiles = profiles().await;
        let setup = ProfileSetup {
            name: "Asha Devi".to_string(),
            city: "Jaipur".to_string(),
            phone: "9876543210".to_string(),
        };

        let error = profiles.complete_setup("ghost", &setup).await.expect_err("no profile");
        assert!(matches!(error, Error::NotFound(_)));
        assert!(profiles.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn artisan_application_uploads_sample_and_sets_pending() {
        let profiles = profiles().await;
        let dir = tempfile::tempdir().unwrap();
        let blobs = LocalBlobStore::new(dir.path(), "http://localhost:9002");
        profiles.create_initial(&user("u1")).await.unwrap();

        let profile = profiles
            .apply_as_artisan("u1", &application(), &blobs)
            .await
            .unwrap();

        assert_eq!(profile.role, Role::Artisan);
        assert_eq!(profile.verification_status, Some(VerificationStatus::Pending));
        assert_eq!(profile.craft.as_deref(), Some("Madhubani"));
        assert_eq!(profile.experience, Some(8));
        assert_eq!(
            profile.sample_images,
            vec!["http://localhost:9002/blobs/artisan-applications/u1/fish.png".to_string()]
        );
        assert!(dir.path().join("artisan-applications/u1/fish.png").exists());
    }

    #[tokio::test]
    async fn pending_artisans_cannot_reapply() {
        let profiles = profiles().await;
        let dir = tempfile::tempdir().unwrap();
        let blobs = LocalBlobStore::new(dir.path(), "http://localhost:9002");
        profiles.create_initial(&user("u1")).await.unwrap();
        profiles.apply_as_artisan("u1", &application(), &blobs).await.unwrap();

        let error = profiles
            .apply_as_artisan("u1", &application(), &blobs)
            .await
            .expect_err("second application");
        assert!(matches!(error, Error::Conflict(_)));

        profiles
            .set_verification_status("u1", VerificationStatus::Rejected)
            .await
            .unwrap();
        let profile = profiles.apply_as_artisan("u1", &application(), &blobs).await.unwrap();
        assert_eq!(profile.verification_status, Some(VerificationStatus::Pending));
    }

    #[tokio::test]
    async fn application_without_profile_is_not_found() {
        let profiles = profiles().await;
        let dir = tempfile::tempdir().unwrap();
        let blobs = LocalBlobStore::new(dir.path(), "http://localhost:9002");

        let error = profiles
            .apply_as_artisan("ghost", &application(), &blobs)
            .await
            .expect_err("no profile");
        assert!(matches!(error, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn watch_follows_profile_writes() {
        let profiles = profiles().await;
        let mut stream = profiles.watch("u1");
        assert_eq!(stream.next().await.unwrap().unwrap(), None);

        profiles.create_initial(&user("u1")).await.unwrap();
        let created = stream.next().await.unwrap().unwrap().expect("profile");
        assert_eq!(created.role, Role::Buyer);

        profiles
            .set_verification_status("u1", VerificationStatus::Verified)
            .await
            .unwrap();
        let updated = stream.next().await.unwrap().unwrap().expect("profile");
        assert_eq!(updated.verification_status, Some(VerificationStatus::Verified));
    }

    #[test]
    fn upload_names_keep_only_the_file_component() {
        assert_eq!(upload_file_name("../../etc/passwd"), "passwd");
        assert_eq!(upload_file_name("vase.jpg"), "vase.jpg");
        assert_eq!(upload_file_name(".."), "sample");
        assert_eq!(upload_file_name(""), "sample");
    }
}
