//! Staff-side pet management: create, edit, delete, photo upload and the
//! adoption toggle. Callers are expected to have passed the staff guard.

use crate::{
    errors::{ServiceError, ServiceResult},
    models::pet::{Pet, PetForm},
    services::{media::MediaService, pet_store::PetStore},
};
use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use std::io;
use tracing::{info, warn};

/// Result of flipping a pet's adoption status.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub success: bool,
    pub adopted: bool,
    pub status_text: &'static str,
    pub message: String,
}

impl ToggleOutcome {
    fn for_pet(pet: &Pet) -> Self {
        Self {
            success: true,
            adopted: pet.adopted,
            status_text: pet.status_text(),
            message: format!(
                "{} has been marked as {}.",
                pet.name,
                pet.status_text().to_lowercase()
            ),
        }
    }
}

#[derive(Clone)]
pub struct PetAdminService {
    store: PetStore,
    media: MediaService,
}

impl PetAdminService {
    pub fn new(store: PetStore, media: MediaService) -> Self {
        Self { store, media }
    }

    pub async fn create(&self, form: PetForm) -> ServiceResult<Pet> {
        let fields = form.validate().map_err(ServiceError::ValidationFailed)?;
        let pet = self.store.create(&fields).await?;
        info!(id = pet.id, "added pet {}", pet);
        Ok(pet)
    }

    pub async fn update(&self, id: i64, form: PetForm) -> ServiceResult<Pet> {
        let fields = form.validate().map_err(ServiceError::ValidationFailed)?;
        let pet = self.store.update(id, &fields).await?;
        info!(id, "updated pet {}", pet);
        Ok(pet)
    }

    /// Delete the record, then its photo (best effort).
    pub async fn delete(&self, id: i64) -> ServiceResult<Pet> {
        let pet = self.store.delete(id).await?;
        if let Some(image) = &pet.image {
            if let Err(err) = self.media.remove(image).await {
                warn!(id, image = %image, error = %err, "could not remove pet image");
            }
        }
        info!(id, "deleted pet {}", pet);
        Ok(pet)
    }

    /// Atomically flip `adopted`.
    pub async fn toggle_adoption(&self, id: i64) -> ServiceResult<ToggleOutcome> {
        let pet = self.store.toggle_adopted(id).await?;
        let outcome = ToggleOutcome::for_pet(&pet);
        info!(id, adopted = pet.adopted, "{}", outcome.message);
        Ok(outcome)
    }

    /// Store a new photo and point the pet at it. The previous photo is
    /// removed only after the record has been updated.
    pub async fn upload_image<S>(
        &self,
        id: i64,
        content_type: Option<&str>,
        stream: S,
    ) -> ServiceResult<Pet>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        let previous = self.store.get_by_id(id).await?.image;
        let path = self.media.store_image_stream(content_type, stream).await?;

        let pet = match self.store.set_image(id, Some(&path)).await {
            Ok(pet) => pet,
            Err(err) => {
                let _ = self.media.remove(&path).await;
                return Err(err);
            }
        };

        if let Some(old) = previous.filter(|old| old != &path) {
            if let Err(err) = self.media.remove(&old).await {
                warn!(id, image = %old, error = %err, "could not remove replaced image");
            }
        }
        info!(id, image = %path, "attached image to pet {}", pet);
        Ok(pet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{insert_pet, setup_test_db};
    use futures::stream;
    use uuid::Uuid;

    async fn service() -> (PetAdminService, PetStore, MediaService) {
        let store = PetStore::new(setup_test_db().await);
        let dir = std::env::temp_dir().join(format!("petconnect-admin-{}", Uuid::new_v4()));
        let media = MediaService::new(dir, 1024);
        (
            PetAdminService::new(store.clone(), media.clone()),
            store,
            media,
        )
    }

    fn png() -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        stream::iter(vec![Ok(Bytes::from_static(b"\x89PNG-data"))])
    }

    fn form(name: &str, age: i64) -> PetForm {
        PetForm {
            name: name.into(),
            breed: "Beagle".into(),
            age,
            description: "Curious nose.".into(),
            adopted: false,
        }
    }

    #[tokio::test]
    async fn toggle_reports_status_and_message() {
        let (admin, store, _) = service().await;
        let pet = insert_pet(&store, "Charlie", "Beagle", 6, false).await;

        let outcome = admin.toggle_adoption(pet.id).await.unwrap();
        assert_eq!(
            outcome,
            ToggleOutcome {
                success: true,
                adopted: true,
                status_text: "Adopted",
                message: "Charlie has been marked as adopted.".into(),
            }
        );

        let back = admin.toggle_adoption(pet.id).await.unwrap();
        assert!(!back.adopted);
        assert_eq!(back.message, "Charlie has been marked as available.");

        assert!(matches!(
            admin.toggle_adoption(pet.id + 100).await,
            Err(ServiceError::PetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn invalid_forms_change_nothing() {
        let (admin, store, _) = service().await;
        let pet = insert_pet(&store, "Charlie", "Beagle", 6, false).await;

        assert!(matches!(
            admin.create(form("", 2)).await,
            Err(ServiceError::ValidationFailed(_))
        ));
        assert!(matches!(
            admin.update(pet.id, form("Charlie", -3)).await,
            Err(ServiceError::ValidationFailed(_))
        ));
        assert_eq!(store.get_by_id(pet.id).await.unwrap(), pet);
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_update_delete() {
        let (admin, store, _) = service().await;
        let pet = admin.create(form("Snoopy", 4)).await.unwrap();
        assert_eq!(pet.name, "Snoopy");

        let updated = admin.update(pet.id, form("Snoopy Sr.", 9)).await.unwrap();
        assert_eq!(updated.age, 9);

        admin.delete(pet.id).await.unwrap();
        assert!(matches!(
            store.get_by_id(pet.id).await,
            Err(ServiceError::PetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn replacing_an_image_removes_the_old_file() {
        let (admin, store, media) = service().await;
        let pet = insert_pet(&store, "Luna", "Siamese Cat", 2, false).await;

        let first = admin.upload_image(pet.id, Some("image/png"), png()).await.unwrap();
        let first_path = first.image.clone().unwrap();
        let second = admin.upload_image(pet.id, Some("image/png"), png()).await.unwrap();
        let second_path = second.image.clone().unwrap();

        assert_ne!(first_path, second_path);
        assert!(media.open(&first_path).await.is_err());
        assert!(media.open(&second_path).await.is_ok());
        assert_eq!(media.count_pet_images().await.unwrap(), 1);

        admin.delete(pet.id).await.unwrap();
        assert_eq!(media.count_pet_images().await.unwrap(), 0);
        let _ = tokio::fs::remove_dir_all(&media.base_path).await;
    }

    #[tokio::test]
    async fn upload_for_missing_pet_stores_nothing() {
        let (admin, _, media) = service().await;
        assert!(matches!(
            admin.upload_image(404, Some("image/png"), png()).await,
            Err(ServiceError::PetNotFound(404))
        ));
        assert_eq!(media.count_pet_images().await.unwrap(), 0);
    }
}
