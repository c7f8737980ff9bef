use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{AddResult, ClassId, MemberId, RemoveResult, ToggleOutcome};
use crate::store::{BookingStore, ClassCatalog, MemberDirectory, StoreError};

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("class {0} not found")]
    ClassNotFound(ClassId),
    #[error("member {0} not found")]
    MemberNotFound(MemberId),
    #[error("class {0} is full")]
    ClassFull(ClassId),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),
}

/// Flips a member's attendance for a class.
///
/// The existence check is advisory; the result of the compare-and-act call
/// decides what is reported. Losing a race to a concurrent toggle still
/// reports the state the pair ended up in, so there is no retry loop.
#[derive(Clone)]
pub struct ToggleService {
    catalog: Arc<dyn ClassCatalog>,
    members: Arc<dyn MemberDirectory>,
    bookings: Arc<dyn BookingStore>,
}

impl ToggleService {
    pub fn new(
        catalog: Arc<dyn ClassCatalog>,
        members: Arc<dyn MemberDirectory>,
        bookings: Arc<dyn BookingStore>,
    ) -> Self {
        Self {
            catalog,
            members,
            bookings,
        }
    }

    pub async fn toggle(
        &self,
        member: &MemberId,
        class: ClassId,
    ) -> Result<ToggleOutcome, ToggleError> {
        let result = self.apply(member, class).await;
        match &result {
            Ok(outcome) => {
                info!(member_id = %member, class_id = %class, ?outcome, "booking toggled")
            }
            Err(ToggleError::StorageUnavailable(err)) => {
                warn!(member_id = %member, class_id = %class, error = %err, "booking toggle failed")
            }
            Err(err) => {
                info!(member_id = %member, class_id = %class, error = %err, "booking toggle rejected")
            }
        }
        result
    }

    async fn apply(&self, member: &MemberId, class: ClassId) -> Result<ToggleOutcome, ToggleError> {
        self.ensure_known(member, class).await?;

        if self.bookings.exists(member, class).await? {
            if self.bookings.try_remove(member, class).await? == RemoveResult::NotFound {
                debug!(member_id = %member, class_id = %class, "concurrent remove won");
            }
            return Ok(ToggleOutcome::Removed);
        }

        match self.bookings.try_add(member, class).await {
            Ok(AddResult::Inserted) => Ok(ToggleOutcome::Added),
            Ok(AddResult::AlreadyExists) => {
                debug!(member_id = %member, class_id = %class, "concurrent add won");
                Ok(ToggleOutcome::Added)
            }
            Ok(AddResult::ClassFull) => Err(ToggleError::ClassFull(class)),
            // The class or member vanished after the lookup. Class ids are never
            // reused, so a referential failure is never worth retrying.
            Err(StoreError::MissingReference) => match self.ensure_known(member, class).await {
                Err(err) => Err(err),
                Ok(()) => Err(ToggleError::ClassNotFound(class)),
            },
            Err(err) => Err(err.into()),
        }
    }

    async fn ensure_known(&self, member: &MemberId, class: ClassId) -> Result<(), ToggleError> {
        let (found_class, found_member) = futures::try_join!(
            self.catalog.find_class(class),
            self.members.member_exists(member)
        )?;
        if found_class.is_none() {
            return Err(ToggleError::ClassNotFound(class));
        }
        if !found_member {
            return Err(ToggleError::MemberNotFound(member.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::db::SqliteStore;
    use crate::db::tests::{new_class, setup_test_store};
    use crate::models::GymClass;
    use crate::store::{MockBookingStore, MockClassCatalog, MockMemberDirectory};

    fn gym_class(id: i64) -> GymClass {
        GymClass {
            id: ClassId(id),
            name: "WOD".to_string(),
            start_time: Utc.with_ymd_and_hms(2025, 11, 24, 6, 0, 0).unwrap(),
            duration_seconds: 3600,
            description: String::new(),
            capacity: None,
            version: 1,
        }
    }

    fn known_catalog() -> MockClassCatalog {
        let mut catalog = MockClassCatalog::new();
        catalog
            .expect_find_class()
            .returning(|id| Ok(Some(gym_class(id.0))));
        catalog
    }

    fn known_members() -> MockMemberDirectory {
        let mut members = MockMemberDirectory::new();
        members.expect_member_exists().returning(|_| Ok(true));
        members
    }

    fn service(
        catalog: MockClassCatalog,
        members: MockMemberDirectory,
        bookings: MockBookingStore,
    ) -> ToggleService {
        ToggleService::new(Arc::new(catalog), Arc::new(members), Arc::new(bookings))
    }

    fn sqlite_service(store: &SqliteStore) -> ToggleService {
        let store = Arc::new(store.clone());
        ToggleService::new(store.clone(), store.clone(), store)
    }

    #[tokio::test]
    async fn test_lost_add_race_reports_added() {
        let mut bookings = MockBookingStore::new();
        bookings.expect_exists().times(1).returning(|_, _| Ok(false));
        bookings
            .expect_try_add()
            .times(1)
            .returning(|_, _| Ok(AddResult::AlreadyExists));

        let service = service(known_catalog(), known_members(), bookings);
        let outcome = service.toggle(&MemberId::new("anna"), ClassId(1)).await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Added);
    }

    #[tokio::test]
    async fn test_lost_remove_race_reports_removed() {
        let mut bookings = MockBookingStore::new();
        bookings.expect_exists().times(1).returning(|_, _| Ok(true));
        bookings
            .expect_try_remove()
            .times(1)
            .returning(|_, _| Ok(RemoveResult::NotFound));

        let service = service(known_catalog(), known_members(), bookings);
        let outcome = service.toggle(&MemberId::new("anna"), ClassId(1)).await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Removed);
    }

    #[tokio::test]
    async fn test_unknown_member_does_not_touch_bookings() {
        let mut members = MockMemberDirectory::new();
        members.expect_member_exists().returning(|_| Ok(false));
        // No expectations: any booking call would panic.
        let bookings = MockBookingStore::new();

        let service = service(known_catalog(), members, bookings);
        let err = service
            .toggle(&MemberId::new("ghost"), ClassId(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ToggleError::MemberNotFound(id) if id.as_str() == "ghost"));
    }

    #[tokio::test]
    async fn test_unknown_class_does_not_touch_bookings() {
        let mut catalog = MockClassCatalog::new();
        catalog.expect_find_class().returning(|_| Ok(None));
        let bookings = MockBookingStore::new();

        let service = service(catalog, known_members(), bookings);
        let err = service
            .toggle(&MemberId::new("anna"), ClassId(9))
            .await
            .unwrap_err();
        assert!(matches!(err, ToggleError::ClassNotFound(ClassId(9))));
    }

    #[tokio::test]
    async fn test_storage_timeout_is_surfaced() {
        let mut bookings = MockBookingStore::new();
        bookings.expect_exists().returning(|_, _| Ok(false));
        bookings
            .expect_try_add()
            .returning(|_, _| Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut)));

        let service = service(known_catalog(), known_members(), bookings);
        let err = service
            .toggle(&MemberId::new("anna"), ClassId(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ToggleError::StorageUnavailable(e) if e.is_unavailable()));
    }

    #[tokio::test]
    async fn test_class_deleted_mid_toggle() {
        let mut catalog = MockClassCatalog::new();
        let mut first = true;
        catalog.expect_find_class().returning(move |id| {
            let found = first.then(|| gym_class(id.0));
            first = false;
            Ok(found)
        });
        let mut bookings = MockBookingStore::new();
        bookings.expect_exists().returning(|_, _| Ok(false));
        bookings
            .expect_try_add()
            .returning(|_, _| Err(StoreError::MissingReference));

        let service = service(catalog, known_members(), bookings);
        let err = service
            .toggle(&MemberId::new("anna"), ClassId(3))
            .await
            .unwrap_err();
        assert!(matches!(err, ToggleError::ClassNotFound(ClassId(3))));
    }

    #[tokio::test]
    async fn test_missing_reference_is_not_reported_as_retryable() {
        let mut bookings = MockBookingStore::new();
        bookings.expect_exists().returning(|_, _| Ok(false));
        bookings
            .expect_try_add()
            .times(1)
            .returning(|_, _| Err(StoreError::MissingReference));

        let service = service(known_catalog(), known_members(), bookings);
        let err = service
            .toggle(&MemberId::new("anna"), ClassId(4))
            .await
            .unwrap_err();
        assert!(matches!(err, ToggleError::ClassNotFound(ClassId(4))));
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let store = setup_test_store().await;
        let member = MemberId::new("anna");
        store.register_member(&member).await.unwrap();
        let class = store.create_class(&new_class("WOD", None)).await.unwrap();
        let service = sqlite_service(&store);

        assert_eq!(
            service.toggle(&member, class.id).await.unwrap(),
            ToggleOutcome::Added
        );
        assert!(store.exists(&member, class.id).await.unwrap());
        assert_eq!(
            service.toggle(&member, class.id).await.unwrap(),
            ToggleOutcome::Removed
        );
        assert!(!store.exists(&member, class.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_existence_tracks_toggle_parity() {
        let store = setup_test_store().await;
        let member = MemberId::new("anna");
        store.register_member(&member).await.unwrap();
        let class = store.create_class(&new_class("WOD", None)).await.unwrap();
        let service = sqlite_service(&store);

        let mut balance = 0i32;
        for _ in 0..7 {
            match service.toggle(&member, class.id).await.unwrap() {
                ToggleOutcome::Added => balance += 1,
                ToggleOutcome::Removed => balance -= 1,
            }
            let booked = store.exists(&member, class.id).await.unwrap();
            assert_eq!(booked, balance.rem_euclid(2) == 1);
        }
    }

    #[tokio::test]
    async fn test_full_class_rejects_new_member() {
        let store = setup_test_store().await;
        let anna = MemberId::new("anna");
        let jan = MemberId::new("jan");
        store.register_member(&anna).await.unwrap();
        store.register_member(&jan).await.unwrap();
        let class = store.create_class(&new_class("HYROX", Some(1))).await.unwrap();
        let service = sqlite_service(&store);

        service.toggle(&anna, class.id).await.unwrap();
        let err = service.toggle(&jan, class.id).await.unwrap_err();
        assert!(matches!(err, ToggleError::ClassFull(id) if id == class.id));
        assert!(!store.exists(&jan, class.id).await.unwrap());

        // Leaving is always possible and frees the seat.
        assert_eq!(
            service.toggle(&anna, class.id).await.unwrap(),
            ToggleOutcome::Removed
        );
        assert_eq!(
            service.toggle(&jan, class.id).await.unwrap(),
            ToggleOutcome::Added
        );
    }
}
