//! Integration tests for organization and catalog repositories using
//! in-memory SurrealDB.

use rust_decimal::Decimal;
use slotwise_core::error::SlotwiseError;
use slotwise_core::models::business_hours::BookingSettings;
use slotwise_core::models::customer::{CreateCustomer, NewCustomer, UpdateCustomer};
use slotwise_core::models::organization::{
    CreateOrganization, OrganizationStatus, UpdateOrganization,
};
use slotwise_core::models::service::{CreateService, UpdateService};
use slotwise_core::models::staff::{CreateStaff, UpdateStaff};
use slotwise_core::models::vehicle::CreateVehicle;
use slotwise_core::repository::{
    BusinessHoursRepository, Catalog, CustomerRepository, OrganizationRepository,
    ServiceRepository, StaffRepository, VehicleRepository,
};
use slotwise_db::repository::{
    SurrealBusinessHoursRepository, SurrealCatalog, SurrealCustomerRepository,
    SurrealOrganizationRepository, SurrealServiceRepository, SurrealStaffRepository,
    SurrealVehicleRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: spin up in-memory DB, run migrations, create an organization.
async fn setup() -> (Surreal<Db>, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    slotwise_db::run_migrations(&db).await.unwrap();

    let org = SurrealOrganizationRepository::new(db.clone())
        .create(
            CreateOrganization {
                name: "Garage".into(),
                timezone: "+00:00".into(),
                status: None,
            },
            BookingSettings::default(),
        )
        .await
        .unwrap();

    (db, org.id)
}

fn details(first: &str, email: Option<&str>) -> NewCustomer {
    NewCustomer {
        first_name: first.into(),
        last_name: "Tester".into(),
        phone: None,
        email: email.map(Into::into),
    }
}

fn oil_change(organization_id: Uuid) -> CreateService {
    CreateService {
        organization_id,
        name: "Oil change".into(),
        category: "Maintenance".into(),
        duration_minutes: 60,
        price: Decimal::new(8500, 2),
        requires_vehicle: true,
    }
}

// -----------------------------------------------------------------------
// Organization tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn new_organization_is_active_and_closed_all_week() {
    let (db, org_id) = setup().await;
    let repo = SurrealOrganizationRepository::new(db.clone());
    let hours = SurrealBusinessHoursRepository::new(db);

    let org = repo.get_by_id(org_id).await.unwrap();
    assert_eq!(org.status, OrganizationStatus::Active);
    assert_eq!(org.timezone, "+00:00");

    let week = hours.get_week(org_id).await.unwrap();
    assert_eq!(week.len(), 7);
    assert!(week.iter().all(|d| d.closed));
    assert_eq!(hours.settings(org_id).await.unwrap(), BookingSettings::default());
}

#[tokio::test]
async fn organization_rejects_unknown_timezone() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    slotwise_db::run_migrations(&db).await.unwrap();

    let err = SurrealOrganizationRepository::new(db)
        .create(
            CreateOrganization {
                name: "Salon".into(),
                timezone: "Mars/Olympus".into(),
                status: None,
            },
            BookingSettings::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SlotwiseError::Invalid { .. }));
}

#[tokio::test]
async fn update_organization_status() {
    let (db, org_id) = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    let updated = repo
        .update(
            org_id,
            UpdateOrganization {
                status: Some(OrganizationStatus::Suspended),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, OrganizationStatus::Suspended);
    assert_eq!(updated.name, "Garage");
}

// -----------------------------------------------------------------------
// Customer tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn customer_email_is_unique_per_organization() {
    let (db, org_id) = setup().await;
    let repo = SurrealCustomerRepository::new(db.clone());

    let first = repo
        .create(CreateCustomer {
            organization_id: org_id,
            details: details("Ada", Some(" Ada@Example.com ")),
        })
        .await
        .unwrap();
    assert_eq!(first.email.as_deref(), Some("ada@example.com"));

    let err = repo
        .create(CreateCustomer {
            organization_id: org_id,
            details: details("Other", Some("ada@example.com")),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SlotwiseError::AlreadyExists { ref entity } if entity == "customer"));

    // Customers without email never collide.
    repo.create(CreateCustomer {
        organization_id: org_id,
        details: details("NoMail", None),
    })
    .await
    .unwrap();
    repo.create(CreateCustomer {
        organization_id: org_id,
        details: details("NoMail2", None),
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn customer_is_invisible_to_other_tenants() {
    let (db, org_id) = setup().await;
    let repo = SurrealCustomerRepository::new(db);

    let customer = repo
        .create(CreateCustomer {
            organization_id: org_id,
            details: details("Ada", None),
        })
        .await
        .unwrap();

    let err = repo.get_by_id(Uuid::new_v4(), customer.id).await.unwrap_err();
    assert!(matches!(err, SlotwiseError::NotFound { .. }));

    let updated = repo
        .update(
            org_id,
            customer.id,
            UpdateCustomer {
                phone: Some(Some("555-0100".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.phone.as_deref(), Some("555-0100"));
}

// -----------------------------------------------------------------------
// Vehicle and staff tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn vehicle_requires_owner_in_same_organization() {
    let (db, org_id) = setup().await;
    let customers = SurrealCustomerRepository::new(db.clone());
    let vehicles = SurrealVehicleRepository::new(db);

    let owner = customers
        .create(CreateCustomer {
            organization_id: org_id,
            details: details("Ada", None),
        })
        .await
        .unwrap();

    let vehicle = vehicles
        .create(CreateVehicle {
            organization_id: org_id,
            customer_id: owner.id,
            make: "Volvo".into(),
            model: "240".into(),
            plate: " abc-123 ".into(),
            mileage: Some(250_000),
        })
        .await
        .unwrap();
    assert_eq!(vehicle.customer_id, owner.id);
    assert_eq!(vehicle.plate, "ABC-123");

    let err = vehicles
        .create(CreateVehicle {
            organization_id: Uuid::new_v4(),
            customer_id: owner.id,
            make: "Saab".into(),
            model: "900".into(),
            plate: "XYZ".into(),
            mileage: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SlotwiseError::NotFound { .. }));
}

#[tokio::test]
async fn staff_can_be_deactivated() {
    let (db, org_id) = setup().await;
    let repo = SurrealStaffRepository::new(db);

    let staff = repo
        .create(CreateStaff {
            organization_id: org_id,
            first_name: "Sam".into(),
            last_name: "Wrench".into(),
        })
        .await
        .unwrap();
    assert!(staff.is_active);

    let updated = repo
        .update(
            org_id,
            staff.id,
            UpdateStaff {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!updated.is_active);
}

// -----------------------------------------------------------------------
// Service and catalog tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn service_name_is_unique_within_category() {
    let (db, org_id) = setup().await;
    let repo = SurrealServiceRepository::new(db);

    let created = repo.create(oil_change(org_id)).await.unwrap();
    assert_eq!(created.price, Decimal::new(8500, 2));
    assert_eq!(created.duration_minutes, 60);

    let err = repo.create(oil_change(org_id)).await.unwrap_err();
    assert!(matches!(err, SlotwiseError::AlreadyExists { .. }));

    let mut other_category = oil_change(org_id);
    other_category.category = "Express".into();
    repo.create(other_category).await.unwrap();
}

#[tokio::test]
async fn service_rejects_negative_price_and_zero_duration() {
    let (db, org_id) = setup().await;
    let repo = SurrealServiceRepository::new(db);

    let mut negative = oil_change(org_id);
    negative.price = Decimal::new(-1, 0);
    assert!(matches!(
        repo.create(negative).await.unwrap_err(),
        SlotwiseError::Invalid { .. }
    ));

    let mut instant = oil_change(org_id);
    instant.duration_minutes = 0;
    assert!(matches!(
        repo.create(instant).await.unwrap_err(),
        SlotwiseError::Invalid { .. }
    ));
}

#[tokio::test]
async fn resolve_services_preserves_input_order() {
    let (db, org_id) = setup().await;
    let services = SurrealServiceRepository::new(db.clone());
    let catalog = SurrealCatalog::new(db);

    let a = services.create(oil_change(org_id)).await.unwrap();
    let mut wash = oil_change(org_id);
    wash.name = "Wash".into();
    wash.duration_minutes = 30;
    let b = services.create(wash).await.unwrap();

    let resolved = catalog.resolve_services(org_id, &[b.id, a.id]).await.unwrap();
    let ids: Vec<Uuid> = resolved.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![b.id, a.id]);
}

#[tokio::test]
async fn resolve_services_rejects_missing_foreign_and_inactive() {
    let (db, org_id) = setup().await;
    let services = SurrealServiceRepository::new(db.clone());
    let catalog = SurrealCatalog::new(db.clone());

    let service = services.create(oil_change(org_id)).await.unwrap();

    let err = catalog
        .resolve_services(org_id, &[service.id, Uuid::new_v4()])
        .await
        .unwrap_err();
    assert!(matches!(err, SlotwiseError::NotFound { ref entity, .. } if entity == "service"));

    let other_org = SurrealOrganizationRepository::new(db)
        .create(
            CreateOrganization {
                name: "Other".into(),
                timezone: "UTC".into(),
                status: None,
            },
            BookingSettings::default(),
        )
        .await
        .unwrap();
    let err = catalog
        .resolve_services(other_org.id, &[service.id])
        .await
        .unwrap_err();
    assert!(matches!(err, SlotwiseError::NotFound { .. }));

    services
        .update(
            org_id,
            service.id,
            UpdateService {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let err = catalog
        .resolve_services(org_id, &[service.id])
        .await
        .unwrap_err();
    assert!(matches!(err, SlotwiseError::Invalid { .. }));
}

#[tokio::test]
async fn unreferenced_service_can_be_deleted() {
    let (db, org_id) = setup().await;
    let repo = SurrealServiceRepository::new(db);

    let service = repo.create(oil_change(org_id)).await.unwrap();
    repo.delete(org_id, service.id).await.unwrap();

    let err = repo.get_by_id(org_id, service.id).await.unwrap_err();
    assert!(matches!(err, SlotwiseError::NotFound { .. }));
}
