mod common;

use chrono::{Duration, Utc};
use sqlx::PgPool;

use common::{seed_candidate, seed_client, seed_day, seed_open_requisition};
use dentalinkr::database::models::{RecurrenceDayStatus, RequisitionStatus};
use dentalinkr::database::repositories::{
    AuditRepository, ClientRepository, RecurrenceDayRepository, RequisitionRepository,
};
use dentalinkr::services::{AgingService, AuditLogger, ClaimService, Notifier};

fn aging_service(pool: &PgPool) -> AgingService {
    AgingService::new(
        RequisitionRepository::new(pool.clone()),
        RecurrenceDayRepository::new(pool.clone()),
        AuditLogger::new(AuditRepository::new(pool.clone())),
    )
}

#[sqlx::test(migrations = "./migrations")]
async fn stale_unfilled_requisition_is_canceled(pool: PgPool) {
    let client = seed_client(&pool, None).await;
    let requisition = seed_open_requisition(&pool, client.id).await;
    let stale = (Utc::now() - Duration::days(10)).date_naive();
    let day = seed_day(&pool, requisition.id, stale).await;

    let summary = aging_service(&pool)
        .close_outdated_requisitions()
        .await
        .unwrap();

    assert_eq!(summary.examined, 1);
    assert_eq!(summary.canceled, 1);
    assert_eq!(summary.unfulfilled, 0);
    assert_eq!(summary.errors, 0);

    let requisition = RequisitionRepository::new(pool.clone())
        .find_by_id(requisition.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(requisition.status, RequisitionStatus::Canceled);

    let day = RecurrenceDayRepository::new(pool.clone())
        .find_by_id(day.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(day.status, RecurrenceDayStatus::Canceled);
}

#[sqlx::test(migrations = "./migrations")]
async fn stale_partially_filled_requisition_becomes_unfulfilled(pool: PgPool) {
    let client = seed_client(&pool, None).await;
    let (_, candidate) = seed_candidate(&pool, "hygienist@example.com").await;
    let requisition = seed_open_requisition(&pool, client.id).await;

    let stale = (Utc::now() - Duration::days(10)).date_naive();
    let filled_day = seed_day(&pool, requisition.id, stale).await;
    let open_day = seed_day(&pool, requisition.id, stale + Duration::days(1)).await;

    // One of the two days got claimed back then
    ClaimService::new(
        pool.clone(),
        ClientRepository::new(pool.clone()),
        Notifier::new(None),
    )
    .claim_shift(&candidate, filled_day.id)
    .await
    .unwrap();
    // Claiming one of two days leaves the requisition open, so the batch
    // still examines it.

    let summary = aging_service(&pool)
        .close_outdated_requisitions()
        .await
        .unwrap();

    assert_eq!(summary.unfulfilled, 1);
    assert_eq!(summary.canceled, 0);

    let requisition = RequisitionRepository::new(pool.clone())
        .find_by_id(requisition.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(requisition.status, RequisitionStatus::Unfulfilled);

    let day_repo = RecurrenceDayRepository::new(pool.clone());
    let filled_day = day_repo.find_by_id(filled_day.id).await.unwrap().unwrap();
    assert_eq!(filled_day.status, RecurrenceDayStatus::Filled);
    let open_day = day_repo.find_by_id(open_day.id).await.unwrap().unwrap();
    assert_eq!(open_day.status, RecurrenceDayStatus::Unfulfilled);
}

#[sqlx::test(migrations = "./migrations")]
async fn recent_requisitions_are_left_alone(pool: PgPool) {
    let client = seed_client(&pool, None).await;
    let requisition = seed_open_requisition(&pool, client.id).await;
    let recent = (Utc::now() - Duration::days(2)).date_naive();
    seed_day(&pool, requisition.id, recent).await;

    let summary = aging_service(&pool)
        .close_outdated_requisitions()
        .await
        .unwrap();

    assert_eq!(summary.examined, 1);
    assert_eq!(summary.canceled, 0);
    assert_eq!(summary.unfulfilled, 0);

    let requisition = RequisitionRepository::new(pool.clone())
        .find_by_id(requisition.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(requisition.status, RequisitionStatus::Open);
}

#[sqlx::test(migrations = "./migrations")]
async fn permanent_requisitions_never_age_out(pool: PgPool) {
    let client = seed_client(&pool, None).await;

    let repo = RequisitionRepository::new(pool.clone());
    let requisition = repo
        .create_requisition(dentalinkr::database::models::RequisitionInput {
            title: "Permanent Hygienist".to_string(),
            client_id: client.id,
            location: None,
            discipline: common::DISCIPLINE.to_string(),
            experience_level: None,
            hourly_rate: None,
            permanent_position: true,
            reference_timezone: common::ZONE.to_string(),
        })
        .await
        .unwrap();
    repo.update_status(requisition.id, RequisitionStatus::Open)
        .await
        .unwrap();

    let stale = (Utc::now() - Duration::days(30)).date_naive();
    seed_day(&pool, requisition.id, stale).await;

    let summary = aging_service(&pool)
        .close_outdated_requisitions()
        .await
        .unwrap();

    // Permanent roles are not part of the scan at all
    assert_eq!(summary.examined, 0);

    let requisition = repo.find_by_id(requisition.id).await.unwrap().unwrap();
    assert_eq!(requisition.status, RequisitionStatus::Open);
}

#[sqlx::test(migrations = "./migrations")]
async fn requisition_without_days_is_skipped(pool: PgPool) {
    let client = seed_client(&pool, None).await;
    let requisition = seed_open_requisition(&pool, client.id).await;

    let summary = aging_service(&pool)
        .close_outdated_requisitions()
        .await
        .unwrap();

    assert_eq!(summary.examined, 1);
    assert_eq!(summary.canceled, 0);
    assert_eq!(summary.unfulfilled, 0);

    let requisition = RequisitionRepository::new(pool.clone())
        .find_by_id(requisition.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(requisition.status, RequisitionStatus::Open);
}
