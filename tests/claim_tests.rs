mod common;

use sqlx::PgPool;

use common::{date, seed_candidate, seed_client, seed_day, seed_open_requisition};
use dentalinkr::database::models::{RecurrenceDayStatus, RequisitionStatus, TimesheetStatus};
use dentalinkr::database::repositories::{
    RecurrenceDayRepository, RequisitionRepository, TimesheetRepository, WorkdayRepository,
};
use dentalinkr::error::AppError;
use dentalinkr::services::{ClaimService, Notifier, UserContext};

fn claim_service(pool: &PgPool) -> ClaimService {
    ClaimService::new(
        pool.clone(),
        dentalinkr::database::repositories::ClientRepository::new(pool.clone()),
        Notifier::new(None),
    )
}

#[sqlx::test(migrations = "./migrations")]
async fn claim_creates_workday_and_draft_timesheet(pool: PgPool) {
    let client = seed_client(&pool, None).await;
    let (_, candidate) = seed_candidate(&pool, "hygienist@example.com").await;
    let requisition = seed_open_requisition(&pool, client.id).await;
    // 2024-06-03 is a Monday; its week begins Sunday 2024-06-02
    let day = seed_day(&pool, requisition.id, date(2024, 6, 3)).await;

    let outcome = claim_service(&pool)
        .claim_shift(&candidate, day.id)
        .await
        .expect("claim should succeed");

    assert_eq!(outcome.workday.candidate_id, candidate.user_id());
    assert_eq!(outcome.workday.recurrence_day_id, Some(day.id));
    assert_eq!(outcome.workday.timesheet_id, Some(outcome.timesheet.id));
    assert_eq!(outcome.recurrence_day.status, RecurrenceDayStatus::Filled);
    assert_eq!(outcome.timesheet.status, TimesheetStatus::Draft);
    assert_eq!(outcome.timesheet.week_begin_date, date(2024, 6, 2));

    // Filling the only day fills the temp requisition
    let requisition = RequisitionRepository::new(pool.clone())
        .find_by_id(requisition.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(requisition.status, RequisitionStatus::Filled);
}

#[sqlx::test(migrations = "./migrations")]
async fn second_claim_loses_with_already_claimed(pool: PgPool) {
    let client = seed_client(&pool, None).await;
    let (_, first) = seed_candidate(&pool, "first@example.com").await;
    let (_, second) = seed_candidate(&pool, "second@example.com").await;
    let requisition = seed_open_requisition(&pool, client.id).await;
    let day = seed_day(&pool, requisition.id, date(2024, 6, 3)).await;

    let service = claim_service(&pool);
    service.claim_shift(&first, day.id).await.expect("first claim wins");

    let result = service.claim_shift(&second, day.id).await;
    assert!(matches!(result, Err(AppError::AlreadyClaimed)));
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_claims_yield_exactly_one_winner(pool: PgPool) {
    let client = seed_client(&pool, None).await;
    let requisition = seed_open_requisition(&pool, client.id).await;
    let day = seed_day(&pool, requisition.id, date(2024, 6, 3)).await;

    let mut contexts: Vec<UserContext> = Vec::new();
    for i in 0..5 {
        let (_, ctx) = seed_candidate(&pool, &format!("candidate{}@example.com", i)).await;
        contexts.push(ctx);
    }

    let mut handles = Vec::new();
    for ctx in contexts {
        let service = claim_service(&pool);
        let day_id = day.id;
        handles.push(tokio::spawn(async move {
            service.claim_shift(&ctx, day_id).await
        }));
    }

    let mut wins = 0;
    let mut already_claimed = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => wins += 1,
            Err(AppError::AlreadyClaimed) => already_claimed += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(wins, 1);
    assert_eq!(already_claimed, 4);
}

#[sqlx::test(migrations = "./migrations")]
async fn claim_requires_declared_discipline(pool: PgPool) {
    let client = seed_client(&pool, None).await;
    let requisition = seed_open_requisition(&pool, client.id).await;
    let day = seed_day(&pool, requisition.id, date(2024, 6, 3)).await;

    // Candidate with a different declared discipline
    let repo = dentalinkr::database::repositories::UserRepository::new(pool.clone());
    let user = repo
        .create_user(
            "assistant@example.com",
            "hash123",
            "Wrong Discipline",
            dentalinkr::database::models::UserRole::Candidate,
        )
        .await
        .unwrap();
    let context = UserContext {
        user,
        disciplines: vec!["dental_assistant".to_string()],
    };

    let result = claim_service(&pool).claim_shift(&context, day.id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // Nothing was written
    let workday = WorkdayRepository::new(pool.clone())
        .find_by_recurrence_day(day.id)
        .await
        .unwrap();
    assert!(workday.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn claim_against_closed_requisition_fails_its_precondition(pool: PgPool) {
    let client = seed_client(&pool, None).await;
    let (_, candidate) = seed_candidate(&pool, "hygienist@example.com").await;
    let requisition = seed_open_requisition(&pool, client.id).await;
    let day = seed_day(&pool, requisition.id, date(2024, 6, 3)).await;

    // The aging batch closed it between listing and claiming
    RequisitionRepository::new(pool.clone())
        .update_status(requisition.id, RequisitionStatus::Canceled)
        .await
        .unwrap();

    let result = claim_service(&pool).claim_shift(&candidate, day.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn cancel_is_the_symmetric_inverse_of_claim(pool: PgPool) {
    let client = seed_client(&pool, None).await;
    let (_, candidate) = seed_candidate(&pool, "hygienist@example.com").await;
    let requisition = seed_open_requisition(&pool, client.id).await;
    let day = seed_day(&pool, requisition.id, date(2024, 6, 3)).await;

    let service = claim_service(&pool);
    let outcome = service.claim_shift(&candidate, day.id).await.unwrap();

    service
        .cancel_shift(&candidate, outcome.workday.id)
        .await
        .expect("cancel should succeed");

    // Workday gone, draft timesheet gone, day open again, requisition open
    let workday_repo = WorkdayRepository::new(pool.clone());
    assert!(workday_repo
        .find_by_id(outcome.workday.id)
        .await
        .unwrap()
        .is_none());

    let timesheet_repo = TimesheetRepository::new(pool.clone());
    assert!(timesheet_repo
        .find_by_id(outcome.timesheet.id)
        .await
        .unwrap()
        .is_none());

    let day = RecurrenceDayRepository::new(pool.clone())
        .find_by_id(day.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(day.status, RecurrenceDayStatus::Open);

    let requisition = RequisitionRepository::new(pool.clone())
        .find_by_id(requisition.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(requisition.status, RequisitionStatus::Open);
}

#[sqlx::test(migrations = "./migrations")]
async fn cancel_leaves_submitted_timesheets_alone(pool: PgPool) {
    let client = seed_client(&pool, None).await;
    let (_, candidate) = seed_candidate(&pool, "hygienist@example.com").await;
    let requisition = seed_open_requisition(&pool, client.id).await;
    let day = seed_day(&pool, requisition.id, date(2024, 6, 3)).await;

    let service = claim_service(&pool);
    let outcome = service.claim_shift(&candidate, day.id).await.unwrap();

    // Submit hours before canceling
    let timesheet_repo = TimesheetRepository::new(pool.clone());
    use bigdecimal::BigDecimal;
    use std::str::FromStr;
    timesheet_repo
        .submit(
            outcome.timesheet.id,
            serde_json::json!([
                {"date": "2024-06-03", "startTime": "08:00", "endTime": "16:00", "hours": 7.5}
            ]),
            BigDecimal::from_str("7.5").unwrap(),
            BigDecimal::from_str("30.00").unwrap(),
            BigDecimal::from_str("45.00").unwrap(),
        )
        .await
        .unwrap()
        .expect("submission should succeed");

    service
        .cancel_shift(&candidate, outcome.workday.id)
        .await
        .unwrap();

    // The submitted timesheet survives the cancellation
    let timesheet = timesheet_repo
        .find_by_id(outcome.timesheet.id)
        .await
        .unwrap()
        .expect("submitted timesheet must survive");
    assert_eq!(timesheet.status, TimesheetStatus::Pending);
}
