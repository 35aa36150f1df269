#![allow(dead_code)]

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use fake::faker::internet::en::SafeEmail;
use fake::Fake;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use dentalinkr::database::models::{
    Client, ClientInput, RecurrenceDay, Requisition, RequisitionInput, RequisitionStatus, User,
    UserRole,
};
use dentalinkr::database::repositories::{
    ClientRepository, RecurrenceDayRepository, RequisitionRepository, UserRepository,
};
use dentalinkr::handlers::recurrence_days::build_day;
use dentalinkr::services::UserContext;

pub const DISCIPLINE: &str = "dental_hygienist";
pub const ZONE: &str = "America/New_York";

pub async fn seed_client(pool: &PgPool, billing_customer_id: Option<&str>) -> Client {
    ClientRepository::new(pool.clone())
        .create_client(ClientInput {
            name: "Bright Smiles Dental".to_string(),
            contact_email: SafeEmail().fake(),
            billing_customer_id: billing_customer_id.map(|s| s.to_string()),
        })
        .await
        .expect("failed to seed client")
}

pub async fn seed_candidate(pool: &PgPool, email: &str) -> (User, UserContext) {
    let repo = UserRepository::new(pool.clone());
    let user = repo
        .create_user(email, "hash123", "Test Candidate", UserRole::Candidate)
        .await
        .expect("failed to seed candidate");
    repo.add_discipline(user.id, DISCIPLINE, "senior")
        .await
        .expect("failed to seed discipline");

    let context = UserContext {
        user: user.clone(),
        disciplines: vec![DISCIPLINE.to_string()],
    };
    (user, context)
}

pub async fn seed_staff(pool: &PgPool, email: &str) -> UserContext {
    let repo = UserRepository::new(pool.clone());
    let user = repo
        .create_user(email, "hash123", "Test Staff", UserRole::Staff)
        .await
        .expect("failed to seed staff");

    UserContext {
        user,
        disciplines: vec![],
    }
}

pub async fn seed_open_requisition(pool: &PgPool, client_id: Uuid) -> Requisition {
    let repo = RequisitionRepository::new(pool.clone());
    let requisition = repo
        .create_requisition(RequisitionInput {
            title: "Temp Hygienist Coverage".to_string(),
            client_id,
            location: Some("Downtown clinic".to_string()),
            discipline: DISCIPLINE.to_string(),
            experience_level: Some("senior".to_string()),
            hourly_rate: Some(BigDecimal::from_str("30.00").unwrap()),
            permanent_position: false,
            reference_timezone: ZONE.to_string(),
        })
        .await
        .expect("failed to seed requisition");

    repo.update_status(requisition.id, RequisitionStatus::Open)
        .await
        .expect("failed to open requisition")
        .expect("requisition vanished")
}

/// Local 08:00-16:00 with a 12:00-12:30 lunch, converted through the
/// requisition's reference timezone.
pub async fn seed_day(pool: &PgPool, requisition_id: Uuid, date: NaiveDate) -> RecurrenceDay {
    let input = dentalinkr::database::models::RecurrenceDayInput {
        date,
        day_start: "08:00".to_string(),
        day_end: "16:00".to_string(),
        lunch_start: Some("12:00".to_string()),
        lunch_end: Some("12:30".to_string()),
    };
    let new_day = build_day(&input, ZONE).expect("failed to build day");

    RecurrenceDayRepository::new(pool.clone())
        .create_days(requisition_id, vec![new_day])
        .await
        .expect("failed to seed recurrence day")
        .into_iter()
        .next()
        .expect("no day created")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
