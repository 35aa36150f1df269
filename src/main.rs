use actix_cors::Cors;
use actix_web::{get, middleware::Logger, web, App, HttpResponse, HttpServer, Responder};
use anyhow::Result;

use dentalinkr::database::{
    init_database,
    repositories::{
        AdminFeeRepository, AuditRepository, ClientRepository, InvoiceRepository,
        RecurrenceDayRepository, RequisitionRepository, TimesheetRepository, UserRepository,
        WorkdayRepository,
    },
};
use dentalinkr::handlers::{
    admin, auth, invoices, jobs, recurrence_days, requisitions, timesheets, workdays,
};
use dentalinkr::middleware::RequestId;
use dentalinkr::services::{
    AgingService, AuditLogger, AuthService, ClaimService, HostedBillingClient, Notifier,
    SettlementService, UserContextService,
};
use dentalinkr::Config;

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("DentaLinkr API v1.0")
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init();

    println!("🚀 Starting DentaLinkr API server...");

    // Load configuration
    let config = Config::from_env()?;
    println!(
        "📋 Configuration loaded (environment: {})",
        config.environment
    );

    // Initialize database
    let pool = init_database(&config.database_url).await?;
    println!("✅ Database initialized");

    // Initialize repositories
    let client_repository = ClientRepository::new(pool.clone());
    let user_repository = UserRepository::new(pool.clone());
    let requisition_repository = RequisitionRepository::new(pool.clone());
    let recurrence_day_repository = RecurrenceDayRepository::new(pool.clone());
    let workday_repository = WorkdayRepository::new(pool.clone());
    let timesheet_repository = TimesheetRepository::new(pool.clone());
    let invoice_repository = InvoiceRepository::new(pool.clone());
    let admin_fee_repository = AdminFeeRepository::new(pool.clone());
    let audit_repository = AuditRepository::new(pool.clone());

    // Initialize services
    let auth_service = AuthService::new(user_repository.clone(), config.clone());
    let user_context_service =
        UserContextService::new(user_repository.clone(), auth_service.clone());
    let audit_logger = AuditLogger::new(audit_repository.clone());
    let notifier = Notifier::new(config.notify_webhook_url.clone());
    let claim_service = ClaimService::new(pool.clone(), client_repository.clone(), notifier);
    let billing_client = HostedBillingClient::new(
        config.billing_api_url.clone(),
        config.billing_api_key.clone(),
    );
    let settlement_service = SettlementService::new(
        timesheet_repository.clone(),
        invoice_repository.clone(),
        requisition_repository.clone(),
        client_repository.clone(),
        audit_logger.clone(),
        billing_client,
    );
    let aging_service = AgingService::new(
        requisition_repository.clone(),
        recurrence_day_repository.clone(),
        audit_logger.clone(),
    );

    // Wrap everything for the app
    let client_repo_data = web::Data::new(client_repository);
    let user_repo_data = web::Data::new(user_repository);
    let requisition_repo_data = web::Data::new(requisition_repository);
    let recurrence_day_repo_data = web::Data::new(recurrence_day_repository);
    let workday_repo_data = web::Data::new(workday_repository);
    let timesheet_repo_data = web::Data::new(timesheet_repository);
    let invoice_repo_data = web::Data::new(invoice_repository);
    let admin_fee_repo_data = web::Data::new(admin_fee_repository);
    let auth_service_data = web::Data::new(auth_service);
    let user_context_service_data = web::Data::new(user_context_service);
    let audit_logger_data = web::Data::new(audit_logger);
    let claim_service_data = web::Data::new(claim_service);
    let settlement_service_data = web::Data::new(settlement_service);
    let aging_service_data = web::Data::new(aging_service);
    let config_data = web::Data::new(config.clone());

    let server_address = config.server_address();
    println!("🌐 Server starting on http://{}", server_address);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(client_repo_data.clone())
            .app_data(user_repo_data.clone())
            .app_data(requisition_repo_data.clone())
            .app_data(recurrence_day_repo_data.clone())
            .app_data(workday_repo_data.clone())
            .app_data(timesheet_repo_data.clone())
            .app_data(invoice_repo_data.clone())
            .app_data(admin_fee_repo_data.clone())
            .app_data(auth_service_data.clone())
            .app_data(user_context_service_data.clone())
            .app_data(audit_logger_data.clone())
            .app_data(claim_service_data.clone())
            .app_data(settlement_service_data.clone())
            .app_data(aging_service_data.clone())
            .app_data(config_data.clone())
            .wrap(
                Cors::default()
                    .allowed_origin("http://localhost:3000")
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        "Authorization",
                        "Content-Type",
                        "Accept",
                        "X-Requested-With",
                        "X-Correlation-ID",
                    ])
                    .max_age(3600),
            )
            .wrap(RequestId)
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T correlation_id=%{x-correlation-id}o"#,
            ))
            .service(hello)
            .service(health)
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/auth")
                            .route("/register", web::post().to(auth::register))
                            .route("/login", web::post().to(auth::login))
                            .route("/me", web::get().to(auth::me)),
                    )
                    .service(
                        web::scope("/requisitions")
                            .route("", web::post().to(requisitions::create_requisition))
                            .route("", web::get().to(requisitions::get_requisitions))
                            .route("/{id}", web::get().to(requisitions::get_requisition))
                            .route("/{id}", web::put().to(requisitions::update_requisition))
                            .route("/{id}", web::delete().to(requisitions::archive_requisition))
                            .route(
                                "/{id}/status",
                                web::post().to(requisitions::update_requisition_status),
                            )
                            .route(
                                "/{id}/recurrence-days",
                                web::post().to(requisitions::create_recurrence_days),
                            )
                            .route(
                                "/{id}/recurrence-days",
                                web::get().to(requisitions::get_recurrence_days),
                            )
                            .route(
                                "/{id}/timesheets",
                                web::get().to(timesheets::get_requisition_timesheets),
                            ),
                    )
                    .service(
                        web::scope("/recurrence-days")
                            .route(
                                "/{id}",
                                web::put().to(recurrence_days::update_recurrence_day),
                            )
                            .route(
                                "/{id}",
                                web::delete().to(recurrence_days::delete_recurrence_day),
                            )
                            .route("/{id}/claim", web::post().to(workdays::claim_shift)),
                    )
                    .service(
                        web::scope("/workdays")
                            .route("/my", web::get().to(workdays::get_my_workdays))
                            .route("/{id}/cancel", web::post().to(workdays::cancel_shift))
                            .route(
                                "/{id}/timesheet",
                                web::post().to(timesheets::submit_timesheet),
                            ),
                    )
                    .service(
                        web::scope("/timesheets")
                            .route("/my", web::get().to(timesheets::get_my_timesheets))
                            .route("/{id}", web::get().to(timesheets::get_timesheet))
                            .route("/{id}/validation", web::get().to(timesheets::validate))
                            .route("/{id}/approve", web::post().to(timesheets::approve))
                            .route("/{id}/reject", web::post().to(timesheets::reject))
                            .route("/{id}/void", web::post().to(timesheets::void))
                            .route(
                                "/{id}/mark-discrepancy",
                                web::post().to(timesheets::mark_discrepancy),
                            )
                            .route(
                                "/{id}/revert-to-pending",
                                web::post().to(timesheets::revert_to_pending),
                            ),
                    )
                    .service(
                        web::scope("/invoices")
                            .route("", web::get().to(invoices::get_invoices))
                            .route("/{id}", web::get().to(invoices::get_invoice)),
                    )
                    .service(
                        web::scope("/admin")
                            .route("/fee-config", web::get().to(admin::get_fee_config))
                            .route("/fee-config", web::put().to(admin::update_fee_config))
                            .route("/clients", web::post().to(admin::create_client))
                            .route("/clients", web::get().to(admin::get_clients))
                            .route(
                                "/candidates/{id}/disciplines",
                                web::post().to(admin::add_candidate_discipline),
                            ),
                    )
                    .service(web::scope("/jobs").route(
                        "/close-outdated-requisitions",
                        web::post().to(jobs::close_outdated_requisitions),
                    )),
            )
    })
    .bind(&server_address)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
