mod api;
mod auth;
mod config;
mod database;
mod jobs;
mod middleware;
mod models;
mod scim;
mod seeds;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::io;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = config::AppConfig::from_env().map_err(|e| {
        log::error!("❌ Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    log::info!("🚀 Starting Office Facility Management Service...");
    log::info!("📊 Database: {} ({})", config.mongodb_uri, config.mongodb_db);

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&config.mongodb_uri, &config.mongodb_db)
        .await
        .map_err(|e| {
            log::error!("❌ Failed to connect to MongoDB: {}", e);
            io::Error::new(io::ErrorKind::ConnectionRefused, e.to_string())
        })?;
    log::info!("✅ MongoDB connected successfully");

    // 🌱 Seeds
    seeds::roles_seed::seed_default_roles(&db).await;
    seeds::settings_seed::seed_default_settings(&db).await;
    if let Err(e) = seeds::trip_purposes_seed::seed_trip_purposes(&db, &config.default_company_id).await {
        log::error!("   ❌ Failed to seed trip purposes: {}", e);
    }

    let settings = services::SettingsStore::new(db.clone(), &config.settings_encryption_key);
    let scim_client = scim::ScimClient::new(settings.clone());
    let auth_context = auth::AuthContext::from_config(&config);

    // 📅 Background jobs
    log::info!("📅 Starting background jobs...");
    jobs::oauth_state_cleanup::start_oauth_state_cleanup();
    jobs::scim_scheduler::start_scim_scheduler(db.clone(), scim_client.clone(), config.clone());
    log::info!("✅ Background jobs started");

    let bind_addr = (config.host.clone(), config.port);
    log::info!("🌐 Server starting on {}:{}", config.host, config.port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", config.host, config.port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", config.host, config.port);

    let db_data = web::Data::new(db);
    let config_data = web::Data::new(config);
    let auth_data = web::Data::new(auth_context);
    let settings_data = web::Data::new(settings);
    let scim_data = web::Data::new(scim_client);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = config_data
            .cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CACHE_CONTROL,
                actix_web::http::header::PRAGMA,
            ])
            .expose_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::CONTENT_DISPOSITION,
            ])
            .supports_credentials()
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .app_data(config_data.clone())
            .app_data(auth_data.clone())
            .app_data(settings_data.clone())
            .app_data(scim_data.clone())
            .app_data(api::json_config())
            .app_data(api::query_config())
            .app_data(api::path_config())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
            // Health check
            .route("/health", web::get().to(api::health::health_check))

            // ==================== AUTH (SSO) ====================
            .service(
                web::scope("/auth")
                    .service(api::auth::login)
                    .service(api::auth::callback)
                    .service(api::auth::logout_get)
                    .service(api::auth::logout)
            )
            .service(
                web::scope("/api/v1/auth")
                    // Refresh lê o cookie selado diretamente
                    .service(api::auth::refresh)
                    .service(
                        web::scope("")
                            .wrap(middleware::AuthMiddleware)
                            .service(api::auth::me)
                            .service(api::auth::issue_token)
                    )
            )

            // ==================== PUBLIC (tablets / SSO) ====================
            // Registrados antes dos scopes protegidos com o mesmo prefixo
            .configure(api::meetings::configure_public)
            .configure(api::devices::configure_public)
            .configure(api::sync::configure_public)

            // ==================== ORGANIZATION ====================
            .service(
                web::scope("/api/v1/companies")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::companies::configure)
            )
            .service(
                web::scope("/api/v1/departments")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::departments::configure)
            )
            .service(
                web::scope("/api/v1/positions")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::positions::configure)
            )
            .service(
                web::scope("/api/v1/roles")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::roles::configure)
            )
            .service(
                web::scope("/api/v1/users")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::users::configure)
            )

            // ==================== MASTER DATA ====================
            .service(
                web::scope("/api/v1/locations")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::locations::configure)
            )
            .service(
                web::scope("/api/v1/rooms")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::rooms::configure)
            )
            .service(
                web::scope("/api/v1/vehicles")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::vehicles::configure)
            )
            .service(
                web::scope("/api/v1/drivers")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::drivers::configure)
            )
            .service(
                web::scope("/api/v1/transport-companies")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::transport_companies::configure)
            )
            .service(
                web::scope("/api/v1/trip-purposes")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::trip_purposes::configure)
            )

            // ==================== REQUESTS ====================
            .service(
                web::scope("/api/v1/transport/requests")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::transport::configure)
            )
            .service(
                web::scope("/api/v1/meetings")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::meetings::configure)
            )
            .service(
                web::scope("/api/v1/facility/requests")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::facility::configure)
            )
            .service(
                web::scope("/api/v1/driver")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::drivers::configure_trips)
            )
            .service(
                web::scope("/api/v1/vouchers")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::vouchers::configure)
            )
            .service(
                web::scope("/api/v1/devices")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::devices::configure)
            )

            // ==================== ADMIN ====================
            .service(
                web::scope("/api/v1/settings")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::settings::configure)
            )
            .service(
                web::scope("/api/v1/sync")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::sync::configure_sync)
            )
            .service(
                web::scope("/api/v1/scim")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::sync::configure_scim)
            )
            .service(
                web::scope("/api/v1/approval-workflows")
                    .wrap(middleware::AuthMiddleware)
                    .configure(api::approval_workflows::configure)
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
