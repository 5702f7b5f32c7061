use std::sync::Arc;

use clap::Parser;
use poem::{listener::TcpListener, Route, Server};
use poem_openapi::OpenApiService;

use docsync_auth::api::{AdminApi, AuthApi, HealthApi};
use docsync_auth::app_data::AppData;
use docsync_auth::cli::{self, Cli, Commands};
use docsync_auth::config::{init_logging, AuthSettings, SecretManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_logging()?;

    let cli = Cli::parse();
    let settings = AuthSettings::from_env()?;
    let secrets = SecretManager::init()?;

    let command = cli.command();
    if command != Commands::Serve {
        return cli::execute_command(command, &settings, &secrets).await;
    }

    let app_data = Arc::new(AppData::init(settings, secrets).await?);
    let expose_detail = app_data.settings.expose_error_detail;
    let address = app_data.settings.server_address();

    let auth_api = AuthApi::new(app_data.gateway.clone(), app_data.users.clone(), expose_detail);
    let admin_api = AdminApi::new(
        app_data.admin.clone(),
        app_data.token_service.clone(),
        expose_detail,
    );
    let health_api = HealthApi::new(app_data.store.clone());

    let api_service = OpenApiService::new(
        (health_api, auth_api, admin_api),
        "DocSync Auth API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(format!("http://{}", address));

    let ui = api_service.swagger_ui();

    let app = Route::new()
        .nest("/swagger", ui)
        .nest("/", api_service);

    tracing::info!(
        %address,
        backend = %app_data.store.backend(),
        "Starting server; Swagger UI at /swagger"
    );

    Server::new(TcpListener::bind(address)).run(app).await?;
    Ok(())
}
