use log::info;
use server::app::build_router;
use server::cloudinary::CloudinaryClient;
use server::state::AppState;
use server::storage::init_temp_dir;
use std::env;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    dotenvy::dotenv().ok();

    info!("Starting upload relay...");

    init_temp_dir().expect("Failed to initialize temp directory");

    let media = CloudinaryClient::from_env().expect("Missing media host credentials");
    let state = AppState::new(media);
    let app = build_router(state);

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8000);
    let addr = format!("0.0.0.0:{}", port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
