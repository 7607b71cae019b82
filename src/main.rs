use actix_web::{middleware, web, App, HttpServer};

use spa_desk::{
    auth::TokenIssuer,
    config::AppConfig,
    routes,
    state::AppState,
    store,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let config = AppConfig::from_env();

    let store = store::connect(&config.database_url).await?;
    log::info!("Using {} store", store.backend());
    store.migrate().await?;
    store::seed_defaults(store.as_ref(), &config).await?;

    let state = AppState::new(store.clone(), TokenIssuer::new(&config.jwt_secret));

    let address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting spa-desk on http://{address}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind(address)?
    .run()
    .await?;

    store.close().await;
    log::info!("Store closed, shutting down");
    Ok(())
}
