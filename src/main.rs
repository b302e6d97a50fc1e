use actix_web::{self, middleware::Logger, App, HttpServer};
use dotenv::dotenv;
use log::{log, Level};
use nagarnetra_backend::{
    app::{configure_app, get_app_data},
    config::Config,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env()?;
    let app_data = get_app_data(&config).await?;
    log!(Level::Info, "Listening on {}:{}", config.bind_addr, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new(
                "%a \"%r\" %s %b \"%{Referer}i\" \"%{User-Agent}i\" %T",
            ))
            .configure(configure_app)
            .app_data(app_data.clone())
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;
    Ok(())
}
