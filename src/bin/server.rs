use std::path::Path;

use actix_web::middleware::{self, Logger};
use actix_web::{get, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use env_logger::Env;
use firds::api;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Port number
    #[arg(short, long, default_value = "8111")]
    port: u16,

    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,
}

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("Hello world!  This is the FIRDS etl server.")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let env_file = format!(".env/{}.env", args.env);
    if Path::new(&env_file).exists() {
        dotenvy::from_path(Path::new(&env_file)).unwrap();
    }

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(middleware::Compress::default())
            .service(hello)
            .service(api::firds::api_run_etl)
    })
    .bind(("127.0.0.1", args.port))?
    // .bind(("0.0.0.0", args.port))? // use this if you want to allow all connections
    .run()
    .await
}
