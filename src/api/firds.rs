use actix_web::{post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::config::EtlConfig;
use crate::pipeline;

#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    pub status: String,
    pub message: String,
}

/// Run the whole FIRDS pipeline once.  The request body is ignored; the
/// configuration comes from the environment of the server process.
///
/// curl -X POST http://127.0.0.1:8111/firds/run
#[post("/firds/run")]
pub async fn api_run_etl(_body: web::Bytes) -> impl Responder {
    let cfg = match EtlConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            return HttpResponse::InternalServerError().json(RunResponse {
                status: "error".to_string(),
                message: format!("{} failed: {}", e.stage(), e),
            })
        }
    };
    match pipeline::run(&cfg).await {
        Ok(report) => HttpResponse::Ok().json(RunResponse {
            status: "ok".to_string(),
            message: report.to_string(),
        }),
        Err(e) => HttpResponse::InternalServerError().json(RunResponse {
            status: "error".to_string(),
            message: format!("{} failed: {}", e.stage(), e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::{env, path::Path};

    // actix's `test` attribute macro must stay out of scope here or it
    // shadows the built-in `#[test]` on the blocking test below
    use actix_web::{http::StatusCode, App};

    use crate::api::firds::*;

    #[actix_web::test]
    async fn run_reports_the_failing_stage() {
        env::set_var("FIRDS_INDEX_URL", "http://127.0.0.1:9/solr/select");
        env::set_var("AWS_ACCESS_KEY_ID", "minioadmin");
        env::set_var("AWS_SECRET_ACCESS_KEY", "minioadmin");
        env::set_var("FIRDS_BUCKET", "firds-test");
        env::set_var("FIRDS_CSV_PATH", "firds_api_test.csv");

        let app = actix_web::test::init_service(App::new().service(api_run_etl)).await;
        let req = actix_web::test::TestRequest::post()
            .uri("/firds/run")
            .to_request();
        let resp = actix_web::test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: RunResponse = actix_web::test::read_body_json(resp).await;
        assert_eq!(body.status, "error");
        assert!(body.message.contains("register index"));
    }

    #[ignore]
    #[test]
    fn api_test() -> Result<(), reqwest::Error> {
        dotenvy::from_path(Path::new(".env/test.env")).unwrap();
        let url = format!("{}/firds/run", env::var("RUST_SERVER").unwrap());
        let response = reqwest::blocking::Client::new().post(url).send()?.text()?;
        println!("{}", response);
        let body: RunResponse = serde_json::from_str(&response).unwrap();
        assert_eq!(body.status, "ok");
        Ok(())
    }
}
