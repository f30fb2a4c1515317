//! Mock PostgREST endpoint for E2E tests.
//!
//! Serves `POST /rest/v1/rpc/exec_sql` and `GET /rest/v1/...` on an ephemeral
//! port, records every call, and keeps a table set so repeated DDL behaves
//! like a real database.

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, get, post, web};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

pub const SERVICE_KEY: &str = "test-service-role-key";
pub const ANON_KEY: &str = "test-anon-key";

/// How `exec_sql` behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecMode {
    /// Execute, tracking `CREATE TABLE` / `DROP TABLE IF EXISTS`
    Execute,
    /// The function is not in the schema cache (PGRST202)
    MissingProcedure,
    /// Reject every call with a Postgres error
    SqlError { code: String, message: String },
    /// Answer 200 with `{"error": ...}`, as functions that trap exceptions do
    TrappedError(String),
}

/// One recorded `exec_sql` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub apikey: Option<String>,
    pub authorization: Option<String>,
    pub sql: String,
}

pub struct MockState {
    pub mode: ExecMode,
    pub calls: Vec<RecordedCall>,
    pub tables: HashSet<String>,
}

#[derive(Deserialize)]
struct ExecSqlBody {
    sql: String,
}

fn header(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn authorized(req: &HttpRequest, expected: &[&str]) -> bool {
    let apikey = header(req, "apikey");
    let bearer = header(req, "authorization");
    expected.iter().any(|key| {
        apikey.as_deref() == Some(*key) && bearer.as_deref() == Some(&format!("Bearer {}", key))
    })
}

fn invalid_key() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({
        "message": "Invalid API key",
        "hint": "Double check your Supabase `anon` or `service_role` API key."
    }))
}

/// Apply the statements the mock understands; return an error message for a
/// duplicate bare `CREATE TABLE`.
fn execute(tables: &mut HashSet<String>, sql: &str) -> Option<String> {
    for statement in sql.split(';') {
        let words: Vec<String> = statement
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["drop", "table", "if", "exists", name, ..] => {
                tables.remove(*name);
            }
            ["create", "table", "if", "not", "exists", name, ..] => {
                tables.insert(name.to_string());
            }
            ["create", "table", name, ..] => {
                if !tables.insert(name.to_string()) {
                    return Some(format!("relation \"{}\" already exists", name));
                }
            }
            _ => {}
        }
    }
    None
}

#[post("/rest/v1/rpc/exec_sql")]
async fn exec_sql(
    req: HttpRequest,
    body: web::Json<ExecSqlBody>,
    state: web::Data<Arc<Mutex<MockState>>>,
) -> HttpResponse {
    let mut state = state.lock().unwrap();
    state.calls.push(RecordedCall {
        apikey: header(&req, "apikey"),
        authorization: header(&req, "authorization"),
        sql: body.sql.clone(),
    });

    if !authorized(&req, &[SERVICE_KEY]) {
        return invalid_key();
    }

    match state.mode.clone() {
        ExecMode::Execute => match execute(&mut state.tables, &body.sql) {
            None => HttpResponse::Ok().json(json!({ "success": true })),
            Some(message) => HttpResponse::BadRequest().json(json!({
                "code": "42P07",
                "details": null,
                "hint": null,
                "message": message
            })),
        },
        ExecMode::MissingProcedure => HttpResponse::NotFound().json(json!({
            "code": "PGRST202",
            "details": "Searched for the function public.exec_sql with parameter sql or with a single unnamed json/jsonb parameter, but no matches were found in the schema cache.",
            "hint": null,
            "message": "Could not find the function public.exec_sql(sql) in the schema cache"
        })),
        ExecMode::SqlError { code, message } => HttpResponse::BadRequest().json(json!({
            "code": code,
            "details": null,
            "hint": null,
            "message": message
        })),
        ExecMode::TrappedError(message) => HttpResponse::Ok().json(json!({ "error": message })),
    }
}

#[get("/rest/v1/")]
async fn api_root(req: HttpRequest) -> HttpResponse {
    if !authorized(&req, &[ANON_KEY, SERVICE_KEY]) {
        return invalid_key();
    }
    HttpResponse::Ok().json(json!({ "swagger": "2.0", "paths": {} }))
}

#[get("/rest/v1/{table}")]
async fn select_table(req: HttpRequest, path: web::Path<String>) -> HttpResponse {
    if !authorized(&req, &[ANON_KEY, SERVICE_KEY]) {
        return invalid_key();
    }
    match path.as_str() {
        "tickets" => HttpResponse::Ok().json(json!([{ "id": "8f2c", "status": "open" }])),
        other => HttpResponse::NotFound().json(json!({
            "code": "PGRST205",
            "message": format!("Could not find the table 'public.{}' in the schema cache", other)
        })),
    }
}

/// Mock PostgREST server.
pub struct MockPostgrest {
    pub url: String,
    pub state: Arc<Mutex<MockState>>,
}

impl MockPostgrest {
    /// Start the mock on an ephemeral port.
    pub async fn start(mode: ExecMode) -> Self {
        let state = Arc::new(Mutex::new(MockState {
            mode,
            calls: Vec::new(),
            tables: HashSet::new(),
        }));

        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{}", port);

        let state_data = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state_data.clone()))
                .service(exec_sql)
                .service(api_root)
                .service(select_table)
        })
        .workers(1)
        .listen(listener)
        .expect("failed to listen")
        .disable_signals()
        .run();

        // Runs until the test runtime shuts down
        tokio::spawn(server);

        MockPostgrest { url, state }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn set_mode(&self, mode: ExecMode) {
        self.state.lock().unwrap().mode = mode;
    }
}
