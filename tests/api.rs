use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;
use stock_trader::api::routes;
use stock_trader::auth::TokenKeys;
use stock_trader::db::Database;
use stock_trader::quote::StaticQuoteProvider;
use stock_trader::state::AppState;
use warp::http::StatusCode;
use warp::{Filter, Reply};

const FORM: &str = "application/x-www-form-urlencoded";

async fn app() -> (
    impl Filter<Extract = impl Reply, Error = std::convert::Infallible> + Clone + 'static,
    Arc<StaticQuoteProvider>,
) {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create in-memory database");
    let quotes = Arc::new(StaticQuoteProvider::new());
    quotes.set_price("AAPL", "Apple Inc.", dec!(50));
    let state = AppState::new(
        db,
        quotes.clone(),
        TokenKeys::new("test-secret", 3600),
        dec!(10000),
    );
    (routes(Arc::new(state)), quotes)
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("response is not JSON")
}

async fn post<F>(api: &F, path: &str, token: Option<&str>, body: &str) -> (StatusCode, Value)
where
    F: Filter<Error = std::convert::Infallible> + 'static,
    F::Extract: Reply + Send,
{
    let mut req = warp::test::request()
        .method("POST")
        .path(path)
        .header("content-type", FORM)
        .body(body.to_string());
    if let Some(token) = token {
        req = req.header("authorization", format!("Bearer {}", token));
    }
    let resp = req.reply(api).await;
    (resp.status(), json(resp.body()))
}

async fn get<F>(api: &F, path: &str, token: Option<&str>) -> (StatusCode, Value)
where
    F: Filter<Error = std::convert::Infallible> + 'static,
    F::Extract: Reply + Send,
{
    let mut req = warp::test::request().method("GET").path(path);
    if let Some(token) = token {
        req = req.header("authorization", format!("Bearer {}", token));
    }
    let resp = req.reply(api).await;
    (resp.status(), json(resp.body()))
}

async fn login_as<F>(api: &F, username: &str) -> String
where
    F: Filter<Error = std::convert::Infallible> + 'static,
    F::Extract: Reply + Send,
{
    let form = format!("username={}&password=pw&confirmation=pw", username);
    let (status, _) = post(api, "/register", None, &form).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post(
        api,
        "/login",
        None,
        &format!("username={}&password=pw", username),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().expect("token missing").to_string()
}

#[tokio::test]
async fn trading_flow_over_http() {
    let (api, quotes) = app().await;
    let token = login_as(&api, "alice").await;

    let (status, body) = post(&api, "/buy", Some(&token), "symbol=aapl&shares=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cash"], "9500");
    assert_eq!(body["symbol"], "AAPL");

    quotes.set_price("AAPL", "Apple Inc.", dec!(60));
    let (status, body) = post(&api, "/sell", Some(&token), "symbol=AAPL&shares=4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cash"], "9740");

    let (status, body) = get(&api, "/", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["holdings"][0]["shares"], 6);
    assert_eq!(body["holdings"][0]["total"], "360");
    assert_eq!(body["total"], "10100");

    let (status, body) = get(&api, "/history", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let directions: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["direction"].as_str().unwrap())
        .collect();
    assert_eq!(directions, vec!["buy", "sell"]);
}

#[tokio::test]
async fn overselling_is_rejected_with_code() {
    let (api, _) = app().await;
    let token = login_as(&api, "bob").await;
    post(&api, "/buy", Some(&token), "symbol=AAPL&shares=6").await;

    let (status, body) = post(&api, "/sell", Some(&token), "symbol=AAPL&shares=10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_SHARES");

    let (_, body) = get(&api, "/", Some(&token)).await;
    assert_eq!(body["cash"], "9700");
    assert_eq!(body["holdings"][0]["shares"], 6);
}

#[tokio::test]
async fn manage_moves_cash() {
    let (api, _) = app().await;
    let token = login_as(&api, "carol").await;

    let (status, body) = post(&api, "/manage", Some(&token), "direction=deposit&amount=250").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cash"], "10250");

    let (status, body) =
        post(&api, "/manage", Some(&token), "direction=withdraw&amount=20000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_FUNDS");

    let (status, body) = post(&api, "/manage", Some(&token), "direction=borrow&amount=5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn quote_reports_display_price() {
    let (api, quotes) = app().await;
    let token = login_as(&api, "dave").await;
    quotes.set_price("BRK.A", "Berkshire Hathaway", dec!(612345.5));

    let (status, body) = post(&api, "/quote", Some(&token), "symbol=brk.a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Berkshire Hathaway");
    assert_eq!(body["price_display"], "$612,345.50");

    let (status, body) = post(&api, "/quote", Some(&token), "symbol=ZZZZ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNKNOWN_SYMBOL");
}

#[tokio::test]
async fn duplicate_registration_and_bad_login() {
    let (api, _) = app().await;
    login_as(&api, "erin").await;

    let (status, body) = post(
        &api,
        "/register",
        None,
        "username=erin&password=x&confirmation=x",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "username taken");

    let (status, body) = post(&api, "/login", None, "username=erin&password=nope").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let (api, _) = app().await;

    let (status, body) = get(&api, "/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_ERROR");

    let (status, _) = post(&api, "/buy", Some("garbage"), "symbol=AAPL&shares=1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn responses_are_not_cached() {
    let (api, _) = app().await;
    let resp = warp::test::request().method("GET").path("/nowhere").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        resp.headers()["cache-control"],
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(resp.headers()["pragma"], "no-cache");
}
