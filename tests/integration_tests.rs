//! Integration tests for the zangli HTTP API

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use zangli::assistant::{KnowledgeBase, KnowledgeChunk};
use zangli::config::Profile;
use zangli::{AppState, AssistantService, ChatProvider, ZangliConfig, ZangliError, web};

/// Chat provider that records prompts and answers with a fixed reply
struct StubProvider {
    prompts: Mutex<Vec<String>>,
}

impl StubProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, prompt: &str) -> Result<String, ZangliError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("时轮历是藏历的基础。".to_string())
    }
}

fn knowledge() -> Arc<KnowledgeBase> {
    Arc::new(KnowledgeBase::new(vec![
        KnowledgeChunk {
            content: "时轮历是藏历推算的基础，传入西藏后形成浦派历算。".to_string(),
        },
        KnowledgeChunk {
            content: "太阳在春分点时赤纬为零。".to_string(),
        },
    ]))
}

fn test_app(provider: Option<Arc<dyn ChatProvider>>) -> Router {
    let mut config = ZangliConfig::default();
    config.profile = Profile::Testing;
    config.cache.enabled = false;
    let assistant = AssistantService::new(knowledge(), provider, 3);
    let state = AppState::new(config, assistant).unwrap();
    web::app(state).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    post(uri, body.to_string())
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(test_app(None), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["aiConfigured"], false);
    assert_eq!(body["data"]["knowledgeEntries"], 2);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (status, body) = send(test_app(None), get("/api/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_tibetan_lookup() {
    let (status, body) = send(
        test_app(None),
        get("/api/calendar/tibetan?year=2025&month=11&day=1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["gregorianDate"], "2025-11-01");
    assert_eq!(body["data"]["tibetan"]["month"], 9);
    assert_eq!(body["data"]["tibetan"]["day"], 11);
    assert_eq!(body["data"]["tibetan"]["fullText"], "木蛇年 九月十一");
}

#[tokio::test]
async fn test_tibetan_lookup_today() {
    let (status, body) = send(test_app(None), get("/api/calendar/tibetan")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["gregorianDate"].is_string());
}

#[tokio::test]
async fn test_tibetan_lookup_partial_query() {
    let (status, body) = send(test_app(None), get("/api/calendar/tibetan?year=2025")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_PARAMS");
}

#[tokio::test]
async fn test_convert_gregorian() {
    let (status, body) = send(
        test_app(None),
        post_json("/api/calendar/convert", &json!({ "date": "2025-11-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["tibetan"]["fullText"], "木蛇年 九月十一");
    assert_eq!(data["lunar"]["text"], "二零二五年 九月十二");
    assert_eq!(data["fiveElements"]["fixedWeekday"], json!([0, 46, 51, 2, 29, 195]));
}

#[tokio::test]
async fn test_convert_from_tibetan() {
    let (status, body) = send(
        test_app(None),
        post_json(
            "/api/calendar/convert",
            &json!({ "from": "tibetan", "year": 2025, "month": 9, "day": 11 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["gregorianDate"], "2025-11-01");
}

#[tokio::test]
async fn test_convert_errors() {
    let (status, body) = send(test_app(None), post("/api/calendar/convert", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "EMPTY_REQUEST");

    let (status, body) = send(test_app(None), post("/api/calendar/convert", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let (status, body) = send(
        test_app(None),
        post_json("/api/calendar/convert", &json!({ "date": "2025/11/01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_DATE_FORMAT");

    let (status, body) = send(
        test_app(None),
        post_json("/api/calendar/convert", &json!({ "date": "2051-02-12" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "DATE_OUT_OF_RANGE");
    assert_eq!(body["error"]["message"], "日期超出范围");
}

#[tokio::test]
async fn test_comprehensive_data() {
    let (status, body) = send(
        test_app(None),
        post_json(
            "/api/calendar/date-comprehensive-data",
            &json!({ "date": "2025-11-01", "cityName": "拉萨市" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["selectedDate"], "2025-11-01");
    assert_eq!(data["selectedCity"], "拉萨市");
    assert_eq!(data["astrologicalTable"]["tibetanDate"], "木蛇年 九月十一");
    assert_eq!(data["astrologicalTable"]["tableData"].as_array().unwrap().len(), 6);
    assert_eq!(data["dateEvents"]["solarInfo"]["fullDate"], "2025年11月1日 周六");
    assert!(data["moonPhase"]["phaseName"].is_string());
    assert!(data["planetaryChart"]["zodiacPosition"]["sign"].is_string());
}

#[tokio::test]
async fn test_comprehensive_data_defaults_to_shanghai() {
    let (status, body) = send(
        test_app(None),
        post_json(
            "/api/calendar/date-comprehensive-data",
            &json!({ "date": "2025-11-01", "cityName": "不存在的城市" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["selectedCity"], "上海市");
}

#[tokio::test]
async fn test_calculate() {
    let (status, body) = send(
        test_app(None),
        post_json(
            "/api/calculate",
            &json!({ "latitude": 31.23, "longitude": 121.47, "date": "2024-03-20", "time": "08:00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["sunrise"].is_string());
    assert!(body.get("sunrise").is_none());
    assert!(body["data"]["sun_declination"].is_string());
}

#[tokio::test]
async fn test_calculate_missing_params() {
    let (status, body) = send(
        test_app(None),
        post_json("/api/calculate", &json!({ "latitude": 31.23 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_PARAMS");
}

#[tokio::test]
async fn test_planets_on_both_paths() {
    let request = json!({ "latitude": 29.65, "longitude": 91.13, "datetime": "2025-06-21T12:00:00+08:00" });
    for path in ["/api/astrology/planets", "/api/planets"] {
        let (status, body) = send(test_app(None), post_json(path, &request)).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        for planet in ["Mercury", "Venus", "Mars", "Jupiter", "Saturn"] {
            assert!(body["data"][planet]["declination"].is_string(), "{path} {planet}");
        }
    }
}

#[tokio::test]
async fn test_moon_phase() {
    let (status, body) = send(
        test_app(None),
        get("/api/astrology/moon-phase?date=2025-11-05&latitude=31.23&longitude=121.47"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["observationTime"], "12:00");
    let illumination = body["data"]["illumination"].as_f64().unwrap();
    assert!(illumination >= 0.9, "illumination {illumination}");
}

#[tokio::test]
async fn test_moon_phase_out_of_range() {
    let (status, body) = send(
        test_app(None),
        get("/api/astrology/moon-phase?date=1850-01-01"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "DATE_OUT_OF_RANGE");
}

#[tokio::test]
async fn test_ask_without_provider() {
    let (status, body) = send(
        test_app(None),
        post_json("/api/ask", &json!({ "question": "什么是时轮历？" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "AI_NOT_CONFIGURED");
}

#[tokio::test]
async fn test_ask_with_provider() {
    let stub = StubProvider::new();
    let provider: Arc<dyn ChatProvider> = stub.clone();
    let (status, body) = send(
        test_app(Some(provider)),
        post_json("/api/ask", &json!({ "question": "什么是时轮历？" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["question"], "什么是时轮历？");
    assert_eq!(body["data"]["answer"], "时轮历是藏历的基础。");

    let prompts = stub.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("浦派历算"));
    assert!(prompts[0].ends_with("问题: 什么是时轮历？\n"));
}

#[tokio::test]
async fn test_chat_requires_message() {
    let stub = StubProvider::new();
    let provider: Arc<dyn ChatProvider> = stub.clone();
    let (status, body) = send(
        test_app(Some(provider)),
        post_json("/api/chat", &json!({ "question": "wrong field" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    assert!(stub.prompts().is_empty());
}

#[tokio::test]
async fn test_chat_reply() {
    let provider: Arc<dyn ChatProvider> = StubProvider::new();
    let (status, body) = send(
        test_app(Some(provider)),
        post_json("/api/chat", &json!({ "message": "太阳赤纬" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reply"], "时轮历是藏历的基础。");
}

#[tokio::test]
async fn test_echo() {
    let payload = json!({ "hello": "扎西德勒", "n": [1, 2, 3] });
    let (status, body) = send(test_app(None), post_json("/api/echo", &payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["echo"], payload);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let question = "藏".repeat(40_000);
    let (status, body) = send(
        test_app(None),
        post_json("/api/ask", &json!({ "question": question })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");

    let payload = json!({ "text": "藏".repeat(40_000) });
    let (status, body) = send(test_app(None), post_json("/api/echo", &payload)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_body_within_limit_accepted() {
    let payload = json!({ "text": "藏".repeat(1_000) });
    let (status, body) = send(test_app(None), post_json("/api/echo", &payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["echo"], payload);
}

#[tokio::test]
async fn test_comprehensive_data_year_out_of_range() {
    let (status, body) = send(
        test_app(None),
        post_json(
            "/api/calendar/date-comprehensive-data",
            &json!({ "date": "1899-12-31" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "DATE_OUT_OF_RANGE");
    assert_eq!(body["error"]["message"], "日期超出范围");
}

#[tokio::test]
async fn test_cors_preflight_for_local_origin() {
    let mut config = ZangliConfig::default();
    config.cors.allow_local_network = true;
    let assistant = AssistantService::new(knowledge(), None, 3);
    let app = web::app(AppState::new(config, assistant).unwrap()).unwrap();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/ask")
        .header(header::ORIGIN, "http://192.168.1.20:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://192.168.1.20:5173"
    );
}
