//! Adapters exercised against a local axum server.

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use facewatch_core::{
    DetectionError, Detector, Frame, FrameSource, NameExchange, NetworkError, RecognitionState,
    UploadRecord, UploadSink,
};
use facewatch_remote::{
    build_client, HttpDetector, HttpFrameSource, HttpNameExchange, HttpUploadSink,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G'];

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server failed");
    });
    format!("http://{}", addr)
}

fn client() -> reqwest::Client {
    build_client(Duration::from_secs(5)).expect("client")
}

fn test_frame() -> Frame {
    Frame::from_rgb(vec![128; 8 * 6 * 3], 8, 6, 0).unwrap()
}

#[tokio::test]
async fn frame_source_decodes_snapshot() {
    let png = test_frame().encode_png().unwrap();
    let app = Router::new().route(
        "/snapshot.png",
        get(move || {
            let png = png.clone();
            async move { ([(header::CONTENT_TYPE, "image/png")], png) }
        }),
    );
    let base = serve(app).await;

    let source = HttpFrameSource::new(client(), format!("{base}/snapshot.png"));
    let first = source.grab().await.unwrap();
    let second = source.grab().await.unwrap();

    assert_eq!((first.width, first.height), (8, 6));
    assert_eq!(first.data.len(), 8 * 6 * 3);
    assert_eq!(second.sequence, first.sequence + 1);
}

#[tokio::test]
async fn frame_source_maps_http_error_to_unavailable() {
    let app = Router::new().route(
        "/snapshot.png",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let base = serve(app).await;

    let source = HttpFrameSource::new(client(), format!("{base}/snapshot.png"));
    let err = source.grab().await.unwrap_err();
    assert!(matches!(err, DetectionError::Unavailable(_)), "{err}");
}

#[tokio::test]
async fn frame_source_rejects_undecodable_body() {
    let app = Router::new().route("/snapshot.png", get(|| async { "not an image" }));
    let base = serve(app).await;

    let source = HttpFrameSource::new(client(), format!("{base}/snapshot.png"));
    let err = source.grab().await.unwrap_err();
    assert!(matches!(err, DetectionError::Failed(_)), "{err}");
}

#[tokio::test]
async fn detect_posts_png_and_parses_faces() {
    let seen = Arc::new(Mutex::new(Vec::<u8>::new()));
    let app = Router::new()
        .route(
            "/detect",
            post(
                |State(seen): State<Arc<Mutex<Vec<u8>>>>, body: Bytes| async move {
                    *seen.lock().unwrap() = body.to_vec();
                    Json(json!({
                        "faces": [{
                            "box": {"x": 12.0, "y": 20.0, "width": 64.0, "height": 64.0},
                            "age": 31.4,
                            "gender": "female",
                            "expressions": {"happy": 0.8, "neutral": 0.2}
                        }]
                    }))
                },
            ),
        )
        .with_state(seen.clone());
    let base = serve(app).await;

    let detector = HttpDetector::new(client(), base);
    let faces = detector.detect_all(&test_frame()).await.unwrap();

    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].bbox.x, 12.0);
    assert_eq!(faces[0].gender.as_deref(), Some("female"));
    assert_eq!(faces[0].mood(), Some("happy"));
    assert!(faces[0].descriptor.is_none());
    assert!(seen.lock().unwrap().starts_with(PNG_MAGIC));
}

#[tokio::test]
async fn describe_returns_face_with_descriptor() {
    let app = Router::new().route(
        "/describe",
        post(|| async {
            Json(json!({
                "face": {
                    "box": {"x": 0.0, "y": 0.0, "width": 10.0, "height": 10.0},
                    "descriptor": [0.1, 0.2, 0.3]
                }
            }))
        }),
    );
    let base = serve(app).await;

    let detector = HttpDetector::new(client(), base);
    let face = detector.detect_one(&test_frame()).await.unwrap().unwrap();
    assert_eq!(face.descriptor.unwrap().values(), &[0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn describe_without_face_is_none() {
    let app = Router::new().route("/describe", post(|| async { Json(json!({"face": null})) }));
    let base = serve(app).await;

    let detector = HttpDetector::new(client(), base);
    assert!(detector.detect_one(&test_frame()).await.unwrap().is_none());
}

#[tokio::test]
async fn describe_face_without_descriptor_is_an_error() {
    let app = Router::new().route(
        "/describe",
        post(|| async {
            Json(json!({"face": {"box": {"x": 0.0, "y": 0.0, "width": 1.0, "height": 1.0}}}))
        }),
    );
    let base = serve(app).await;

    let detector = HttpDetector::new(client(), base);
    let err = detector.detect_one(&test_frame()).await.unwrap_err();
    assert!(matches!(err, DetectionError::Failed(_)), "{err}");
}

#[derive(Debug, Clone, PartialEq)]
struct Field {
    name: String,
    file_name: Option<String>,
    data: Vec<u8>,
}

async fn capture_form(
    State(fields): State<Arc<Mutex<Vec<Field>>>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        fields.lock().unwrap().push(Field {
            name,
            file_name,
            data,
        });
    }
    StatusCode::OK
}

fn text(fields: &[Field], name: &str) -> Option<String> {
    fields
        .iter()
        .find(|f| f.name == name)
        .map(|f| String::from_utf8_lossy(&f.data).into_owned())
}

#[tokio::test]
async fn upload_sends_multipart_fields() {
    let fields = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/upload", post(capture_form))
        .with_state(fields.clone());
    let base = serve(app).await;

    let sink = HttpUploadSink::new(client(), &format!("{base}/"));
    let png = test_frame().encode_png().unwrap();
    sink.upload(UploadRecord {
        image: Some(png.clone()),
        age: Some(31),
        gender: Some("female".into()),
        mood: Some("happy".into()),
        recognition_state: RecognitionState::Recognized,
        recognized_name: "Alice".into(),
    })
    .await
    .unwrap();

    let fields = fields.lock().unwrap().clone();
    assert_eq!(text(&fields, "age").as_deref(), Some("31"));
    assert_eq!(text(&fields, "gender").as_deref(), Some("female"));
    assert_eq!(text(&fields, "mood").as_deref(), Some("happy"));
    assert_eq!(text(&fields, "recognizestate").as_deref(), Some("true"));
    assert_eq!(text(&fields, "recognizedname").as_deref(), Some("Alice"));

    let file = fields.iter().find(|f| f.name == "file").unwrap();
    assert_eq!(file.file_name.as_deref(), Some("image.png"));
    assert_eq!(file.data, png);
}

#[tokio::test]
async fn lost_upload_sends_empty_attributes_and_no_file() {
    let fields = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/upload", post(capture_form))
        .with_state(fields.clone());
    let base = serve(app).await;

    let sink = HttpUploadSink::new(client(), &base);
    sink.upload(UploadRecord {
        image: None,
        age: None,
        gender: None,
        mood: None,
        recognition_state: RecognitionState::Lost,
        recognized_name: String::new(),
    })
    .await
    .unwrap();

    let fields = fields.lock().unwrap().clone();
    assert_eq!(text(&fields, "age").as_deref(), Some(""));
    assert_eq!(text(&fields, "recognizestate").as_deref(), Some("lost"));
    assert!(fields.iter().all(|f| f.name != "file"));
}

#[tokio::test]
async fn upload_rejection_is_a_status_error() {
    let app = Router::new().route("/upload", post(|| async { StatusCode::BAD_REQUEST }));
    let base = serve(app).await;

    let sink = HttpUploadSink::new(client(), &base);
    let err = sink
        .upload(UploadRecord {
            image: None,
            age: None,
            gender: None,
            mood: None,
            recognition_state: RecognitionState::Unrecognized,
            recognized_name: String::new(),
        })
        .await
        .unwrap_err();
    assert!(
        matches!(err, NetworkError::Status { status: 400, .. }),
        "{err}"
    );
}

#[tokio::test]
async fn exchange_reads_and_clears_pending_name() {
    let pending = Arc::new(Mutex::new("Alice".to_string()));
    let app = Router::new()
        .route(
            "/getupdatename",
            get(|State(p): State<Arc<Mutex<String>>>| async move {
                Json(json!({"updatename": p.lock().unwrap().clone()}))
            }),
        )
        .route(
            "/clearupdatename",
            post(|State(p): State<Arc<Mutex<String>>>| async move {
                *p.lock().unwrap() = "NotYet".into();
                StatusCode::OK
            }),
        )
        .with_state(pending.clone());
    let base = serve(app).await;

    let exchange = HttpNameExchange::new(client(), base);
    assert_eq!(exchange.pending_name().await.unwrap(), "Alice");
    exchange.clear().await.unwrap();
    assert_eq!(exchange.pending_name().await.unwrap(), "NotYet");
}

#[tokio::test]
async fn exchange_malformed_body_is_a_decode_error() {
    let app = Router::new().route(
        "/getupdatename",
        get(|| async { Json(json!({"name": "Alice"})) }),
    );
    let base = serve(app).await;

    let exchange = HttpNameExchange::new(client(), base);
    let err = exchange.pending_name().await.unwrap_err();
    assert!(matches!(err, NetworkError::Decode(_)), "{err}");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let exchange = HttpNameExchange::new(client(), format!("http://{addr}"));
    let err = exchange.pending_name().await.unwrap_err();
    assert!(matches!(err, NetworkError::Transport(_)), "{err}");
}
