use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::json;
use stable_diffusion_cat::{
    config::{API_KEY, STEPS_FOR_GENERATION},
    hook::{FAILURE_REPLY, MISSING_API_KEY_NOTICE},
    ChatSink, GeneratorConfig, MessageKind, StableDiffusionCat, StaticSettings,
};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{body_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<(String, MessageKind)>>,
}

impl RecordingSink {
    fn messages(&self) -> Vec<(String, MessageKind)> {
        self.messages.lock().unwrap().clone()
    }
}

impl ChatSink for RecordingSink {
    fn send(&self, content: &str, kind: MessageKind) {
        self.messages.lock().unwrap().push((content.to_string(), kind));
    }
}

fn png_base64() -> String {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 200, 30])))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    STANDARD.encode(bytes)
}

fn plugin(server: &MockServer, assets: &TempDir, settings: StaticSettings) -> StableDiffusionCat {
    let config = GeneratorConfig::new()
        .with_endpoint(format!("{}/sdapi/v1/txt2img", server.uri()))
        .with_assets_root(assets.path());
    StableDiffusionCat::new(Arc::new(settings), config).unwrap()
}

#[tokio::test]
async fn test_plain_messages_pass_through() {
    let server = MockServer::start().await;
    let assets = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let settings = StaticSettings::new().with(API_KEY, "sk-test");
    let cat = plugin(&server, &assets, settings);
    let sink = RecordingSink::default();

    assert_eq!(cat.fast_reply("how are you?", &sink).await, None);
    assert_eq!(cat.fast_reply("*", &sink).await, None);
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn test_triggered_message_gets_image_reply() {
    let server = MockServer::start().await;
    let assets = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(body_json(json!({"prompt": "a sleepy cat", "steps": 25})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"images": [png_base64()]})))
        .expect(1)
        .mount(&server)
        .await;

    let settings = StaticSettings::new()
        .with(API_KEY, "sk-test")
        .with(STEPS_FOR_GENERATION, 25);
    let cat = plugin(&server, &assets, settings);
    let sink = RecordingSink::default();

    let reply = cat.fast_reply("a sleepy cat*", &sink).await.unwrap();
    assert!(reply.starts_with("<p><b>a sleepy cat</b></p><img src=\""));
    assert!(reply.contains("stable-diffusion-cat"));
    assert!(reply.ends_with(".jpg\">"));

    assert_eq!(
        sink.messages(),
        vec![(
            "Generating image based on the prompt a sleepy cat ...".to_string(),
            MessageKind::ChatToken
        )]
    );
}

#[tokio::test]
async fn test_missing_key_notifies_chat() {
    let server = MockServer::start().await;
    let assets = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cat = plugin(&server, &assets, StaticSettings::new());
    let sink = RecordingSink::default();

    let reply = cat.fast_reply("a cat*", &sink).await;
    assert_eq!(reply.as_deref(), Some(FAILURE_REPLY));

    let messages = sink.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1], (MISSING_API_KEY_NOTICE.to_string(), MessageKind::Chat));
}

#[tokio::test]
async fn test_remote_failure_details_stay_out_of_chat() {
    let server = MockServer::start().await;
    let assets = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal stack trace"))
        .expect(1)
        .mount(&server)
        .await;

    let settings = StaticSettings::new().with(API_KEY, "sk-test");
    let cat = plugin(&server, &assets, settings);
    let sink = RecordingSink::default();

    let reply = cat.fast_reply("a cat*", &sink).await.unwrap();
    assert_eq!(reply, FAILURE_REPLY);

    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert!(!messages[0].0.contains("stack trace"));
}

#[tokio::test]
async fn test_missing_key_reported_before_bad_steps() {
    let server = MockServer::start().await;
    let assets = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let settings = StaticSettings::new().with(STEPS_FOR_GENERATION, "many");
    let cat = plugin(&server, &assets, settings);
    let sink = RecordingSink::default();

    let reply = cat.fast_reply("a cat*", &sink).await;
    assert_eq!(reply.as_deref(), Some(FAILURE_REPLY));
    assert!(sink
        .messages()
        .contains(&(MISSING_API_KEY_NOTICE.to_string(), MessageKind::Chat)));
}

#[tokio::test]
async fn test_integral_float_steps_are_sent() {
    let server = MockServer::start().await;
    let assets = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(body_json(json!({"prompt": "a cat", "steps": 30})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"images": [png_base64()]})))
        .expect(1)
        .mount(&server)
        .await;

    let settings = StaticSettings::new()
        .with(API_KEY, "sk-test")
        .with(STEPS_FOR_GENERATION, 30.0);
    let cat = plugin(&server, &assets, settings);

    let reply = cat.fast_reply("a cat*", &RecordingSink::default()).await.unwrap();
    assert!(reply.ends_with(".jpg\">"));
}
