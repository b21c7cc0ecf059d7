use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Html;
use axum::routing::get;
use axum::{Extension, Router};
use partials::minijinja::Environment;
use partials::web::{register_axum_extensions, render_page, PageError};
use partials::{TemplateExtension, Templates};
use serde::Serialize;
use tower::ServiceExt;

#[derive(Serialize)]
struct Video {
    title: &'static str,
    author: &'static str,
    views: u64,
}

#[derive(Serialize)]
struct IndexPage {
    title: &'static str,
    items: Vec<Video>,
}

fn templates() -> Templates {
    Templates::builder()
        .directory(format!("{}/tests/templates", env!("CARGO_MANIFEST_DIR")))
        .max_workers(2)
        .build()
        .unwrap()
}

async fn index(Extension(templates): Extension<Templates>) -> Result<Html<String>, PageError> {
    let page = IndexPage {
        title: "Videos",
        items: vec![
            Video {
                title: "Python Basics",
                author: "Alice",
                views: 12500,
            },
            Video {
                title: "Tom & Jerry",
                author: "Bob",
                views: 8750,
            },
        ],
    };
    render_page(&templates, "home/index.html", &page).await
}

async fn broken(Extension(templates): Extension<Templates>) -> Result<Html<String>, PageError> {
    render_page(&templates, "home/missing.html", &()).await
}

fn app(templates: &Templates) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/broken", get(broken));
    register_axum_extensions(router, templates)
}

async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_handler_renders_page_with_partials() {
    let templates = templates();
    let (status, body) = get_body(app(&templates), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<title>Videos</title>"));
    assert!(body.contains("<span class=\"title\">Python Basics</span>"));
    assert!(body.contains("<span class=\"author\">Alice</span>"));
    assert!(body.contains("<span class=\"views\">8750 views</span>"));
    // Escaped once by the partial, not again by the page.
    assert!(body.contains("Tom &amp; Jerry"));
    assert!(!body.contains("&lt;li"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_template_is_server_error() {
    let templates = templates();
    let (status, body) = get_body(app(&templates), "/broken").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains("missing.html"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_templates() {
    let templates = templates();
    let app = app(&templates);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let app = app.clone();
        handles.push(tokio::spawn(async move { get_body(app, "/").await }));
    }

    let mut bodies = Vec::new();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        bodies.push(body);
    }
    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(templates.bridge().is_started());
}

#[tokio::test]
async fn test_shutdown_keeps_serving() {
    let templates = templates();
    let app = app(&templates);

    partials::shutdown_on(templates.clone(), async {}).await;
    assert!(templates.bridge().is_closed());

    let (status, body) = get_body(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Python Basics"));
}

struct SiteTitle;

impl TemplateExtension for SiteTitle {
    fn name(&self) -> &str {
        "site-title"
    }

    fn register(&self, env: &mut Environment<'_>) {
        env.add_global("site", "Video Hub");
    }
}

async fn untitled(Extension(templates): Extension<Templates>) -> Result<Html<String>, PageError> {
    render_page(
        &templates,
        "home/index.html",
        &partials::minijinja::context! { items => Vec::<Video>::new() },
    )
    .await
}

#[tokio::test]
async fn test_layout_uses_builtin_filters_and_extensions() {
    let templates = Templates::builder()
        .directory(format!("{}/tests/templates", env!("CARGO_MANIFEST_DIR")))
        .template("about.html", "<p>{{ site | upper }}</p>")
        .extension(SiteTitle)
        .build()
        .unwrap();
    assert_eq!(
        templates.render("about.html", ()).unwrap(),
        "<p>VIDEO HUB</p>"
    );

    let app = register_axum_extensions(Router::new().route("/", get(untitled)), &templates);
    let (status, body) = get_body(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<title>Partials demo</title>"));
}
