use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine as _;
use docrag::github::GitHubExtractor;
use docrag::youtube::YouTubeExtractor;
use url::Url;

const README_BODY: &str = "# ROS 2 Docs\nHello.";

fn spawn_github_stub() -> (String, mpsc::Sender<()>, thread::JoinHandle<()>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start github stub");
    let addr = server.server_addr();
    let base_url = format!("http://{addr}");
    let api_root = base_url.clone();
    let file_url = format!("{base_url}/file/README.md");

    // Line-wrapped the way the contents API returns blobs.
    let encoded = base64::engine::general_purpose::STANDARD.encode(README_BODY);
    let wrapped = format!("{}\n{}\n", &encoded[..8], &encoded[8..]);

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let authorized = request
                .headers()
                .iter()
                .find(|header| header.field.equiv("Authorization"))
                .map(|header| header.value.as_str() == "Bearer s3cret")
                .unwrap_or(false);
            if !authorized {
                let _ = request.respond(
                    tiny_http::Response::from_string("missing token").with_status_code(401),
                );
                continue;
            }

            let url = request.url().to_string();
            let body = if url.starts_with("/repos/ros2/docs/contents/") && url.contains("ref=humble")
            {
                serde_json::json!([
                    {
                        "name": "README.md",
                        "path": "README.md",
                        "type": "file",
                        "size": README_BODY.len(),
                        "html_url": "https://github.com/ros2/docs/blob/humble/README.md",
                        "url": file_url,
                    },
                    {
                        "name": "setup.py",
                        "path": "setup.py",
                        "type": "file",
                        "size": 10,
                        "html_url": "https://github.com/ros2/docs/blob/humble/setup.py",
                        "url": format!("{api_root}/file/setup.py"),
                    },
                    {
                        "name": "docs",
                        "path": "docs",
                        "type": "dir",
                        "size": 0,
                        "html_url": "https://github.com/ros2/docs/tree/humble/docs",
                        "url": format!("{api_root}/repos/ros2/docs/contents/docs"),
                    },
                ])
                .to_string()
            } else if url.starts_with("/file/README.md") {
                serde_json::json!({
                    "content": wrapped,
                    "encoding": "base64",
                })
                .to_string()
            } else {
                let _ = request
                    .respond(tiny_http::Response::from_string("not found").with_status_code(404));
                continue;
            };

            let header =
                tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .expect("build header");
            let _ = request.respond(tiny_http::Response::from_string(body).with_header(header));
        }
    });

    (base_url, shutdown_tx, handle)
}

fn spawn_youtube_stub() -> (String, mpsc::Sender<()>, thread::JoinHandle<()>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start youtube stub");
    let addr = server.server_addr();
    let base_url = format!("http://{addr}");

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let url = request.url().to_string();
            if !url.starts_with("/yt/playlistItems")
                || !url.contains("playlistId=PL42")
                || !url.contains("key=k3y")
            {
                let _ = request
                    .respond(tiny_http::Response::from_string("not found").with_status_code(404));
                continue;
            }

            let body = if url.contains("pageToken=PAGE2") {
                serde_json::json!({
                    "items": [{
                        "snippet": {
                            "title": "Nav2 deep dive",
                            "description": "Costmaps and planners.",
                            "channelTitle": "Open Robotics",
                            "publishedAt": "2023-06-01T00:00:00Z",
                        },
                        "contentDetails": { "videoId": "bbb222" },
                    }],
                })
                .to_string()
            } else {
                serde_json::json!({
                    "items": [{
                        "snippet": {
                            "title": "ROS 2 intro",
                            "description": "Getting started.",
                            "channelTitle": "Open Robotics",
                            "publishedAt": "2023-05-01T00:00:00Z",
                        },
                        "contentDetails": { "videoId": "aaa111" },
                    }],
                    "nextPageToken": "PAGE2",
                })
                .to_string()
            };

            let header =
                tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .expect("build header");
            let _ = request.respond(tiny_http::Response::from_string(body).with_header(header));
        }
    });

    (base_url, shutdown_tx, handle)
}

#[tokio::test(flavor = "multi_thread")]
async fn github_extraction_filters_decodes_and_authenticates() {
    let (base_url, shutdown_tx, handle) = spawn_github_stub();

    let extractor = GitHubExtractor::new(Some("s3cret".to_owned()))
        .expect("extractor")
        .with_api_base(Url::parse(&base_url).expect("stub url"));

    let documents = extractor
        .extract_repo_content("ros2/docs", "humble")
        .await
        .expect("extract repo");

    shutdown_tx.send(()).ok();
    handle.join().expect("join stub");

    // setup.py and the directory entry are filtered; only README.md lands.
    assert_eq!(documents.len(), 1);
    let readme = &documents[0];
    assert_eq!(readme.doc_type, "github_documentation");
    assert_eq!(readme.subdomain, "docs");
    assert_eq!(readme.source.version, "humble");
    assert_eq!(readme.content.title, "README.md");
    assert_eq!(readme.content.sections[0].body, README_BODY);
}

#[tokio::test(flavor = "multi_thread")]
async fn github_extraction_without_token_is_rejected_by_stub() {
    let (base_url, shutdown_tx, handle) = spawn_github_stub();

    let extractor = GitHubExtractor::new(None)
        .expect("extractor")
        .with_api_base(Url::parse(&base_url).expect("stub url"));

    let result = extractor.extract_repo_content("ros2/docs", "humble").await;

    shutdown_tx.send(()).ok();
    handle.join().expect("join stub");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn youtube_extraction_follows_page_tokens() {
    let (base_url, shutdown_tx, handle) = spawn_youtube_stub();

    let extractor = YouTubeExtractor::new("k3y".to_owned())
        .expect("extractor")
        .with_api_base(Url::parse(&format!("{base_url}/yt/")).expect("stub url"));

    let videos = extractor
        .extract_playlist_videos("ros2", "PL42")
        .await
        .expect("extract playlist");

    shutdown_tx.send(()).ok();
    handle.join().expect("join stub");

    assert_eq!(videos.len(), 2);
    assert_eq!(videos[0].source.url, "https://www.youtube.com/watch?v=aaa111");
    assert_eq!(videos[1].source.url, "https://www.youtube.com/watch?v=bbb222");
    assert!(videos.iter().all(|v| v.doc_type == "youtube_content"));
    assert!(videos.iter().all(|v| v.source.version == "PL42"));
    assert_eq!(videos[1].content.sections[0].body, "Costmaps and planners.");
}
