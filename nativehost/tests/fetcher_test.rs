mod common;

use std::fs;
use std::io::{Cursor, Read, Write};
use std::net::TcpListener;
use std::thread;

use common::{config_in, frame, responses, Fakes};
use gyazodumper_nativehost::fetcher::{FetchError, FETCH_TIMEOUT};
use gyazodumper_nativehost::{
    Collaborators, FramedTransport, HttpImageFetcher, ImageFetcher, Session,
};
use tempfile::TempDir;
use tiny_http::{Response, Server};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-an-image";

/// Serves `requests` requests: `/missing*` gets a 404, everything else the PNG.
fn serve(requests: usize) -> String {
    let server = Server::http("127.0.0.1:0").expect("bind test server");
    let addr = server
        .server_addr()
        .to_ip()
        .expect("test server should listen on TCP");
    thread::spawn(move || {
        for _ in 0..requests {
            let Ok(request) = server.recv() else { return };
            let response = if request.url().starts_with("/missing") {
                Response::from_data(b"gone".to_vec()).with_status_code(404)
            } else {
                Response::from_data(PNG_BYTES.to_vec()).with_status_code(200)
            };
            let _ = request.respond(response);
        }
    });
    format!("http://{addr}")
}

/// Promises `claimed` body bytes, sends `sent`, then hangs up.
fn serve_cut_short(claimed: usize, sent: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else { return };
        let mut request = [0u8; 1024];
        let _ = stream.read(&mut request);
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {claimed}\r\n\r\n"
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(sent);
        let _ = stream.flush();
    });
    format!("http://{addr}")
}

// Talks to the local server directly, whatever proxy the environment sets.
fn local_fetcher() -> HttpImageFetcher {
    let client = reqwest::blocking::Client::builder()
        .no_proxy()
        .timeout(FETCH_TIMEOUT)
        .build()
        .unwrap();
    HttpImageFetcher::with_client(client)
}

#[test]
fn test_download_writes_file_named_by_pattern() {
    let base = serve(1);
    let dir = TempDir::new().unwrap();
    let save_dir = dir.path().join("nested").join("GyazoDumps");
    let config = config_in(&save_dir);

    let fetcher = local_fetcher();
    let path = fetcher
        .download(&format!("{base}/0a1b2c.jpg"), "0a1b2c", &config)
        .unwrap();

    assert_eq!(path.parent().unwrap(), save_dir.as_path());
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("Gyazo_"), "{name}");
    assert!(name.ends_with("_0a1b2c.jpg"), "{name}");
    assert_eq!(fs::read(&path).unwrap(), PNG_BYTES);
}

#[test]
fn test_download_uses_png_when_url_has_no_extension() {
    let base = serve(1);
    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path());
    config.file_name_pattern = "{hash}{ext}".to_string();

    let path = local_fetcher()
        .download(&format!("{base}/raw/abc"), "abc", &config)
        .unwrap();

    assert_eq!(path, dir.path().join("abc.png"));
}

#[test]
fn test_http_error_status_fails_without_writing() {
    let base = serve(1);
    let dir = TempDir::new().unwrap();
    let save_dir = dir.path().join("out");
    let config = config_in(&save_dir);

    let result = local_fetcher()
        .download(&format!("{base}/missing.png"), "x", &config);

    match result {
        Err(FetchError::Status(status)) => assert_eq!(status.as_u16(), 404),
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(!save_dir.exists());
}

#[test]
fn test_interrupted_body_leaves_no_file_behind() {
    let base = serve_cut_short(4096, PNG_BYTES);
    let dir = TempDir::new().unwrap();
    let save_dir = dir.path().join("out");
    let config = config_in(&save_dir);

    let result = local_fetcher().download(&format!("{base}/cut.png"), "cut", &config);

    assert!(
        matches!(result, Err(FetchError::Http(_)) | Err(FetchError::Io(_))),
        "expected a body error, got {result:?}"
    );
    let left: Vec<_> = fs::read_dir(&save_dir)
        .map(|entries| entries.map(|e| e.unwrap().path()).collect())
        .unwrap_or_default();
    assert!(left.is_empty(), "{left:?}");
}

#[test]
fn test_invalid_url_is_rejected_before_any_request() {
    let dir = TempDir::new().unwrap();
    let result = local_fetcher()
        .download("not a url", "x", &config_in(dir.path()));
    assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
}

#[test]
fn test_saveimage_end_to_end() {
    let base = serve(2);
    let dir = TempDir::new().unwrap();
    let fakes = Fakes::new(config_in(dir.path()));
    let collaborators = Collaborators {
        fetcher: Box::new(local_fetcher()),
        ..fakes.collaborators()
    };

    let mut input = frame(&format!(
        r#"{{"action":"saveImage","imageUrl":"{base}/shot.png","gyazoId":"shot"}}"#
    ));
    input.extend(frame(&format!(
        r#"{{"action":"saveImage","imageUrl":"{base}/missing.png","gyazoId":"gone"}}"#
    )));

    let mut output = Vec::new();
    {
        let transport = FramedTransport::new(Cursor::new(input), &mut output);
        Session::new(transport, collaborators).run();
    }
    let out = responses(&output);

    assert_eq!(out.len(), 2);
    assert!(out[0].success);
    let saved = out[0].file_path.clone().unwrap();
    assert!(saved.ends_with("_shot.png"), "{saved}");
    assert_eq!(fs::read(&saved).unwrap(), PNG_BYTES);

    assert!(!out[1].success);
    assert!(out[1].error.as_deref().unwrap().contains("404"));
}
