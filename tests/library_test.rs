use bookshelf::library::{submit, BookRecord, BookSubmission, Library, UploadStatus};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::thread;

fn sample_record(name: &str, cover_url: &str) -> BookRecord {
    BookRecord {
        name: name.to_string(),
        author: "Frank Herbert".to_string(),
        cover_url: cover_url.to_string(),
        pdf_url: None,
        uploaded_at: chrono::Utc::now(),
    }
}

fn write_cover(dir: &std::path::Path) -> PathBuf {
    let cover = dir.join("cover.jpg");
    let mut file = File::create(&cover).unwrap();
    file.write_all(b"fake image bytes").unwrap();
    cover
}

// Canned relay: drains the request body, then answers with a fixed
// JSON response. One request per server.
fn spawn_fake_relay(status: u16, body: &'static str) -> (String, thread::JoinHandle<()>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let url = format!("http://{}", addr);
    let handle = thread::spawn(move || {
        if let Ok(mut request) = server.recv() {
            let mut drained = Vec::new();
            let _ = request.as_reader().read_to_end(&mut drained);
            let response = tiny_http::Response::from_string(body)
                .with_status_code(status)
                .with_header(
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .unwrap(),
                );
            let _ = request.respond(response);
        }
    });
    (url, handle)
}

#[test]
fn empty_library_renders_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let library = Library::load(dir.path().join("books.json"));

    assert!(library.is_empty());
    assert!(library.render().contains("No books in your collection yet"));
}

#[test]
fn render_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut library = Library::load(dir.path().join("books.json"));
    library.add(sample_record("Dune", "https://host/book_covers/dune.jpg"));
    library.add(sample_record("Dune Messiah", "https://host/book_covers/messiah.jpg"));

    let first = library.render();
    let second = library.render();
    assert_eq!(first, second);
    assert!(first.contains("Dune"));
    assert!(first.contains("https://host/book_covers/dune.jpg"));
}

#[test]
fn library_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books.json");

    let mut library = Library::load(&path);
    library.add(sample_record("Dune", "https://host/book_covers/dune.jpg"));
    library.save().unwrap();

    let reloaded = Library::load(&path);
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.books()[0].cover_url, "https://host/book_covers/dune.jpg");
    assert_eq!(reloaded.render(), library.render());
}

#[test]
fn corrupt_library_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books.json");
    fs::write(&path, "definitely not json").unwrap();

    let library = Library::load(&path);
    assert!(library.is_empty());

    // Saving repairs the store wholesale
    library.save().unwrap();
    let reloaded = Library::load(&path);
    assert!(reloaded.is_empty());
}

#[test]
fn clear_empties_collection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books.json");

    let mut library = Library::load(&path);
    library.add(sample_record("Dune", "https://host/book_covers/dune.jpg"));
    library.save().unwrap();

    library.clear();
    library.save().unwrap();

    let reloaded = Library::load(&path);
    assert!(reloaded.is_empty());
    assert!(reloaded.render().contains("No books in your collection yet"));
}

#[test]
fn empty_name_submission_is_rejected_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let cover = write_cover(dir.path());

    let submission = BookSubmission {
        name: "   ".to_string(),
        author: "Herbert".to_string(),
        use_first_page: false,
        cover,
        pdf: None,
    };

    // An unreachable server would fail with a transport error; the
    // validation message proves no request was attempted.
    let err = submit("http://127.0.0.1:9", &submission).unwrap_err();
    assert!(err.to_string().contains("book name"), "got: {}", err);
}

#[test]
fn missing_cover_submission_is_rejected_without_network() {
    let dir = tempfile::tempdir().unwrap();

    let submission = BookSubmission {
        name: "Dune".to_string(),
        author: "Herbert".to_string(),
        use_first_page: false,
        cover: dir.path().join("nope.jpg"),
        pdf: None,
    };

    let err = submit("http://127.0.0.1:9", &submission).unwrap_err();
    assert!(err.to_string().contains("cover image"), "got: {}", err);
}

#[test]
fn successful_upload_stores_returned_url_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let cover = write_cover(dir.path());
    let (server, handle) = spawn_fake_relay(
        200,
        r#"{"success":true,"message":"Files uploaded successfully","data":{"bookName":"Dune","authorName":"Herbert","coverUrl":"https://host/book_covers/book_123.jpg"}}"#,
    );

    let submission = BookSubmission {
        name: "Dune".to_string(),
        author: "Herbert".to_string(),
        use_first_page: false,
        cover,
        pdf: None,
    };

    let record = submit(&server, &submission).unwrap();
    handle.join().unwrap();

    assert_eq!(record.name, "Dune");
    assert_eq!(record.cover_url, "https://host/book_covers/book_123.jpg");
    assert_eq!(record.pdf_url, None);

    // The list gains exactly this record, URL untouched
    let path = dir.path().join("books.json");
    let mut library = Library::load(&path);
    library.add(record);
    library.save().unwrap();
    let reloaded = Library::load(&path);
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.books()[0].cover_url, "https://host/book_covers/book_123.jpg");
}

#[test]
fn failed_upload_leaves_library_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let cover = write_cover(dir.path());
    let path = dir.path().join("books.json");

    let mut library = Library::load(&path);
    library.add(sample_record("Dune", "https://host/book_covers/dune.jpg"));
    library.save().unwrap();

    let (server, handle) = spawn_fake_relay(
        500,
        r#"{"success":false,"message":"Upload failed","error":"media host down"}"#,
    );

    let submission = BookSubmission {
        name: "Dune Messiah".to_string(),
        author: "Herbert".to_string(),
        use_first_page: false,
        cover,
        pdf: None,
    };

    let err = submit(&server, &submission).unwrap_err();
    handle.join().unwrap();
    assert!(err.to_string().contains("Upload failed"), "got: {}", err);

    let reloaded = Library::load(&path);
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.books()[0].name, "Dune");
}

#[test]
fn upload_status_labels_drive_presentation() {
    assert_eq!(UploadStatus::Idle.label(), "Add Book");
    assert_eq!(UploadStatus::Uploading.label(), "Uploading...");
    assert_eq!(UploadStatus::Succeeded.label(), "Added Successfully!");
    assert_eq!(UploadStatus::Failed.label(), "Upload failed");
}
