//! End-to-end: files on disk → session → encode pass → zip, on the real codec.

use batch_resize::archive::ZipPackageWriter;
use batch_resize::imaging::{Dimensions, OutputFormat, ResizePolicy, RustBackend};
use batch_resize::ingest::load_sources;
use batch_resize::registry::{ItemStatus, Turn};
use batch_resize::session::Session;
use image::{ImageReader, RgbImage};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;
use tempfile::TempDir;

fn write_image(dir: &Path, name: &str, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    });
    img.save(dir.join(name)).unwrap();
}

/// Entry name → decoded dimensions, directories excluded.
fn zip_contents(bytes: Vec<u8>) -> BTreeMap<String, (u32, u32)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut contents = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        if file.is_dir() {
            continue;
        }
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        let dims = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .unwrap()
            .into_dimensions()
            .unwrap();
        contents.insert(file.name().to_string(), dims);
    }
    contents
}

fn setup() -> (TempDir, Session) {
    let tmp = TempDir::new().unwrap();
    write_image(tmp.path(), "landscape.jpg", 1600, 1200);
    write_image(tmp.path(), "landscape.png", 400, 300);
    write_image(tmp.path(), "portrait.png", 600, 800);
    std::fs::write(tmp.path().join("broken.jpg"), b"definitely not a jpeg").unwrap();

    let backend = RustBackend::new();
    let report = load_sources(&backend, &[tmp.path().to_path_buf()]);
    assert_eq!(report.accepted.len(), 3);
    assert_eq!(report.rejected.len(), 1);

    let session = Session::with_policy(ResizePolicy {
        target_width: 800,
        ..ResizePolicy::default()
    });
    for source in report.accepted {
        session.ingest(source);
    }
    (tmp, session)
}

#[test]
fn resize_rotate_and_package() {
    let (_tmp, session) = setup();
    let backend = RustBackend::new();
    let ids: Vec<_> = session.snapshot().iter().map(|s| s.id).collect();

    session.rotate_item(ids[0], Turn::Clockwise).unwrap();
    let summary = session.process_all(&backend, None).unwrap();

    assert_eq!(summary.completed, 3);
    assert_eq!(summary.failed, 0);

    let snapshot = session.snapshot();
    assert!(snapshot.iter().all(|s| s.status == ItemStatus::Completed));
    // Logical sizes stay unrotated
    assert_eq!(snapshot[0].target_size, Dimensions::new(800, 600));
    assert_eq!(snapshot[1].target_size, Dimensions::new(800, 600));
    assert_eq!(snapshot[2].target_size, Dimensions::new(800, 1067));

    let bytes = session.build_archive("My Photos", &ZipPackageWriter).unwrap();
    let contents = zip_contents(bytes);

    let expected: BTreeMap<String, (u32, u32)> = [
        (format!("My Photos/landscape-{}.jpeg", ids[0]), (600, 800)),
        (format!("My Photos/landscape-{}.jpeg", ids[1]), (800, 600)),
        ("My Photos/portrait.jpeg".to_string(), (800, 1067)),
    ]
    .into_iter()
    .collect();
    assert_eq!(contents, expected);
}

#[test]
fn format_change_reencodes_with_new_extension() {
    let (_tmp, session) = setup();
    let backend = RustBackend::new();
    session.process_all(&backend, None).unwrap();

    let invalidated = session.set_output_format(OutputFormat::Png);
    assert_eq!(invalidated, 3);
    assert_eq!(session.completed_count(), 0);

    let summary = session.process_all(&backend, None).unwrap();
    assert_eq!(summary.completed, 3);

    let contents = zip_contents(session.build_archive("out", &ZipPackageWriter).unwrap());
    assert_eq!(contents.len(), 3);
    assert!(contents.keys().all(|name| name.ends_with(".png")));
}

#[test]
fn free_ratio_stretches_to_box() {
    let (_tmp, session) = setup();
    session.set_policy(ResizePolicy {
        target_width: 1920,
        target_height: 1080,
        maintain_aspect_ratio: false,
        ..session.policy()
    });

    session.process_all(&RustBackend::new(), None).unwrap();

    let contents = zip_contents(session.build_archive("hd", &ZipPackageWriter).unwrap());
    assert!(contents.values().all(|&dims| dims == (1920, 1080)));
}

#[test]
fn report_serializes_every_item() {
    let (_tmp, session) = setup();
    session.process_all(&RustBackend::new(), None).unwrap();

    let json = serde_json::to_value(session.snapshot()).unwrap();
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|item| item["status"] == "completed"));
    assert!(items.iter().all(|item| item["encoded_bytes"].as_u64().unwrap() > 0));

    let stats = session.stats();
    assert_eq!(stats.completed, 3);
    assert!(stats.encoded_bytes > 0);
}
