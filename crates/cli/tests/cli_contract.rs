use assert_cmd::Command;
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use predicates::prelude::*;
use serde_json::Value;
use std::io::Cursor;
use std::path::{Path, PathBuf};

fn cli() -> Command {
    Command::cargo_bin("pdf-annotator").expect("binary should be built")
}

/// Writes a PDF with one page per entry into `dir`.
fn write_pdf(dir: &Path, name: &str, page_sizes: &[(f32, f32)]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for &(width, height) in page_sizes {
        let content_id = doc.add_object(Stream::new(Dictionary::default(), b"q Q".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(width),
                Object::Real(height),
            ],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_sizes.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture should serialize");
    std::fs::write(&path, bytes).expect("fixture should be written");
    path
}

fn write_png(dir: &Path, name: &str) -> PathBuf {
    let img = image::RgbImage::from_pixel(8, 4, image::Rgb([30, 30, 200]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("png should encode");
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("fixture should be written");
    path
}

fn exported_page_heights(path: &Path) -> Vec<f32> {
    let doc = Document::load(path).expect("export should be a readable PDF");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let media_box = doc
                .get_dictionary(page_id)
                .unwrap()
                .get(b"MediaBox")
                .unwrap()
                .as_array()
                .unwrap();
            media_box[3].as_float().unwrap()
        })
        .collect()
}

#[test]
fn info_emits_page_count_and_size() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "doc.pdf", &[(612.0, 792.0), (612.0, 500.0)]);

    let output = cli().arg("info").arg(&pdf).assert().success().get_output().stdout.clone();

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(value["page_count"], 2);
    assert_eq!(value["first_page_size_pt"]["width"], 612.0);
    assert_eq!(value["first_page_size_pt"]["height"], 792.0);
}

#[test]
fn render_thumb_writes_png_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "doc.pdf", &[(612.0, 792.0)]);
    let output_path = temp.path().join("thumb.png");

    cli()
        .arg("render-thumb")
        .arg(&pdf)
        .arg("--width")
        .arg("64")
        .arg("--height")
        .arg("64")
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success();

    let image = image::open(&output_path).expect("thumbnail should be a readable image");
    assert!(image.width() > 0);
    assert!(image.height() > 0);
}

#[test]
fn export_defaults_to_edited_prefix_next_to_input() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "doc.pdf", &[(612.0, 792.0), (612.0, 500.0)]);

    cli()
        .arg("export")
        .arg(&pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("edited-doc.pdf"));

    let exported = temp.path().join("edited-doc.pdf");
    assert_eq!(exported_page_heights(&exported), vec![792.0, 500.0]);
}

#[test]
fn export_replays_script_and_order() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "doc.pdf", &[(612.0, 792.0), (612.0, 500.0)]);
    let png = write_png(temp.path(), "stamp.png");

    let script = temp.path().join("edits.json");
    std::fs::write(
        &script,
        serde_json::json!([
            { "op": "add-text", "page": 1, "x": 40.0, "y": 50.0, "text": "Hello" },
            { "op": "add-image", "page": 2, "file": png },
        ])
        .to_string(),
    )
    .expect("script should be written");

    let output_path = temp.path().join("out.pdf");
    cli()
        .arg("export")
        .arg(&pdf)
        .arg("--script")
        .arg(&script)
        .arg("--order")
        .arg("2,1")
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success();

    assert_eq!(exported_page_heights(&output_path), vec![500.0, 792.0]);

    let doc = Document::load(&output_path).expect("export should load");
    let pages: Vec<_> = doc.get_pages().into_values().collect();
    let second_page = String::from_utf8_lossy(&doc.get_page_content(pages[1]).unwrap()).into_owned();
    assert!(second_page.contains("(Hello) Tj"), "text edit missing: {second_page}");
    let first_page = String::from_utf8_lossy(&doc.get_page_content(pages[0]).unwrap()).into_owned();
    assert!(first_page.contains("/Im1 Do"), "image edit missing: {first_page}");
}

#[test]
fn export_rejects_a_script_step_for_a_missing_edit() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "doc.pdf", &[(612.0, 792.0)]);

    let script = temp.path().join("edits.json");
    std::fs::write(
        &script,
        serde_json::json!([{ "op": "remove", "page": 1, "edit": 0 }]).to_string(),
    )
    .expect("script should be written");

    cli()
        .arg("export")
        .arg(&pdf)
        .arg("--script")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no edit at position"));
}

#[test]
fn commands_fail_for_missing_file() {
    cli()
        .arg("info")
        .arg("does-not-exist.pdf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn commands_fail_for_non_pdf_payload() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let fake = temp.path().join("fake.pdf");
    std::fs::write(&fake, b"plain text, no header").expect("fixture should be written");

    cli()
        .arg("export")
        .arg(&fake)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a PDF"));
}

#[test]
fn version_prints_crate_version() {
    cli()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
