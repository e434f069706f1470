use std::{io::Cursor, path::PathBuf, process::Command};

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_relatorio")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "relatorio.exe"
            } else {
                "relatorio"
            });
            p
        })
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(exe())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

#[test]
fn cli_init_edit_and_generate() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("relatorio.json");
    let config_arg = config.to_string_lossy().to_string();
    let config_arg = config_arg.as_str();

    let png = dir.path().join("bg.png");
    let img = image::RgbImage::from_pixel(40, 60, image::Rgb([90, 30, 120]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(&png, &buf).unwrap();
    let png_arg = png.to_string_lossy().to_string();
    let png_arg = png_arg.as_str();

    let intro = dir.path().join("intro.txt");
    std::fs::write(&intro, "Olá [NOME_CLIENTE].").unwrap();
    let intro_arg = intro.to_string_lossy().to_string();
    let intro_arg = intro_arg.as_str();

    for args in [
        vec!["--config", config_arg, "init"],
        vec!["--config", config_arg, "set-intro", "--file", intro_arg],
        vec!["--config", config_arg, "set-item", "--id", "2", "--title", "Harmonia"],
        vec!["--config", config_arg, "upload-image", "--id", "2", "--file", png_arg],
        vec!["--config", config_arg, "set-cover", "--image", png_arg],
    ] {
        let out = run(&args);
        assert!(
            out.status.success(),
            "{args:?} failed: {}",
            String::from_utf8_lossy(&out.stderr)
        );
    }

    let saved: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&config).unwrap()).unwrap();
    assert_eq!(saved["introductionText"], "Olá [NOME_CLIENTE].");
    assert_eq!(saved["frequencies"][1]["title"], "Harmonia");
    assert_eq!(saved["coverSettings"]["backgroundType"], "custom");

    let session = dir.path().join("session.json");
    std::fs::write(
        &session,
        r#"{
            "therapistName": "Joana",
            "clientName": "Maria  Clara",
            "sessionDate": "2024-05-01",
            "selectedFrequencies": [2, 1]
        }"#,
    )
    .unwrap();
    let out_dir = dir.path().join("out");

    let out = run(&[
        "generate",
        "--config",
        config_arg,
        "--session",
        &session.to_string_lossy(),
        "--out-dir",
        &out_dir.to_string_lossy(),
    ]);
    assert!(
        out.status.success(),
        "generate failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let pdf = out_dir.join("relatorio_Maria_Clara_2024-05-01.pdf");
    let bytes = std::fs::read(&pdf).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

fn generate_with(dir: &std::path::Path, session_json: &str) -> std::process::Output {
    let session = dir.join("session.json");
    std::fs::write(&session, session_json).unwrap();
    run(&[
        "--config",
        &dir.join("c.json").to_string_lossy(),
        "generate",
        "--session",
        &session.to_string_lossy(),
        "--out-dir",
        &dir.to_string_lossy(),
    ])
}

#[test]
fn cli_generate_asks_for_a_selection() {
    let dir = tempfile::tempdir().unwrap();
    let out = generate_with(
        dir.path(),
        r#"{"therapistName":"Joana","clientName":"Ana","sessionDate":"2024-05-01","selectedFrequencies":[]}"#,
    );
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains(relatorio::locale::NO_ITEMS_NOTICE));
    assert!(!stderr.contains("Erro ao gerar o relatório"));
}

#[test]
fn cli_generate_asks_for_missing_fields() {
    let dir = tempfile::tempdir().unwrap();
    let out = generate_with(
        dir.path(),
        r#"{"therapistName":"Joana","clientName":"Ana","sessionDate":"","selectedFrequencies":[1]}"#,
    );
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains(relatorio::locale::MISSING_FIELDS_NOTICE));
    assert!(!stderr.contains("Erro ao gerar o relatório"));
    let pdfs = std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "pdf"))
        .count();
    assert_eq!(pdfs, 0);
}

#[test]
fn cli_generate_reports_generic_message_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("c.json"), "{ not json").unwrap();
    let out = generate_with(
        dir.path(),
        r#"{"therapistName":"Joana","clientName":"Ana","sessionDate":"2024-05-01","selectedFrequencies":[1]}"#,
    );
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Erro ao gerar o relatório. Tente novamente."));
}

#[test]
fn cli_rejects_unknown_cover_preset() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&[
        "--config",
        &dir.path().join("c.json").to_string_lossy(),
        "set-cover",
        "--preset",
        "neon",
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown cover preset"));
}
