use std::error::Error;
use std::fs;

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use tempfile::tempdir;

fn cli() -> Result<Command, Box<dyn Error>> {
    let mut command = Command::cargo_bin("printstation-cli")?;
    command
        .env_remove("PRINTSTATION_LOCALE")
        .env_remove("PRINTSTATION_LOCALE_DIR")
        .env_remove("PRINTSTATION_PDFIUM_DIR");
    Ok(command)
}

#[test]
fn unsupported_files_are_skipped_without_touching_the_spooler() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "not printable")?;

    cli()?
        .args(["print", notes.to_str().unwrap(), "--printer", "Office"])
        .assert()
        .success()
        .stdout(predicate::str::contains("skipped"))
        .stdout(predicate::str::contains("0 files printed"));
    Ok(())
}

#[test]
fn batch_summary_is_localized() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let notes = dir.path().join("notes.docx");
    fs::write(&notes, "")?;

    cli()?
        .args([
            "--lang",
            "ru-RU",
            "print",
            notes.to_str().unwrap(),
            "--printer",
            "Office",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Напечатано 0 файлов"));
    Ok(())
}

#[test]
fn zero_copies_are_rejected() -> Result<(), Box<dyn Error>> {
    cli()?
        .args(["print", "a.pdf", "--printer", "Office", "--copies", "0"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn unknown_paper_is_rejected() -> Result<(), Box<dyn Error>> {
    cli()?
        .args(["print", "a.pdf", "--printer", "Office", "--paper", "B5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown paper size 'B5'"));
    Ok(())
}

#[test]
fn preview_writes_thumbnail_png() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("wide.png");
    RgbImage::from_pixel(1000, 200, Rgb([0, 128, 255])).save(&input)?;
    let output = dir.path().join("preview.png");

    cli()?
        .args([
            "preview",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("500x100"));

    let written = image::open(&output)?;
    assert_eq!((written.width(), written.height()), (500, 100));
    Ok(())
}

#[test]
fn preview_of_missing_file_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    cli()?
        .args([
            "preview",
            dir.path().join("absent.pdf").to_str().unwrap(),
            "--output",
            dir.path().join("out.png").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}

#[test]
fn locales_lists_builtin_languages() -> Result<(), Box<dyn Error>> {
    cli()?
        .args(["--lang", "ru", "locales"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  en-US\tEnglish"))
        .stdout(predicate::str::contains("* ru-RU\tРусский"));
    Ok(())
}

#[test]
fn locale_packs_are_loaded_from_directory() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join("de-DE.json"),
        r#"{ "locale": "de-DE", "display_name": "Deutsch", "strings": {} }"#,
    )?;

    cli()?
        .args(["--locale-dir", dir.path().to_str().unwrap(), "locales"])
        .assert()
        .success()
        .stdout(predicate::str::contains("de-DE\tDeutsch"))
        .stdout(predicate::str::contains("* en-US"));
    Ok(())
}
