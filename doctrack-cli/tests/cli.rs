use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `doctrack` running in `dir`, isolated from the caller's environment.
fn doctrack(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("doctrack").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("DOCTRACK_DATABASE_PATH")
        .env_remove("DOCTRACK_SCHEMA_DIR")
        .env_remove("DOCTRACK_LOG_LEVEL");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

const VALID_PASSPORT: &str = r#"{
    "full_name": "Ada Lovelace",
    "passport_number": "X1234567",
    "expiry_date": "2031-05-01",
    "gender": "female"
}"#;

#[test]
fn types_lists_builtin_document_types() {
    let dir = TempDir::new().unwrap();
    doctrack(dir.path())
        .arg("types")
        .assert()
        .success()
        .stdout(predicate::str::contains("passport"))
        .stdout(predicate::str::contains("vehicle_registration"))
        .stdout(predicate::str::contains("document type(s)"));
}

#[test]
fn types_filters_by_category() {
    let dir = TempDir::new().unwrap();
    doctrack(dir.path())
        .args(["types", "--category", "travel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("visa"))
        .stdout(predicate::str::contains("drivers_license").not());
}

#[test]
fn types_as_json() {
    let dir = TempDir::new().unwrap();
    let output = doctrack(dir.path())
        .args(["types", "--category", "financial", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let list: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let keys: Vec<_> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["type_key"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys.len(), 4);
    assert!(keys.contains(&"bank_card".to_string()));
}

#[test]
fn show_prints_fields_and_conditions() {
    let dir = TempDir::new().unwrap();
    doctrack(dir.path())
        .args(["show", "visa"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sponsor"))
        .stdout(predicate::str::contains("employer_name"))
        .stdout(predicate::str::contains("visa_type"));
}

#[test]
fn unknown_type_fails() {
    let dir = TempDir::new().unwrap();
    doctrack(dir.path())
        .args(["show", "spaceship_license"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown document type: spaceship_license"));
}

#[test]
fn form_hides_conditional_sections() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "tourist.json", r#"{"visa_type": "tourist"}"#);
    write(dir.path(), "work.json", r#"{"visa_type": "work"}"#);

    doctrack(dir.path())
        .args(["form", "visa", "--values", "tourist.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Visa"))
        .stdout(predicate::str::contains("## Sponsor").not());

    doctrack(dir.path())
        .args(["form", "visa", "--values", "work.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Sponsor"))
        .stdout(predicate::str::contains("Employer Name is required."));
}

#[test]
fn validate_reports_errors_with_exit_code() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "bad.json", r#"{"full_name": "Ada Lovelace", "passport_number": "A1"}"#);
    write(dir.path(), "good.json", VALID_PASSPORT);

    doctrack(dir.path())
        .args(["validate", "passport", "--values", "bad.json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Passport Number must be at least 6 characters."))
        .stdout(predicate::str::contains("Expiry Date is required."))
        .stdout(predicate::str::contains("2 field(s) failed validation"));

    doctrack(dir.path())
        .args(["validate", "passport", "--values", "good.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("passport: valid"));
}

#[test]
fn validate_accepts_yaml_values() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "values.yaml",
        "full_name: Ada Lovelace\npassport_number: X1234567\nexpiry_date: 2031-05-01\n",
    );
    doctrack(dir.path())
        .args(["validate", "passport", "--values", "values.yaml"])
        .assert()
        .success();
}

#[test]
fn save_load_delete_cycle() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "passport.json", VALID_PASSPORT);

    doctrack(dir.path())
        .args(["save", "doc-1", "passport", "--values", "passport.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved 4 field value(s) for doc-1"));
    assert!(dir.path().join("doctrack.db").exists());

    let output = doctrack(dir.path())
        .args(["load", "doc-1", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let values: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(values["passport_number"], "X1234567");
    assert_eq!(values["expiry_date"], "2031-05-01");

    doctrack(dir.path())
        .args(["load", "doc-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("expiry_date"))
        .stdout(predicate::str::contains("date"));

    doctrack(dir.path())
        .args(["delete", "doc-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 4 field value(s) for doc-1"));

    doctrack(dir.path())
        .args(["load", "doc-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No field values stored for doc-1"));
}

#[test]
fn invalid_save_writes_nothing() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "bad.json", r#"{"full_name": "Ada Lovelace"}"#);

    doctrack(dir.path())
        .args(["save", "doc-1", "passport", "--values", "bad.json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("nothing saved"));

    doctrack(dir.path())
        .args(["load", "doc-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No field values stored"));
}

#[test]
fn database_flag_and_config_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "passport.json", VALID_PASSPORT);
    write(dir.path(), "doctrack.toml", "database_path = \"from-config.db\"\n");

    doctrack(dir.path())
        .args(["save", "doc-1", "passport", "--values", "passport.json"])
        .assert()
        .success();
    assert!(dir.path().join("from-config.db").exists());

    doctrack(dir.path())
        .args(["--database", "from-flag.db", "save", "doc-1", "passport", "--values", "passport.json"])
        .assert()
        .success();
    assert!(dir.path().join("from-flag.db").exists());
    assert!(!dir.path().join("doctrack.db").exists());
}

#[test]
fn environment_selects_database() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "passport.json", VALID_PASSPORT);

    doctrack(dir.path())
        .env("DOCTRACK_DATABASE_PATH", "from-env.db")
        .args(["save", "doc-1", "passport", "--values", "passport.json"])
        .assert()
        .success();
    assert!(dir.path().join("from-env.db").exists());
}

#[test]
fn missing_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    doctrack(dir.path())
        .args(["--config", "nope.toml", "types"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn custom_schema_directory_adds_types() {
    let dir = TempDir::new().unwrap();
    let schema = dir.path().join("schema");
    fs::create_dir_all(schema.join("definitions")).unwrap();
    fs::create_dir_all(schema.join("templates")).unwrap();
    fs::write(
        schema.join("definitions").join("chip_number.yaml"),
        "field_key: chip_number\ntype: { kind: text }\nlabel: Chip Number\nvalidation_rules: { pattern: '^[0-9]{15}$' }\n",
    )
    .unwrap();
    fs::write(
        schema.join("templates").join("pet_chip.yaml"),
        "type_key: pet_chip\nname: Pet Microchip\ncategory: custom\nfields:\n  - { field_key: chip_number, section: Chip, display_order: 1, is_required: true }\n  - { field_key: owner_name, section: Owner, display_order: 1 }\n",
    )
    .unwrap();
    write(dir.path(), "chip.json", r#"{"chip_number": "12345"}"#);

    doctrack(dir.path())
        .args(["--schema-dir", "schema", "types", "--category", "custom"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pet_chip"));

    doctrack(dir.path())
        .args(["--schema-dir", "schema", "validate", "pet_chip", "--values", "chip.json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Chip Number has an invalid format."));
}
