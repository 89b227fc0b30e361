//! Validates backend contract fixtures against frozen JSON schemas, then
//! checks the typed clients read the same fixtures.

use birth_registry_auth::decode_claims;
use birth_registry_core::{Role, User};
use birth_registry_gateway::LoginResponse;
use birth_registry_records::{BirthRecord, Gender, NewBirthRecord, RecordStatus};
use jsonschema::JSONSchema;
use serde_json::{Value, json};

fn load_json(path: &str) -> Value {
    let raw = std::fs::read_to_string(path).expect("json file should be readable");
    serde_json::from_str(&raw).expect("json file should be valid")
}

fn contract(name: &str) -> JSONSchema {
    let schema = load_json(&format!(
        "{}/../../contracts/{name}.schema.json",
        env!("CARGO_MANIFEST_DIR")
    ));
    JSONSchema::compile(&schema).expect("schema should compile")
}

fn fixture(name: &str) -> Value {
    load_json(&format!(
        "{}/../../contracts/fixtures/{name}.valid.json",
        env!("CARGO_MANIFEST_DIR")
    ))
}

#[test]
fn login_response_fixture_matches_schema_and_decodes() {
    let fixture = fixture("login-response");
    assert!(
        contract("login-response").is_valid(&fixture),
        "login fixture should validate against schema"
    );

    let response: LoginResponse = serde_json::from_value(fixture).expect("login response");
    let user = response.user().expect("embedded user");
    assert_eq!(user.role, Role::User);

    let claims = decode_claims(&response.access_token).expect("token claims");
    assert_eq!(claims.subject, Some(user.id));
}

#[test]
fn login_response_without_token_is_rejected() {
    assert!(!contract("login-response").is_valid(&json!({ "token": "a.b.c" })));
}

#[test]
fn user_profile_fixture_matches_schema_and_normalizes_role() {
    let fixture = fixture("user-profile");
    assert!(contract("user-profile").is_valid(&fixture));

    let user = User::from_raw_role(
        fixture["id"].as_i64().expect("id"),
        fixture["username"].as_str().expect("username"),
        fixture["role"].as_str().expect("role"),
    )
    .expect("known role");
    assert_eq!(user.role, Role::Registrar);
}

#[test]
fn birth_record_fixture_matches_schema_and_decodes() {
    let fixture = fixture("birth-record");
    assert!(contract("birth-record").is_valid(&fixture));

    let record: BirthRecord = serde_json::from_value(fixture).expect("birth record");
    assert_eq!(record.status, RecordStatus::Verified);
    assert_eq!(record.blockchain_tx.as_deref(), Some("0x5be1"));
    assert!(record.is_owned_by(7));
}

#[test]
fn submission_body_matches_schema() {
    let application = NewBirthRecord {
        first_name: "Ada".to_string(),
        middle_name: None,
        last_name: "Uwase".to_string(),
        date_of_birth: "2024-02-03".to_string(),
        gender: Gender::Female,
        place_of_birth: "Kigali".to_string(),
        mother_full_name: "Marie Uwase".to_string(),
        father_full_name: "Jean Uwase".to_string(),
    };
    application.validate().expect("valid application");

    let body = serde_json::to_value(&application).expect("serializable");
    assert!(contract("birth-record-submission").is_valid(&body));
}

#[test]
fn submission_with_legacy_field_names_is_rejected() {
    let legacy = json!({
        "child_name": "Ada Uwase",
        "date_of_birth": "2024-02-03",
        "place_of_birth": "Kigali",
        "father_name": "Jean Uwase",
        "mother_name": "Marie Uwase"
    });
    assert!(!contract("birth-record-submission").is_valid(&legacy));
}
