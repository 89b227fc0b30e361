//! Token claims are decoded without signature verification. These tests pin
//! that boundary: the client trusts claims for navigation only, and the
//! backend remains the authority.

mod common;

use birth_registry_auth::{LoginOutcome, SessionState, UserSource, decode_claims};
use birth_registry_core::{Role, Route};
use birth_registry_gateway::Credentials;
use birth_registry_guard::GuardDecision;
use common::{IN_ONE_HOUR, NOW_MS};
use serde_json::json;

fn forged_admin_token() -> String {
    let token = common::token(json!({
        "sub": 9,
        "username": "mallory",
        "role": "admin",
        "exp": IN_ONE_HOUR,
    }));
    let (unsigned, _) = token.rsplit_once('.').expect("three segments");
    format!("{unsigned}.not-a-real-signature")
}

#[test]
fn advisory_claims_tests_signature_is_not_checked() {
    let claims = decode_claims(&forged_admin_token()).expect("decodes regardless of signature");
    let user = claims.embedded_user().expect("embedded user");
    assert_eq!(user.role, Role::Admin);
}

#[tokio::test]
async fn advisory_claims_tests_claims_fallback_is_revoked_by_backend() {
    let token = forged_admin_token();
    let harness = common::harness(None);
    harness
        .backend
        .on("/auth/login", 200, json!({ "access_token": token }).to_string())
        .on("/users/9", 503, "")
        .on("/birth-records", 401, "");

    let outcome = harness
        .app
        .sign_in(&Credentials {
            username: "mallory".to_string(),
            password: "pw".to_string(),
        })
        .await
        .expect("login request");

    assert!(matches!(
        outcome,
        LoginOutcome::Authenticated { source: UserSource::TokenClaims, .. }
    ));
    assert_eq!(
        harness.navigator.history().last().map(Route::path),
        Some("/admin")
    );

    let user = harness.app.session().current_user().expect("claims user");
    let listing = harness.app.records().list_for(&user).await;
    assert!(listing.is_err());
    assert_eq!(harness.stored_token(), None);

    assert_eq!(
        harness.app.navigate(Route::new("/admin"), NOW_MS),
        GuardDecision::Redirect(Route::login())
    );
    assert_eq!(harness.app.session().state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn advisory_claims_tests_restore_never_trusts_embedded_claims() {
    let token = forged_admin_token();
    let harness = common::harness(Some(&token));
    harness.backend.on("/users/9", 503, "");

    let state = harness.app.start(NOW_MS).await;

    assert_eq!(state, SessionState::Unauthenticated);
    assert_eq!(harness.stored_token(), None);
}
