use assert_json_diff::assert_json_eq;
use portal::Role;
use serde_json::json;

use crate::api::tests::{MockBackend, TAKEN_EMAIL};
use crate::api::{Error, Registration};

fn registration(email: &str, role: Role) -> Registration {
    Registration {
        user_name: "Bob".to_owned(),
        email: email.to_owned(),
        password: "hunter2".to_owned(),
        role,
    }
}

#[tokio::test]
async fn accepted() {
    let backend = MockBackend::start(json!({}));

    backend
        .api()
        .register(&registration("bob@example.com", Role::Employer))
        .await
        .unwrap();

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "/user/register");
    assert_json_eq!(
        requests[0].1,
        json!({
            "userName": "Bob",
            "email": "bob@example.com",
            "password": "hunter2",
            "role": "EMPLOYER",
        })
    );
}

#[tokio::test]
async fn incomplete_form_is_not_sent() {
    let backend = MockBackend::start(json!({}));

    let mut form = registration("bob@example.com", Role::Trainer);
    form.user_name = "  ".to_owned();

    let err = backend.api().register(&form).await.unwrap_err();
    assert!(matches!(err, Error::MissingFields));
    assert_eq!(err.to_string(), "All fields are required");
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn admin_cannot_register() {
    let backend = MockBackend::start(json!({}));

    let err = backend
        .api()
        .register(&registration("root@example.com", Role::Admin))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RoleNotSelectable(Role::Admin)));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn taken_email_is_rejected() {
    let backend = MockBackend::start(json!({}));

    let err = backend
        .api()
        .register(&registration(TAKEN_EMAIL, Role::Jobseeker))
        .await
        .unwrap_err();

    match err {
        Error::Rejected { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message.as_deref(), Some("Email already registered"));
        }
        err => panic!("Unexpected error: {err:?}"),
    }
}
