// End-to-end authentication flows against the relational backend

mod common;

use common::{client, relational_app, ADMIN_PASSWORD};
use docsync_auth::errors::{AuthError, CredentialError, InternalError};
use docsync_auth::types::db::{audit_event, refresh_token, user_session};
use docsync_auth::types::internal::auth::TokenType;
use docsync_auth::types::internal::user::NewUser;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn test_created_user_can_log_in_and_token_names_them() {
    let (app, _db) = relational_app().await;
    let pairs = [("alice", "s3cret!"), ("bob", "correct horse"), ("émilie", "pässwörd")];

    for (username, password) in pairs {
        app.store.create_user(NewUser::new(username, password)).await.unwrap();

        let outcome = app.gateway.login(username, password, &client()).await.unwrap();
        let claims = app
            .token_service
            .verify(&outcome.access.token, TokenType::Access)
            .unwrap();

        assert_eq!(claims.username, username);
    }
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_identical() {
    let (app, _db) = relational_app().await;
    app.store.create_user(NewUser::new("alice", "s3cret!")).await.unwrap();

    let wrong_password = app.gateway.login("alice", "nope", &client()).await.unwrap_err();
    let unknown_user = app.gateway.login("mallory", "s3cret!", &client()).await.unwrap_err();

    let wrong_password = AuthError::from_internal_error(wrong_password, true);
    let unknown_user = AuthError::from_internal_error(unknown_user, true);

    assert_eq!(wrong_password.status_code(), 401);
    assert_eq!(wrong_password.code(), unknown_user.code());
    assert_eq!(wrong_password.message(), unknown_user.message());
    assert_eq!(wrong_password.detail(), unknown_user.detail());
}

#[tokio::test]
async fn test_password_change_revokes_earlier_refresh_token() {
    let (app, _db) = relational_app().await;
    let alice = app.store.create_user(NewUser::new("alice", "s3cret!")).await.unwrap();

    let first = app.gateway.login("alice", "s3cret!", &client()).await.unwrap();
    let a2 = app.gateway.refresh(&first.refresh.token, &client()).await.unwrap();
    assert!(app.token_service.verify(&a2.token, TokenType::Access).is_ok());

    app.gateway
        .change_password(&alice.id, "s3cret!", "n3w-s3cret!", &client())
        .await
        .unwrap();

    // The signature still verifies, only the store knows it is revoked
    assert!(app
        .token_service
        .verify(&first.refresh.token, TokenType::Refresh)
        .is_ok());
    assert!(app.gateway.refresh(&first.refresh.token, &client()).await.is_err());

    assert!(app.gateway.login("alice", "s3cret!", &client()).await.is_err());
    assert!(app.gateway.login("alice", "n3w-s3cret!", &client()).await.is_ok());
}

#[tokio::test]
async fn test_change_password_with_wrong_old_password_keeps_sessions() {
    let (app, _db) = relational_app().await;
    let alice = app.store.create_user(NewUser::new("alice", "s3cret!")).await.unwrap();
    let outcome = app.gateway.login("alice", "s3cret!", &client()).await.unwrap();

    let result = app
        .gateway
        .change_password(&alice.id, "guess", "other", &client())
        .await;

    assert!(matches!(
        result,
        Err(InternalError::Credential(CredentialError::InvalidCredentials))
    ));
    assert!(app.gateway.refresh(&outcome.refresh.token, &client()).await.is_ok());
}

#[tokio::test]
async fn test_logout_is_idempotent_and_final() {
    let (app, _db) = relational_app().await;
    app.store.create_user(NewUser::new("alice", "s3cret!")).await.unwrap();
    let outcome = app.gateway.login("alice", "s3cret!", &client()).await.unwrap();

    assert!(app.gateway.logout(&outcome.refresh.token, &client()).await.is_ok());
    assert!(app.gateway.logout(&outcome.refresh.token, &client()).await.is_ok());
    assert!(app.gateway.logout("never-issued", &client()).await.is_ok());

    assert!(app.gateway.refresh(&outcome.refresh.token, &client()).await.is_err());
}

#[tokio::test]
async fn test_access_token_outlives_revocation() {
    let (app, _db) = relational_app().await;
    app.store.create_user(NewUser::new("alice", "s3cret!")).await.unwrap();
    let outcome = app.gateway.login("alice", "s3cret!", &client()).await.unwrap();

    app.gateway.logout(&outcome.refresh.token, &client()).await.unwrap();

    // Access tokens are stateless and stay valid until they expire
    assert!(app
        .token_service
        .verify(&outcome.access.token, TokenType::Access)
        .is_ok());
}

#[tokio::test]
async fn test_hard_delete_leaves_no_orphans() {
    let (app, db) = relational_app().await;
    let alice = app.store.create_user(NewUser::new("alice", "s3cret!")).await.unwrap();
    let outcome = app.gateway.login("alice", "s3cret!", &client()).await.unwrap();
    app.gateway.login("alice", "s3cret!", &client()).await.unwrap();
    assert!(app.gateway.login("alice", "wrong-password", &client()).await.is_err());
    let claims = app
        .token_service
        .verify(&outcome.access.token, TokenType::Access)
        .unwrap();
    app.users.start_session(&claims, "websocket", &client()).await.unwrap();

    let admin_login = app.gateway.login("admin", ADMIN_PASSWORD, &client()).await.unwrap();
    let admin_claims = app
        .token_service
        .verify(&admin_login.access.token, TokenType::Access)
        .unwrap();

    app.admin.delete_user(&admin_claims, &alice.id, &client()).await.unwrap();

    assert!(app.store.get_by_id(&alice.id).await.unwrap().is_none());
    assert!(app.store.get_by_username("alice").await.unwrap().is_none());

    let tokens = refresh_token::Entity::find()
        .filter(refresh_token::Column::UserId.eq(alice.id.as_str()))
        .count(&db)
        .await
        .unwrap();
    let sessions = user_session::Entity::find()
        .filter(user_session::Column::UserId.eq(alice.id.as_str()))
        .count(&db)
        .await
        .unwrap();
    let audit_rows = audit_event::Entity::find()
        .filter(
            audit_event::Column::UserId
                .eq(alice.id.as_str())
                .or(audit_event::Column::Username.eq("alice")),
        )
        .count(&db)
        .await
        .unwrap();
    assert_eq!(tokens, 0);
    assert_eq!(sessions, 0);
    assert_eq!(audit_rows, 0);

    assert!(app.gateway.refresh(&outcome.refresh.token, &client()).await.is_err());
}

#[tokio::test]
async fn test_duplicate_username_is_rejected_without_partial_record() {
    let (app, _db) = relational_app().await;
    app.store
        .create_user(NewUser::new("alice", "s3cret!").with_email("alice@example.com"))
        .await
        .unwrap();
    let before = app.store.count_users().await.unwrap();

    let err = app
        .store
        .create_user(NewUser::new("alice", "different").with_email("other@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        InternalError::Credential(CredentialError::DuplicateUsername(_))
    ));
    assert_eq!(AuthError::from_internal_error(err, false).status_code(), 409);
    assert_eq!(app.store.count_users().await.unwrap(), before);
    assert!(app.gateway.login("alice", "different", &client()).await.is_err());
}

#[tokio::test]
async fn test_deactivated_user_cannot_refresh() {
    let (app, _db) = relational_app().await;
    let alice = app.store.create_user(NewUser::new("alice", "s3cret!")).await.unwrap();
    let outcome = app.gateway.login("alice", "s3cret!", &client()).await.unwrap();

    app.store.deactivate_user(&alice.id).await.unwrap();

    assert!(app.gateway.refresh(&outcome.refresh.token, &client()).await.is_err());
    assert!(app.gateway.login("alice", "s3cret!", &client()).await.is_err());
}
