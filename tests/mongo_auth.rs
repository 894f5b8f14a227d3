use mongodb::Client;
use mongodb::bson::{Document, doc};
use uuid::Uuid;

use vibrant_journal::auth::model::SignUpRequest;
use vibrant_journal::auth::mongo_provider::MongoAuthProvider;
use vibrant_journal::auth::provider::AuthProvider;

async fn client() -> Client {
    let uri = std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    Client::with_uri_str(&uri).await.unwrap()
}

fn request(email: &str, username: &str) -> SignUpRequest {
    SignUpRequest {
        email: email.to_string(),
        password: "Secret123".to_string(),
        username: username.to_string(),
    }
}

#[tokio::test]
#[ignore = "needs a running MongoDB at MONGODB_URI"]
async fn failed_profile_insert_leaves_no_account_behind() {
    let client = client().await;
    let name = format!("journal_test_{}", Uuid::new_v4().simple());
    let db = client.database(&name);

    // Reject every profile so the second insert of sign-up fails.
    db.create_collection("profiles")
        .validator(doc! { "username": { "$exists": false } })
        .await
        .unwrap();

    let provider = MongoAuthProvider::new(&client, &name, "test-device");
    let err = provider
        .sign_up(request("a@example.com", "alice"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NETWORK_OR_SERVER_ERROR");

    let accounts = db
        .collection::<Document>("users")
        .count_documents(doc! { "email": "a@example.com" })
        .await
        .unwrap();
    assert_eq!(accounts, 0);

    db.collection::<Document>("profiles").drop().await.unwrap();
    let user = provider
        .sign_up(request("a@example.com", "alice"))
        .await
        .unwrap();
    assert_eq!(user.email, "a@example.com");
    let profile = provider.fetch_profile(&user.id).await.unwrap().unwrap();
    assert_eq!(profile.username, "alice");

    db.drop().await.unwrap();
}
