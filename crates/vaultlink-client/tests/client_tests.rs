use bytes::Bytes;
use serde_json::json;
use std::path::Path;
use uuid::Uuid;
use vaultlink_client::{ClientError, Config, ShareOptions, ShareStatus, VaultClient};
use vaultlink_core::{ConfirmOutcome, EncryptionInfo, Permission, ShareUrl};
use vaultlink_crypto::{
    CryptoError, EnvelopeEncryptor, FileKeyStore, KeyPair, MemoryKeyStore, TAG_SIZE,
};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

fn client(server: &MockServer) -> VaultClient<MemoryKeyStore> {
    VaultClient::new(
        Config::new(server.uri()).with_token("jwt"),
        "alice",
        MemoryKeyStore::new(),
    )
    .unwrap()
}

async fn file_client(server: &MockServer, keys_dir: &Path) -> VaultClient<FileKeyStore> {
    VaultClient::new(
        Config::new(server.uri()).with_token("jwt"),
        "alice",
        FileKeyStore::open(keys_dir).await.unwrap(),
    )
    .unwrap()
}

fn file_json(filename: &str, size: u64) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "owner": "alice",
        "storageLocator": "alice/x",
        "filename": filename,
        "size": size,
        "contentType": "text/plain",
        "checksum": "",
        "createdAt": "2026-01-01T00:00:00Z",
        "updatedAt": "2026-01-01T00:00:00Z",
    })
}

#[tokio::test]
async fn plain_upload_sends_raw_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files"))
        .and(header("authorization", "Bearer jwt"))
        .and(header("x-filename", "notes%20v2.txt"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_json("notes v2.txt", 5)))
        .expect(1)
        .mount(&server)
        .await;

    let file = client(&server)
        .upload("notes v2.txt", Some("text/plain"), Bytes::from_static(b"hello"), false)
        .await
        .unwrap();
    assert_eq!(file.filename, "notes v2.txt");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, b"hello");
    assert!(requests[0].headers.get("x-wrapped-key").is_none());
}

#[tokio::test]
async fn encrypted_upload_publishes_key_and_sends_ciphertext() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/keys"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/files"))
        .and(header_exists("x-wrapped-key"))
        .and(header_exists("x-nonce"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_json("secret.txt", 27)))
        .expect(2)
        .mount(&server)
        .await;

    let vault = client(&server);
    let plaintext = b"the eagle lands at midnight";
    vault.upload("secret.txt", None, &plaintext[..], true).await.unwrap();
    // Second upload reuses the cached key pair: no second PUT /api/keys
    vault.upload("secret.txt", None, &plaintext[..], true).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let upload = requests.iter().find(|r| r.url.path() == "/api/files").unwrap();
    assert_eq!(upload.body.len(), plaintext.len() + TAG_SIZE);
    assert_ne!(&upload.body[..plaintext.len()], &plaintext[..]);
}

#[tokio::test]
async fn issue_link_posts_policy() {
    let server = MockServer::start().await;
    let file_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/api/links"))
        .and(body_json(json!({
            "fileId": file_id,
            "isOneTimeDownload": true,
            "permissions": "Download",
            "isE2EE": false,
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": TOKEN,
            "url": format!("https://vault.example/share/{}", TOKEN),
        })))
        .mount(&server)
        .await;

    let issued = client(&server)
        .issue_link(&file_id, &ShareOptions::new(Permission::Download).one_time())
        .await
        .unwrap();
    assert_eq!(issued.token, TOKEN);
}

#[tokio::test]
async fn resolve_maps_outcomes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/api/share/{}", TOKEN)))
        .and(body_json(json!({ "password": null })))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "status": "passwordRequired" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/share/{}", TOKEN)))
        .and(body_json(json!({ "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "granted",
            "fileId": Uuid::nil(),
            "filename": "F.txt",
            "contentType": "text/plain",
            "size": 6,
            "permissions": "Download",
            "isOneTimeDownload": true,
            "isE2EE": false,
        })))
        .mount(&server)
        .await;

    let vault = client(&server);
    assert_eq!(vault.resolve(TOKEN, None).await.unwrap(), ShareStatus::PasswordRequired);
    match vault.resolve(TOKEN, Some("pw")).await.unwrap() {
        ShareStatus::Granted(file) => {
            assert_eq!(file.filename, "F.txt");
            assert!(file.is_one_time_download);
        }
        other => panic!("expected grant, got {:?}", other),
    }
}

#[tokio::test]
async fn confirm_and_refused_download() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/api/share/{}/confirm", TOKEN)))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "status": "alreadyConsumed" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/share/{}/download", TOKEN)))
        .respond_with(ResponseTemplate::new(410).set_body_json(json!({ "status": "consumed" })))
        .mount(&server)
        .await;

    let vault = client(&server);
    assert_eq!(
        vault.confirm(TOKEN, None).await.unwrap(),
        ConfirmOutcome::AlreadyConsumed
    );
    let err = vault.download(TOKEN, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Refused(ref s) if s == "consumed"));
}

#[tokio::test]
async fn api_errors_are_parsed() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path(format!("/api/files/{}", id)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "FileNotFound",
            "message": "file not found",
            "requestId": "req-1",
        })))
        .mount(&server)
        .await;

    let err = client(&server).get_file(&id).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, ClientError::Api { ref code, .. } if code == "FileNotFound"));
}

#[tokio::test]
async fn unknown_recipient_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/keys/bob"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).public_key_for("bob").await.unwrap_err();
    assert!(matches!(err, ClientError::Crypto(CryptoError::PublicKeyNotFound(_))));
}

#[tokio::test]
async fn download_and_decrypt_e2ee_share() {
    let server = MockServer::start().await;
    let recipient = KeyPair::generate().unwrap();
    let plaintext = b"file F, encrypted end to end";
    let encrypted = EnvelopeEncryptor::new(recipient.public_key())
        .encrypt(Bytes::from_static(plaintext))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path(format!("/api/share/{}/download", TOKEN)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-permissions", "Download")
                .insert_header("x-encrypted", "true")
                .set_body_bytes(encrypted.ciphertext.clone()),
        )
        .mount(&server)
        .await;

    let url = ShareUrl::new(&server.uri(), TOKEN)
        .with_encryption(EncryptionInfo {
            wrapped_key: encrypted.wrapped_key.clone(),
            nonce: encrypted.nonce.clone(),
        })
        .to_url();

    let plain = client(&server)
        .download_and_decrypt(&url, None, recipient.private_key())
        .await
        .unwrap();
    assert_eq!(plain.as_ref(), plaintext);

    // The wrong private key cannot open it
    let stranger = KeyPair::generate().unwrap();
    let err = client(&server)
        .download_and_decrypt(&url, None, stranger.private_key())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Crypto(CryptoError::KeyUnwrap(_))));
}

#[tokio::test]
async fn stored_key_is_republished_after_gateway_restart() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/keys"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/keys/alice"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "code": "KeyNotFound" })))
        .expect(1)
        .mount(&server)
        .await;

    let keys_dir = tempfile::tempdir().unwrap();
    let created = file_client(&server, keys_dir.path()).await.ensure_keys().await.unwrap();

    // New process, same key files; the gateway no longer knows the key
    let reopened = file_client(&server, keys_dir.path()).await.ensure_keys().await.unwrap();
    assert_eq!(created.public_key(), reopened.public_key());

    let requests = server.received_requests().await.unwrap();
    let republished = requests
        .iter()
        .filter(|r| r.method.as_str() == "PUT")
        .last()
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&republished.body).unwrap();
    assert_eq!(body["publicKey"], created.public_key().to_base64().unwrap());
}

#[tokio::test]
async fn token_download_uses_granted_key_material() {
    let server = MockServer::start().await;
    let recipient = KeyPair::generate().unwrap();
    let plaintext = b"decrypt me from the token alone";
    let encrypted = EnvelopeEncryptor::new(recipient.public_key())
        .encrypt(Bytes::from_static(plaintext))
        .await
        .unwrap();
    let encryption = EncryptionInfo {
        wrapped_key: encrypted.wrapped_key.clone(),
        nonce: encrypted.nonce.clone(),
    };

    Mock::given(method("POST"))
        .and(path(format!("/api/share/{}", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "granted",
            "fileId": Uuid::nil(),
            "filename": "F.bin",
            "contentType": "application/octet-stream",
            "size": encrypted.ciphertext.len(),
            "permissions": "Download",
            "isOneTimeDownload": false,
            "isE2EE": true,
            "encryption": encryption,
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/share/{}/download", TOKEN)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-encrypted", "true")
                .set_body_bytes(encrypted.ciphertext.clone()),
        )
        .mount(&server)
        .await;

    let vault = client(&server);
    match vault.resolve(TOKEN, None).await.unwrap() {
        ShareStatus::Granted(file) => assert_eq!(file.encryption.as_ref(), Some(&encryption)),
        other => panic!("expected grant, got {:?}", other),
    }

    let plain = vault
        .download_token_and_decrypt(TOKEN, None, recipient.private_key())
        .await
        .unwrap();
    assert_eq!(plain.as_ref(), plaintext);
}

#[tokio::test]
async fn token_download_reports_refusal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/api/share/{}", TOKEN)))
        .respond_with(ResponseTemplate::new(410).set_body_json(json!({ "status": "consumed" })))
        .mount(&server)
        .await;

    let recipient = KeyPair::generate().unwrap();
    let err = client(&server)
        .download_token_and_decrypt(TOKEN, None, recipient.private_key())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Refused(ref s) if s == "consumed"));
}
