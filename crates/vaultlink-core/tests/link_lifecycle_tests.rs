use bytes::Bytes;
use chrono::{Duration, Utc};
use std::sync::Arc;
use vaultlink_core::{
    Clock, ConfirmOutcome, DownloadOutcome, FileService, FixedClock, LinkIssuer, LinkPolicy,
    LinkResolver, LinkStatus, MemoryMetadataStore, MetadataStore, Permission, ResolveOutcome,
    UploadRequest,
};
use vaultlink_store::MemoryObjectStore;

struct Harness {
    clock: FixedClock,
    objects: Arc<MemoryObjectStore>,
    metadata: Arc<MemoryMetadataStore>,
    files: FileService<MemoryObjectStore, MemoryMetadataStore>,
    issuer: LinkIssuer<MemoryMetadataStore>,
    resolver: LinkResolver<MemoryMetadataStore>,
}

impl Harness {
    fn new() -> Self {
        let clock = FixedClock::new(Utc::now());
        let objects = Arc::new(MemoryObjectStore::new());
        let metadata = Arc::new(MemoryMetadataStore::new());
        let shared: vaultlink_core::SharedClock = Arc::new(clock.clone());
        Self {
            files: FileService::with_clock(objects.clone(), metadata.clone(), shared.clone()),
            issuer: LinkIssuer::with_clock(metadata.clone(), "https://vault.example", shared.clone()),
            resolver: LinkResolver::with_clock(metadata.clone(), shared),
            clock,
            objects,
            metadata,
        }
    }

    async fn upload(&self, data: &'static [u8]) -> uuid::Uuid {
        self.files
            .upload(
                "alice",
                UploadRequest {
                    filename: "F.txt".into(),
                    content_type: "text/plain".into(),
                    data: Bytes::from_static(data),
                    encryption: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn issue(&self, policy: LinkPolicy) -> String {
        let file = self.upload(b"file F").await;
        self.issuer.issue_link("alice", &file, policy).await.unwrap().token
    }
}

fn policy() -> vaultlink_core::LinkPolicyBuilder {
    LinkPolicy::builder().permissions(Permission::Download)
}

#[tokio::test]
async fn one_time_link_full_scenario() {
    let h = Harness::new();
    let token = h.issue(policy().one_time(true).build().unwrap()).await;

    // Preview does not consume
    let first = h.resolver.resolve(&token, None).await.unwrap();
    let ResolveOutcome::Granted(descriptor) = first.clone() else {
        panic!("expected grant, got {:?}", first);
    };
    assert!(descriptor.is_one_time_download);
    assert_eq!(descriptor.permissions, Permission::Download);
    assert!(h.resolver.resolve(&token, None).await.unwrap().is_granted());

    assert_eq!(
        h.resolver.confirm_download(&token, None).await.unwrap(),
        ConfirmOutcome::Confirmed
    );
    let link = h.metadata.get_link(&token).await.unwrap().unwrap();
    assert!(link.used);
    assert_eq!(link.permissions, Permission::ViewOnly);

    assert_eq!(
        h.resolver.confirm_download(&token, None).await.unwrap(),
        ConfirmOutcome::AlreadyConsumed
    );
    assert_eq!(h.resolver.resolve(&token, None).await.unwrap(), ResolveOutcome::Consumed);

    // Record is kept, not deleted
    assert_eq!(h.metadata.link_count(), 1);
    let summaries = h.issuer.list_links_for_principal("alice").await.unwrap();
    assert_eq!(summaries[0].status, LinkStatus::Consumed);
}

#[tokio::test]
async fn expired_link_reports_expired_even_when_untouched() {
    let h = Harness::new();
    let token = h
        .issue(policy().expires_in(Duration::minutes(5)).one_time(true).password("pw").build_at(h.clock.now()).unwrap())
        .await;

    h.clock.advance(Duration::minutes(6));

    assert_eq!(h.resolver.resolve(&token, None).await.unwrap(), ResolveOutcome::Expired);
    assert_eq!(
        h.resolver.resolve(&token, Some("pw")).await.unwrap(),
        ResolveOutcome::Expired
    );
    assert_eq!(
        h.resolver.confirm_download(&token, Some("pw")).await.unwrap(),
        ConfirmOutcome::Expired
    );
    // Expiry never mutates the record
    assert!(!h.metadata.get_link(&token).await.unwrap().unwrap().used);
}

#[tokio::test]
async fn expiry_boundary_is_inclusive() {
    let h = Harness::new();
    let token = h
        .issue(policy().expires_in(Duration::seconds(10)).build_at(h.clock.now()).unwrap())
        .await;

    h.clock.advance(Duration::seconds(9));
    assert!(h.resolver.resolve(&token, None).await.unwrap().is_granted());
    h.clock.advance(Duration::seconds(1));
    assert_eq!(h.resolver.resolve(&token, None).await.unwrap(), ResolveOutcome::Expired);
}

#[tokio::test]
async fn password_gating() {
    let h = Harness::new();
    let token = h.issue(policy().one_time(true).password("letmein").build().unwrap()).await;

    assert_eq!(
        h.resolver.resolve(&token, None).await.unwrap(),
        ResolveOutcome::PasswordRequired
    );
    assert_eq!(
        h.resolver.resolve(&token, Some("wrong")).await.unwrap(),
        ResolveOutcome::InvalidPassword
    );
    assert_eq!(
        h.resolver.confirm_download(&token, Some("wrong")).await.unwrap(),
        ConfirmOutcome::InvalidPassword
    );
    assert_eq!(
        h.resolver.confirm_download(&token, None).await.unwrap(),
        ConfirmOutcome::PasswordRequired
    );

    // None of the failures consumed the grant
    assert!(!h.metadata.get_link(&token).await.unwrap().unwrap().used);
    assert!(h.resolver.resolve(&token, Some("letmein")).await.unwrap().is_granted());
    assert_eq!(
        h.resolver.confirm_download(&token, Some("letmein")).await.unwrap(),
        ConfirmOutcome::Confirmed
    );

    // Once used, the password no longer matters
    assert_eq!(h.resolver.resolve(&token, None).await.unwrap(), ResolveOutcome::Consumed);
    for password in [None, Some("wrong"), Some("letmein")] {
        assert_eq!(
            h.resolver.confirm_download(&token, password).await.unwrap(),
            ConfirmOutcome::AlreadyConsumed
        );
    }
}

#[tokio::test]
async fn unknown_and_malformed_tokens() {
    let h = Harness::new();
    let fresh = vaultlink_core::token::generate_token();
    assert_eq!(h.resolver.resolve(&fresh, None).await.unwrap(), ResolveOutcome::NotFound);
    assert_eq!(h.resolver.resolve("../../etc", None).await.unwrap(), ResolveOutcome::NotFound);
    assert_eq!(
        h.resolver.confirm_download(&fresh, None).await.unwrap(),
        ConfirmOutcome::NotFound
    );
}

#[tokio::test]
async fn confirm_on_reusable_link() {
    let h = Harness::new();
    let token = h.issue(policy().build().unwrap()).await;
    assert_eq!(
        h.resolver.confirm_download(&token, None).await.unwrap(),
        ConfirmOutcome::NotOneTimeLink
    );
    assert!(h.resolver.resolve(&token, None).await.unwrap().is_granted());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_confirmations_have_one_winner() {
    let h = Harness::new();
    let token = h.issue(policy().one_time(true).build().unwrap()).await;

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let resolver = h.resolver.clone();
            let token = token.clone();
            tokio::spawn(async move { resolver.confirm_download(&token, None).await.unwrap() })
        })
        .collect();

    let outcomes = futures::future::join_all(tasks).await;
    let confirmed = outcomes
        .iter()
        .filter(|o| *o.as_ref().unwrap() == ConfirmOutcome::Confirmed)
        .count();
    let rejected = outcomes
        .iter()
        .filter(|o| *o.as_ref().unwrap() == ConfirmOutcome::AlreadyConsumed)
        .count();
    assert_eq!(confirmed, 1);
    assert_eq!(rejected, 31);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_downloads_deliver_bytes_once() {
    let h = Harness::new();
    let token = h.issue(policy().one_time(true).build().unwrap()).await;

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let resolver = h.resolver.clone();
            let objects = h.objects.clone();
            let token = token.clone();
            tokio::spawn(async move { resolver.download(objects.as_ref(), &token, None).await.unwrap() })
        })
        .collect();

    let mut delivered = 0;
    for outcome in futures::future::join_all(tasks).await {
        match outcome.unwrap() {
            DownloadOutcome::Content { data, .. } => {
                assert_eq!(data.as_ref(), b"file F");
                delivered += 1;
            }
            DownloadOutcome::Consumed => {}
            other => panic!("unexpected {:?}", other),
        }
    }
    assert_eq!(delivered, 1);
}

#[tokio::test]
async fn view_only_link_cannot_download() {
    let h = Harness::new();
    let token = h
        .issue(LinkPolicy::builder().permissions(Permission::ViewOnly).build().unwrap())
        .await;

    assert!(h.resolver.resolve(&token, None).await.unwrap().is_granted());
    assert_eq!(
        h.resolver.download(h.objects.as_ref(), &token, None).await.unwrap(),
        DownloadOutcome::ViewOnly
    );
}

#[tokio::test]
async fn deleting_file_removes_its_links() {
    let h = Harness::new();
    let file = h.upload(b"bytes").await;
    let issued = h
        .issuer
        .issue_link("alice", &file, policy().build().unwrap())
        .await
        .unwrap();

    h.files.delete("alice", &file).await.unwrap();
    assert_eq!(
        h.resolver.resolve(&issued.token, None).await.unwrap(),
        ResolveOutcome::NotFound
    );
    assert_eq!(h.metadata.link_count(), 0);
}

#[tokio::test]
async fn revoked_link_is_not_found() {
    let h = Harness::new();
    let token = h.issue(policy().build().unwrap()).await;
    h.issuer.revoke("alice", &token).await.unwrap();
    assert_eq!(h.resolver.resolve(&token, None).await.unwrap(), ResolveOutcome::NotFound);
}
