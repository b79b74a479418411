//! Tests for the GitHub metadata client against a local mock server

use gitback::analysis::error::MetadataError;
use gitback::analysis::RepositoryIdentity;
use gitback::metadata::{GithubMetadataClient, MetadataService};
use mockito::Matcher;

fn widgets() -> RepositoryIdentity {
    RepositoryIdentity::new("octo", "widgets").unwrap()
}

fn client(server: &mockito::Server, token: Option<&str>) -> GithubMetadataClient {
    GithubMetadataClient::with_client(
        reqwest::Client::new(),
        &server.url(),
        token.map(str::to_string),
        365,
    )
}

#[tokio::test]
async fn test_fetch_repo_info_with_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/repos/octo/widgets")
        .match_header("authorization", "token secret-token")
        .match_header("accept", "application/vnd.github.v3+json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"stargazers_count": 1200, "language": "Rust", "size": 4096, "forks": 7}"#)
        .create_async()
        .await;

    let info = client(&server, Some("secret-token"))
        .fetch_repo_info(&widgets())
        .await
        .unwrap();

    assert_eq!(info.stars, 1200);
    assert_eq!(info.language.as_deref(), Some("Rust"));
    assert_eq!(info.size_kb, 4096);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/repos/octo/widgets")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"stargazers_count": 3, "language": null, "size": 0}"#)
        .create_async()
        .await;

    let info = client(&server, None).fetch_repo_info(&widgets()).await.unwrap();

    assert_eq!(info.stars, 3);
    assert!(info.language.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/repos/octo/widgets")
        .with_status(403)
        .with_body(r#"{"message": "API rate limit exceeded"}"#)
        .create_async()
        .await;

    let err = client(&server, None)
        .fetch_repo_info(&widgets())
        .await
        .unwrap_err();

    match err {
        MetadataError::Status { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("rate limit"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_top_discussions_mapping() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search/issues")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("sort".into(), "reactions".into()),
            Matcher::UrlEncoded("order".into(), "desc".into()),
            Matcher::UrlEncoded("per_page".into(), "2".into()),
            Matcher::Regex("repo%3Aocto%2Fwidgets".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "total_count": 3,
                "items": [
                    {
                        "id": 501, "number": 12, "title": "Faster decoding",
                        "user": {"login": "alice"},
                        "created_at": "2024-04-01T10:00:00Z", "state": "closed",
                        "html_url": "https://github.com/octo/widgets/pull/12",
                        "comments": 8,
                        "reactions": {"total_count": 40, "+1": 30},
                        "pull_request": {"merged_at": "2024-04-03T09:00:00Z"}
                    },
                    {
                        "id": 502, "number": 15, "title": "Drop old API",
                        "user": null,
                        "created_at": "2024-05-01T10:00:00Z", "state": "open",
                        "html_url": "https://github.com/octo/widgets/pull/15",
                        "pull_request": {"merged_at": null}
                    },
                    {
                        "id": 503, "number": 16, "title": "Ignored past the limit",
                        "user": {"login": "carol"},
                        "created_at": "2024-05-02T10:00:00Z", "state": "open",
                        "html_url": "https://github.com/octo/widgets/pull/16"
                    }
                ]
            }"#,
        )
        .create_async()
        .await;

    let discussions = client(&server, None)
        .fetch_top_discussions(&widgets(), 2)
        .await
        .unwrap();

    assert_eq!(discussions.len(), 2);

    let first = &discussions[0];
    assert_eq!(first.number, 12);
    assert_eq!(first.author, "alice");
    assert_eq!(first.comments, 8);
    assert_eq!(first.reactions, 40);
    assert!(first.merged);

    let second = &discussions[1];
    assert_eq!(second.author, "");
    assert_eq!(second.reactions, 0);
    assert!(!second.merged);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_zero_limit_makes_no_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let discussions = client(&server, None)
        .fetch_top_discussions(&widgets(), 0)
        .await
        .unwrap();

    assert!(discussions.is_empty());
    mock.assert_async().await;
}
