#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tollgate_core::{
    Config, GitHubConfig, LlmConfig, PullRequestRef, ReviewConfig, TollgateError,
};
use tollgate_review::llm::Reviewer;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const PULL_PATH: &str = "/repos/acme/widgets/pulls/42";
pub const COMMENTS_PATH: &str = "/repos/acme/widgets/issues/42/comments";
pub const COMMENT_PATH_RE: &str = r"^/repos/acme/widgets/issues/comments/\d+$";
pub const LABELS_PATH: &str = "/repos/acme/widgets/issues/42/labels";
pub const LABEL_PATH_RE: &str = r"^/repos/acme/widgets/issues/42/labels/[^/]+$";

pub fn pr() -> PullRequestRef {
    PullRequestRef {
        owner: "acme".into(),
        repo: "widgets".into(),
        number: 42,
    }
}

pub fn github_config(api_base: &str) -> GitHubConfig {
    GitHubConfig {
        token: "ghp_test".into(),
        api_base: api_base.into(),
        backoff_base_ms: 0,
        ..GitHubConfig::default()
    }
}

pub fn config(api_base: &str) -> Config {
    Config {
        pr: pr(),
        github: github_config(api_base),
        llm: LlmConfig::default(),
        review: ReviewConfig::default(),
    }
}

/// Reviewer that returns a fixed text and counts invocations.
pub struct CannedReviewer {
    review: String,
    calls: AtomicUsize,
}

impl CannedReviewer {
    pub fn new(review: &str) -> Self {
        Self {
            review: review.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reviewer for CannedReviewer {
    async fn review_diff(&self, _diff: &str) -> Result<String, TollgateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.review.clone())
    }
}

#[derive(Debug, Default)]
pub struct PrState {
    pub diff: String,
    pub comments: Vec<(u64, String)>,
    pub labels: Vec<String>,
    next_id: u64,
}

/// In-memory GitHub serving one pull request's diff, comments and labels.
pub struct FakeGitHub {
    pub server: MockServer,
    pub state: Arc<Mutex<PrState>>,
}

impl FakeGitHub {
    pub async fn start(diff: &str) -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(Mutex::new(PrState {
            diff: diff.into(),
            next_id: 1000,
            ..PrState::default()
        }));

        let s = state.clone();
        Mock::given(method("GET"))
            .and(path(PULL_PATH))
            .respond_with(move |_: &Request| {
                ResponseTemplate::new(200).set_body_string(s.lock().unwrap().diff.clone())
            })
            .mount(&server)
            .await;

        let s = state.clone();
        Mock::given(method("GET"))
            .and(path(COMMENTS_PATH))
            .respond_with(move |req: &Request| {
                let first_page = req
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "page")
                    .map_or(true, |(_, v)| v == "1");
                let body: Vec<Value> = if first_page {
                    s.lock()
                        .unwrap()
                        .comments
                        .iter()
                        .map(|(id, body)| json!({ "id": id, "body": body }))
                        .collect()
                } else {
                    Vec::new()
                };
                ResponseTemplate::new(200).set_body_json(body)
            })
            .mount(&server)
            .await;

        let s = state.clone();
        Mock::given(method("POST"))
            .and(path(COMMENTS_PATH))
            .respond_with(move |req: &Request| {
                let body = json_body(req)["body"].as_str().unwrap_or_default().to_string();
                let mut st = s.lock().unwrap();
                st.next_id += 1;
                let id = st.next_id;
                st.comments.push((id, body.clone()));
                ResponseTemplate::new(201).set_body_json(json!({ "id": id, "body": body }))
            })
            .mount(&server)
            .await;

        let s = state.clone();
        Mock::given(method("PATCH"))
            .and(path_regex(COMMENT_PATH_RE))
            .respond_with(move |req: &Request| {
                let id = last_segment(req).parse::<u64>().unwrap_or_default();
                let body = json_body(req)["body"].as_str().unwrap_or_default().to_string();
                let mut st = s.lock().unwrap();
                match st.comments.iter_mut().find(|(cid, _)| *cid == id) {
                    Some(comment) => {
                        comment.1 = body.clone();
                        ResponseTemplate::new(200).set_body_json(json!({ "id": id, "body": body }))
                    }
                    None => ResponseTemplate::new(404),
                }
            })
            .mount(&server)
            .await;

        let s = state.clone();
        Mock::given(method("DELETE"))
            .and(path_regex(COMMENT_PATH_RE))
            .respond_with(move |req: &Request| {
                let id = last_segment(req).parse::<u64>().unwrap_or_default();
                let mut st = s.lock().unwrap();
                let before = st.comments.len();
                st.comments.retain(|(cid, _)| *cid != id);
                if st.comments.len() < before {
                    ResponseTemplate::new(204)
                } else {
                    ResponseTemplate::new(404)
                }
            })
            .mount(&server)
            .await;

        let s = state.clone();
        Mock::given(method("GET"))
            .and(path(LABELS_PATH))
            .respond_with(move |_: &Request| {
                ResponseTemplate::new(200).set_body_json(labels_json(&s.lock().unwrap().labels))
            })
            .mount(&server)
            .await;

        let s = state.clone();
        Mock::given(method("POST"))
            .and(path(LABELS_PATH))
            .respond_with(move |req: &Request| {
                let mut st = s.lock().unwrap();
                if let Some(names) = json_body(req)["labels"].as_array() {
                    for name in names.iter().filter_map(Value::as_str) {
                        if !st.labels.iter().any(|l| l == name) {
                            st.labels.push(name.to_string());
                        }
                    }
                }
                ResponseTemplate::new(200).set_body_json(labels_json(&st.labels))
            })
            .mount(&server)
            .await;

        let s = state.clone();
        Mock::given(method("DELETE"))
            .and(path_regex(LABEL_PATH_RE))
            .respond_with(move |req: &Request| {
                let name = last_segment(req);
                let mut st = s.lock().unwrap();
                let before = st.labels.len();
                st.labels.retain(|l| *l != name);
                if st.labels.len() < before {
                    ResponseTemplate::new(200).set_body_json(labels_json(&st.labels))
                } else {
                    ResponseTemplate::new(404)
                }
            })
            .mount(&server)
            .await;

        Self { server, state }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.state.lock().unwrap().comments.clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.state.lock().unwrap().labels.clone()
    }

    pub fn seed_comment(&self, body: &str) -> u64 {
        let mut st = self.state.lock().unwrap();
        st.next_id += 1;
        let id = st.next_id;
        st.comments.push((id, body.into()));
        id
    }

    pub fn seed_label(&self, name: &str) {
        self.state.lock().unwrap().labels.push(name.into());
    }

    /// Number of received requests with the given method.
    pub async fn count(&self, http_method: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == http_method)
            .count()
    }
}

fn json_body(req: &Request) -> Value {
    serde_json::from_slice(&req.body).unwrap_or(Value::Null)
}

fn last_segment(req: &Request) -> String {
    req.url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .unwrap_or_default()
        .to_string()
}

fn labels_json(labels: &[String]) -> Value {
    Value::Array(labels.iter().map(|name| json!({ "name": name })).collect())
}
