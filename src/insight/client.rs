//! Chat-completions client for OpenAI-compatible endpoints.
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{Error, Result};
use super::{ApiKey, InsightClient, Prompt};

/// How long a completion may take, the same budget the OpenAI SDKs give a request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Sends one blocking request per [InsightClient::analyse] call. No retries.
pub struct OpenAiClient {
    http: Client,
    api_key: ApiKey,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn new(api_key: ApiKey, base_url: &str, model: &str, max_tokens: u32) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Upstream(format!("could not build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request<'a>(&'a self, data: &str, prompt: Prompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt.system().to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.user(data),
                },
            ],
            max_tokens: self.max_tokens,
        }
    }
}

impl InsightClient for OpenAiClient {
    fn analyse(&self, data: &str, prompt: Prompt) -> Result<String> {
        log::info!("Sending summary to {} ({} prompt, model {}).", self.base_url, prompt, self.model);

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose())
            .json(&self.request(data, prompt))
            .send()
            .map_err(|e| Error::Upstream(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Upstream(format!("{status}: {body}")));
        }

        let body: ChatResponse = response
            .json()
            .map_err(|e| Error::Upstream(format!("could not decode response: {e}")))?;
        first_content(body)
    }
}

/// Pulls the text of the first choice out of a response.
fn first_content(response: ChatResponse) -> Result<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Upstream("response contained no choices".to_string()))?;

    choice
        .message
        .content
        .ok_or_else(|| Error::Upstream("first choice has no content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves a single HTTP response after `delay`, returns the base URL to point the client at.
    fn serve_once(delay: Duration, status: &str, body: &str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            thread::sleep(delay);
            stream.write_all(response.as_bytes()).unwrap();
            request
        });
        (format!("http://{addr}/v1"), handle)
    }

    /// Reads headers and a Content-Length body.
    fn read_request(stream: &mut impl Read) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn client(base_url: &str) -> OpenAiClient {
        let key = ApiKey::new(Some("sk-test".to_string())).unwrap();
        OpenAiClient::new(key, base_url, "gpt-4o-mini", 500).unwrap()
    }

    #[test]
    fn test_request_body() {
        let client = client("https://api.openai.com/v1/");
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");

        let body = serde_json::to_value(client.request("{}", Prompt::TrafficAnalysis)).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body["messages"][1]["content"].as_str().unwrap().contains("summary: {}."));
    }

    #[test]
    fn test_first_content() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "all quiet"}},
                            {"message": {"role": "assistant", "content": "ignored"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_content(response).unwrap(), "all quiet");
    }

    #[test]
    fn test_no_choices_is_upstream_error() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(first_content(response), Err(Error::Upstream(_))));

        let response: ChatResponse = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert!(matches!(first_content(response), Err(Error::Upstream(_))));
    }

    #[test]
    fn test_null_content_is_upstream_error() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(matches!(first_content(response), Err(Error::Upstream(_))));
    }

    #[test]
    fn test_answer_from_server() {
        let (base_url, server) = serve_once(
            Duration::ZERO,
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"two hosts talking TCP"}}]}"#,
        );

        let answer = client(&base_url).analyse("{\"total_packets\": 3}", Prompt::TrafficAnalysis).unwrap();
        assert_eq!(answer, "two hosts talking TCP");

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /v1/chat/completions"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer sk-test"));
        assert!(request.contains("total_packets"));
    }

    #[test]
    fn test_error_status_is_upstream_error() {
        let (base_url, server) = serve_once(Duration::ZERO, "500 Internal Server Error", r#"{"error":"boom"}"#);

        match client(&base_url).analyse("{}", Prompt::TrafficAnalysis) {
            Err(Error::Upstream(msg)) => assert!(msg.contains("500") && msg.contains("boom")),
            other => panic!("expected upstream error, got {other:?}"),
        }
        server.join().unwrap();
    }

    #[test]
    fn test_slow_completion_still_answers() {
        // Longer than reqwest's default 30 s request timeout.
        let (base_url, server) = serve_once(
            Duration::from_secs(35),
            "200 OK",
            r#"{"choices":[{"message":{"content":"slow but fine"}}]}"#,
        );

        let answer = client(&base_url).analyse("{}", Prompt::LayerEvaluation);
        assert_eq!(answer.unwrap(), "slow but fine");
        server.join().unwrap();
    }

    #[test]
    fn test_unreachable_endpoint_is_upstream_error() {
        // Nothing listens on port 1.
        let client = client("http://127.0.0.1:1/v1");
        let result = client.analyse("{}", Prompt::TrafficAnalysis);
        assert!(matches!(result, Err(Error::Upstream(_))));
    }
}
