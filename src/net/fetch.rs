use std::time::Duration;

use url::Url;

use crate::error::{Result, SimviewError};

/// Response body of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub body: String,
    pub url: String,
    pub status: u16,
    pub content_type: String,
}

/// Build the blocking client shared by every request of one connection.
pub fn client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(concat!("simview/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SimviewError::Transport(format!("Client error: {}", e)))
}

/// GET `url` and return the body. Non-2xx statuses are errors.
pub fn fetch_json(client: &reqwest::blocking::Client, url: &Url) -> Result<FetchResult> {
    log::debug!("GET {}", url);
    let response = client
        .get(url.as_str())
        .header("Accept", "application/json")
        .send()
        .map_err(|e| SimviewError::Transport(format!("Request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SimviewError::Transport(format!("{} returned {}", url, status)));
    }
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string();
    let final_url = response.url().to_string();

    let body = response
        .text()
        .map_err(|e| SimviewError::Transport(format!("Failed to read body: {}", e)))?;

    Ok(FetchResult {
        body,
        url: final_url,
        status: status.as_u16(),
        content_type,
    })
}

/// `base` joined with `path`, keeping any path prefix `base` already has.
pub fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|e| SimviewError::Transport(format!("Invalid URL: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_prefix() {
        let base = Url::parse("http://localhost:5000/sim").unwrap();
        assert_eq!(
            endpoint(&base, "model").unwrap().as_str(),
            "http://localhost:5000/sim/model"
        );
        let root = Url::parse("http://localhost:5000").unwrap();
        assert_eq!(
            endpoint(&root, "states").unwrap().as_str(),
            "http://localhost:5000/states"
        );
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let c = client(Duration::from_millis(200)).unwrap();
        let url = Url::parse("http://127.0.0.1:9/model").unwrap();
        assert!(matches!(fetch_json(&c, &url), Err(SimviewError::Transport(_))));
    }
}
