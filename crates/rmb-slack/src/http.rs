use async_trait::async_trait;

use rmb_core::{errors::Error, ports::ApiPort, Result};

/// `ApiPort` implementation over the Slack-style web API.
///
/// Every call is a form-encoded POST of flat string parameters to
/// `<base>/<method>`, with the token injected as a parameter. The payload
/// comes back as raw JSON; the core decides what an `"ok": false` means
/// for the call in question.
#[derive(Clone, Debug)]
pub struct HttpApi {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client build");
        Self {
            base_url: base_url.into(),
            token: token.into(),
            http,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), method)
    }
}

#[async_trait]
impl ApiPort for HttpApi {
    async fn call(
        &self,
        method: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value> {
        let mut form: Vec<(&str, &str)> = vec![("token", self.token.as_str())];
        form.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let resp = self
            .http
            .post(self.endpoint(method))
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Send(format!("{method} request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Send(format!(
                "{method} failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| Error::Send(format!("{method} json error: {e}")))
    }
}
