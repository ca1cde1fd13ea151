use gloo_net::http::{Request, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("fetch error: {0}")]
    Network(String),
    #[error("login required")]
    Unauthorized,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("parse error: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Text shown to the user: the server's own message when it sent one, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Unauthorized => "로그인이 필요합니다.".to_string(),
            _ => fallback.to_string(),
        }
    }
}

fn classify(status: u16, body: String) -> ApiError {
    match status {
        401 | 403 => ApiError::Unauthorized,
        _ => {
            let body = body.trim();
            if body.is_empty() || body.starts_with('<') {
                ApiError::Status(status)
            } else {
                ApiError::Rejected {
                    status,
                    message: body.to_string(),
                }
            }
        }
    }
}

async fn send(request: Result<Request, gloo_net::Error>) -> Result<Response, ApiError> {
    let resp = request
        .map_err(|e| ApiError::Network(e.to_string()))?
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    if resp.ok() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(classify(status, body))
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    resp.json::<T>()
        .await
        .map_err(|e| ApiError::Parse(e.to_string()))
}

pub async fn get_json<T: DeserializeOwned>(url: &str) -> Result<T, ApiError> {
    decode(send(Request::get(url).build()).await?).await
}

pub async fn post_json<B: Serialize, T: DeserializeOwned>(url: &str, body: &B) -> Result<T, ApiError> {
    decode(send(Request::post(url).json(body)).await?).await
}

/// POST with a JSON body; the response body is ignored.
pub async fn post_json_unit<B: Serialize>(url: &str, body: &B) -> Result<(), ApiError> {
    send(Request::post(url).json(body)).await.map(|_| ())
}

/// POST without a body, returning the decoded response.
pub async fn post_empty<T: DeserializeOwned>(url: &str) -> Result<T, ApiError> {
    decode(send(Request::post(url).build()).await?).await
}

/// POST without a body; the response body is ignored.
pub async fn post_unit(url: &str) -> Result<(), ApiError> {
    send(Request::post(url).build()).await.map(|_| ())
}

pub async fn post_form(url: &str, form: &web_sys::FormData) -> Result<(), ApiError> {
    send(Request::post(url).body(form.clone())).await.map(|_| ())
}

pub async fn delete(url: &str) -> Result<(), ApiError> {
    send(Request::delete(url).build()).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_map_to_unauthorized() {
        assert_eq!(classify(401, String::new()), ApiError::Unauthorized);
        assert_eq!(classify(403, "Forbidden".into()), ApiError::Unauthorized);
    }

    #[test]
    fn plain_text_bodies_become_rejections() {
        let err = classify(400, " 이미 사용 중인 아이디입니다. ".into());
        assert_eq!(err.user_message("실패"), "이미 사용 중인 아이디입니다.");
    }

    #[test]
    fn html_or_empty_bodies_fall_back() {
        assert_eq!(classify(500, "<html>oops</html>".into()), ApiError::Status(500));
        assert_eq!(classify(502, "  ".into()).user_message("서버 오류"), "서버 오류");
    }
}
