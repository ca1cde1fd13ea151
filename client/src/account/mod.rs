//! Member pages mounted outside the map: signup, account recovery, profile.

pub mod find_account;
pub mod profile;
pub mod signup;

use leptos::prelude::*;

use safenavi_shared::account::{
    Availability, ValidationError, is_valid_email, is_valid_nickname, is_valid_user_id,
};

use crate::api::{self, ApiError};

/// Fields whose uniqueness is confirmed by an explicit server round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    UserId,
    Email,
    Nickname,
}

impl DuplicateField {
    pub fn label(self) -> &'static str {
        match self {
            Self::UserId => "아이디",
            Self::Email => "이메일",
            Self::Nickname => "닉네임",
        }
    }

    /// Format check run before the round trip.
    pub fn validate(self, value: &str) -> Result<(), ValidationError> {
        let ok = match self {
            Self::UserId => is_valid_user_id(value),
            Self::Email => is_valid_email(value),
            Self::Nickname => is_valid_nickname(value),
        };
        if ok {
            Ok(())
        } else {
            Err(match self {
                Self::UserId => ValidationError::UserId,
                Self::Email => ValidationError::Email,
                Self::Nickname => ValidationError::Nickname,
            })
        }
    }

    pub fn url(self, value: &str) -> String {
        let (path, param) = match self {
            Self::UserId => ("id", "userId"),
            Self::Email => ("email", "email"),
            Self::Nickname => ("nickname", "nickname"),
        };
        format!("/api/check/{path}?{param}={}", urlencoding::encode(value))
    }

    fn verdict(self, available: bool) -> &'static str {
        match (self, available) {
            (Self::UserId, true) => "사용 가능한 아이디입니다.",
            (Self::UserId, false) => "이미 사용 중인 아이디입니다.",
            (Self::Email, true) => "사용 가능한 이메일입니다.",
            (Self::Email, false) => "이미 가입된 이메일입니다.",
            (Self::Nickname, true) => "사용 가능한 닉네임입니다.",
            (Self::Nickname, false) => "이미 사용 중인 닉네임입니다.",
        }
    }
}

/// Result of the last duplicate check for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CheckState {
    #[default]
    Unchecked,
    /// Confirmed free for exactly this value.
    Available(String),
    Taken(String),
}

impl CheckState {
    pub fn confirms(&self, value: &str) -> bool {
        matches!(self, Self::Available(checked) if checked == value)
    }

    /// Message under the input plus whether it reads as success.
    pub fn message(&self, field: DuplicateField) -> Option<(&'static str, bool)> {
        match self {
            Self::Unchecked => None,
            Self::Available(_) => Some((field.verdict(true), true)),
            Self::Taken(_) => Some((field.verdict(false), false)),
        }
    }
}

pub async fn check_availability(field: DuplicateField, value: &str) -> Result<bool, ApiError> {
    let response: Availability = api::get_json(&field.url(value)).await?;
    Ok(response.available)
}

/// Shows `message` in a blocking dialog, then navigates to `href`.
pub(crate) fn finish_and_go(message: &str, href: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let _ = window.alert_with_message(message);
    if let Err(e) = window.location().set_href(href) {
        web_sys::console::warn_1(&e);
    }
}

/// Validation line rendered under an input.
pub(crate) fn input_message(message: Option<(String, bool)>) -> impl IntoView {
    message.map(|(text, ok)| {
        let class = if ok {
            "kb-input-msg success"
        } else {
            "kb-input-msg error"
        };
        view! { <div class=class>{text}</div> }
    })
}
