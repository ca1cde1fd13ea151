use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use safenavi_shared::account::{
    FindQuestionRequest, FindQuestionResponse, ResetPasswordRequest, SecurityQuestion,
    ValidationError, VerifyAnswerRequest, is_valid_reset_password,
};

use super::{finish_and_go, input_message};
use crate::api;
use crate::notice::{NoticeStack, Notices};

/// Recovery only moves forward; each step carries what the next request needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindStep {
    Identify,
    Verify {
        user_id: String,
        question: SecurityQuestion,
    },
    Reset {
        user_id: String,
    },
}

impl FindStep {
    pub fn identify(user_id: &str, email: &str) -> Result<FindQuestionRequest, ValidationError> {
        let (user_id, email) = (user_id.trim(), email.trim());
        if user_id.is_empty() || email.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        Ok(FindQuestionRequest {
            user_id: user_id.to_string(),
            email: email.to_string(),
        })
    }

    /// Step 1 succeeded: the account exists and has this question.
    pub fn found(self, user_id: String, question: SecurityQuestion) -> Self {
        match self {
            Self::Identify => Self::Verify { user_id, question },
            other => other,
        }
    }

    pub fn verify(&self, answer: &str) -> Option<Result<VerifyAnswerRequest, ValidationError>> {
        let Self::Verify { user_id, .. } = self else {
            return None;
        };
        let answer = answer.trim();
        Some(if answer.is_empty() {
            Err(ValidationError::MissingFields)
        } else {
            Ok(VerifyAnswerRequest {
                user_id: user_id.clone(),
                answer: answer.to_string(),
            })
        })
    }

    /// Step 2 succeeded: the answer matched.
    pub fn verified(self) -> Self {
        match self {
            Self::Verify { user_id, .. } => Self::Reset { user_id },
            other => other,
        }
    }

    pub fn reset(
        &self,
        password: &str,
        confirmation: &str,
    ) -> Option<Result<ResetPasswordRequest, ValidationError>> {
        let Self::Reset { user_id } = self else {
            return None;
        };
        Some(if !is_valid_reset_password(password) {
            Err(ValidationError::ResetPassword)
        } else if password != confirmation {
            Err(ValidationError::PasswordMismatch)
        } else {
            Ok(ResetPasswordRequest {
                user_id: user_id.clone(),
                password: password.to_string(),
            })
        })
    }

    pub fn question_text(&self) -> Option<String> {
        match self {
            Self::Verify { question, .. } => Some(format!("Q. {}", question.text())),
            _ => None,
        }
    }

    fn number(&self) -> u8 {
        match self {
            Self::Identify => 1,
            Self::Verify { .. } => 2,
            Self::Reset { .. } => 3,
        }
    }
}

fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

#[component]
pub fn FindAccountPage() -> impl IntoView {
    let notices = Notices::new();
    provide_context(notices);

    let step = RwSignal::new(FindStep::Identify);
    let user_id = RwSignal::new(String::new());
    let email = RwSignal::new(String::new());
    let answer = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let confirmation = RwSignal::new(String::new());

    let identify = move |_| {
        let request = match FindStep::identify(&user_id.get_untracked(), &email.get_untracked()) {
            Ok(request) => request,
            Err(e) => {
                notices.error(e.to_string());
                return;
            }
        };
        spawn_local(async move {
            match api::post_json::<_, FindQuestionResponse>("/api/find/question", &request).await {
                Ok(found) => step.update(|s| *s = s.clone().found(request.user_id, found.question)),
                Err(e) => {
                    web_sys::console::warn_1(&format!("account lookup failed: {e}").into());
                    notices.error("일치하는 회원 정보가 없습니다.");
                }
            }
        });
    };

    let verify = move |_| {
        let Some(checked) = step.with_untracked(|s| s.verify(&answer.get_untracked())) else {
            return;
        };
        let request = match checked {
            Ok(request) => request,
            Err(e) => {
                notices.error(e.to_string());
                return;
            }
        };
        spawn_local(async move {
            match api::post_json_unit("/api/find/verify", &request).await {
                Ok(()) => {
                    alert("본인 인증에 성공했습니다.\n새로운 비밀번호를 설정해주세요.");
                    step.update(|s| *s = s.clone().verified());
                }
                Err(_) => notices.error("답변이 일치하지 않습니다. 다시 확인해주세요."),
            }
        });
    };

    let reset = move |_| {
        let checked = step.with_untracked(|s| {
            s.reset(&password.get_untracked(), &confirmation.get_untracked())
        });
        let Some(checked) = checked else {
            return;
        };
        let request = match checked {
            Ok(request) => request,
            Err(e) => {
                notices.error(e.to_string());
                return;
            }
        };
        spawn_local(async move {
            match api::post_json_unit("/api/find/reset", &request).await {
                Ok(()) => finish_and_go(
                    "비밀번호가 성공적으로 변경되었습니다. 🎉\n로그인 페이지로 이동합니다.",
                    "/login",
                ),
                Err(e) => notices.api_error(&e, "비밀번호 변경 중 시스템 오류가 발생했습니다."),
            }
        });
    };

    let matched = move || {
        let confirm = confirmation.get();
        (!confirm.is_empty()).then(|| {
            let ok = confirm == password.get();
            let text = if ok { "비밀번호가 일치합니다." } else { "비밀번호가 일치하지 않습니다." };
            (text.to_string(), ok)
        })
    };
    let current = move || step.with(FindStep::number);

    view! {
        <NoticeStack />
        <Show when=move || current() == 1>
            <section class="kb-step fade-in">
                <input
                    type="text"
                    placeholder="아이디"
                    prop:value=user_id
                    on:input=move |ev| user_id.set(event_target_value(&ev))
                />
                <input
                    type="email"
                    placeholder="가입한 이메일"
                    prop:value=email
                    on:input=move |ev| email.set(event_target_value(&ev))
                />
                <button type="button" class="kb-btn-primary" on:click=identify>"다음"</button>
            </section>
        </Show>
        <Show when=move || current() == 2>
            <section class="kb-step fade-in">
                <p class="kb-question">{move || step.with(FindStep::question_text)}</p>
                <input
                    type="text"
                    placeholder="답변"
                    prop:value=answer
                    on:input=move |ev| answer.set(event_target_value(&ev))
                />
                <button type="button" class="kb-btn-primary" on:click=verify>"확인"</button>
            </section>
        </Show>
        <Show when=move || current() == 3>
            <section class="kb-step fade-in">
                <input
                    type="password"
                    placeholder="새 비밀번호"
                    prop:value=password
                    on:input=move |ev| password.set(event_target_value(&ev))
                />
                <input
                    type="password"
                    placeholder="새 비밀번호 확인"
                    prop:value=confirmation
                    on:input=move |ev| confirmation.set(event_target_value(&ev))
                />
                {move || input_message(matched())}
                <button type="button" class="kb-btn-primary" on:click=reset>"비밀번호 변경"</button>
            </section>
        </Show>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_needs_both_fields() {
        assert_eq!(
            FindStep::identify(" ", "a@naver.com"),
            Err(ValidationError::MissingFields)
        );
        let request = FindStep::identify(" safe01 ", "a@naver.com").unwrap();
        assert_eq!(request.user_id, "safe01");
    }

    #[test]
    fn steps_only_move_forward() {
        let step = FindStep::Identify.verified();
        assert_eq!(step, FindStep::Identify);

        let step = step.found("safe01".to_string(), SecurityQuestion::Treasure);
        assert_eq!(step.question_text().as_deref(), Some("Q. 보물 1호?"));
        assert!(step.reset("Passw0rd!", "Passw0rd!").is_none());

        let step = step.verified();
        assert_eq!(
            step,
            FindStep::Reset {
                user_id: "safe01".to_string()
            }
        );
        assert_eq!(step.clone().found("other".to_string(), SecurityQuestion::Motto), step);
        assert!(step.verify("answer").is_none());
    }

    #[test]
    fn verify_carries_the_found_user() {
        let step = FindStep::Verify {
            user_id: "safe01".to_string(),
            question: SecurityQuestion::Motto,
        };
        assert_eq!(step.verify("  "), Some(Err(ValidationError::MissingFields)));
        let request = step.verify(" 성실 ").unwrap().unwrap();
        assert_eq!(request.user_id, "safe01");
        assert_eq!(request.answer, "성실");
    }

    #[test]
    fn reset_applies_recovery_password_rule() {
        let step = FindStep::Reset {
            user_id: "safe01".to_string(),
        };
        assert_eq!(
            step.reset("abcdefg1", "abcdefg1"),
            Some(Err(ValidationError::ResetPassword))
        );
        assert_eq!(
            step.reset("abcdef1!", "abcdef1?"),
            Some(Err(ValidationError::PasswordMismatch))
        );
        let request = step.reset("abcdef1!", "abcdef1!").unwrap().unwrap();
        assert_eq!(request.password, "abcdef1!");
    }
}
