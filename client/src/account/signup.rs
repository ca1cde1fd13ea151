use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use safenavi_shared::LatLng;
use safenavi_shared::account::{
    PasswordStrength, SecurityQuestion, SignupRequest, ValidationError, digits_only,
    is_valid_name, is_valid_phone, is_valid_signup_password,
};

use super::{CheckState, DuplicateField, check_availability, finish_and_go, input_message};
use crate::api;
use crate::kakao;
use crate::notice::{NoticeStack, Notices};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupStep {
    Terms,
    Credentials,
    Profile,
}

impl SignupStep {
    pub fn title(self) -> &'static str {
        match self {
            Self::Terms => "서비스 이용 약관에 동의해주세요",
            Self::Credentials => "계정 정보를 입력해주세요",
            Self::Profile => "프로필 정보를 입력해주세요",
        }
    }

    fn index(self) -> u8 {
        match self {
            Self::Terms => 1,
            Self::Credentials => 2,
            Self::Profile => 3,
        }
    }
}

/// Everything the three signup steps collect.
#[derive(Debug, Clone, PartialEq)]
pub struct SignupForm {
    step: SignupStep,
    pub agree_terms: bool,
    pub agree_location: bool,
    user_id: String,
    email: String,
    nickname: String,
    id_check: CheckState,
    email_check: CheckState,
    nickname_check: CheckState,
    pub password: String,
    pub password_confirm: String,
    pub name: String,
    phone: String,
    pub address: String,
    pub detail_address: String,
    pub area_name: String,
    pub position: Option<LatLng>,
    pub question: SecurityQuestion,
    pub answer: String,
}

impl Default for SignupForm {
    fn default() -> Self {
        Self {
            step: SignupStep::Terms,
            agree_terms: false,
            agree_location: false,
            user_id: String::new(),
            email: String::new(),
            nickname: String::new(),
            id_check: CheckState::Unchecked,
            email_check: CheckState::Unchecked,
            nickname_check: CheckState::Unchecked,
            password: String::new(),
            password_confirm: String::new(),
            name: String::new(),
            phone: String::new(),
            address: String::new(),
            detail_address: String::new(),
            area_name: String::new(),
            position: None,
            question: SecurityQuestion::Motto,
            answer: String::new(),
        }
    }
}

impl SignupForm {
    pub fn step(&self) -> SignupStep {
        self.step
    }

    pub fn all_agreed(&self) -> bool {
        self.agree_terms && self.agree_location
    }

    pub fn set_all_agreed(&mut self, agreed: bool) {
        self.agree_terms = agreed;
        self.agree_location = agreed;
    }

    pub fn value(&self, field: DuplicateField) -> &str {
        match field {
            DuplicateField::UserId => &self.user_id,
            DuplicateField::Email => &self.email,
            DuplicateField::Nickname => &self.nickname,
        }
    }

    pub fn check(&self, field: DuplicateField) -> &CheckState {
        match field {
            DuplicateField::UserId => &self.id_check,
            DuplicateField::Email => &self.email_check,
            DuplicateField::Nickname => &self.nickname_check,
        }
    }

    fn slot(&mut self, field: DuplicateField) -> (&mut String, &mut CheckState) {
        match field {
            DuplicateField::UserId => (&mut self.user_id, &mut self.id_check),
            DuplicateField::Email => (&mut self.email, &mut self.email_check),
            DuplicateField::Nickname => (&mut self.nickname, &mut self.nickname_check),
        }
    }

    /// Editing a checked field invalidates its check.
    pub fn set_value(&mut self, field: DuplicateField, value: String) {
        let (current, check) = self.slot(field);
        if *current != value {
            *current = value;
            *check = CheckState::Unchecked;
        }
    }

    /// Records a server verdict; ignored if the field changed while the check was in flight.
    pub fn record_check(&mut self, field: DuplicateField, checked: &str, available: bool) {
        let (current, check) = self.slot(field);
        if current != checked {
            return;
        }
        *check = if available {
            CheckState::Available(checked.to_string())
        } else {
            CheckState::Taken(checked.to_string())
        };
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn set_phone(&mut self, raw: &str) {
        self.phone = digits_only(raw);
    }

    pub fn password_strength(&self) -> PasswordStrength {
        PasswordStrength::of(&self.password)
    }

    /// `None` until a confirmation is typed.
    pub fn passwords_match(&self) -> Option<bool> {
        if self.password_confirm.is_empty() {
            return None;
        }
        Some(self.password == self.password_confirm && is_valid_signup_password(&self.password))
    }

    fn require_checked(&self, field: DuplicateField) -> Result<(), ValidationError> {
        if self.check(field).confirms(self.value(field)) {
            Ok(())
        } else {
            Err(ValidationError::Unchecked(field.label()))
        }
    }

    fn credentials_ready(&self) -> Result<(), ValidationError> {
        if [&self.user_id, &self.email, &self.nickname, &self.password, &self.password_confirm]
            .iter()
            .any(|v| v.is_empty())
        {
            return Err(ValidationError::MissingFields);
        }
        self.require_checked(DuplicateField::UserId)?;
        self.require_checked(DuplicateField::Email)?;
        self.require_checked(DuplicateField::Nickname)?;
        if !is_valid_signup_password(&self.password) {
            return Err(ValidationError::WeakPassword);
        }
        if self.password != self.password_confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }

    /// Moves forward when the current step's gate passes.
    pub fn advance(&mut self) -> Result<SignupStep, ValidationError> {
        self.step = match self.step {
            SignupStep::Terms if !self.all_agreed() => return Err(ValidationError::TermsNotAccepted),
            SignupStep::Terms => SignupStep::Credentials,
            SignupStep::Credentials => {
                self.credentials_ready()?;
                SignupStep::Profile
            }
            SignupStep::Profile => SignupStep::Profile,
        };
        Ok(self.step)
    }

    pub fn back(&mut self) -> SignupStep {
        self.step = match self.step {
            SignupStep::Terms | SignupStep::Credentials => SignupStep::Terms,
            SignupStep::Profile => SignupStep::Credentials,
        };
        self.step
    }

    /// The final payload; every earlier gate is re-checked.
    pub fn request(&self) -> Result<SignupRequest, ValidationError> {
        if !self.all_agreed() {
            return Err(ValidationError::TermsNotAccepted);
        }
        self.credentials_ready()?;
        let name = self.name.trim();
        if !is_valid_name(name) {
            return Err(ValidationError::Name);
        }
        if !is_valid_phone(&self.phone) {
            return Err(ValidationError::Phone);
        }
        if self.address.trim().is_empty() || self.answer.trim().is_empty() {
            return Err(ValidationError::MissingFields);
        }
        Ok(SignupRequest {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            name: name.to_string(),
            nickname: self.nickname.clone(),
            address: self.address.trim().to_string(),
            detail_address: self.detail_address.trim().to_string(),
            area_name: self.area_name.clone(),
            latitude: self.position.map(|p| p.lat),
            longitude: self.position.map(|p| p.lng),
            emergency_phone: self.phone.clone(),
            pw_question: self.question.into(),
            pw_answer: self.answer.trim().to_string(),
        })
    }
}

fn duplicate_input(
    form: RwSignal<SignupForm>,
    notices: Notices,
    field: DuplicateField,
    input_type: &'static str,
) -> impl IntoView {
    let run_check = move |_| {
        let value = form.with_untracked(|f| f.value(field).to_string());
        if let Err(e) = field.validate(&value) {
            notices.error(e.to_string());
            return;
        }
        spawn_local(async move {
            match check_availability(field, &value).await {
                Ok(available) => form.update(|f| f.record_check(field, &value, available)),
                Err(e) => notices.api_error(&e, "중복 확인에 실패했습니다."),
            }
        });
    };
    let message = move || {
        form.with(|f| f.check(field).message(field))
            .map(|(text, ok)| (text.to_string(), ok))
    };
    view! {
        <div class="kb-input-group">
            <label>{field.label()}</label>
            <div class="kb-input-row">
                <input
                    type=input_type
                    prop:value=move || form.with(|f| f.value(field).to_string())
                    on:input=move |ev| form.update(|f| f.set_value(field, event_target_value(&ev)))
                />
                <button type="button" class="kb-btn-check" on:click=run_check>"중복 확인"</button>
            </div>
            {move || input_message(message())}
        </div>
    }
}

/// Fills address, district and coordinates from a typed address.
fn locate_address(form: RwSignal<SignupForm>, notices: Notices) {
    let query = form.with_untracked(|f| f.address.clone());
    spawn_local(async move {
        match kakao::geocode(&query).await {
            Some(place) => form.update(|f| {
                f.position = Some(place.position);
                f.area_name = crate::admin::district_of(&query).unwrap_or_default();
            }),
            None => notices.error("주소를 찾을 수 없습니다."),
        }
    });
}

#[component]
pub fn SignupPage() -> impl IntoView {
    let notices = Notices::new();
    provide_context(notices);
    let form = RwSignal::new(SignupForm::default());

    let advance = move |_| {
        if let Some(Err(e)) = form.try_update(SignupForm::advance) {
            notices.error(e.to_string());
        }
    };
    let back = move |_| form.update(|f| {
        f.back();
    });

    let submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let request = match form.with_untracked(SignupForm::request) {
            Ok(request) => request,
            Err(e) => {
                notices.error(e.to_string());
                return;
            }
        };
        spawn_local(async move {
            match api::post_json_unit("/signup", &request).await {
                Ok(()) => finish_and_go("회원가입이 완료되었습니다! 🎉\n로그인 페이지로 이동합니다.", "/login"),
                Err(e) => notices.error(format!(
                    "가입 실패: {}",
                    e.user_message("회원가입 처리 중 오류가 발생했습니다.")
                )),
            }
        });
    };

    let step = move || form.with(SignupForm::step);
    let strength = move || form.with(SignupForm::password_strength);
    let matched = move || {
        form.with(SignupForm::passwords_match).map(|ok| {
            let text = if ok { "비밀번호가 일치합니다." } else { "비밀번호가 일치하지 않습니다." };
            (text.to_string(), ok)
        })
    };

    view! {
        <NoticeStack />
        <h2 id="page-title">{move || step().title()}</h2>
        <div class="kb-step-dots">
            {[SignupStep::Terms, SignupStep::Credentials, SignupStep::Profile]
                .into_iter()
                .map(|s| view! { <span class="kb-dot" class:active=move || step() == s>{s.index()}</span> })
                .collect_view()}
        </div>
        <form id="signup-form" on:submit=submit>
            <Show when=move || step() == SignupStep::Terms>
                <section class="kb-step fade-in">
                    <label>
                        <input
                            type="checkbox"
                            prop:checked=move || form.with(SignupForm::all_agreed)
                            on:change=move |ev| form.update(|f| f.set_all_agreed(event_target_checked(&ev)))
                        />
                        " 전체 동의"
                    </label>
                    <label>
                        <input
                            type="checkbox"
                            prop:checked=move || form.with(|f| f.agree_terms)
                            on:change=move |ev| form.update(|f| f.agree_terms = event_target_checked(&ev))
                        />
                        " (필수) 서비스 이용약관 동의"
                    </label>
                    <label>
                        <input
                            type="checkbox"
                            prop:checked=move || form.with(|f| f.agree_location)
                            on:change=move |ev| form.update(|f| f.agree_location = event_target_checked(&ev))
                        />
                        " (필수) 위치기반 서비스 이용약관 동의"
                    </label>
                    <button
                        type="button"
                        class="kb-btn-primary"
                        disabled=move || !form.with(SignupForm::all_agreed)
                        on:click=advance
                    >
                        {move || if form.with(SignupForm::all_agreed) { "다음 단계로" } else { "약관에 모두 동의해주세요" }}
                    </button>
                </section>
            </Show>
            <Show when=move || step() == SignupStep::Credentials>
                <section class="kb-step fade-in">
                    {duplicate_input(form, notices, DuplicateField::UserId, "text")}
                    {duplicate_input(form, notices, DuplicateField::Email, "email")}
                    {duplicate_input(form, notices, DuplicateField::Nickname, "text")}
                    <div class="kb-input-group">
                        <label>"비밀번호"</label>
                        <input
                            type="password"
                            prop:value=move || form.with(|f| f.password.clone())
                            on:input=move |ev| form.update(|f| f.password = event_target_value(&ev))
                        />
                        <div class="kb-pw-meter">
                            <div
                                class="kb-pw-meter-bar"
                                style=move || {
                                    let (width, color) = strength().meter();
                                    format!("width:{width}%;background-color:{color}")
                                }
                            ></div>
                        </div>
                        <span class="kb-pw-label">{move || strength().label()}</span>
                    </div>
                    <div class="kb-input-group">
                        <label>"비밀번호 확인"</label>
                        <input
                            type="password"
                            prop:value=move || form.with(|f| f.password_confirm.clone())
                            on:input=move |ev| form.update(|f| f.password_confirm = event_target_value(&ev))
                        />
                        {move || input_message(matched())}
                    </div>
                    <div class="kb-step-actions">
                        <button type="button" class="kb-btn-secondary" on:click=back>"이전"</button>
                        <button type="button" class="kb-btn-primary" on:click=advance>"다음"</button>
                    </div>
                </section>
            </Show>
            <Show when=move || step() == SignupStep::Profile>
                <section class="kb-step fade-in">
                    <div class="kb-input-group">
                        <label>"이름"</label>
                        <input
                            type="text"
                            prop:value=move || form.with(|f| f.name.clone())
                            on:input=move |ev| form.update(|f| f.name = event_target_value(&ev))
                        />
                        {move || {
                            let name = form.with(|f| f.name.trim().to_string());
                            (!name.is_empty()).then(|| {
                                let ok = is_valid_name(&name);
                                let text = if ok { "올바른 이름 형식입니다." } else { "이름은 한글/영문 2자 이상입니다." };
                                input_message(Some((text.to_string(), ok)))
                            })
                        }}
                    </div>
                    <div class="kb-input-group">
                        <label>"비상 연락처"</label>
                        <input
                            type="tel"
                            prop:value=move || form.with(|f| f.phone().to_string())
                            on:input=move |ev| form.update(|f| f.set_phone(&event_target_value(&ev)))
                        />
                        {move || {
                            let phone = form.with(|f| f.phone().to_string());
                            (!phone.is_empty()).then(|| {
                                let ok = is_valid_phone(&phone);
                                let text = if ok { "올바른 전화번호입니다." } else { "010으로 시작하는 11자리 숫자여야 합니다." };
                                input_message(Some((text.to_string(), ok)))
                            })
                        }}
                    </div>
                    <div class="kb-input-group">
                        <label>"주소"</label>
                        <div class="kb-input-row">
                            <input
                                type="text"
                                prop:value=move || form.with(|f| f.address.clone())
                                on:input=move |ev| form.update(|f| {
                                    f.address = event_target_value(&ev);
                                    f.position = None;
                                })
                            />
                            <button type="button" class="kb-btn-check" on:click=move |_| locate_address(form, notices)>
                                "주소 확인"
                            </button>
                        </div>
                        <input
                            type="text"
                            placeholder="상세 주소"
                            prop:value=move || form.with(|f| f.detail_address.clone())
                            on:input=move |ev| form.update(|f| f.detail_address = event_target_value(&ev))
                        />
                    </div>
                    <div class="kb-input-group">
                        <label>"본인 확인 질문"</label>
                        <select on:change=move |ev| {
                            let picked = event_target_value(&ev).parse::<u8>().ok();
                            if let Some(question) = picked.and_then(|n| SecurityQuestion::try_from(n).ok()) {
                                form.update(|f| f.question = question);
                            }
                        }>
                            {SecurityQuestion::ALL
                                .into_iter()
                                .map(|q| view! { <option value=u8::from(q).to_string()>{q.text()}</option> })
                                .collect_view()}
                        </select>
                        <input
                            type="text"
                            placeholder="답변"
                            prop:value=move || form.with(|f| f.answer.clone())
                            on:input=move |ev| form.update(|f| f.answer = event_target_value(&ev))
                        />
                    </div>
                    <div class="kb-step-actions">
                        <button type="button" class="kb-btn-secondary" on:click=back>"이전"</button>
                        <button type="submit" class="kb-btn-primary">"가입하기"</button>
                    </div>
                </section>
            </Show>
        </form>
    }
}
