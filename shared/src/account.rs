//! Member account rules and payloads: signup, account recovery, profile changes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Characters accepted as "special" by the recovery and profile password rules.
const PASSWORD_SPECIALS: &str = "@$!%*#?&";

const EMAIL_DOMAINS: [&str; 4] = ["naver.com", "gmail.com", "kakao.com", "daum.net"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("아이디는 영문, 숫자 조합 4~12자로 입력해주세요.")]
    UserId,
    #[error("이메일은 네이버, 지메일, 카카오, 다음 주소만 사용할 수 있습니다.")]
    Email,
    #[error("닉네임은 한글, 영문, 숫자 2~10자로 입력해주세요.")]
    Nickname,
    #[error("이름은 한글 또는 영문 2~20자로 입력해주세요.")]
    Name,
    #[error("휴대폰 번호는 010으로 시작하는 11자리 숫자로 입력해주세요.")]
    Phone,
    #[error("비밀번호는 8자 이상, 영문/숫자/특수문자 중 2종류 이상을 포함해야 합니다.")]
    WeakPassword,
    #[error("비밀번호는 8자 이상, 숫자와 특수문자(@$!%*#?&)를 포함해야 합니다.")]
    ResetPassword,
    #[error("비밀번호는 8자 이상, 대문자/숫자/특수문자(@$!%*#?&)를 포함해야 합니다.")]
    ProfilePassword,
    #[error("비밀번호가 일치하지 않습니다.")]
    PasswordMismatch,
    #[error("필수 약관에 모두 동의해주세요.")]
    TermsNotAccepted,
    #[error("{0} 중복 확인을 해주세요.")]
    Unchecked(&'static str),
    #[error("필수 항목을 모두 입력해주세요.")]
    MissingFields,
    #[error("제목과 내용을 입력해주세요.")]
    MissingPostFields,
    #[error("검색어는 2글자 이상 입력해주세요.")]
    ShortKeyword,
    #[error("즐겨찾기는 최대 5개까지 등록 가능합니다.")]
    FavoriteLimit,
    #[error("탈퇴 안내에 동의하고 비밀번호를 입력해주세요.")]
    WithdrawalNotConfirmed,
}

fn is_hangul_syllable(c: char) -> bool {
    ('가'..='힣').contains(&c)
}

fn char_count_in(s: &str, min: usize, max: usize) -> bool {
    let n = s.chars().count();
    n >= min && n <= max
}

pub fn is_valid_user_id(id: &str) -> bool {
    char_count_in(id, 4, 12) && id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Local part `[A-Za-z0-9_.+-]+` at one of the supported portal domains.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-'))
        && EMAIL_DOMAINS.contains(&domain)
}

pub fn is_valid_nickname(nickname: &str) -> bool {
    char_count_in(nickname, 2, 10)
        && nickname
            .chars()
            .all(|c| is_hangul_syllable(c) || c.is_ascii_alphanumeric())
}

pub fn is_valid_name(name: &str) -> bool {
    char_count_in(name, 2, 20)
        && name
            .chars()
            .all(|c| is_hangul_syllable(c) || c.is_ascii_alphabetic())
}

/// Strips everything but ASCII digits, as phone inputs do on every keystroke.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 11 && phone.starts_with("010") && phone.chars().all(|c| c.is_ascii_digit())
}

/// ASCII letter, digit and "other" classes present in a password. Non-ASCII letters count as other.
fn password_classes(password: &str) -> usize {
    let letters = password.chars().any(|c| c.is_ascii_alphabetic());
    let digits = password.chars().any(|c| c.is_ascii_digit());
    let others = password.chars().any(|c| !c.is_ascii_alphanumeric());
    [letters, digits, others].into_iter().filter(|b| *b).count()
}

/// Signup rule: at least 8 characters drawn from at least two classes.
pub fn is_valid_signup_password(password: &str) -> bool {
    password.chars().count() >= 8 && password_classes(password) >= 2
}

fn in_recovery_charset(c: char) -> bool {
    c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c)
}

/// Recovery rule: 8+ from `[A-Za-z0-9@$!%*#?&]`, with a digit and a special character.
pub fn is_valid_reset_password(password: &str) -> bool {
    password.len() >= 8
        && password.chars().all(in_recovery_charset)
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

/// Profile rule: the recovery rule plus an uppercase letter.
pub fn is_valid_profile_password(password: &str) -> bool {
    is_valid_reset_password(password) && password.chars().any(|c| c.is_ascii_uppercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordStrength {
    Empty,
    Weak,
    Fair,
    Strong,
}

impl PasswordStrength {
    pub fn of(password: &str) -> Self {
        if password.is_empty() {
            Self::Empty
        } else if password.chars().count() < 8 {
            Self::Weak
        } else if password_classes(password) < 3 {
            Self::Fair
        } else {
            Self::Strong
        }
    }

    /// Meter width percentage and color.
    pub fn meter(self) -> (u8, &'static str) {
        match self {
            Self::Empty => (0, "transparent"),
            Self::Weak => (20, "#dc3545"),
            Self::Fair => (50, "#ffc107"),
            Self::Strong => (100, "#28a745"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Empty => "",
            Self::Weak => "너무 짧음",
            Self::Fair => "보통",
            Self::Strong => "안전",
        }
    }
}

/// Security questions used for account recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SecurityQuestion {
    Motto = 1,
    Treasure = 2,
    Teacher = 3,
    ElementarySchool = 4,
    NextLife = 5,
}

impl TryFrom<u8> for SecurityQuestion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|q| *q as u8 == value)
            .ok_or_else(|| format!("unknown security question {value}"))
    }
}

impl From<SecurityQuestion> for u8 {
    fn from(question: SecurityQuestion) -> Self {
        question as u8
    }
}

impl SecurityQuestion {
    pub const ALL: [SecurityQuestion; 5] = [
        Self::Motto,
        Self::Treasure,
        Self::Teacher,
        Self::ElementarySchool,
        Self::NextLife,
    ];

    pub fn text(self) -> &'static str {
        match self {
            Self::Motto => "인생 좌우명?",
            Self::Treasure => "보물 1호?",
            Self::Teacher => "기억에 남는 선생님?",
            Self::ElementarySchool => "졸업한 초등학교?",
            Self::NextLife => "다시 태어나면 되고싶은 것?",
        }
    }
}

/// Body of `POST /signup`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub user_id: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub nickname: String,
    pub address: String,
    pub detail_address: String,
    pub area_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub emergency_phone: String,
    pub pw_question: u8,
    pub pw_answer: String,
}

/// Response of the duplicate-check endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindQuestionRequest {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindQuestionResponse {
    pub question: SecurityQuestion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyAnswerRequest {
    pub user_id: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub nickname: String,
    pub phone: String,
    pub address: String,
    pub detail_address: String,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_nickname(&self.nickname) {
            return Err(ValidationError::Nickname);
        }
        if !is_valid_phone(&self.phone) {
            return Err(ValidationError::Phone);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub security_answer: String,
    pub new_password: String,
}

impl PasswordChange {
    pub fn validate(&self, confirmation: &str) -> Result<(), ValidationError> {
        if self.current_password.is_empty() || self.security_answer.trim().is_empty() {
            return Err(ValidationError::MissingFields);
        }
        if !is_valid_profile_password(&self.new_password) {
            return Err(ValidationError::ProfilePassword);
        }
        if self.new_password != confirmation {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub password: String,
}

impl WithdrawRequest {
    pub fn confirmed(agreed: bool, password: &str) -> Result<Self, ValidationError> {
        if !agreed || password.is_empty() {
            return Err(ValidationError::WithdrawalNotConfirmed);
        }
        Ok(Self {
            password: password.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_password_needs_two_classes() {
        assert!(is_valid_signup_password("Abcdef1!"));
        assert!(is_valid_signup_password("abcdefg1"));
        assert!(!is_valid_signup_password("abcdefgh"));
        assert!(!is_valid_signup_password("Ab1!"));
    }

    #[test]
    fn nickname_allow_list() {
        assert!(is_valid_nickname("안전지킴이"));
        assert!(is_valid_nickname("nav1"));
        assert!(!is_valid_nickname("a!"));
        assert!(!is_valid_nickname("a"));
        assert!(!is_valid_nickname("ㅎㅎ"));
        assert!(!is_valid_nickname("열한글자닉네임입니다요"));
    }

    #[test]
    fn user_id_and_name_rules() {
        assert!(is_valid_user_id("safe01"));
        assert!(!is_valid_user_id("abc"));
        assert!(!is_valid_user_id("has space"));
        assert!(is_valid_name("홍길동"));
        assert!(is_valid_name("Kim"));
        assert!(!is_valid_name("홍1"));
    }

    #[test]
    fn email_portal_domains_only() {
        assert!(is_valid_email("safe.user+1@naver.com"));
        assert!(is_valid_email("a_b@daum.net"));
        assert!(!is_valid_email("user@example.com"));
        assert!(!is_valid_email("@gmail.com"));
        assert!(!is_valid_email("us er@gmail.com"));
    }

    #[test]
    fn phone_is_digits_starting_with_010() {
        assert_eq!(digits_only("010-1234-5678"), "01012345678");
        assert!(is_valid_phone("01012345678"));
        assert!(!is_valid_phone("0111234567"));
        assert!(!is_valid_phone("010123456789"));
    }

    #[test]
    fn reset_and_profile_password_rules() {
        assert!(is_valid_reset_password("safety12!"));
        assert!(!is_valid_reset_password("safety123"));
        assert!(!is_valid_reset_password("safety12!^"));
        assert!(!is_valid_profile_password("safety12!"));
        assert!(is_valid_profile_password("Safety12!"));
    }

    #[test]
    fn strength_meter_bands() {
        assert_eq!(PasswordStrength::of(""), PasswordStrength::Empty);
        assert_eq!(PasswordStrength::of("Ab1!"), PasswordStrength::Weak);
        assert_eq!(PasswordStrength::of("abcdefg1"), PasswordStrength::Fair);
        assert_eq!(PasswordStrength::of("abcdef1!"), PasswordStrength::Strong);
        assert_eq!(PasswordStrength::Weak.meter(), (20, "#dc3545"));
    }

    #[test]
    fn non_ascii_letters_count_as_other() {
        assert!(is_valid_signup_password("abcdefg가"));
        assert!(is_valid_signup_password("passwordé"));
        assert!(!is_valid_signup_password("가나다라마바사아"));
        assert_eq!(PasswordStrength::of("abcdef1가"), PasswordStrength::Strong);
    }

    #[test]
    fn security_question_wire_is_numeric() {
        let response: FindQuestionResponse = serde_json::from_str(r#"{"question":3}"#).unwrap();
        assert_eq!(response.question, SecurityQuestion::Teacher);
        assert_eq!(response.question.text(), "기억에 남는 선생님?");
        assert!(serde_json::from_str::<FindQuestionResponse>(r#"{"question":9}"#).is_err());
    }

    #[test]
    fn password_change_checks_rule_then_confirmation() {
        let change = PasswordChange {
            current_password: "old".to_string(),
            security_answer: "answer".to_string(),
            new_password: "Safety12!".to_string(),
        };
        assert_eq!(change.validate("Safety12!"), Ok(()));
        assert_eq!(
            change.validate("Safety12?"),
            Err(ValidationError::PasswordMismatch)
        );
        let weak = PasswordChange {
            new_password: "safety12!".to_string(),
            ..change
        };
        assert_eq!(weak.validate("safety12!"), Err(ValidationError::ProfilePassword));
    }

    #[test]
    fn withdrawal_requires_agreement_and_password() {
        assert!(WithdrawRequest::confirmed(false, "pw").is_err());
        assert!(WithdrawRequest::confirmed(true, "").is_err());
        assert_eq!(
            WithdrawRequest::confirmed(true, "pw").unwrap().password,
            "pw"
        );
    }

    #[test]
    fn signup_request_uses_camel_case() {
        let json = serde_json::to_value(SignupRequest {
            user_id: "safe01".to_string(),
            pw_question: 2,
            ..SignupRequest::default()
        })
        .unwrap();
        assert_eq!(json["userId"], "safe01");
        assert_eq!(json["pwQuestion"], 2);
        assert!(json.get("detailAddress").is_some());
    }
}
