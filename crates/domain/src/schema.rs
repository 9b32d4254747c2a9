//! 请求载荷的结构校验规则
//!
//! 每个载荷类型先由 serde 完成结构解码，再由 `validator` 完成语义校验；
//! 两步中任意一步失败都返回带字段级违规信息的 [`ValidationError`]，不存在部分成功。

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationErrors};

/// 单个字段的违规信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// 载荷校验失败
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation {
                field: field.into(),
                message: message.into(),
            }],
        }
    }

    /// serde 解码失败（缺少字段、类型不符等）
    pub fn from_decode(error: serde_json::Error) -> Self {
        Self::single("body", error.to_string())
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ValidationErrors> for ValidationError {
    fn from(errors: ValidationErrors) -> Self {
        let mut violations: Vec<FieldViolation> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |err| FieldViolation {
                    field: field.clone(),
                    message: describe(err),
                })
            })
            .collect();
        violations.sort_by(|a, b| a.field.cmp(&b.field));
        Self { violations }
    }
}

fn describe(err: &validator::ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    match err.code.as_ref() {
        "email" => "invalid email address".to_string(),
        "length" => {
            let min = err.params.get("min").map(|v| v.to_string());
            let max = err.params.get("max").map(|v| v.to_string());
            match (min, max) {
                (Some(min), Some(max)) => format!("length must be between {min} and {max}"),
                (Some(min), None) => format!("length must be at least {min}"),
                (None, Some(max)) => format!("length must be at most {max}"),
                (None, None) => "invalid length".to_string(),
            }
        }
        other => other.to_string(),
    }
}

/// 将未定型的 JSON 解析为强类型载荷并校验
pub fn parse_payload<T>(value: Value) -> Result<T, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    let payload: T = serde_json::from_value(value).map_err(ValidationError::from_decode)?;
    payload.validate()?;
    Ok(payload)
}

/// 邮箱域名必须带点，且以至少两个字母的顶级域结尾（`a@b`、`ann@localhost` 不合法）。
///
/// 没有 `@` 的值交给 `email` 规则报告，避免同一字段出现两条违规。
pub(crate) fn email_with_tld(value: &str) -> Result<(), validator::ValidationError> {
    let Some((_, domain)) = value.rsplit_once('@') else {
        return Ok(());
    };
    let valid = match domain.rsplit_once('.') {
        Some((host, tld)) => {
            !host.is_empty()
                && !host.ends_with('.')
                && tld.len() >= 2
                && tld.chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    };
    if !valid {
        let mut err = validator::ValidationError::new("email_domain");
        err.message = Some("email domain must end with a top-level domain".into());
        return Err(err);
    }
    Ok(())
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut err = validator::ValidationError::new("blank");
        err.message = Some("Board ID cannot be empty or whitespace only".into());
        return Err(err);
    }
    Ok(())
}

/// 用户注册请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(email, custom(function = "email_with_tld"))]
    pub email: String,
    #[validate(length(min = 2, max = 30))]
    pub name: String,
}

/// 留言板创建请求；`createdBy` 只是不透明引用，不校验用户是否存在
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoardRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    pub created_by: String,
}

/// 发帖请求，`boardId` 来自路径参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    #[validate(length(min = 1, max = 5000))]
    pub data: String,
    pub user_id: String,
    pub board_id: String,
}

/// 路径参数 `email`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EmailParam {
    #[validate(email, custom(function = "email_with_tld"))]
    pub email: String,
}

/// 路径参数 `boardId`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BoardIdParam {
    #[validate(length(min = 1), custom(function = "not_blank"))]
    pub board_id: String,
}

pub fn validate_email_param(email: &str) -> Result<String, ValidationError> {
    let param = EmailParam {
        email: email.to_string(),
    };
    param.validate()?;
    Ok(param.email)
}

pub fn validate_board_id_param(board_id: &str) -> Result<String, ValidationError> {
    let param = BoardIdParam {
        board_id: board_id.to_string(),
    };
    param.validate()?;
    Ok(param.board_id)
}

/// WebSocket 客户端动作，按 `action` 字段区分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum WebSocketAction {
    Subscribe {
        board_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    Unsubscribe {
        board_id: String,
    },
}

impl WebSocketAction {
    pub fn board_id(&self) -> &str {
        match self {
            WebSocketAction::Subscribe { board_id, .. } => board_id,
            WebSocketAction::Unsubscribe { board_id } => board_id,
        }
    }
}

// 结构约束已由 serde 的标签解码完成
impl Validate for WebSocketAction {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}
