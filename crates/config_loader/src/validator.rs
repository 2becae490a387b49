//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (derive 规则：相机尺寸、fov、超时、录制帧率等)
//! - 录制输出目录不能是已存在的文件
//! - 帧率上限

use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use contracts::{ContractError, SessionConfig};

/// 主循环帧率上限
const MAX_TARGET_FPS: u32 = 240;

/// 校验 SessionConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &SessionConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_recording(config)?;
    validate_pacing(config)?;
    Ok(())
}

/// 校验 derive 声明的字段规则
fn validate_fields(config: &SessionConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let (field, message) = first_error(&errors, "")
            .unwrap_or_else(|| ("<root>".to_string(), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// 深度优先取出第一条错误 (按字段名排序，结果稳定)
fn first_error(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_error(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_error(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// 校验录制配置
fn validate_recording(config: &SessionConfig) -> Result<(), ContractError> {
    if config.enable_recording && config.recording.output_dir.is_file() {
        return Err(ContractError::config_validation(
            "recording.output_dir",
            format!(
                "'{}' is a file, expected a directory",
                config.recording.output_dir.display()
            ),
        ));
    }
    Ok(())
}

/// 校验主循环帧率
fn validate_pacing(config: &SessionConfig) -> Result<(), ContractError> {
    if config.pacing.target_fps > MAX_TARGET_FPS {
        return Err(ContractError::config_validation(
            "pacing.target_fps",
            format!(
                "target_fps must be <= {MAX_TARGET_FPS}, got {}",
                config.pacing.target_fps
            ),
        ));
    }
    Ok(())
}
