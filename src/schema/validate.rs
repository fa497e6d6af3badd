// ==========================================
// CSV 配置化导入系统 - 档案校验
// ==========================================
// 职责: 导入前校验档案与模型注册表的一致性
// 不变量: 列映射引用的字段必须存在于目标模型;
//         子字段必须存在于关系目标模型且为标量;
//         查找键只能映射到可比较的标量字段
// ==========================================

use crate::domain::profile::ImportProfile;
use crate::schema::registry::SchemaRegistry;
use thiserror::Error;

/// 档案校验错误类型
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("目标模型未注册: {0}")]
    UnknownModel(String),

    #[error("字段不存在: {model}.{field}")]
    UnknownField { model: String, field: String },

    #[error("子字段不存在: {model}.{sub_field} (经由 {field})")]
    UnknownSubField {
        model: String,
        field: String,
        sub_field: String,
    },

    #[error("关系字段缺少子字段映射: {model}.{field}")]
    MissingSubField { model: String, field: String },

    #[error("标量字段不允许子字段映射: {model}.{field}")]
    UnexpectedSubField { model: String, field: String },

    #[error("子字段必须为标量字段: {model}.{sub_field} (经由 {field})")]
    RelationalSubField {
        model: String,
        field: String,
        sub_field: String,
    },

    #[error("查找键必须映射到可比较的标量字段: {model}.{field}")]
    RelationalSearchKey { model: String, field: String },

    #[error("列映射缺少列位置: 字段 {0}")]
    EmptyPositions(String),

    #[error("引号字符必须是 ASCII: {0:?}")]
    NonAsciiQuote(char),

    #[error("日期字段缺少日期格式: {model}.{field}")]
    MissingDateFormat { model: String, field: String },

    #[error("导入档案未启用: {0}")]
    InactiveProfile(String),
}

/// 校验档案与注册表的一致性
///
/// 方言检查: 引号字符必须是 ASCII
///
/// 逐列检查:
/// 1. 列位置非空
/// 2. 字段存在于目标模型
/// 3. 标量字段: 禁止子字段, 日期类型必须带格式, 查找键合法
/// 4. 关系字段: 必须声明子字段, 子字段存在于关系目标且为标量,
///    禁止作为查找键
pub fn validate_profile(
    profile: &ImportProfile,
    registry: &SchemaRegistry,
) -> Result<(), ProfileError> {
    let model = registry
        .model(&profile.model)
        .ok_or_else(|| ProfileError::UnknownModel(profile.model.clone()))?;

    // csv 解析器的 quote 是单字节, 多字节字符无法表达
    if let Some(quote) = profile.dialect.quote {
        if !quote.is_ascii() {
            return Err(ProfileError::NonAsciiQuote(quote));
        }
    }

    for mapping in &profile.columns {
        if mapping.positions.is_empty() {
            return Err(ProfileError::EmptyPositions(mapping.field.clone()));
        }

        let field = model
            .field(&mapping.field)
            .ok_or_else(|| ProfileError::UnknownField {
                model: profile.model.clone(),
                field: mapping.field.clone(),
            })?;

        if field.kind.is_relational() {
            if mapping.is_search_key {
                return Err(ProfileError::RelationalSearchKey {
                    model: profile.model.clone(),
                    field: mapping.field.clone(),
                });
            }

            let sub_field_name =
                mapping
                    .sub_field
                    .as_deref()
                    .ok_or_else(|| ProfileError::MissingSubField {
                        model: profile.model.clone(),
                        field: mapping.field.clone(),
                    })?;

            // 关系目标模型必须已注册
            let target_name = field.target_model().unwrap_or_default();
            let target =
                registry
                    .model(target_name)
                    .ok_or_else(|| ProfileError::UnknownModel(target_name.to_string()))?;

            let sub_field =
                target
                    .field(sub_field_name)
                    .ok_or_else(|| ProfileError::UnknownSubField {
                        model: target_name.to_string(),
                        field: mapping.field.clone(),
                        sub_field: sub_field_name.to_string(),
                    })?;

            if sub_field.kind.is_relational() {
                return Err(ProfileError::RelationalSubField {
                    model: target_name.to_string(),
                    field: mapping.field.clone(),
                    sub_field: sub_field_name.to_string(),
                });
            }

            if sub_field.kind.needs_date_format() && mapping.date_format.is_none() {
                return Err(ProfileError::MissingDateFormat {
                    model: target_name.to_string(),
                    field: sub_field_name.to_string(),
                });
            }
        } else {
            if mapping.sub_field.is_some() {
                return Err(ProfileError::UnexpectedSubField {
                    model: profile.model.clone(),
                    field: mapping.field.clone(),
                });
            }

            if field.kind.needs_date_format() && mapping.date_format.is_none() {
                return Err(ProfileError::MissingDateFormat {
                    model: profile.model.clone(),
                    field: mapping.field.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::ColumnMapping;
    use crate::schema::registry::{FieldDescriptor, ModelDescriptor};

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry.register(
            ModelDescriptor::new("party")
                .with_field(FieldDescriptor::char("name"))
                .with_field(FieldDescriptor::date("birth_date"))
                .with_field(FieldDescriptor::one2many(
                    "addresses",
                    "party.address",
                    "party",
                )),
        );
        registry.register(
            ModelDescriptor::new("party.address")
                .with_field(FieldDescriptor::char("street"))
                .with_field(FieldDescriptor::many2one("party", "party")),
        );
        registry
    }

    #[test]
    fn test_valid_profile() {
        let profile = ImportProfile::new("p", "party")
            .with_column(ColumnMapping::scalar(0, "name").search_key())
            .with_column(ColumnMapping::relational(1, "addresses", "street"));
        assert!(validate_profile(&profile, &registry()).is_ok());
    }

    #[test]
    fn test_unknown_field() {
        let profile =
            ImportProfile::new("p", "party").with_column(ColumnMapping::scalar(0, "no_such"));
        assert!(matches!(
            validate_profile(&profile, &registry()),
            Err(ProfileError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_unknown_sub_field() {
        let profile = ImportProfile::new("p", "party")
            .with_column(ColumnMapping::relational(0, "addresses", "no_such"));
        assert!(matches!(
            validate_profile(&profile, &registry()),
            Err(ProfileError::UnknownSubField { .. })
        ));
    }

    #[test]
    fn test_relational_field_requires_sub_field() {
        let profile =
            ImportProfile::new("p", "party").with_column(ColumnMapping::scalar(0, "addresses"));
        assert!(matches!(
            validate_profile(&profile, &registry()),
            Err(ProfileError::MissingSubField { .. })
        ));
    }

    #[test]
    fn test_search_key_must_be_scalar() {
        let profile = ImportProfile::new("p", "party")
            .with_column(ColumnMapping::relational(0, "addresses", "street").search_key());
        assert!(matches!(
            validate_profile(&profile, &registry()),
            Err(ProfileError::RelationalSearchKey { .. })
        ));
    }

    #[test]
    fn test_non_ascii_quote_rejected() {
        let mut profile =
            ImportProfile::new("p", "party").with_column(ColumnMapping::scalar(0, "name"));
        profile.dialect.quote = Some('«');
        assert!(matches!(
            validate_profile(&profile, &registry()),
            Err(ProfileError::NonAsciiQuote('«'))
        ));

        profile.dialect.quote = Some('"');
        assert!(validate_profile(&profile, &registry()).is_ok());
    }

    #[test]
    fn test_date_field_requires_format() {
        let profile =
            ImportProfile::new("p", "party").with_column(ColumnMapping::scalar(0, "birth_date"));
        assert!(matches!(
            validate_profile(&profile, &registry()),
            Err(ProfileError::MissingDateFormat { .. })
        ));

        let profile = ImportProfile::new("p", "party")
            .with_column(ColumnMapping::scalar(0, "birth_date").with_date_format("%d/%m/%Y"));
        assert!(validate_profile(&profile, &registry()).is_ok());
    }
}
