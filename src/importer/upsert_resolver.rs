// ==========================================
// CSV 配置化导入系统 - 建档/更新决策器
// ==========================================
// 职责: 按查找键构建匹配域, 查询已有记录, 决定 建/改/跳
// 规则: 无查找键 → 一律新建;
//       skip_existing 优先于 update_existing;
//       多条匹配 → 行级失败, 不做任何写入
// ==========================================

use crate::domain::profile::ImportProfile;
use crate::domain::record::{MappedValue, RecordPayload};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::record_store::{Domain, RecordId, RecordStore};
use tracing::debug;

// ==========================================
// UpsertDecision - 行级写入决策
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertDecision {
    Create,
    Update(RecordId),
    Skip(RecordId),
}

// ==========================================
// UpsertResolver
// ==========================================
pub struct UpsertResolver;

impl UpsertResolver {
    /// 从查找键列构建匹配域
    ///
    /// 查找键值缺失或为空时无法构建可比较条件, 报 DomainBuildError
    pub fn build_domain(
        profile: &ImportProfile,
        payload: &RecordPayload,
        row_number: usize,
    ) -> ImportResult<Domain> {
        let mut domain = Domain::new();
        for mapping in profile.search_key_columns() {
            match payload.get(&mapping.field) {
                Some(MappedValue::Scalar(value)) if !value.is_null() => {
                    domain.push((mapping.field.clone(), value.clone()));
                }
                Some(MappedValue::Scalar(_)) | None => {
                    return Err(ImportError::DomainBuildError {
                        row: row_number,
                        field: mapping.field.clone(),
                        message: "查找键值为空".to_string(),
                    });
                }
                Some(_) => {
                    // 档案校验阻止关系查找键, 此处兜底
                    return Err(ImportError::DomainBuildError {
                        row: row_number,
                        field: mapping.field.clone(),
                        message: "查找键不是可比较的标量值".to_string(),
                    });
                }
            }
        }
        Ok(domain)
    }

    /// 决策: 建 / 改 / 跳
    pub fn resolve(
        store: &dyn RecordStore,
        profile: &ImportProfile,
        payload: &RecordPayload,
        row_number: usize,
    ) -> ImportResult<UpsertDecision> {
        let domain = Self::build_domain(profile, payload, row_number)?;
        if domain.is_empty() {
            // 无查找键档案: 每行都是新建
            return Ok(UpsertDecision::Create);
        }

        let matches = store.search(&profile.model, &domain)?;
        debug!(
            model = %profile.model,
            row = row_number,
            matches = matches.len(),
            "查找键匹配完成"
        );

        match matches.as_slice() {
            [] => Ok(UpsertDecision::Create),
            [id] => {
                if profile.skip_existing {
                    Ok(UpsertDecision::Skip(*id))
                } else if profile.update_existing {
                    Ok(UpsertDecision::Update(*id))
                } else {
                    Ok(UpsertDecision::Skip(*id))
                }
            }
            many => Err(ImportError::DuplicateMatchError {
                row: row_number,
                model: profile.model.clone(),
                matches: many.len(),
            }),
        }
    }
}
