// ==========================================
// CSV 配置化导入系统 - 行映射器实现
// ==========================================
// 职责: 档案列映射 + 原始行 → 结构化记录负载
// 规则: 标量列直接赋值; many2one 列生成链接负载;
//       one2many/many2many 的每个列映射各生成一条子记录
// ==========================================

use crate::domain::profile::{ColumnMapping, ImportProfile};
use crate::domain::record::RecordPayload;
use crate::domain::types::FieldKind;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::value_parser::ValueParser;
use crate::schema::registry::SchemaRegistry;

// ==========================================
// RowMapper
// ==========================================
pub struct RowMapper<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> RowMapper<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// 将一行原始单元格映射为记录负载
    ///
    /// row_number 为日志用行号(已含表头偏移)
    pub fn map_row(
        &self,
        profile: &ImportProfile,
        row: &[String],
        row_number: usize,
    ) -> ImportResult<RecordPayload> {
        let model = self
            .registry
            .model(&profile.model)
            .ok_or_else(|| ImportError::MappingError {
                row: row_number,
                message: format!("目标模型未注册: {}", profile.model),
            })?;

        let parser = ValueParser::new(&profile.dialect);
        let mut payload = RecordPayload::new(&profile.model);

        for mapping in &profile.columns {
            let raw = Self::gather_cells(mapping, row, row_number)?;

            let field =
                model
                    .field(&mapping.field)
                    .ok_or_else(|| ImportError::MappingError {
                        row: row_number,
                        message: format!("字段不存在: {}.{}", profile.model, mapping.field),
                    })?;

            if !field.kind.is_relational() {
                let value = parser.parse(
                    field.kind,
                    &mapping.field,
                    mapping.date_format.as_deref(),
                    &raw,
                    row_number,
                )?;
                payload.set_scalar(&mapping.field, value);
                continue;
            }

            // 关系列: 空单元格整列跳过, 不生成链接/子记录
            if raw.trim().is_empty() {
                continue;
            }

            let target_name = field.target_model().unwrap_or_default();
            let sub_field_name =
                mapping
                    .sub_field
                    .as_deref()
                    .ok_or_else(|| ImportError::MappingError {
                        row: row_number,
                        message: format!(
                            "关系字段缺少子字段映射: {}.{}",
                            profile.model, mapping.field
                        ),
                    })?;
            let sub_field = self
                .registry
                .field(target_name, sub_field_name)
                .ok_or_else(|| ImportError::MappingError {
                    row: row_number,
                    message: format!("子字段不存在: {}.{}", target_name, sub_field_name),
                })?;

            let value = parser.parse(
                sub_field.kind,
                sub_field_name,
                mapping.date_format.as_deref(),
                &raw,
                row_number,
            )?;

            match field.kind {
                FieldKind::Many2One => {
                    payload.set_link(&mapping.field, target_name, sub_field_name, value);
                }
                FieldKind::One2Many | FieldKind::Many2Many => {
                    let mut child = RecordPayload::new(target_name);
                    child.set_scalar(sub_field_name, value);
                    payload.push_child(&mapping.field, child);
                }
                _ => unreachable!("is_relational 已筛除标量字段"),
            }
        }

        Ok(payload)
    }

    /// 取出列映射声明的单元格(多列拼接)
    fn gather_cells(
        mapping: &ColumnMapping,
        row: &[String],
        row_number: usize,
    ) -> ImportResult<String> {
        let mut cells = Vec::with_capacity(mapping.positions.len());
        for &position in &mapping.positions {
            let cell = row
                .get(position)
                .ok_or(ImportError::ColumnOutOfRange {
                    row: row_number,
                    position,
                    width: row.len(),
                })?;
            cells.push(cell.as_str());
        }
        Ok(ValueParser::combine_cells(&cells))
    }
}
