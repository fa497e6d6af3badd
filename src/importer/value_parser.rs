// ==========================================
// CSV 配置化导入系统 - 单元格值解析器
// ==========================================
// 职责: 原始单元格 → 类型化 FieldValue
// 规则: 数值按档案的千分位/小数点分隔符规整,
//       整数沿用历史 32 位范围约束,
//       日期按列映射的 strptime 格式解析
// ==========================================

use crate::domain::profile::CsvDialect;
use crate::domain::record::FieldValue;
use crate::domain::types::FieldKind;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// 历史整数字段的取值范围(32 位有符号)
const INTEGER_MIN: i64 = -2_147_483_648;
const INTEGER_MAX: i64 = 2_147_483_647;

use crate::importer::error::{ImportError, ImportResult};

// ==========================================
// ValueParser
// ==========================================
pub struct ValueParser<'a> {
    dialect: &'a CsvDialect,
}

impl<'a> ValueParser<'a> {
    pub fn new(dialect: &'a CsvDialect) -> Self {
        Self { dialect }
    }

    /// 多列映射的单元格拼接(空格连接)
    pub fn combine_cells(cells: &[&str]) -> String {
        cells.join(" ").trim().to_string()
    }

    /// 多列日期格式 "%d/%m/%Y,%H:%M:%S" → "%d/%m/%Y %H:%M:%S"
    /// (与单元格拼接方式对齐)
    fn normalize_format(format: &str) -> String {
        format
            .split(',')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 解析单元格为类型化值(空单元格 → Null)
    ///
    /// date_format 仅对 Date/DateTime 生效, 由档案校验保证已填写
    pub fn parse(
        &self,
        kind: FieldKind,
        field: &str,
        date_format: Option<&str>,
        raw: &str,
        row_number: usize,
    ) -> ImportResult<FieldValue> {
        let value = raw.trim();
        if value.is_empty() {
            return Ok(FieldValue::Null);
        }

        match kind {
            FieldKind::Char => Ok(FieldValue::Char(value.to_string())),
            FieldKind::Integer => self.parse_integer(field, value, row_number),
            FieldKind::Numeric => self.parse_numeric(field, value, row_number),
            FieldKind::Boolean => self.parse_boolean(field, value, row_number),
            FieldKind::Date => self.parse_date(field, date_format, value, row_number),
            FieldKind::DateTime => self.parse_datetime(field, date_format, value, row_number),
            // 关系字段由行映射器按子字段类型解析, 不会走到这里
            FieldKind::Many2One | FieldKind::One2Many | FieldKind::Many2Many => {
                Err(ImportError::MappingError {
                    row: row_number,
                    message: format!("关系字段 {} 不支持直接取值", field),
                })
            }
        }
    }

    fn parse_integer(&self, field: &str, value: &str, row_number: usize) -> ImportResult<FieldValue> {
        let parsed = value
            .parse::<i64>()
            .map_err(|_| ImportError::TypeConversionError {
                row: row_number,
                field: field.to_string(),
                message: format!("无法解析为整数: {}", value),
            })?;
        if !(INTEGER_MIN..=INTEGER_MAX).contains(&parsed) {
            return Err(ImportError::IntegerOutOfRange {
                row: row_number,
                field: field.to_string(),
                value: value.to_string(),
            });
        }
        Ok(FieldValue::Integer(parsed))
    }

    fn parse_numeric(&self, field: &str, value: &str, row_number: usize) -> ImportResult<FieldValue> {
        let mut normalized = value.to_string();
        // 先去千分位, 再统一小数点
        if let Some(thousands) = self.dialect.thousands_separator.as_char() {
            normalized = normalized.replace(thousands, "");
        }
        let decimal = self.dialect.decimal_separator.as_char();
        if decimal != '.' {
            normalized = normalized.replace(decimal, ".");
        }
        normalized
            .parse::<f64>()
            .map(FieldValue::Numeric)
            .map_err(|_| ImportError::TypeConversionError {
                row: row_number,
                field: field.to_string(),
                message: format!("无法解析为数值: {}", value),
            })
    }

    fn parse_boolean(&self, field: &str, value: &str, row_number: usize) -> ImportResult<FieldValue> {
        match value.to_lowercase().as_str() {
            "1" | "true" | "t" | "yes" | "y" => Ok(FieldValue::Boolean(true)),
            "0" | "false" | "f" | "no" | "n" => Ok(FieldValue::Boolean(false)),
            _ => Err(ImportError::TypeConversionError {
                row: row_number,
                field: field.to_string(),
                message: format!("无法解析为布尔值: {}", value),
            }),
        }
    }

    fn parse_date(
        &self,
        field: &str,
        date_format: Option<&str>,
        value: &str,
        row_number: usize,
    ) -> ImportResult<FieldValue> {
        let format = Self::normalize_format(date_format.unwrap_or("%Y-%m-%d"));
        NaiveDate::parse_from_str(value, &format)
            .map(FieldValue::Date)
            .map_err(|_| ImportError::DateFormatError {
                row: row_number,
                field: field.to_string(),
                value: value.to_string(),
                format,
            })
    }

    fn parse_datetime(
        &self,
        field: &str,
        date_format: Option<&str>,
        value: &str,
        row_number: usize,
    ) -> ImportResult<FieldValue> {
        let format = Self::normalize_format(date_format.unwrap_or("%Y-%m-%d %H:%M:%S"));
        let naive = NaiveDateTime::parse_from_str(value, &format).map_err(|_| {
            ImportError::DateFormatError {
                row: row_number,
                field: field.to_string(),
                value: value.to_string(),
                format: format.clone(),
            }
        })?;
        Ok(FieldValue::DateTime(DateTime::<Utc>::from_naive_utc_and_offset(
            naive, Utc,
        )))
    }
}
