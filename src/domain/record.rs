// ==========================================
// CSV 配置化导入系统 - 记录负载领域模型
// ==========================================
// 职责: 行映射产物(字段值 / 关系链接 / 嵌套子记录)
// 生命周期: 仅在导入管道内, 最终交由 RecordStore 落库
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// FieldValue - 类型化单元格值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Char(String),
    Integer(i64),
    Numeric(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Char(v) => write!(f, "{}", v),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Numeric(v) => write!(f, "{}", v),
            FieldValue::Boolean(v) => write!(f, "{}", v),
            FieldValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            FieldValue::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            FieldValue::Null => write!(f, "NULL"),
        }
    }
}

// ==========================================
// MappedValue - 字段映射结果
// ==========================================
// Scalar:   标量字段值
// Link:     many2one 链接(落库时按 key_field=key 查找/创建目标记录)
// Children: one2many / many2many 嵌套创建负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MappedValue {
    Scalar(FieldValue),
    Link {
        model: String,
        key_field: String,
        key: FieldValue,
    },
    Children(Vec<RecordPayload>),
}

// ==========================================
// RecordPayload - 记录负载
// ==========================================
// 红线: values 保持列映射声明顺序, 同名关系字段的
//       多个列映射各自追加一条子记录(不合并)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPayload {
    pub model: String,
    pub values: Vec<(String, MappedValue)>,
}

impl RecordPayload {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            values: Vec::new(),
        }
    }

    /// 写入标量字段值(同名字段覆盖)
    pub fn set_scalar(&mut self, field: &str, value: FieldValue) {
        self.set(field, MappedValue::Scalar(value));
    }

    /// 写入 many2one 链接(同名字段覆盖)
    pub fn set_link(&mut self, field: &str, model: &str, key_field: &str, key: FieldValue) {
        self.set(
            field,
            MappedValue::Link {
                model: model.to_string(),
                key_field: key_field.to_string(),
                key,
            },
        );
    }

    /// 追加嵌套子记录: 每个关系列映射产出独立的子记录,
    /// 街道列 + 邮编列各生成一条地址
    pub fn push_child(&mut self, field: &str, child: RecordPayload) {
        if let Some((_, MappedValue::Children(children))) =
            self.values.iter_mut().find(|(name, _)| name == field)
        {
            children.push(child);
            return;
        }
        self.values
            .push((field.to_string(), MappedValue::Children(vec![child])));
    }

    pub fn get(&self, field: &str) -> Option<&MappedValue> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn set(&mut self, field: &str, value: MappedValue) {
        if let Some(slot) = self.values.iter_mut().find(|(name, _)| name == field) {
            slot.1 = value;
            return;
        }
        self.values.push((field.to_string(), value));
    }
}
