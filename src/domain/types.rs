// ==========================================
// CSV 配置化导入系统 - 领域类型定义
// ==========================================
// 职责: 定义导入档案与字段体系共享的枚举类型
// 红线: 枚举以文本码存库, 与数据库列值保持一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 字段类型 (Field Kind)
// ==========================================
// 对齐: 模型注册表 field 描述符的 kind 列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Char,
    Integer,
    Numeric,
    Boolean,
    Date,
    DateTime,
    Many2One,
    One2Many,
    Many2Many,
}

impl FieldKind {
    /// 是否为关系字段(需要子字段映射)
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            FieldKind::Many2One | FieldKind::One2Many | FieldKind::Many2Many
        )
    }

    /// 是否可作为查找键参与匹配域(仅标量字段可比较)
    pub fn is_comparable(&self) -> bool {
        !self.is_relational()
    }

    /// 是否需要日期格式
    pub fn needs_date_format(&self) -> bool {
        matches!(self, FieldKind::Date | FieldKind::DateTime)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Char => "char",
            FieldKind::Integer => "integer",
            FieldKind::Numeric => "numeric",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::DateTime => "datetime",
            FieldKind::Many2One => "many2one",
            FieldKind::One2Many => "one2many",
            FieldKind::Many2Many => "many2many",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 行处理结果状态 (Row Status)
// ==========================================
// 用途: 每行导入结果落入 import_row_log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowStatus {
    Created, // 新建记录
    Updated, // 更新已有记录
    Skipped, // 按策略跳过
    Failed,  // 行级失败(原因见 message)
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Created => "created",
            RowStatus::Updated => "updated",
            RowStatus::Skipped => "skipped",
            RowStatus::Failed => "failed",
        }
    }

    /// 从数据库文本码还原(未知值归入 Failed)
    pub fn from_code(code: &str) -> RowStatus {
        match code.trim() {
            "created" => RowStatus::Created,
            "updated" => RowStatus::Updated,
            "skipped" => RowStatus::Skipped,
            _ => RowStatus::Failed,
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// CSV 分隔符 (Separator)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Separator {
    Comma,     // ,
    Semicolon, // ;
    Tab,       // \t
    Pipe,      // |
}

impl Separator {
    pub fn as_byte(&self) -> u8 {
        match self {
            Separator::Comma => b',',
            Separator::Semicolon => b';',
            Separator::Tab => b'\t',
            Separator::Pipe => b'|',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Separator::Comma => ",",
            Separator::Semicolon => ";",
            Separator::Tab => "tab",
            Separator::Pipe => "|",
        }
    }

    pub fn from_code(code: &str) -> Option<Separator> {
        match code.trim() {
            "," => Some(Separator::Comma),
            ";" => Some(Separator::Semicolon),
            "tab" | "\t" => Some(Separator::Tab),
            "|" => Some(Separator::Pipe),
            _ => None,
        }
    }
}

// ==========================================
// 字符编码 (Character Encoding)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterEncoding {
    Utf8,
    Latin1,
}

impl CharacterEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            CharacterEncoding::Utf8 => "utf-8",
            CharacterEncoding::Latin1 => "latin-1",
        }
    }

    pub fn from_code(code: &str) -> Option<CharacterEncoding> {
        match code.trim().to_lowercase().as_str() {
            "utf-8" | "utf8" => Some(CharacterEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Some(CharacterEncoding::Latin1),
            _ => None,
        }
    }
}

// ==========================================
// 千分位分隔符 (Thousands Separator)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThousandsSeparator {
    None,
    Dot,
    Comma,
}

impl ThousandsSeparator {
    pub fn as_char(&self) -> Option<char> {
        match self {
            ThousandsSeparator::None => None,
            ThousandsSeparator::Dot => Some('.'),
            ThousandsSeparator::Comma => Some(','),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThousandsSeparator::None => "none",
            ThousandsSeparator::Dot => ".",
            ThousandsSeparator::Comma => ",",
        }
    }

    pub fn from_code(code: &str) -> Option<ThousandsSeparator> {
        match code.trim() {
            "none" | "" => Some(ThousandsSeparator::None),
            "." => Some(ThousandsSeparator::Dot),
            "," => Some(ThousandsSeparator::Comma),
            _ => None,
        }
    }
}

// ==========================================
// 小数点分隔符 (Decimal Separator)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecimalSeparator {
    Dot,
    Comma,
}

impl DecimalSeparator {
    pub fn as_char(&self) -> char {
        match self {
            DecimalSeparator::Dot => '.',
            DecimalSeparator::Comma => ',',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DecimalSeparator::Dot => ".",
            DecimalSeparator::Comma => ",",
        }
    }

    pub fn from_code(code: &str) -> Option<DecimalSeparator> {
        match code.trim() {
            "." => Some(DecimalSeparator::Dot),
            "," => Some(DecimalSeparator::Comma),
            _ => None,
        }
    }
}

// ==========================================
// 关系引用解析策略 (Link Policy)
// ==========================================
// 用途: many2one 链接在目标模型中无匹配时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkPolicy {
    CreateMissing, // 自动创建缺失的目标记录
    Fail,          // 行级失败
}

impl LinkPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkPolicy::CreateMissing => "create_missing",
            LinkPolicy::Fail => "fail",
        }
    }

    pub fn from_code(code: &str) -> Option<LinkPolicy> {
        match code.trim() {
            "create_missing" => Some(LinkPolicy::CreateMissing),
            "fail" => Some(LinkPolicy::Fail),
            _ => None,
        }
    }
}
