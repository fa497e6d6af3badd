// ==========================================
// CSV 配置化导入系统 - 文件解析器实现
// ==========================================
// 职责: 按档案方言读取 CSV 文件为原始行
// 流程: 读字节 → 按声明编码解码 → csv 解析 → 去表头/空行
// ==========================================

use crate::domain::profile::CsvDialect;
use crate::domain::types::CharacterEncoding;
use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use encoding_rs::{UTF_8, WINDOWS_1252};
use std::path::Path;

// ==========================================
// ParsedRow - 解析产物
// ==========================================
// number: 文件内物理行号(1 起, 表头与被跳过的空行占号不占位)
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub number: usize,
    pub cells: Vec<String>,
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口(管道阶段 0)
// 实现者: CsvFileParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行(按位置的单元格列表, 带物理行号)
    ///
    /// header=true 时首行被剔除; 全空白行被跳过;
    /// 整个文件一次读入内存后再处理
    fn parse_rows(&self, file_path: &Path, dialect: &CsvDialect) -> ImportResult<Vec<ParsedRow>>;
}

// ==========================================
// CsvFileParser 实现
// ==========================================
pub struct CsvFileParser;

impl CsvFileParser {
    /// 按声明编码解码文件字节
    ///
    /// latin-1 档案按 windows-1252 解码(单字节全映射, 不会失败);
    /// utf-8 档案遇到非法序列时报编码错误而不是静默替换
    fn decode(bytes: &[u8], encoding: CharacterEncoding) -> ImportResult<String> {
        let codec = match encoding {
            CharacterEncoding::Utf8 => UTF_8,
            CharacterEncoding::Latin1 => WINDOWS_1252,
        };
        let (text, _, had_errors) = codec.decode(bytes);
        if had_errors {
            return Err(ImportError::EncodingError {
                encoding: encoding.as_str().to_string(),
            });
        }
        Ok(text.into_owned())
    }
}

impl FileParser for CsvFileParser {
    fn parse_rows(&self, file_path: &Path, dialect: &CsvDialect) -> ImportResult<Vec<ParsedRow>> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(
                file_path.display().to_string(),
            ));
        }

        let bytes = std::fs::read(file_path)?;
        let text = Self::decode(&bytes, dialect.encoding)?;

        let mut builder = ReaderBuilder::new();
        builder
            .has_headers(false) // 表头剔除在下方统一处理
            .flexible(true) // 允许行长度不一致
            .delimiter(dialect.separator.as_byte());
        match dialect.quote {
            Some(q) => {
                builder.quote(q as u8);
            }
            None => {
                builder.quoting(false);
            }
        }
        let mut reader = builder.from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;

            // 物理行号取自记录起始位置, 空行被剔除后行号不漂移
            let number = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 1);

            // 首行为表头时剔除
            if idx == 0 && dialect.header {
                continue;
            }

            let cells: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();

            // 跳过完全空白的行
            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }

            rows.push(ParsedRow { number, cells });
        }

        Ok(rows)
    }
}
