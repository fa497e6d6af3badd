// ==========================================
// CSV 配置化导入系统 - 导入器 Trait
// ==========================================
// 职责: 定义导入主接口(不包含实现)
// ==========================================

use crate::domain::log::ImportReport;
use crate::domain::profile::ImportProfile;
use crate::importer::error::ImportResult;
use std::path::Path;

// ==========================================
// CsvImporter Trait
// ==========================================
// 用途: 导入主接口
// 实现者: CsvImporterImpl
pub trait CsvImporter: Send + Sync {
    /// 按档案名执行导入
    ///
    /// # 参数
    /// - profile_name: 已保存档案的名称
    /// - file_path: CSV 文件路径
    ///
    /// # 返回
    /// - Ok(ImportReport): 批次信息 + 逐行结果
    /// - Err: 档案缺失/校验失败/文件级错误
    ///
    /// # 导入流程(5 个阶段)
    /// 1. 档案读取与校验
    /// 2. 文件解析(整文件读入, 去表头/空行)
    /// 3. 行映射(列 → 字段, 关系列 → 链接/子记录)
    /// 4. 建档/更新决策(查找键匹配域)
    /// 5. 落库 + 逐行日志(行级失败不中断全局)
    fn import_file(&self, profile_name: &str, file_path: &Path) -> ImportResult<ImportReport>;

    /// 按内存中的档案执行导入(不经档案仓储)
    fn import_with_profile(
        &self,
        profile: &ImportProfile,
        file_path: &Path,
    ) -> ImportResult<ImportReport>;
}
