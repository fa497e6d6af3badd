// ==========================================
// CSV 配置化导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口(不包含实现)
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::profile::CsvDialect;
use crate::domain::types::LinkPolicy;
use crate::repository::error::StoreResult;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager(从 config_kv 表读取)
pub trait ImportConfigReader: Send + Sync {
    /// 新建档案的默认 CSV 方言
    ///
    /// 面向建档前端(宿主界面/后续 CLI 子命令)的接缝:
    /// 导入管道本身只读档案里已存的方言, 不经此方法
    ///
    /// # 默认值
    /// - 分号分隔, 双引号包裹, 首行表头, UTF-8,
    ///   千分位 '.', 小数点 ','
    fn default_dialect(&self) -> StoreResult<CsvDialect>;

    /// many2one 链接无匹配时的解析策略
    ///
    /// # 默认值
    /// - CreateMissing(自动创建目标记录)
    fn link_policy(&self) -> StoreResult<LinkPolicy>;
}
