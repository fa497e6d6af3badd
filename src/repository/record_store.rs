// ==========================================
// CSV 配置化导入系统 - 记录存取 Trait
// ==========================================
// 职责: 定义宿主记录系统的存取接口(不包含实现)
// 红线: Store 不含映射/决策逻辑, 只做域查询与 CRUD
// ==========================================

use crate::domain::record::{FieldValue, RecordPayload};
use crate::repository::error::StoreResult;

/// 记录主键
pub type RecordId = i64;

/// 匹配域: 字段名 = 值 的等值条件合取
pub type Domain = Vec<(String, FieldValue)>;

// ==========================================
// RecordStore Trait
// ==========================================
// 用途: 导入管道的落库/查询出口
// 实现者: SqliteRecordStore(参考实现)
pub trait RecordStore: Send + Sync {
    /// 按匹配域查询记录 id(按 id 升序; 空域返回全部)
    fn search(&self, model: &str, domain: &Domain) -> StoreResult<Vec<RecordId>>;

    /// 创建记录
    ///
    /// 嵌套子记录与 many2one 链接在实现内原子落库:
    /// 任一子写入失败则整条记录回滚
    fn create(&self, payload: &RecordPayload) -> StoreResult<RecordId>;

    /// 更新记录
    ///
    /// 记录状态处于模型的只读状态集合时返回 WriteForbidden,
    /// 不允许静默空操作
    fn update(&self, id: RecordId, payload: &RecordPayload) -> StoreResult<()>;

    /// 读取记录状态(模型无状态语义时返回 None)
    fn state(&self, model: &str, id: RecordId) -> StoreResult<Option<String>>;
}
