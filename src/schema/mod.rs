// ==========================================
// CSV 配置化导入系统 - 模型注册表层
// ==========================================
// 职责: 模型/字段结构描述与档案校验
// ==========================================

pub mod registry;
pub mod validate;

pub use registry::{FieldDescriptor, ModelDescriptor, RelationInfo, SchemaRegistry};
pub use validate::{validate_profile, ProfileError};
