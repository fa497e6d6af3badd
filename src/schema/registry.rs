// ==========================================
// CSV 配置化导入系统 - 模型注册表
// ==========================================
// 职责: 显式的模型/字段描述体系, 取代宿主框架的运行时反射
// 用途: 映射期与落库期按名称查询字段类型与关系目标
// 红线: 注册表只描述结构, 不持有数据
// ==========================================

use crate::domain::types::FieldKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

// ==========================================
// RelationInfo - 关系目标描述
// ==========================================
// target:  关系指向的模型名
// inverse: one2many 反向字段(子模型上指向父记录的 many2one)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationInfo {
    pub target: String,
    pub inverse: Option<String>,
}

// ==========================================
// FieldDescriptor - 字段描述符
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub relation: Option<RelationInfo>,
}

impl FieldDescriptor {
    fn scalar(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            relation: None,
        }
    }

    pub fn char(name: &str) -> Self {
        Self::scalar(name, FieldKind::Char)
    }

    pub fn integer(name: &str) -> Self {
        Self::scalar(name, FieldKind::Integer)
    }

    pub fn numeric(name: &str) -> Self {
        Self::scalar(name, FieldKind::Numeric)
    }

    pub fn boolean(name: &str) -> Self {
        Self::scalar(name, FieldKind::Boolean)
    }

    pub fn date(name: &str) -> Self {
        Self::scalar(name, FieldKind::Date)
    }

    pub fn datetime(name: &str) -> Self {
        Self::scalar(name, FieldKind::DateTime)
    }

    pub fn many2one(name: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Many2One,
            relation: Some(RelationInfo {
                target: target.to_string(),
                inverse: None,
            }),
        }
    }

    pub fn one2many(name: &str, target: &str, inverse: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::One2Many,
            relation: Some(RelationInfo {
                target: target.to_string(),
                inverse: Some(inverse.to_string()),
            }),
        }
    }

    pub fn many2many(name: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Many2Many,
            relation: Some(RelationInfo {
                target: target.to_string(),
                inverse: None,
            }),
        }
    }

    /// 关系目标模型名(标量字段返回 None)
    pub fn target_model(&self) -> Option<&str> {
        self.relation.as_ref().map(|r| r.target.as_str())
    }
}

// ==========================================
// ModelDescriptor - 模型描述符
// ==========================================
// readonly_states: 处于这些状态的记录禁止更新
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub readonly_states: Vec<String>,
}

impl ModelDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
            readonly_states: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_readonly_states(mut self, states: &[&str]) -> Self {
        self.readonly_states = states.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_readonly_state(&self, state: &str) -> bool {
        self.readonly_states.iter().any(|s| s == state)
    }
}

// ==========================================
// SchemaRegistry - 模型注册表
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaRegistry {
    models: HashMap<String, ModelDescriptor>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册模型(同名覆盖)
    pub fn register(&mut self, model: ModelDescriptor) {
        self.models.insert(model.name.clone(), model);
    }

    pub fn model(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.get(name)
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.values()
    }

    /// 查询字段描述符
    pub fn field(&self, model: &str, field: &str) -> Option<&FieldDescriptor> {
        self.models.get(model).and_then(|m| m.field(field))
    }

    /// 从 JSON 文件加载注册表(CLI 入口使用)
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let registry: SchemaRegistry = serde_json::from_str(&data)?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party_registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry.register(
            ModelDescriptor::new("party")
                .with_field(FieldDescriptor::char("name"))
                .with_field(FieldDescriptor::one2many(
                    "addresses",
                    "party.address",
                    "party",
                )),
        );
        registry.register(
            ModelDescriptor::new("party.address")
                .with_field(FieldDescriptor::char("street"))
                .with_field(FieldDescriptor::many2one("party", "party")),
        );
        registry
    }

    #[test]
    fn test_field_lookup() {
        let registry = party_registry();
        let field = registry.field("party", "addresses").unwrap();
        assert_eq!(field.kind, FieldKind::One2Many);
        assert_eq!(field.target_model(), Some("party.address"));
        assert!(registry.field("party", "missing").is_none());
        assert!(registry.field("missing", "name").is_none());
    }

    #[test]
    fn test_readonly_states() {
        let model = ModelDescriptor::new("account.statement")
            .with_readonly_states(&["posted", "validated"]);
        assert!(model.is_readonly_state("posted"));
        assert!(!model.is_readonly_state("draft"));
    }

    #[test]
    fn test_registry_json_roundtrip() {
        let registry = party_registry();
        let json = serde_json::to_string(&registry).unwrap();
        let restored: SchemaRegistry = serde_json::from_str(&json).unwrap();
        assert!(restored.model("party.address").is_some());
    }
}
