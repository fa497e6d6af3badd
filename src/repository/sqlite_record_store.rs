// ==========================================
// CSV 配置化导入系统 - SQLite 记录存取实现
// ==========================================
// 职责: 按模型注册表落库的参考存取实现
// 表结构: 标量字段 → 同名列, many2one → {field}_id 列,
//         one2many → 子表反向列, many2many → 中间表
// 红线: 每条记录(含嵌套子记录)在单个事务内原子写入
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::record::{FieldValue, MappedValue, RecordPayload};
use crate::domain::types::{FieldKind, LinkPolicy};
use crate::repository::error::{StoreError, StoreResult};
use crate::repository::record_store::{Domain, RecordId, RecordStore};
use crate::schema::registry::{FieldDescriptor, SchemaRegistry};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// ==========================================
// SqliteRecordStore
// ==========================================
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
    registry: Arc<SchemaRegistry>,
    link_policy: LinkPolicy,
}

impl SqliteRecordStore {
    /// 打开数据库并按注册表建表
    pub fn new(db_path: &str, registry: Arc<SchemaRegistry>) -> StoreResult<Self> {
        let conn =
            open_sqlite_connection(db_path).map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        Self::from_connection(Arc::new(Mutex::new(conn)), registry)
    }

    /// 从已有连接创建(与其他仓储共享连接)
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
        registry: Arc<SchemaRegistry>,
    ) -> StoreResult<Self> {
        let store = Self {
            conn,
            registry,
            link_policy: LinkPolicy::CreateMissing,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// 设置 many2one 无匹配时的解析策略
    pub fn with_link_policy(mut self, policy: LinkPolicy) -> Self {
        self.link_policy = policy;
        self
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    /// 模型名 → 表名 ("party.address" → "party_address")
    fn table_name(model: &str) -> String {
        model.replace(['.', '-'], "_")
    }

    /// 字段描述符 → 列名 (many2one 带 _id 后缀)
    fn column_name(field: &FieldDescriptor) -> String {
        match field.kind {
            FieldKind::Many2One => format!("{}_id", field.name),
            _ => field.name.clone(),
        }
    }

    fn sql_type(kind: FieldKind) -> &'static str {
        match kind {
            FieldKind::Char | FieldKind::Date | FieldKind::DateTime => "TEXT",
            FieldKind::Integer | FieldKind::Boolean | FieldKind::Many2One => "INTEGER",
            FieldKind::Numeric => "REAL",
            FieldKind::One2Many | FieldKind::Many2Many => "",
        }
    }

    fn to_sql_value(value: &FieldValue) -> Value {
        match value {
            FieldValue::Char(v) => Value::Text(v.clone()),
            FieldValue::Integer(v) => Value::Integer(*v),
            FieldValue::Numeric(v) => Value::Real(*v),
            FieldValue::Boolean(v) => Value::Integer(i64::from(*v)),
            FieldValue::Date(v) => Value::Text(v.format("%Y-%m-%d").to_string()),
            FieldValue::DateTime(v) => Value::Text(v.to_rfc3339()),
            FieldValue::Null => Value::Null,
        }
    }

    /// 按注册表建表(幂等)
    fn ensure_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        for model in self.registry.models() {
            let table = Self::table_name(&model.name);
            let mut columns =
                vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(), "state TEXT".to_string()];
            for field in &model.fields {
                match field.kind {
                    FieldKind::One2Many => continue, // 反向列在子表上
                    FieldKind::Many2Many => {
                        let junction = format!("{}__{}", table, field.name);
                        conn.execute_batch(&format!(
                            "CREATE TABLE IF NOT EXISTS \"{}\" (\
                             parent_id INTEGER NOT NULL, child_id INTEGER NOT NULL)",
                            junction
                        ))?;
                    }
                    kind => {
                        columns.push(format!(
                            "\"{}\" {}",
                            Self::column_name(field),
                            Self::sql_type(kind)
                        ));
                    }
                }
            }
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
                table,
                columns.join(", ")
            ))?;
        }
        Ok(())
    }

    /// 域查询(内部, 供 search/resolve_link 复用)
    fn search_ids(
        conn: &Connection,
        registry: &SchemaRegistry,
        model: &str,
        domain: &Domain,
    ) -> StoreResult<Vec<RecordId>> {
        let descriptor = registry
            .model(model)
            .ok_or_else(|| StoreError::UnknownModel(model.to_string()))?;
        let table = Self::table_name(model);

        let mut clauses = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        for (field_name, value) in domain {
            let field =
                descriptor
                    .field(field_name)
                    .ok_or_else(|| StoreError::UnknownField {
                        model: model.to_string(),
                        field: field_name.clone(),
                    })?;
            let column = Self::column_name(field);
            if value.is_null() {
                clauses.push(format!("\"{}\" IS NULL", column));
            } else {
                params.push(Self::to_sql_value(value));
                clauses.push(format!("\"{}\" = ?{}", column, params.len()));
            }
        }

        let sql = if clauses.is_empty() {
            format!("SELECT id FROM \"{}\" ORDER BY id", table)
        } else {
            format!(
                "SELECT id FROM \"{}\" WHERE {} ORDER BY id",
                table,
                clauses.join(" AND ")
            )
        };

        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(params.iter()), |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// many2one 链接解析: 按 key_field=key 查找目标记录,
    /// 无匹配时按策略创建或报错; 多匹配取 id 最小者
    fn resolve_link(
        conn: &Connection,
        registry: &SchemaRegistry,
        policy: LinkPolicy,
        target: &str,
        key_field: &str,
        key: &FieldValue,
    ) -> StoreResult<RecordId> {
        let domain = vec![(key_field.to_string(), key.clone())];
        let ids = Self::search_ids(conn, registry, target, &domain)?;
        if let Some(id) = ids.first() {
            return Ok(*id);
        }
        match policy {
            LinkPolicy::CreateMissing => {
                debug!(model = %target, field = %key_field, "链接目标缺失, 自动创建");
                let mut payload = RecordPayload::new(target);
                payload.set_scalar(key_field, key.clone());
                Self::insert_record(conn, registry, policy, &payload, None)
            }
            LinkPolicy::Fail => Err(StoreError::UnresolvedLink {
                model: target.to_string(),
                field: key_field.to_string(),
                value: key.to_string(),
            }),
        }
    }

    /// 递归插入记录(在调用方事务内执行)
    ///
    /// parent: 作为嵌套子记录插入时, 指向父记录的反向列与父 id
    fn insert_record(
        conn: &Connection,
        registry: &SchemaRegistry,
        policy: LinkPolicy,
        payload: &RecordPayload,
        parent: Option<(&str, RecordId)>,
    ) -> StoreResult<RecordId> {
        let descriptor = registry
            .model(&payload.model)
            .ok_or_else(|| StoreError::UnknownModel(payload.model.clone()))?;
        let table = Self::table_name(&payload.model);

        let mut columns: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        // (字段描述符, 子记录列表), 父记录插入后处理
        let mut children: Vec<(&FieldDescriptor, &Vec<RecordPayload>)> = Vec::new();

        for (field_name, mapped) in &payload.values {
            let field =
                descriptor
                    .field(field_name)
                    .ok_or_else(|| StoreError::UnknownField {
                        model: payload.model.clone(),
                        field: field_name.clone(),
                    })?;
            match mapped {
                MappedValue::Scalar(value) => {
                    columns.push(format!("\"{}\"", Self::column_name(field)));
                    params.push(Self::to_sql_value(value));
                }
                MappedValue::Link {
                    model: target,
                    key_field,
                    key,
                } => {
                    let linked = Self::resolve_link(conn, registry, policy, target, key_field, key)?;
                    columns.push(format!("\"{}\"", Self::column_name(field)));
                    params.push(Value::Integer(linked));
                }
                MappedValue::Children(list) => children.push((field, list)),
            }
        }

        if let Some((column, parent_id)) = parent {
            columns.push(format!("\"{}\"", column));
            params.push(Value::Integer(parent_id));
        }

        if columns.is_empty() {
            conn.execute(&format!("INSERT INTO \"{}\" DEFAULT VALUES", table), [])?;
        } else {
            let placeholders: Vec<String> =
                (1..=params.len()).map(|i| format!("?{}", i)).collect();
            conn.execute(
                &format!(
                    "INSERT INTO \"{}\" ({}) VALUES ({})",
                    table,
                    columns.join(", "),
                    placeholders.join(", ")
                ),
                params_from_iter(params.iter()),
            )?;
        }
        let record_id = conn.last_insert_rowid();

        // 嵌套子记录
        for (field, list) in children {
            match field.kind {
                FieldKind::One2Many => {
                    let inverse = field
                        .relation
                        .as_ref()
                        .and_then(|r| r.inverse.as_deref())
                        .ok_or_else(|| {
                            StoreError::QueryError(format!(
                                "one2many 字段缺少反向字段: {}.{}",
                                payload.model, field.name
                            ))
                        })?;
                    let inverse_column = format!("{}_id", inverse);
                    for child in list {
                        Self::insert_record(
                            conn,
                            registry,
                            policy,
                            child,
                            Some((&inverse_column, record_id)),
                        )?;
                    }
                }
                FieldKind::Many2Many => {
                    let junction = format!("{}__{}", table, field.name);
                    for child in list {
                        let child_id = Self::insert_record(conn, registry, policy, child, None)?;
                        conn.execute(
                            &format!(
                                "INSERT INTO \"{}\" (parent_id, child_id) VALUES (?1, ?2)",
                                junction
                            ),
                            [record_id, child_id],
                        )?;
                    }
                }
                _ => {
                    return Err(StoreError::QueryError(format!(
                        "非关系字段不接受子记录: {}.{}",
                        payload.model, field.name
                    )));
                }
            }
        }

        Ok(record_id)
    }

    fn query_state(conn: &Connection, table: &str, id: RecordId) -> StoreResult<Option<Option<String>>> {
        let state = conn
            .query_row(
                &format!("SELECT state FROM \"{}\" WHERE id = ?1", table),
                [id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(state)
    }

    // ===== 测试/巡检辅助 =====

    /// 记录总数
    pub fn count(&self, model: &str) -> StoreResult<usize> {
        let conn = self.lock()?;
        let table = Self::table_name(model);
        let n: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| {
                row.get(0)
            })?;
        Ok(n as usize)
    }

    /// 读取文本列值
    pub fn read_text(&self, model: &str, id: RecordId, field: &str) -> StoreResult<Option<String>> {
        let descriptor = self
            .registry
            .model(model)
            .ok_or_else(|| StoreError::UnknownModel(model.to_string()))?;
        let column = descriptor
            .field(field)
            .map(Self::column_name)
            .ok_or_else(|| StoreError::UnknownField {
                model: model.to_string(),
                field: field.to_string(),
            })?;
        let conn = self.lock()?;
        let table = Self::table_name(model);
        let value = conn
            .query_row(
                &format!("SELECT \"{}\" FROM \"{}\" WHERE id = ?1", column, table),
                [id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound {
                model: model.to_string(),
                id,
            })?;
        Ok(value)
    }

    /// 写入记录状态(模拟宿主侧的状态流转)
    pub fn set_state(&self, model: &str, id: RecordId, state: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        let table = Self::table_name(model);
        let changed = conn.execute(
            &format!("UPDATE \"{}\" SET state = ?1 WHERE id = ?2", table),
            rusqlite::params![state, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                model: model.to_string(),
                id,
            });
        }
        Ok(())
    }
}

impl RecordStore for SqliteRecordStore {
    fn search(&self, model: &str, domain: &Domain) -> StoreResult<Vec<RecordId>> {
        let conn = self.lock()?;
        Self::search_ids(&conn, &self.registry, model, domain)
    }

    fn create(&self, payload: &RecordPayload) -> StoreResult<RecordId> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::TransactionError(e.to_string()))?;
        let id = Self::insert_record(&tx, &self.registry, self.link_policy, payload, None)?;
        tx.commit()
            .map_err(|e| StoreError::TransactionError(e.to_string()))?;
        Ok(id)
    }

    fn update(&self, id: RecordId, payload: &RecordPayload) -> StoreResult<()> {
        let descriptor = self
            .registry
            .model(&payload.model)
            .ok_or_else(|| StoreError::UnknownModel(payload.model.clone()))?;
        let table = Self::table_name(&payload.model);

        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::TransactionError(e.to_string()))?;

        // 状态检查: 只读状态禁止修改, 必须显式报错
        let state = Self::query_state(&tx, &table, id)?.ok_or_else(|| StoreError::NotFound {
            model: payload.model.clone(),
            id,
        })?;
        if let Some(state) = state {
            if descriptor.is_readonly_state(&state) {
                return Err(StoreError::WriteForbidden {
                    model: payload.model.clone(),
                    id,
                    state,
                });
            }
        }

        let mut assignments: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        let mut children: Vec<(&FieldDescriptor, &Vec<RecordPayload>)> = Vec::new();

        for (field_name, mapped) in &payload.values {
            let field =
                descriptor
                    .field(field_name)
                    .ok_or_else(|| StoreError::UnknownField {
                        model: payload.model.clone(),
                        field: field_name.clone(),
                    })?;
            match mapped {
                MappedValue::Scalar(value) => {
                    params.push(Self::to_sql_value(value));
                    assignments.push(format!(
                        "\"{}\" = ?{}",
                        Self::column_name(field),
                        params.len()
                    ));
                }
                MappedValue::Link {
                    model: target,
                    key_field,
                    key,
                } => {
                    let linked = Self::resolve_link(
                        &tx,
                        &self.registry,
                        self.link_policy,
                        target,
                        key_field,
                        key,
                    )?;
                    params.push(Value::Integer(linked));
                    assignments.push(format!(
                        "\"{}\" = ?{}",
                        Self::column_name(field),
                        params.len()
                    ));
                }
                MappedValue::Children(list) => children.push((field, list)),
            }
        }

        if !assignments.is_empty() {
            params.push(Value::Integer(id));
            tx.execute(
                &format!(
                    "UPDATE \"{}\" SET {} WHERE id = ?{}",
                    table,
                    assignments.join(", "),
                    params.len()
                ),
                params_from_iter(params.iter()),
            )?;
        }

        // 更新时的子记录按追加处理
        for (field, list) in children {
            match field.kind {
                FieldKind::One2Many => {
                    let inverse = field
                        .relation
                        .as_ref()
                        .and_then(|r| r.inverse.as_deref())
                        .ok_or_else(|| {
                            StoreError::QueryError(format!(
                                "one2many 字段缺少反向字段: {}.{}",
                                payload.model, field.name
                            ))
                        })?;
                    let inverse_column = format!("{}_id", inverse);
                    for child in list {
                        Self::insert_record(
                            &tx,
                            &self.registry,
                            self.link_policy,
                            child,
                            Some((&inverse_column, id)),
                        )?;
                    }
                }
                FieldKind::Many2Many => {
                    let junction = format!("{}__{}", table, field.name);
                    for child in list {
                        let child_id =
                            Self::insert_record(&tx, &self.registry, self.link_policy, child, None)?;
                        tx.execute(
                            &format!(
                                "INSERT INTO \"{}\" (parent_id, child_id) VALUES (?1, ?2)",
                                junction
                            ),
                            [id, child_id],
                        )?;
                    }
                }
                _ => {
                    return Err(StoreError::QueryError(format!(
                        "非关系字段不接受子记录: {}.{}",
                        payload.model, field.name
                    )));
                }
            }
        }

        tx.commit()
            .map_err(|e| StoreError::TransactionError(e.to_string()))?;
        Ok(())
    }

    fn state(&self, model: &str, id: RecordId) -> StoreResult<Option<String>> {
        let conn = self.lock()?;
        let table = Self::table_name(model);
        Self::query_state(&conn, &table, id)?.ok_or_else(|| StoreError::NotFound {
            model: model.to_string(),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::{FieldDescriptor, ModelDescriptor};
    use tempfile::NamedTempFile;

    fn registry() -> Arc<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        registry.register(
            ModelDescriptor::new("party")
                .with_field(FieldDescriptor::char("name"))
                .with_field(FieldDescriptor::one2many(
                    "addresses",
                    "party.address",
                    "party",
                ))
                .with_readonly_states(&["archived"]),
        );
        registry.register(
            ModelDescriptor::new("party.address")
                .with_field(FieldDescriptor::char("street"))
                .with_field(FieldDescriptor::char("zip"))
                .with_field(FieldDescriptor::many2one("party", "party")),
        );
        Arc::new(registry)
    }

    fn store() -> (NamedTempFile, SqliteRecordStore) {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_str().unwrap().to_string();
        let store = SqliteRecordStore::new(&path, registry()).unwrap();
        (temp, store)
    }

    fn party_payload(name: &str) -> RecordPayload {
        let mut payload = RecordPayload::new("party");
        payload.set_scalar("name", FieldValue::Char(name.to_string()));
        payload
    }

    #[test]
    fn test_create_and_search() {
        let (_temp, store) = store();
        let id = store.create(&party_payload("Zikzakmedia")).unwrap();

        let domain = vec![(
            "name".to_string(),
            FieldValue::Char("Zikzakmedia".to_string()),
        )];
        assert_eq!(store.search("party", &domain).unwrap(), vec![id]);
        assert!(store
            .search("party", &vec![("name".to_string(), FieldValue::Char("x".into()))])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_nested_children_atomic() {
        let (_temp, store) = store();
        let mut payload = party_payload("Acme");
        let mut street = RecordPayload::new("party.address");
        street.set_scalar("street", FieldValue::Char("St. Zikzakmedia 1".to_string()));
        let mut zip = RecordPayload::new("party.address");
        zip.set_scalar("zip", FieldValue::Char("08720".to_string()));
        payload.push_child("addresses", street);
        payload.push_child("addresses", zip);

        let parent_id = store.create(&payload).unwrap();
        assert_eq!(store.count("party.address").unwrap(), 2);

        // 子记录携带反向外键
        let children = store
            .search(
                "party.address",
                &vec![("party".to_string(), FieldValue::Integer(parent_id))],
            )
            .unwrap();
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_update_overwrites() {
        let (_temp, store) = store();
        let id = store.create(&party_payload("Old")).unwrap();
        store.update(id, &party_payload("New")).unwrap();

        assert_eq!(store.count("party").unwrap(), 1);
        assert_eq!(
            store.read_text("party", id, "name").unwrap(),
            Some("New".to_string())
        );
    }

    #[test]
    fn test_update_readonly_state_forbidden() {
        let (_temp, store) = store();
        let id = store.create(&party_payload("Frozen")).unwrap();
        store.set_state("party", id, "archived").unwrap();

        let err = store.update(id, &party_payload("Thawed")).unwrap_err();
        assert!(matches!(err, StoreError::WriteForbidden { .. }));
        // 禁止静默空操作: 原值保持不变
        assert_eq!(
            store.read_text("party", id, "name").unwrap(),
            Some("Frozen".to_string())
        );
    }

    #[test]
    fn test_update_missing_record() {
        let (_temp, store) = store();
        let err = store.update(999, &party_payload("x")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_link_policy_fail() {
        let (_temp, store) = store();
        let store = store.with_link_policy(LinkPolicy::Fail);
        let mut address = RecordPayload::new("party.address");
        address.set_link(
            "party",
            "party",
            "name",
            FieldValue::Char("Nobody".to_string()),
        );

        let err = store.create(&address).unwrap_err();
        assert!(matches!(err, StoreError::UnresolvedLink { .. }));
    }

    #[test]
    fn test_link_policy_create_missing() {
        let (_temp, store) = store();
        let mut address = RecordPayload::new("party.address");
        address.set_scalar("street", FieldValue::Char("Main 1".to_string()));
        address.set_link(
            "party",
            "party",
            "name",
            FieldValue::Char("AutoCreated".to_string()),
        );

        store.create(&address).unwrap();
        assert_eq!(store.count("party").unwrap(), 1);

        // 第二次链接同名目标时复用已有记录
        let mut second = RecordPayload::new("party.address");
        second.set_link(
            "party",
            "party",
            "name",
            FieldValue::Char("AutoCreated".to_string()),
        );
        store.create(&second).unwrap();
        assert_eq!(store.count("party").unwrap(), 1);
    }
}
