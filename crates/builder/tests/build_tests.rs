//! End-to-end descriptor compilation tests
//!
//! Each test drives one or more [`InterfaceBuilder`]s against a shared
//! registry and asserts on the registered metadata: deferred resolution
//! across interfaces, cache sharing, key generation, discriminators, and
//! signature-derived result types.

use std::sync::Arc;

use rowbind_builder::{
    CacheMarker, CacheRefMarker, CaseMarker, CtorArgMarker, DiscriminatorMarker,
    InterfaceBuilder, InterfaceDescriptor, KeyMarker, MethodDescriptor, NestedObject,
    OptionsMarker, PropertyMarker, StatementMarker,
};
use rowbind_core::{
    statement::SELECT_KEY_SUFFIX, CommandKind, ExecutionMode, KeyStrategy, ReturnShape, TypeRef,
    ValueType,
};
use rowbind_registry::{Registry, Settings};

// ============================================================================
// Helpers
// ============================================================================

fn select_marker(sql: &str) -> StatementMarker {
    StatementMarker::Select {
        sql: vec![sql.to_string()],
        variant: None,
        affects_data: false,
    }
}

fn select_method(name: &str, result: &str) -> MethodDescriptor {
    let mut method = MethodDescriptor::new(name);
    method.return_shape = ReturnShape::Plain(TypeRef::named(result));
    method.statements.push(select_marker("select * from t"));
    method
}

fn parse(registry: &Arc<Registry>, descriptor: InterfaceDescriptor) {
    Arc::new(InterfaceBuilder::new(Arc::clone(registry), descriptor))
        .parse()
        .unwrap();
}

// ============================================================================
// Deferred cross-interface resolution
// ============================================================================

/// A statement referencing a result map that another interface registers
/// later resolves on that interface's retry sweep.
#[test]
fn test_late_result_map_reference_resolves_on_later_build() {
    let registry = Arc::new(Registry::new());

    let mut orders = InterfaceDescriptor::new("app.OrderMapper");
    let mut for_user = select_method("forUser", "app.model.Order");
    for_user
        .result_map_refs
        .push("app.UserMapper.userMap".to_string());
    orders.methods.push(for_user);
    parse(&registry, orders);

    // the referenced map does not exist yet; the method is parked
    assert!(!registry.has_statement("app.OrderMapper.forUser"));
    assert_eq!(registry.pending().len(), 1);

    let mut users = InterfaceDescriptor::new("app.UserMapper");
    let mut find = select_method("find", "app.model.User");
    find.result_group_id = Some("userMap".to_string());
    find.results.push(PropertyMarker::new("name", "user_name"));
    users.methods.push(find);
    parse(&registry, users);

    // the retry sweep at the end of the second build resolved the order
    let statement = registry.statement("app.OrderMapper.forUser").unwrap();
    assert_eq!(statement.result_maps()[0].id(), "app.UserMapper.userMap");
    assert!(registry.pending().is_empty());
}

/// A cache-ref to a namespace whose cache appears later holds back every
/// statement of the referring interface until it resolves.
#[test]
fn test_late_cache_ref_resolves_and_releases_statements() {
    let registry = Arc::new(Registry::new());

    let mut orders = InterfaceDescriptor::new("app.OrderMapper");
    orders.cache_ref = Some(CacheRefMarker {
        type_name: Some("app.UserMapper".to_string()),
        name: None,
    });
    orders.methods.push(select_method("list", "app.model.Order"));
    parse(&registry, orders);

    assert!(!registry.has_statement("app.OrderMapper.list"));
    // one entry for the cache-ref, one for the held-back method
    assert_eq!(registry.pending().len(), 2);

    let mut users = InterfaceDescriptor::new("app.UserMapper");
    users.cache = Some(CacheMarker::default());
    users.methods.push(select_method("find", "app.model.User"));
    parse(&registry, users);

    let statement = registry.statement("app.OrderMapper.list").unwrap();
    // the released statement shares the referenced namespace's cache
    assert_eq!(statement.cache().unwrap().id(), "app.UserMapper");
    assert!(registry.pending().is_empty());
    assert_eq!(
        registry.cache_ref_target("app.OrderMapper").as_deref(),
        Some("app.UserMapper")
    );
}

/// A cache-ref that never resolves keeps its entries reportable instead of
/// silently dropping them.
#[test]
fn test_unresolved_cache_ref_stays_reportable() {
    let registry = Arc::new(Registry::new());

    let mut orders = InterfaceDescriptor::new("app.OrderMapper");
    orders.cache_ref = Some(CacheRefMarker {
        type_name: None,
        name: Some("app.GhostMapper".to_string()),
    });
    orders.methods.push(select_method("list", "app.model.Order"));
    parse(&registry, orders);

    assert!(!registry.has_statement("app.OrderMapper.list"));
    let report = registry.pending().report();
    assert_eq!(report.len(), 2);
    assert!(report.iter().any(|entry| entry.contains("app.GhostMapper")));
    assert!(report
        .iter()
        .any(|entry| entry.contains("app.OrderMapper.list")));
}

/// A cache-ref marker must name its target exactly once.
#[test]
fn test_cache_ref_requires_exactly_one_target() {
    let registry = Arc::new(Registry::new());
    let mut orders = InterfaceDescriptor::new("app.OrderMapper");
    orders.cache_ref = Some(CacheRefMarker {
        type_name: Some("app.UserMapper".to_string()),
        name: Some("app.UserMapper".to_string()),
    });
    let builder = Arc::new(InterfaceBuilder::new(registry, orders));
    assert!(builder.parse().is_err());
}

// ============================================================================
// Key generation
// ============================================================================

/// An auxiliary-key marker registers a suffixed SELECT plus its strategy,
/// and the primary statement points at it.
#[test]
fn test_select_key_marker_registers_auxiliary_statement() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    let mut insert = MethodDescriptor::new("createUser");
    insert.parameters.push(TypeRef::named("app.model.User"));
    insert.statements.push(StatementMarker::Insert {
        sql: vec!["insert into users (name) values (?)".to_string()],
        variant: None,
    });
    insert.key_markers.push(KeyMarker {
        statement: vec!["select last_insert_id()".to_string()],
        result_type: ValueType::named("Long"),
        execution_mode: ExecutionMode::Statement,
        key_property: "id".to_string(),
        key_column: None,
        before: false,
        variant: None,
    });
    users.methods.push(insert);
    parse(&registry, users);

    let aux_id = format!("app.UserMapper.createUser{SELECT_KEY_SUFFIX}");
    let aux = registry.statement(&aux_id).unwrap();
    assert_eq!(aux.command(), CommandKind::Select);
    assert_eq!(aux.execution_mode(), ExecutionMode::Statement);
    assert_eq!(aux.key_property(), Some("id"));
    assert!(!aux.use_cache());
    assert!(!aux.flush_cache());

    let strategy = registry.key_strategy(&aux_id).unwrap();
    assert!(matches!(
        *strategy,
        KeyStrategy::AuxiliarySelect { ref statement_id, before: false }
            if statement_id == &aux_id
    ));

    let primary = registry.statement("app.UserMapper.createUser").unwrap();
    assert!(matches!(
        primary.key_strategy(),
        KeyStrategy::AuxiliarySelect { .. }
    ));
    assert_eq!(primary.key_property(), Some("id"));
}

/// Driver-generated key retrieval via the options marker.
#[test]
fn test_options_generated_keys() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    let mut insert = MethodDescriptor::new("createUser");
    insert.statements.push(StatementMarker::Insert {
        sql: vec!["insert into users default values".to_string()],
        variant: None,
    });
    insert.options.push(OptionsMarker {
        use_generated_keys: true,
        key_property: Some("id".to_string()),
        key_column: Some("user_id".to_string()),
        ..OptionsMarker::default()
    });
    users.methods.push(insert);
    parse(&registry, users);

    let statement = registry.statement("app.UserMapper.createUser").unwrap();
    assert_eq!(statement.key_strategy(), &KeyStrategy::PostRetrieval);
    assert_eq!(statement.key_property(), Some("id"));
    assert_eq!(statement.key_column(), Some("user_id"));
}

/// Declared key names survive an options marker that leaves driver key
/// retrieval off.
#[test]
fn test_options_key_names_recorded_without_retrieval() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    let mut insert = MethodDescriptor::new("createUser");
    insert.statements.push(StatementMarker::Insert {
        sql: vec!["insert into users default values".to_string()],
        variant: None,
    });
    insert.options.push(OptionsMarker {
        use_generated_keys: false,
        key_property: Some("id".to_string()),
        key_column: Some("user_id".to_string()),
        ..OptionsMarker::default()
    });
    users.methods.push(insert);
    parse(&registry, users);

    let statement = registry.statement("app.UserMapper.createUser").unwrap();
    assert_eq!(statement.key_strategy(), &KeyStrategy::None);
    assert_eq!(statement.key_property(), Some("id"));
    assert_eq!(statement.key_column(), Some("user_id"));
}

/// With no options marker at all, the registry-wide setting turns key
/// retrieval on for both kinds of write.
#[test]
fn test_global_generated_keys_setting_applies_to_writes() {
    let settings = Settings {
        use_generated_keys: true,
        ..Settings::default()
    };
    let registry = Arc::new(Registry::with_settings(settings));
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    let mut insert = MethodDescriptor::new("createUser");
    insert.statements.push(StatementMarker::Insert {
        sql: vec!["insert into users default values".to_string()],
        variant: None,
    });
    let mut update = MethodDescriptor::new("renameUser");
    update.statements.push(StatementMarker::Update {
        sql: vec!["update users set name = ?".to_string()],
        variant: None,
    });
    users.methods.push(insert);
    users.methods.push(update);
    parse(&registry, users);

    let insert = registry.statement("app.UserMapper.createUser").unwrap();
    assert_eq!(insert.key_strategy(), &KeyStrategy::PostRetrieval);
    let update = registry.statement("app.UserMapper.renameUser").unwrap();
    assert_eq!(update.key_strategy(), &KeyStrategy::PostRetrieval);
}

// ============================================================================
// Result maps and discriminators
// ============================================================================

/// Discriminator cases become registered child maps inheriting the owner's
/// mappings, and the discriminator routes values to them.
#[test]
fn test_discriminator_cases_extend_owner_map() {
    let registry = Arc::new(Registry::new());
    let mut vehicles = InterfaceDescriptor::new("app.VehicleMapper");
    let mut find = select_method("findVehicle", "app.model.Vehicle");
    find.results.push(PropertyMarker::new("id", "vehicle_id"));
    find.discriminator = Some(DiscriminatorMarker {
        column: "vehicle_type".to_string(),
        value_type: None,
        storage_type: None,
        type_handler: None,
        cases: vec![
            CaseMarker {
                value: "1".to_string(),
                target_type: ValueType::named("app.model.Car"),
                results: vec![PropertyMarker::new("doors", "door_count")],
                ctor_args: vec![],
            },
            CaseMarker {
                value: "2".to_string(),
                target_type: ValueType::named("app.model.Truck"),
                results: vec![PropertyMarker::new("payload", "payload_kg")],
                ctor_args: vec![],
            },
        ],
    });
    vehicles.methods.push(find);
    parse(&registry, vehicles);

    let owner = registry
        .result_map("app.VehicleMapper.findVehicle-void")
        .unwrap();
    let discriminator = owner.discriminator().unwrap();
    assert_eq!(discriminator.selector().column(), Some("vehicle_type"));
    assert_eq!(
        discriminator.result_map_for("1"),
        Some("app.VehicleMapper.findVehicle-void-1")
    );

    let car = registry
        .result_map("app.VehicleMapper.findVehicle-void-1")
        .unwrap();
    assert_eq!(car.target_type(), &ValueType::named("app.model.Car"));
    // case-local mapping plus the inherited owner mapping
    assert!(car.mappings().iter().any(|m| m.property() == Some("doors")));
    assert!(car.mappings().iter().any(|m| m.property() == Some("id")));
}

/// Constructor arguments on the method produce constructor-flagged mappings.
#[test]
fn test_ctor_args_are_constructor_flagged() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    let mut find = select_method("findUser", "app.model.User");
    find.ctor_args.push(CtorArgMarker {
        column: Some("id".to_string()),
        value_type: Some(ValueType::named("Long")),
        id: true,
        ..CtorArgMarker::default()
    });
    find.results.push(PropertyMarker::new("name", "user_name"));
    users.methods.push(find);
    parse(&registry, users);

    let map = registry.result_map("app.UserMapper.findUser-void").unwrap();
    assert!(map.has_constructor_mappings());
    let ctor = map
        .mappings()
        .iter()
        .find(|m| m.flags().constructor)
        .unwrap();
    assert!(ctor.flags().id);
    assert_eq!(ctor.column(), Some("id"));
}

/// A nested-query property with a composite column spec carries the parsed
/// property/column pairs.
#[test]
fn test_composite_column_on_nested_query() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    let mut find = select_method("findUser", "app.model.User");
    find.results.push(PropertyMarker {
        property: "orders".to_string(),
        column: Some("{userId=id,region=region_code}".to_string()),
        nested: Some(NestedObject {
            select: Some("app.OrderMapper.forUser".to_string()),
            ..NestedObject::default()
        }),
        ..PropertyMarker::default()
    });
    users.methods.push(find);
    parse(&registry, users);

    let map = registry.result_map("app.UserMapper.findUser-void").unwrap();
    let orders = map
        .mappings()
        .iter()
        .find(|m| m.property() == Some("orders"))
        .unwrap();
    assert_eq!(orders.nested_query_id(), Some("app.OrderMapper.forUser"));
    assert_eq!(
        orders.composites(),
        &[
            ("userId".to_string(), "id".to_string()),
            ("region".to_string(), "region_code".to_string())
        ]
    );
}

/// A foreign-key column on a nested result map triggers composite parsing
/// even without a nested query, and the guard columns survive onto the
/// registered mapping.
#[test]
fn test_foreign_and_not_null_columns_on_nested_result_map() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    let mut find = select_method("findUser", "app.model.User");
    find.results.push(PropertyMarker {
        property: "orders".to_string(),
        column: Some("{userId=id}".to_string()),
        nested: Some(NestedObject {
            result_map: Some("app.OrderMapper.orderMap".to_string()),
            foreign_column: Some("order_user_id".to_string()),
            not_null_columns: Some("{order_id, order_date}".to_string()),
            ..NestedObject::default()
        }),
        ..PropertyMarker::default()
    });
    users.methods.push(find);
    parse(&registry, users);

    let map = registry.result_map("app.UserMapper.findUser-void").unwrap();
    let orders = map
        .mappings()
        .iter()
        .find(|m| m.property() == Some("orders"))
        .unwrap();
    assert_eq!(
        orders.nested_result_map_id(),
        Some("app.OrderMapper.orderMap")
    );
    assert_eq!(orders.foreign_column(), Some("order_user_id"));
    assert_eq!(
        orders.not_null_columns(),
        &["order_id".to_string(), "order_date".to_string()]
    );
    // foreign-key linkage alone is enough to parse the composite spec
    assert_eq!(
        orders.composites(),
        &[("userId".to_string(), "id".to_string())]
    );
}

// ============================================================================
// Signature-derived result types
// ============================================================================

/// Collection-like returns unwrap to their element type; keyed maps only
/// unwrap when the method marks the key column.
#[test]
fn test_return_shape_drives_result_type() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");

    let mut list = MethodDescriptor::new("listUsers");
    list.return_shape = ReturnShape::CollectionOf(TypeRef::named("app.model.User"));
    list.statements.push(select_marker("select * from users"));

    let mut keyed = MethodDescriptor::new("usersById");
    keyed.return_shape = ReturnShape::MapOf {
        key: TypeRef::named("Long"),
        value: TypeRef::named("app.model.User"),
    };
    keyed.map_key = Some("id".to_string());
    keyed.statements.push(select_marker("select * from users"));

    let mut unkeyed = MethodDescriptor::new("statsRow");
    unkeyed.return_shape = ReturnShape::MapOf {
        key: TypeRef::named("String"),
        value: TypeRef::named("Object"),
    };
    unkeyed.statements.push(select_marker("select count(*) from users"));

    users.methods.push(list);
    users.methods.push(keyed);
    users.methods.push(unkeyed);
    parse(&registry, users);

    let list_map = registry.result_map("app.UserMapper.listUsers-void").unwrap();
    assert_eq!(list_map.target_type(), &ValueType::named("app.model.User"));

    let keyed_map = registry.result_map("app.UserMapper.usersById-void").unwrap();
    assert_eq!(keyed_map.target_type(), &ValueType::named("app.model.User"));

    let unkeyed_map = registry.result_map("app.UserMapper.statsRow-void").unwrap();
    assert_eq!(unkeyed_map.target_type(), &ValueType::named("Map"));
}

/// A void return with an explicit override compiles against the override.
#[test]
fn test_void_return_with_override() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    let mut touch = MethodDescriptor::new("touchUser");
    touch.return_shape = ReturnShape::Void;
    touch.result_type_override = Some(ValueType::named("app.model.User"));
    touch.statements.push(select_marker("select * from users"));
    users.methods.push(touch);
    parse(&registry, users);

    let map = registry.result_map("app.UserMapper.touchUser-void").unwrap();
    assert_eq!(map.target_type(), &ValueType::named("app.model.User"));
}

/// The interface's generic bindings resolve type variables in signatures.
#[test]
fn test_generic_bindings_resolve_signature_types() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    users
        .bindings
        .bind("T", ValueType::named("app.model.User"));
    let mut find = MethodDescriptor::new("findById");
    find.parameters.push(TypeRef::named("Long"));
    find.return_shape = ReturnShape::OptionalOf(TypeRef::Var("T".to_string()));
    find.statements.push(select_marker("select * from users where id = ?"));
    users.methods.push(find);
    parse(&registry, users);

    let map = registry.result_map("app.UserMapper.findById-Long").unwrap();
    assert_eq!(map.target_type(), &ValueType::named("app.model.User"));
    let statement = registry.statement("app.UserMapper.findById").unwrap();
    assert_eq!(statement.parameter_type(), &ValueType::named("Long"));
}

/// Several declared parameters collapse into the synthetic parameter map.
#[test]
fn test_multiple_parameters_use_param_map() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    let mut find = MethodDescriptor::new("findByNameAndAge");
    find.parameters.push(TypeRef::named("String"));
    find.parameters.push(TypeRef::named("Integer"));
    find.return_shape = ReturnShape::Plain(TypeRef::named("app.model.User"));
    find.statements.push(select_marker("select * from users"));
    users.methods.push(find);
    parse(&registry, users);

    let statement = registry.statement("app.UserMapper.findByNameAndAge").unwrap();
    assert_eq!(statement.parameter_type(), &ValueType::param_map());
    assert!(registry.has_result_map("app.UserMapper.findByNameAndAge-String-Integer"));
}

// ============================================================================
// Caches and options
// ============================================================================

/// Cache properties resolve `${...}` placeholders against the registry
/// settings' variables.
#[test]
fn test_cache_properties_resolve_placeholders() {
    let mut settings = Settings::default();
    settings.variables.set("cache.size", "512");
    let registry = Arc::new(Registry::with_settings(settings));

    let mut users = InterfaceDescriptor::new("app.UserMapper");
    users.cache = Some(CacheMarker {
        properties: vec![("size".to_string(), "${cache.size}".to_string())],
        ..CacheMarker::default()
    });
    users.methods.push(select_method("find", "app.model.User"));
    parse(&registry, users);

    let cache = registry.cache("app.UserMapper").unwrap();
    assert_eq!(cache.properties().get("size"), Some("512"));

    let statement = registry.statement("app.UserMapper.find").unwrap();
    assert_eq!(statement.cache().unwrap().id(), "app.UserMapper");
}

/// An options marker overrides the per-command cache defaults.
#[test]
fn test_options_override_cache_behavior() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    let mut find = select_method("findFresh", "app.model.User");
    find.options.push(OptionsMarker {
        use_cache: false,
        flush_cache: rowbind_core::FlushPolicy::True,
        fetch_size: Some(100),
        timeout_ms: Some(5_000),
        ..OptionsMarker::default()
    });
    users.methods.push(find);
    parse(&registry, users);

    let statement = registry.statement("app.UserMapper.findFresh").unwrap();
    assert!(!statement.use_cache());
    assert!(statement.flush_cache());
    assert_eq!(statement.fetch_size(), Some(100));
    assert_eq!(statement.timeout_ms(), Some(5_000));
}

/// Named result-set labels split on commas and drop empty segments.
#[test]
fn test_result_sets_labels_split_and_trim() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    let mut find = select_method("findWithOrders", "app.model.User");
    find.options.push(OptionsMarker {
        result_sets: Some("users, orders,".to_string()),
        ..OptionsMarker::default()
    });
    users.methods.push(find);
    parse(&registry, users);

    let statement = registry.statement("app.UserMapper.findWithOrders").unwrap();
    assert_eq!(statement.result_sets(), &["users".to_string(), "orders".to_string()]);
}

/// Two interfaces re-using the same qualified statement id is fatal.
#[test]
fn test_duplicate_statement_id_is_fatal() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    users.methods.push(select_method("find", "app.model.User"));
    parse(&registry, users.clone());

    // distinct resource string, same namespace and method name
    let assistant = Arc::new(rowbind_builder::MappingAssistant::new(
        Arc::clone(&registry),
        "app.UserMapper (companion)",
    ));
    let builder = Arc::new(InterfaceBuilder::with_assistant(assistant, users));
    assert!(builder.parse().is_err());
}

/// Provider-backed statements register with a provider description.
#[test]
fn test_provider_statement_registers() {
    let registry = Arc::new(Registry::new());
    let mut users = InterfaceDescriptor::new("app.UserMapper");
    let mut find = MethodDescriptor::new("search");
    find.return_shape = ReturnShape::CollectionOf(TypeRef::named("app.model.User"));
    find.statements.push(StatementMarker::SelectProvider {
        provider: rowbind_core::ProviderRef {
            type_name: "app.UserSqlProvider".to_string(),
            method: "searchSql".to_string(),
        },
        variant: None,
        affects_data: false,
    });
    users.methods.push(find);
    parse(&registry, users);

    let statement = registry.statement("app.UserMapper.search").unwrap();
    assert!(statement.sql().describe().contains("app.UserSqlProvider"));
    assert!(statement.sql().describe().contains("searchSql"));
}
