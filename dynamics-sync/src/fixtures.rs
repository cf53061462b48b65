//! Shared test fixtures: an HR-style model over two in-memory graphs

use crate::metadata::{Association, AssociationEnd, AssociationRegistry, Multiplicity, ReferentialConstraint};
use crate::model::{EntityKey, Value};
use std::sync::Arc;

pub(crate) use crate::graph::{MemoryEntity, MemoryGraph};

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn make_registry() -> Arc<AssociationRegistry> {
    let registry = AssociationRegistry::new([
        Association::new(
            "Employee_Manager",
            AssociationEnd::new("Manager", "Employees", Multiplicity::ZeroOrOne).navigation("Reports"),
            AssociationEnd::new("Employee", "Employees", Multiplicity::Many).navigation("Manager"),
        )
        .constraint(ReferentialConstraint::new("Manager", "Employee", &["Id"], &["ManagerId"])),
        Association::new(
            "Department_Employees",
            AssociationEnd::new("Department", "Departments", Multiplicity::One).navigation("Employees"),
            AssociationEnd::new("Employee", "Employees", Multiplicity::Many).navigation("Department"),
        )
        .constraint(ReferentialConstraint::new(
            "Department",
            "Employee",
            &["Id"],
            &["DepartmentId"],
        )),
        Association::new(
            "Folder_Children",
            AssociationEnd::new("Parent", "Folders", Multiplicity::ZeroOrOne).navigation("Children"),
            AssociationEnd::new("Child", "Folders", Multiplicity::Many).navigation("Parent"),
        ),
        Association::new(
            "Employee_Projects",
            AssociationEnd::new("Employee", "Employees", Multiplicity::Many).navigation("Projects"),
            AssociationEnd::new("Project", "Projects", Multiplicity::Many),
        ),
        Association::new(
            "Employee_Badge",
            AssociationEnd::new("Holder", "Employees", Multiplicity::One).navigation("Badge"),
            AssociationEnd::new("Badge", "Badges", Multiplicity::ZeroOrOne).navigation("Holder"),
        )
        .constraint(ReferentialConstraint::new("Holder", "Badge", &["Id"], &["EmployeeId"])),
        Association::new(
            "Order_Lines",
            AssociationEnd::new("Order", "Orders", Multiplicity::One).navigation("Lines"),
            AssociationEnd::new("Line", "OrderLines", Multiplicity::Many).navigation("Order"),
        )
        .constraint(ReferentialConstraint::new(
            "Order",
            "Line",
            &["Region", "No"],
            &["OrderRegion", "OrderNo"],
        )),
    ])
    .unwrap();
    Arc::new(registry)
}

pub(crate) fn make_graph(name: &str, registry: &Arc<AssociationRegistry>) -> MemoryGraph {
    MemoryGraph::new(name, registry.clone())
        .entity_set("Employees", &["Id"])
        .entity_set("Departments", &["Id"])
        .entity_set("Folders", &["Id"])
        .entity_set("Projects", &["Id"])
        .entity_set("Badges", &["Id"])
        .entity_set("Orders", &["Region", "No"])
        .entity_set("OrderLines", &["Id"])
}

pub(crate) fn make_key(entity_set: &str, id: i64) -> EntityKey {
    EntityKey::single(entity_set, "Id", id)
}

pub(crate) fn make_employee(id: i64, name: &str, manager: Option<i64>) -> MemoryEntity {
    MemoryEntity::new("Employee")
        .with_value("Id", id)
        .with_value("Name", name)
        .with_value("ManagerId", manager.map(Value::Int).unwrap_or_default())
        .with_value("DepartmentId", Value::Null)
}

pub(crate) fn make_folder(id: i64, name: &str) -> MemoryEntity {
    MemoryEntity::new("Folder").with_value("Id", id).with_value("Name", name)
}

pub(crate) fn make_project(id: i64, name: &str) -> MemoryEntity {
    MemoryEntity::new("Project").with_value("Id", id).with_value("Name", name)
}

pub(crate) fn make_badge(id: i64, holder: Option<i64>) -> MemoryEntity {
    MemoryEntity::new("Badge")
        .with_value("Id", id)
        .with_value("EmployeeId", holder.map(Value::Int).unwrap_or_default())
}

pub(crate) fn make_order_key(region: &str, no: i64) -> EntityKey {
    EntityKey::new("Orders", [("Region", Value::from(region)), ("No", Value::Int(no))])
}

pub(crate) fn make_order(region: &str, no: i64) -> MemoryEntity {
    MemoryEntity::new("Order").with_value("Region", region).with_value("No", no)
}

pub(crate) fn make_order_line(id: i64, region: &str, no: i64) -> MemoryEntity {
    MemoryEntity::new("OrderLine")
        .with_value("Id", id)
        .with_value("OrderRegion", region)
        .with_value("OrderNo", no)
}

/// Source and target graphs over identical stores. The source tracks every
/// row as unchanged; the target has loaded nothing yet.
pub(crate) fn make_seeded_pair(rows: Vec<(&str, MemoryEntity)>) -> (MemoryGraph, MemoryGraph) {
    let registry = make_registry();
    let mut source = make_graph("source", &registry);
    let mut target = make_graph("target", &registry);
    for (entity_set, entity) in rows {
        source.load(entity_set, entity.clone()).unwrap();
        target.seed(entity_set, entity).unwrap();
    }
    (source, target)
}
