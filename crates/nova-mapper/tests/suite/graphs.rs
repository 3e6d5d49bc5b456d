use nova_mapper::{MapperDecl, MappingMethod, PlanKind};
use nova_mapper_config::{MethodConfig, PropertyMappingConfig};
use nova_mapper_types::{TypeDef, TypeRef, TypeStore};
use pretty_assertions::assert_eq;

use super::{method, resolve};

#[test]
fn shared_member_pairs_generate_one_method() {
    let mut store = TypeStore::default();
    let string = store.parse("string").expect("string");
    let customer = store.upsert_type(TypeDef::class("Customer").with_property("Name", string));
    let customer_dto =
        store.upsert_type(TypeDef::class("CustomerDto").with_property("Name", string));
    let order = store.upsert_type(
        TypeDef::class("Order").with_property("Customer", TypeRef::new(customer)),
    );
    let order_dto = store.upsert_type(
        TypeDef::class("OrderDto").with_property("Customer", TypeRef::new(customer_dto)),
    );
    let invoice = store.upsert_type(
        TypeDef::class("Invoice").with_property("Customer", TypeRef::new(customer)),
    );
    let invoice_dto = store.upsert_type(
        TypeDef::class("InvoiceDto").with_property("Customer", TypeRef::new(customer_dto)),
    );
    let mapper = MapperDecl::new("M")
        .with_method(MappingMethod::new(
            "MapOrder",
            TypeRef::new(order),
            TypeRef::new(order_dto),
        ))
        .with_method(MappingMethod::new(
            "MapInvoice",
            TypeRef::new(invoice),
            TypeRef::new(invoice_dto),
        ));

    let resolved = resolve(&store, &mapper);
    let names: Vec<&str> = resolved.plans.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["MapOrder", "MapInvoice", "MapToCustomerDto"]);

    let shared = resolved.plan("MapToCustomerDto").expect("generated");
    assert_eq!(shared.kind, PlanKind::NewInstance);
    for name in ["MapOrder", "MapInvoice"] {
        let calls = resolved.plan(name).expect("declared").calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].plan, shared.id);
    }
    assert_eq!(
        method(&resolved, "MapInvoice"),
        "public partial InvoiceDto MapInvoice(Invoice source) { var target = new InvoiceDto(); \
         target.Customer = MapToCustomerDto(source.Customer); return target; }"
    );
    assert_eq!(
        method(&resolved, "MapToCustomerDto"),
        "private CustomerDto MapToCustomerDto(Customer source) { var target = new CustomerDto(); \
         target.Name = source.Name; return target; }"
    );
}

#[test]
fn self_referencing_graphs_call_the_declared_method() {
    let mut store = TypeStore::default();
    let string = store.parse("string").expect("string");
    let node = store.intern_type_id("Node");
    store.define_type(
        node,
        TypeDef::class("Node")
            .with_property("Name", string)
            .with_property("Next", TypeRef::nullable(node)),
    );
    let dto = store.intern_type_id("NodeDto");
    store.define_type(
        dto,
        TypeDef::class("NodeDto")
            .with_property("Name", string)
            .with_property("Next", TypeRef::nullable(dto)),
    );
    let mapper = MapperDecl::new("M").with_method(MappingMethod::new(
        "Map",
        TypeRef::new(node),
        TypeRef::new(dto),
    ));

    let resolved = resolve(&store, &mapper);
    assert_eq!(resolved.plans.len(), 1);
    assert_eq!(resolved.plans[0].self_calls(), 1);
    assert_eq!(
        method(&resolved, "Map"),
        "public partial NodeDto Map(Node source) { var target = new NodeDto(); \
         target.Name = source.Name; \
         if (source.Next != null) { target.Next = Map(source.Next); } \
         else { target.Next = null; } return target; }"
    );
}

#[test]
fn mutually_recursive_types_generate_each_method_once() {
    let mut store = TypeStore::default();
    let string = store.parse("string").expect("string");
    let author = store.intern_type_id("Author");
    let book = store.intern_type_id("Book");
    let author_dto = store.intern_type_id("AuthorDto");
    let book_dto = store.intern_type_id("BookDto");
    store.define_type(
        author,
        TypeDef::class("Author")
            .with_property("Name", string)
            .with_property("Favorite", TypeRef::nullable(book)),
    );
    store.define_type(
        book,
        TypeDef::class("Book")
            .with_property("Title", string)
            .with_property("Author", TypeRef::nullable(author)),
    );
    store.define_type(
        author_dto,
        TypeDef::class("AuthorDto")
            .with_property("Name", string)
            .with_property("Favorite", TypeRef::nullable(book_dto)),
    );
    store.define_type(
        book_dto,
        TypeDef::class("BookDto")
            .with_property("Title", string)
            .with_property("Author", TypeRef::nullable(author_dto)),
    );
    let mapper = MapperDecl::new("M").with_method(MappingMethod::new(
        "MapAuthor",
        TypeRef::new(author),
        TypeRef::new(author_dto),
    ));

    let resolved = resolve(&store, &mapper);
    let names: Vec<&str> = resolved.plans.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["MapAuthor", "MapToBookDto"]);
    let book_calls: Vec<&str> = resolved
        .plan("MapToBookDto")
        .expect("generated")
        .calls()
        .into_iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(book_calls, vec!["MapAuthor"]);
}

#[test]
fn flattened_and_unflattened_members() {
    let mut store = TypeStore::default();
    let string = store.parse("string").expect("string");
    let customer = store.upsert_type(TypeDef::class("Customer").with_property("Name", string));
    let order = store.upsert_type(
        TypeDef::class("Order")
            .with_property("Customer", TypeRef::new(customer))
            .with_property("Street", string),
    );
    let address = store.upsert_type(TypeDef::class("Address").with_property("Street", string));
    let order_dto = store.upsert_type(
        TypeDef::class("OrderDto")
            .with_property("CustomerName", string)
            .with_property("Shipping", TypeRef::nullable(address)),
    );
    let config = MethodConfig {
        properties: vec![PropertyMappingConfig::new("Street", "Shipping.Street")],
        ..MethodConfig::default()
    };
    let mapper = MapperDecl::new("M").with_method(
        MappingMethod::new("Map", TypeRef::new(order), TypeRef::new(order_dto))
            .with_config(config),
    );

    let resolved = resolve(&store, &mapper);
    assert_eq!(
        method(&resolved, "Map"),
        "public partial OrderDto Map(Order source) { var target = new OrderDto(); \
         target.Shipping ??= new Address(); target.Shipping.Street = source.Street; \
         target.CustomerName = source.Customer.Name; return target; }"
    );
    assert!(resolved.diagnostics.is_empty(), "{:?}", resolved.diagnostics);
}
