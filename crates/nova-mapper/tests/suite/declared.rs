use nova_mapper::{MapperDecl, MappingMethod, MethodParam, PlanKind, RuntimeDispatch};
use nova_mapper_config::{MapperOptionsLayer, MethodConfig};
use nova_mapper_types::{TypeDef, TypeRef, TypeStore};
use pretty_assertions::assert_eq;

use super::{codes, method, resolve};

fn cars(store: &mut TypeStore) -> (TypeRef, TypeRef) {
    let int = store.parse("int").expect("int");
    let car = store.upsert_type(TypeDef::class("Car").with_property("Seats", int));
    let dto = store.upsert_type(TypeDef::class("CarDto").with_property("Seats", int));
    (TypeRef::new(car), TypeRef::new(dto))
}

#[test]
fn identical_types_return_the_source() {
    let mut store = TypeStore::default();
    let (car, _) = cars(&mut store);
    let string = store.parse("string").expect("string");
    let mapper = MapperDecl::new("M")
        .with_method(MappingMethod::new("Copy", car, car))
        .with_method(MappingMethod::new("Text", string, string));

    let resolved = resolve(&store, &mapper);
    assert_eq!(
        method(&resolved, "Copy"),
        "public partial Car Copy(Car source) { return source; }"
    );
    assert_eq!(
        method(&resolved, "Text"),
        "public partial string Text(string source) { return source; }"
    );
    assert!(resolved.plans.iter().all(|plan| !plan.allocates()));
    assert!(resolved.diagnostics.is_empty(), "{:?}", resolved.diagnostics);
}

#[test]
fn deep_cloning_copies_identical_types() {
    let mut store = TypeStore::default();
    let (car, _) = cars(&mut store);
    let mapper = MapperDecl::new("M")
        .with_options(MapperOptionsLayer {
            deep_cloning: Some(true),
            ..MapperOptionsLayer::default()
        })
        .with_method(MappingMethod::new("Copy", car, car));

    let resolved = resolve(&store, &mapper);
    assert_eq!(
        method(&resolved, "Copy"),
        "public partial Car Copy(Car source) { var target = new Car(); \
         target.Seats = source.Seats; return target; }"
    );
}

#[test]
fn nullable_sources_follow_the_null_policy() {
    let mut store = TypeStore::default();
    let (car, dto) = cars(&mut store);
    let int = store.parse("int").expect("int");
    let lenient = MethodConfig {
        options: MapperOptionsLayer {
            throw_on_mapping_null_mismatch: Some(false),
            ..MapperOptionsLayer::default()
        },
        ..MethodConfig::default()
    };
    let mapper = MapperDecl::new("M")
        .with_method(MappingMethod::new(
            "ToNullable",
            car.with_nullable(true),
            dto.with_nullable(true),
        ))
        .with_method(MappingMethod::new("Throwing", car.with_nullable(true), dto))
        .with_method(
            MappingMethod::new("Defaulting", car.with_nullable(true), dto)
                .with_config(lenient.clone()),
        )
        .with_method(
            MappingMethod::new("Unwrap", int.with_nullable(true), int).with_config(lenient),
        );

    let resolved = resolve(&store, &mapper);
    assert!(method(&resolved, "ToNullable")
        .starts_with("public partial CarDto? ToNullable(Car? source) { if (source == null) { return null; }"));
    assert!(method(&resolved, "Throwing").starts_with(
        "public partial CarDto Throwing(Car? source) { \
         if (source == null) { throw new ArgumentNullException(nameof(source)); }"
    ));
    assert!(method(&resolved, "Defaulting").starts_with(
        "public partial CarDto Defaulting(Car? source) { if (source == null) { return new CarDto(); }"
    ));
    assert_eq!(
        method(&resolved, "Unwrap"),
        "public partial int Unwrap(int? source) { if (source == null) { return default; } \
         var sourceValue = source.Value; return sourceValue; }"
    );

    let lenient_methods: Vec<&str> = resolved
        .diagnostics
        .iter()
        .filter(|d| d.diagnostic.code == "NullableSourceTypeToNonNullableTargetType")
        .map(|d| d.method.as_str())
        .collect();
    assert_eq!(lenient_methods, vec!["Defaulting", "Unwrap"]);
}

#[test]
fn existing_targets_are_merged_in_place() {
    let mut store = TypeStore::default();
    let (car, dto) = cars(&mut store);
    let ints = store.parse("IEnumerable<int>").expect("ints");
    let list = store.parse("List<int>").expect("list");
    let mapper = MapperDecl::new("M")
        .with_method(MappingMethod::existing("Update", car, dto))
        .with_method(MappingMethod::existing("Append", ints, list));

    let resolved = resolve(&store, &mapper);
    let update = resolved.plan("Update").expect("Update");
    assert_eq!(update.kind, PlanKind::ExistingTarget);
    assert_eq!(
        method(&resolved, "Update"),
        "public partial void Update(Car source, CarDto target) { target.Seats = source.Seats; }"
    );
    assert_eq!(
        method(&resolved, "Append"),
        "public partial void Append(IEnumerable<int> source, List<int> target) { \
         if (Enumerable.TryGetNonEnumeratedCount(source, out var sourceCount)) \
         { target.EnsureCapacity(sourceCount + target.Count); } \
         foreach (var item in source) { target.Add(item); } }"
    );
}

#[test]
fn runtime_dispatch_tries_derived_sources_first() {
    let mut store = TypeStore::default();
    let (car, dto) = cars(&mut store);
    let int = store.parse("int").expect("int");
    let object = store.parse("object").expect("object");
    let truck = store.upsert_type(
        TypeDef::class("Truck")
            .with_base(car)
            .with_property("Load", int),
    );
    let truck_dto = store.upsert_type(
        TypeDef::class("TruckDto")
            .with_property("Seats", int)
            .with_property("Load", int),
    );
    let type_ty = store.upsert_type(TypeDef::class("Type"));
    let mapper = MapperDecl::new("M")
        .with_method(MappingMethod::new("MapCar", car, dto))
        .with_method(MappingMethod::new(
            "MapTruck",
            TypeRef::new(truck),
            TypeRef::new(truck_dto),
        ))
        .with_method(
            MappingMethod::new("Map", object, object)
                .with_param(MethodParam::new("targetType", TypeRef::new(type_ty)))
                .with_dispatch(RuntimeDispatch::TargetTypeParameter),
        )
        .with_method(
            MappingMethod::new("MapGeneric", object, object)
                .with_dispatch(RuntimeDispatch::GenericTarget),
        );

    let resolved = resolve(&store, &mapper);
    assert_eq!(
        resolved.plan("Map").map(|plan| plan.kind),
        Some(PlanKind::RuntimeDispatch)
    );
    assert_eq!(
        method(&resolved, "Map"),
        "public partial object Map(object source, Type targetType) { return source switch { \
         Truck x0 when targetType.IsAssignableFrom(typeof(TruckDto)) => MapTruck(x0), \
         Car x1 when targetType.IsAssignableFrom(typeof(CarDto)) => MapCar(x1), \
         null => throw new ArgumentNullException(nameof(source)), \
         _ => throw new ArgumentException(\"Cannot map the source to the requested target type \
         as there is no known type mapping\", nameof(source)), }; }"
    );
    let generic = method(&resolved, "MapGeneric");
    assert!(generic.starts_with("public partial TTarget MapGeneric<TTarget>(object source)"));
    assert!(generic.contains(
        "Truck x0 when typeof(TTarget).IsAssignableFrom(typeof(TruckDto)) => (TTarget)((object)MapTruck(x0))"
    ));
}

#[test]
fn duplicate_declarations_are_reported_and_the_first_is_reused() {
    let mut store = TypeStore::default();
    let (car, dto) = cars(&mut store);
    let garage = store.upsert_type(TypeDef::class("Garage").with_property("Car", car));
    let garage_dto = store.upsert_type(TypeDef::class("GarageDto").with_property("Car", dto));
    let mapper = MapperDecl::new("M")
        .with_method(MappingMethod::new("First", car, dto))
        .with_method(MappingMethod::new("Second", car, dto))
        .with_method(MappingMethod::new(
            "MapGarage",
            TypeRef::new(garage),
            TypeRef::new(garage_dto),
        ));

    let resolved = resolve(&store, &mapper);
    assert_eq!(codes(&resolved), vec!["AmbiguousMappingMethod"]);
    assert_eq!(resolved.diagnostics[0].method, "Second");
    let calls: Vec<String> = resolved
        .plan("MapGarage")
        .expect("MapGarage")
        .calls()
        .into_iter()
        .map(|m| m.name.clone())
        .collect();
    assert_eq!(calls, vec!["First".to_string()]);
    // Both declarations still get a body.
    assert!(resolved.plan("Second").is_some());
    assert_eq!(resolved.plans.len(), 3);
}

#[test]
fn unmappable_declarations_become_throw_stubs() {
    let mut store = TypeStore::default();
    let (car, _) = cars(&mut store);
    let int = store.parse("int").expect("int");
    let mapper = MapperDecl::new("M").with_method(MappingMethod::new("Broken", car, int));

    let resolved = resolve(&store, &mapper);
    let plan = resolved.plan("Broken").expect("Broken");
    assert_eq!(plan.kind, PlanKind::ThrowStub);
    assert!(method(&resolved, "Broken").contains("throw new InvalidOperationException("));
    assert!(resolved.has_errors());
}
