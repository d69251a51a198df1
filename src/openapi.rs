//! OpenAPI document derived from the schema registry.
//!
//! Recomputed on every request to `<prefix>openapi.json`; one component schema per registered
//! schema, one path item per generated route.

use crate::config::{FieldDef, FieldType};
use crate::registry::{Schema, SchemaRegistry};
use utoipa::openapi::header::Header;
use utoipa::openapi::path::{HttpMethod, OperationBuilder, Parameter, ParameterBuilder, ParameterIn, PathItem};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::schema::{ArrayBuilder, ObjectBuilder, Schema as ApiSchema, SchemaFormat, Type};
use utoipa::openapi::{
    ComponentsBuilder, ContentBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder, Ref, RefOr,
    Required, ResponseBuilder,
};

const JSON: &str = "application/json";
const ERROR_SCHEMA: &str = "Error";

fn schema_ref(name: &str) -> RefOr<ApiSchema> {
    RefOr::Ref(Ref::from_schema_name(name))
}

fn typed(ty: Type) -> RefOr<ApiSchema> {
    RefOr::T(ApiSchema::Object(ObjectBuilder::new().schema_type(ty).build()))
}

fn field_schema(ty: &FieldType) -> RefOr<ApiSchema> {
    let schema = match ty {
        FieldType::String => ObjectBuilder::new().schema_type(Type::String).build().into(),
        FieldType::Int => ObjectBuilder::new()
            .schema_type(Type::Integer)
            .format(Some(SchemaFormat::Custom("int64".into())))
            .build()
            .into(),
        FieldType::Float => ObjectBuilder::new().schema_type(Type::Number).build().into(),
        FieldType::Bool => ObjectBuilder::new().schema_type(Type::Boolean).build().into(),
        FieldType::DateTime => ObjectBuilder::new()
            .schema_type(Type::String)
            .format(Some(SchemaFormat::Custom("date-time".into())))
            .build()
            .into(),
        FieldType::Reference(target) => ObjectBuilder::new()
            .schema_type(Type::String)
            .pattern(Some(format!(r"^{}/\d+$", target)))
            .description(Some(format!("reference to a record in {}", target)))
            .build()
            .into(),
        FieldType::List(inner) => ApiSchema::Array(ArrayBuilder::new().items(field_schema(inner)).build()),
        FieldType::Nested(fields) => object_schema(fields, false, None),
    };
    RefOr::T(schema)
}

fn object_schema(fields: &[FieldDef], with_id: bool, description: Option<&str>) -> ApiSchema {
    let mut obj = ObjectBuilder::new()
        .schema_type(Type::Object)
        .description(description.map(str::to_string));
    if with_id {
        obj = obj.property(
            "id",
            RefOr::T(ApiSchema::Object(
                ObjectBuilder::new()
                    .schema_type(Type::Integer)
                    .description(Some("system-assigned identifier"))
                    .build(),
            )),
        );
    }
    for f in fields {
        let prop = match field_schema(&f.type_) {
            RefOr::T(ApiSchema::Object(mut o)) => {
                if f.default.is_some() {
                    o.default = f.default.clone();
                }
                if f.description.is_some() {
                    o.description = f.description.clone();
                }
                RefOr::T(ApiSchema::Object(o))
            }
            RefOr::T(ApiSchema::Array(mut a)) => {
                if f.default.is_some() {
                    a.default = f.default.clone();
                }
                if f.description.is_some() {
                    a.description = f.description.clone();
                }
                RefOr::T(ApiSchema::Array(a))
            }
            other => other,
        };
        obj = obj.property(f.name.clone(), prop);
        if f.required {
            obj = obj.required(f.name.clone());
        }
    }
    ApiSchema::Object(obj.build())
}

fn envelope(inner: RefOr<ApiSchema>) -> ApiSchema {
    ApiSchema::Object(
        ObjectBuilder::new()
            .schema_type(Type::Object)
            .property("data", inner)
            .required("data")
            .build(),
    )
}

fn query_param(name: &str, ty: Type, description: &str) -> Parameter {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(ParameterIn::Query)
        .required(Required::False)
        .description(Some(description))
        .schema(Some(typed(ty)))
        .build()
}

/// Parameters shared by every list endpoint.
pub fn list_parameters() -> Vec<Parameter> {
    vec![
        query_param(
            "filter",
            Type::String,
            "comma-separated clauses <field><op><value>, op one of == != < > <= >= ~=",
        ),
        query_param("sort", Type::String, "comma-separated field names, '-' prefix for descending"),
        query_param("offset", Type::Integer, "number of matches to skip (default 0)"),
        query_param("limit", Type::Integer, "page size; 0 or negative returns all matches"),
        query_param("fields", Type::String, "comma-separated projection; id is always returned"),
    ]
}

fn path_param(name: &str, ty: Type) -> Parameter {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .schema(Some(typed(ty)))
        .build()
}

fn response(description: &str, body: Option<ApiSchema>) -> utoipa::openapi::Response {
    let mut builder = ResponseBuilder::new().description(description);
    if let Some(body) = body {
        builder = builder.content(JSON, ContentBuilder::new().schema(Some(body)).build());
    }
    builder.build()
}

fn error_response(description: &str) -> utoipa::openapi::Response {
    ResponseBuilder::new()
        .description(description)
        .content(JSON, ContentBuilder::new().schema(Some(schema_ref(ERROR_SCHEMA))).build())
        .build()
}

fn schema_paths(schema: &Schema, prefix: &str, paths: PathsBuilder) -> PathsBuilder {
    let name = schema.name();
    let coll = schema.collection_name();
    let base = format!("{}{}", prefix, coll);
    let one = || envelope(schema_ref(name));
    let body = || {
        RequestBodyBuilder::new()
            .content(JSON, ContentBuilder::new().schema(Some(schema_ref(name))).build())
            .required(Some(Required::True))
            .build()
    };

    let mut list = OperationBuilder::new()
        .operation_id(Some(format!("list_{}", coll)))
        .summary(Some(format!("List {}", coll)))
        .tag(coll);
    for p in list_parameters() {
        list = list.parameter(p);
    }
    let list = list
        .response(
            "200",
            ResponseBuilder::new()
                .description("matching records")
                .content(
                    JSON,
                    ContentBuilder::new()
                        .schema(Some(envelope(RefOr::T(ApiSchema::Array(
                            ArrayBuilder::new().items(schema_ref(name)).build(),
                        )))))
                        .build(),
                )
                .header(
                    "X-Total-Count",
                    Header::new(typed(Type::Integer)),
                )
                .build(),
        )
        .response("400", error_response("malformed query parameters"))
        .build();

    let create = OperationBuilder::new()
        .operation_id(Some(format!("create_{}", coll)))
        .summary(Some(format!("Create a {} record (or replace one when the body carries an id)", name)))
        .tag(coll)
        .request_body(Some(body()))
        .response("201", response("created", Some(one())))
        .response("200", response("replaced", Some(one())))
        .response("404", error_response("unknown id"))
        .response("422", error_response("invalid body"))
        .build();

    let read = OperationBuilder::new()
        .operation_id(Some(format!("read_{}", coll)))
        .summary(Some(format!("Fetch one {} record", name)))
        .tag(coll)
        .parameter(path_param("id", Type::Integer))
        .parameter(query_param("fields", Type::String, "comma-separated projection"))
        .response("200", response("the record", Some(one())))
        .response("404", error_response("unknown id"))
        .build();

    let replace = OperationBuilder::new()
        .operation_id(Some(format!("replace_{}", coll)))
        .summary(Some(format!("Replace one {} record", name)))
        .tag(coll)
        .parameter(path_param("id", Type::Integer))
        .request_body(Some(body()))
        .response("200", response("replaced", Some(one())))
        .response("404", error_response("unknown id"))
        .response("409", error_response("body id differs from path id"))
        .response("422", error_response("invalid body"))
        .build();

    let delete = OperationBuilder::new()
        .operation_id(Some(format!("delete_{}", coll)))
        .summary(Some(format!("Delete one {} record", name)))
        .tag(coll)
        .parameter(path_param("id", Type::Integer))
        .response("204", response("deleted", None))
        .response("404", error_response("unknown id"))
        .build();

    let walk = OperationBuilder::new()
        .operation_id(Some(format!("walk_{}", coll)))
        .summary(Some(format!("Resolve a path of field names and list indexes inside a {} record", name)))
        .tag(coll)
        .parameter(path_param("id", Type::Integer))
        .parameter(path_param("path", Type::String))
        .response("200", response("the resolved value", Some(envelope(RefOr::T(ApiSchema::Object(ObjectBuilder::new().build()))))))
        .response("404", error_response("unknown id"))
        .response("422", error_response("a path segment does not resolve"))
        .build();

    let mut collection = PathItem::new(HttpMethod::Get, list);
    collection.post = Some(create);
    let mut item = PathItem::new(HttpMethod::Get, read);
    item.put = Some(replace);
    item.delete = Some(delete);

    paths
        .path(base.clone(), collection.clone())
        .path(format!("{}/", base), collection)
        .path(format!("{}/{{id}}", base), item)
        .path(format!("{}/{{id}}/{{path}}", base), PathItem::new(HttpMethod::Get, walk))
}

/// Build the API description for every registered schema.
pub fn document(registry: &SchemaRegistry, prefix: &str) -> OpenApi {
    let mut components = ComponentsBuilder::new().schema(
        ERROR_SCHEMA,
        ApiSchema::Object(
            ObjectBuilder::new()
                .schema_type(Type::Object)
                .property(
                    "error",
                    RefOr::T(ApiSchema::Object(
                        ObjectBuilder::new()
                            .schema_type(Type::Object)
                            .property("code", typed(Type::String))
                            .property("message", typed(Type::String))
                            .required("code")
                            .required("message")
                            .build(),
                    )),
                )
                .required("error")
                .build(),
        ),
    );
    let mut paths = PathsBuilder::new();
    for schema in registry.all_schemas() {
        components = components.schema(
            schema.name(),
            object_schema(schema.fields(), true, schema.description()),
        );
        paths = schema_paths(schema, prefix, paths);
    }

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(env!("CARGO_PKG_NAME"))
                .version(env!("CARGO_PKG_VERSION"))
                .description(Some("CRUD and query endpoints generated from registered schemas"))
                .build(),
        )
        .paths(paths.build())
        .components(Some(components.build()))
        .build()
}
